//! Playback: one sample source routed dry or through an effect graph.
//!
//! The controller is a two-state machine (Idle / Playing). Starting a new
//! playback always stops the previous one first, so at most one source ever
//! renders. Every play returns a [`Completion`] that resolves exactly once:
//! [`PlaybackOutcome::Finished`] when the sample runs out, or
//! [`PlaybackOutcome::Stopped`] when playback was cut short.
//!
//! Rendering is pull-based. The host audio callback (or the offline
//! renderer) calls [`PlaybackController::render`] once per block.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::effect::EffectParam;
use crate::error::{EngineError, Result};
use crate::graph::{EffectGraph, GraphId, ParamSnapshot};

// ── Sample buffer ───────────────────────────────────────────

/// A decoded, mono sample. Cloning is cheap.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    data: Arc<[f32]>,
    sample_rate: u32,
    channels: u16,
}

impl SampleBuffer {
    pub fn new(data: Vec<f32>, sample_rate: u32) -> Self {
        SampleBuffer {
            data: data.into(),
            sample_rate,
            channels: 1,
        }
    }

    /// Mix interleaved multichannel audio down to mono.
    pub fn from_interleaved(samples: &[f32], channels: u16, sample_rate: u32) -> Self {
        let channels = channels.max(1);
        let data: Vec<f32> = samples
            .chunks(channels as usize)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();
        SampleBuffer {
            data: data.into(),
            sample_rate,
            channels,
        }
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count of the source before mixdown.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.data.len() as f64 / self.sample_rate as f64)
    }
}

// ── Output device ───────────────────────────────────────────

/// The audio sink the controller starts and stops around each play.
///
/// Implementations wrap whatever actually pulls samples: an AudioWorklet,
/// a native stream, or nothing at all for offline rendering.
pub trait OutputDevice: Send {
    /// Get ready to pull audio. An error leaves the controller Idle.
    fn start(&mut self) -> Result<()>;

    fn stop(&mut self);
}

/// A device that always starts and never makes a sound on its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOutput;

impl OutputDevice for NullOutput {
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) {}
}

// ── Completion ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// The source ran to its end.
    Finished,
    /// Playback was stopped or replaced before the end.
    Stopped,
}

/// Resolves once per play. Await it, or poll with [`Completion::poll_now`]
/// from a non-async caller.
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<PlaybackOutcome>,
    outcome: Option<PlaybackOutcome>,
}

impl Completion {
    fn new(rx: oneshot::Receiver<PlaybackOutcome>) -> Self {
        Completion { rx, outcome: None }
    }

    /// The outcome if the play has ended, without blocking.
    pub fn poll_now(&mut self) -> Option<PlaybackOutcome> {
        if self.outcome.is_none() {
            self.outcome = match self.rx.try_recv() {
                Ok(outcome) => Some(outcome),
                Err(oneshot::error::TryRecvError::Empty) => None,
                // Sender dropped without a verdict: the play was cut short.
                Err(oneshot::error::TryRecvError::Closed) => Some(PlaybackOutcome::Stopped),
            };
        }
        self.outcome
    }

    pub fn is_done(&mut self) -> bool {
        self.poll_now().is_some()
    }
}

impl Future for Completion {
    type Output = PlaybackOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(outcome) = this.outcome {
            return Poll::Ready(outcome);
        }
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(result) => {
                let outcome = result.unwrap_or(PlaybackOutcome::Stopped);
                this.outcome = Some(outcome);
                Poll::Ready(outcome)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

// ── Controller ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
}

enum Route {
    Dry,
    /// Values are pinned when the play starts, so later changes to the
    /// graph's controls do not reach this play unless retargeted.
    Graph { graph: EffectGraph, values: ParamSnapshot },
}

struct ActivePlayback {
    id: u64,
    route: Route,
    position: usize,
    done: oneshot::Sender<PlaybackOutcome>,
}

/// Owns the loaded sample and the single active playback.
pub struct PlaybackController {
    device: Box<dyn OutputDevice>,
    sample: Option<SampleBuffer>,
    active: Option<ActivePlayback>,
    next_id: u64,
}

impl PlaybackController {
    pub fn new(device: Box<dyn OutputDevice>) -> Self {
        PlaybackController {
            device,
            sample: None,
            active: None,
            next_id: 1,
        }
    }

    /// Replace the loaded sample. Stops anything playing.
    pub fn load_sample(&mut self, sample: SampleBuffer) {
        self.stop();
        debug!(
            frames = sample.len(),
            sample_rate = sample.sample_rate(),
            channels = sample.channels(),
            "loaded sample"
        );
        self.sample = Some(sample);
    }

    pub fn sample(&self) -> Option<&SampleBuffer> {
        self.sample.as_ref()
    }

    /// Play the unprocessed sample.
    pub fn play_dry(&mut self) -> Result<Completion> {
        self.start(Route::Dry)
    }

    /// Play the sample through `graph` using its current control values.
    pub fn play_through_graph(&mut self, graph: &EffectGraph) -> Result<Completion> {
        if !graph.is_connected() {
            self.stop();
            return Err(EngineError::PlaybackFailure(format!("{} is disconnected", graph.id())));
        }
        self.start(Route::Graph {
            graph: graph.clone(),
            values: graph.snapshot(),
        })
    }

    fn start(&mut self, route: Route) -> Result<Completion> {
        self.stop();
        if self.sample.is_none() {
            return Err(EngineError::NoSampleLoaded);
        }
        if let Err(e) = self.device.start() {
            warn!(error = %e, "output device failed to start");
            return Err(match e {
                EngineError::PlaybackFailure(_) => e,
                other => EngineError::PlaybackFailure(other.to_string()),
            });
        }

        let (tx, rx) = oneshot::channel();
        let id = self.next_id;
        self.next_id += 1;
        match &route {
            Route::Dry => debug!(play = id, "playing dry"),
            Route::Graph { graph, .. } => {
                graph.reset();
                debug!(play = id, graph = %graph.id(), "playing through graph");
            }
        }
        self.active = Some(ActivePlayback {
            id,
            route,
            position: 0,
            done: tx,
        });
        Ok(Completion::new(rx))
    }

    /// Stop the active playback. A no-op when Idle.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(play = active.id, "stopped playback");
            // Dropping the sender resolves the completion as Stopped.
            drop(active.done);
            self.device.stop();
        }
    }

    pub fn state(&self) -> PlaybackState {
        if self.active.is_some() {
            PlaybackState::Playing
        } else {
            PlaybackState::Idle
        }
    }

    pub fn is_playing(&self) -> bool {
        self.active.is_some()
    }

    /// Graph the active playback is routed through, if any.
    pub fn active_graph(&self) -> Option<GraphId> {
        match &self.active.as_ref()?.route {
            Route::Graph { graph, .. } => Some(graph.id()),
            Route::Dry => None,
        }
    }

    /// Value the active playback is rendering `param` with.
    pub fn pinned_value(&self, param: EffectParam) -> Option<f64> {
        match &self.active.as_ref()?.route {
            Route::Graph { values, .. } => values.get(param),
            Route::Dry => None,
        }
    }

    /// Forward a live parameter change to the active playback if it is
    /// routed through `graph`.
    pub fn retarget(&mut self, graph: &EffectGraph, param: EffectParam, value: f64) {
        if let Some(ActivePlayback {
            route: Route::Graph { graph: playing, values },
            ..
        }) = self.active.as_mut()
        {
            if playing.same_instance(graph) {
                values.set(param, value);
            }
        }
    }

    /// Fill `out` with the next block. Returns the number of source frames
    /// consumed; zero when Idle.
    pub fn render(&mut self, out: &mut [f32]) -> usize {
        let (Some(active), Some(sample)) = (self.active.as_mut(), self.sample.as_ref()) else {
            out.fill(0.0);
            return 0;
        };

        let remaining = &sample.data()[active.position.min(sample.len())..];
        let n = remaining.len().min(out.len());
        out[..n].copy_from_slice(&remaining[..n]);
        out[n..].fill(0.0);
        active.position += n;

        if let Route::Graph { graph, values } = &active.route {
            graph.render(values, out);
        }

        if active.position >= sample.len() {
            if let Some(finished) = self.active.take() {
                debug!(play = finished.id, "playback finished");
                // The receiver may already be gone.
                let _ = finished.done.send(PlaybackOutcome::Finished);
                self.device.stop();
            }
        }
        n
    }
}
