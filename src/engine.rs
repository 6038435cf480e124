//! The audio engine: one explicitly owned context holding the graph builder
//! and the playback controller.
//!
//! Everything that needs audio takes `&mut AudioEngine`. There is no global
//! instance; create one per page/session and [`close`](AudioEngine::close)
//! it when done.

use tracing::info;

use crate::config::EngineConfig;
use crate::effect::EffectType;
use crate::error::{EngineError, Result};
use crate::graph::{EffectGraph, EffectGraphBuilder, ParamSet};
use crate::playback::{Completion, NullOutput, OutputDevice, PlaybackController, SampleBuffer};

pub struct AudioEngine {
    config: EngineConfig,
    builder: EffectGraphBuilder,
    playback: PlaybackController,
    closed: bool,
}

impl AudioEngine {
    pub fn new(config: EngineConfig, device: Box<dyn OutputDevice>) -> Result<Self> {
        config.validate()?;
        info!(sample_rate = config.sample_rate, "audio engine created");
        Ok(AudioEngine {
            builder: EffectGraphBuilder::new(config.clone()),
            playback: PlaybackController::new(device),
            config,
            closed: false,
        })
    }

    /// An engine with no device attached; audio is pulled with
    /// [`render`](Self::render).
    pub fn offline(config: EngineConfig) -> Result<Self> {
        Self::new(config, Box::new(NullOutput))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(EngineError::EngineClosed)
        } else {
            Ok(())
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> f64 {
        self.config.sample_rate
    }

    /// Build a new live graph, stopping any playback routed through the old one.
    pub fn build_graph(&mut self, effect: EffectType, params: &ParamSet) -> Result<EffectGraph> {
        self.ensure_open()?;
        if self.playback.active_graph().is_some() {
            self.playback.stop();
        }
        self.builder.build(effect, params)
    }

    /// Retarget a parameter on the live graph and on the playback using it.
    pub fn update_parameter(&mut self, name: &str, value: f64) -> Result<()> {
        self.ensure_open()?;
        let graph = self.builder.current().ok_or(EngineError::NoGraph)?;
        let param = graph.effect().lookup(name)?.param;
        graph.set_param(param, value)?;
        self.playback.retarget(graph, param, value);
        Ok(())
    }

    pub fn graph(&self) -> Option<&EffectGraph> {
        self.builder.current()
    }

    /// Load the sample to play. Its rate must match the engine's, since
    /// graph timing is computed at the engine rate.
    pub fn load_sample(&mut self, sample: SampleBuffer) -> Result<()> {
        self.ensure_open()?;
        if sample.sample_rate() as f64 != self.config.sample_rate {
            return Err(EngineError::SampleRateMismatch {
                sample: sample.sample_rate(),
                engine: self.config.sample_rate,
            });
        }
        self.playback.load_sample(sample);
        Ok(())
    }

    pub fn play_dry(&mut self) -> Result<Completion> {
        self.ensure_open()?;
        self.playback.play_dry()
    }

    /// Play through the live graph.
    pub fn play_graph(&mut self) -> Result<Completion> {
        self.ensure_open()?;
        let graph = self.builder.current().ok_or(EngineError::NoGraph)?;
        self.playback.play_through_graph(graph)
    }

    pub fn stop(&mut self) {
        self.playback.stop();
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    /// Pull the next block of output audio.
    pub fn render(&mut self, out: &mut [f32]) -> usize {
        self.playback.render(out)
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    /// Stop playback and release the graph. Every later call that would
    /// produce audio fails with `EngineClosed`.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.playback.stop();
        self.builder.release();
        self.closed = true;
        info!("audio engine closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.close();
    }
}
