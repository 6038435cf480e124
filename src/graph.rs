//! Effect graphs: one processing chain per effect family.
//!
//! [`EffectGraphBuilder::build`] turns an effect family plus a parameter set
//! into an [`EffectGraph`]: a mono input → output chain whose parameters sit
//! behind lock-free [`ParamHandle`]s, so any automatable value can be
//! retargeted while audio is running without rebuilding anything.
//!
//! The builder keeps the one live graph. Building again disconnects the
//! previous instance first; a disconnected graph renders silence.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::dsp::compressor::Compressor;
use crate::dsp::convolver::{Convolver, PARTITION_SIZE, generate_impulse};
use crate::dsp::delay::DelayLine;
use crate::dsp::filter::{BiquadFilter, FilterType};
use crate::dsp::lfo::Lfo;
use crate::dsp::param::ParamHandle;
use crate::dsp::waveshaper::{WaveShaper, make_curve};
use crate::effect::{EffectParam, EffectType, FilterTopology};
use crate::error::{EngineError, Result};

use EffectParam as P;

/// Level of the echo relative to the dry signal.
const ECHO_WET: f32 = 0.5;

/// Phaser all-pass stages.
pub const PHASER_STAGES: usize = 4;
/// Centre of the first phaser stage.
const PHASER_BASE_HZ: f64 = 1000.0;
/// Spacing between consecutive stage centres.
const PHASER_STRIDE_HZ: f64 = 500.0;
/// LFO swing of the first stage at 100% depth.
const PHASER_SWEEP_HZ: f64 = 800.0;
const PHASER_Q: f64 = 1.0;

/// Flanger: short base delay, narrow sweep.
const FLANGER_BASE_SECONDS: f64 = 0.003;
const FLANGER_SWEEP_SECONDS: f64 = 0.002;
/// Chorus: ~30 ms base delay, wider sweep.
const CHORUS_BASE_SECONDS: f64 = 0.030;
const CHORUS_SWEEP_SECONDS: f64 = 0.010;
/// Buffer length for the modulated delay families.
const MODULATED_MAX_SECONDS: f64 = 0.05;

/// Feedback is capped below unity so no loop can run away.
const MAX_FEEDBACK: f64 = 0.95;

fn percent(value: f64) -> f64 {
    (value / 100.0).clamp(0.0, 1.0)
}

fn feedback_fraction(value: f64) -> f64 {
    (value / 100.0).clamp(0.0, MAX_FEEDBACK)
}

/// Gain in front of the distortion curve.
pub fn drive_gain(drive: f64) -> f64 {
    1.0 + drive.max(0.0) / 20.0
}

// ── Parameter sets ──────────────────────────────────────────

/// Parameter values handed to [`EffectGraphBuilder::build`].
///
/// Parameters left out fall back to the family defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSet {
    values: BTreeMap<EffectParam, f64>,
    topology: FilterTopology,
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, param: EffectParam, value: f64) -> Self {
        self.insert(param, value);
        self
    }

    pub fn with_topology(mut self, topology: FilterTopology) -> Self {
        self.topology = topology;
        self
    }

    pub fn insert(&mut self, param: EffectParam, value: f64) {
        self.values.insert(param, value);
    }

    pub fn get(&self, param: EffectParam) -> Option<f64> {
        self.values.get(&param).copied()
    }

    pub fn topology(&self) -> FilterTopology {
        self.topology
    }

    pub fn iter(&self) -> impl Iterator<Item = (EffectParam, f64)> + '_ {
        self.values.iter().map(|(p, v)| (*p, *v))
    }

    /// Resolve UI parameter names against one family.
    pub fn from_named<'a>(effect: EffectType, named: impl IntoIterator<Item = (&'a str, f64)>) -> Result<Self> {
        let mut set = ParamSet::new();
        for (name, value) in named {
            set.insert(effect.lookup(name)?.param, value);
        }
        Ok(set)
    }
}

/// Values a graph renders with for one block.
///
/// Usually read fresh from the graph's handles; a playback may hold its own
/// copy to keep values that were scheduled when it started.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSnapshot(BTreeMap<EffectParam, f64>);

impl ParamSnapshot {
    pub fn get(&self, param: EffectParam) -> Option<f64> {
        self.0.get(&param).copied()
    }

    pub fn set(&mut self, param: EffectParam, value: f64) {
        self.0.insert(param, value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (EffectParam, f64)> + '_ {
        self.0.iter().map(|(p, v)| (*p, *v))
    }
}

// ── Family nodes ────────────────────────────────────────────

/// Delay → feedback gain → back into the delay, summed with the dry path.
struct EchoNode {
    line: DelayLine,
    time_ms: f64,
    feedback: f64,
}

impl EchoNode {
    fn process_block(&mut self, buf: &mut [f32]) {
        let delay = self.line.samples_for(self.time_ms / 1000.0);
        let fb = self.feedback as f32;
        for s in buf.iter_mut() {
            let dry = *s;
            let delayed = self.line.read(delay);
            self.line.write(dry + delayed * fb);
            *s = dry + delayed * ECHO_WET;
        }
    }
}

/// Convolution wet path in parallel with the dry path.
struct ReverbNode {
    convolver: Convolver,
    wet: f64,
}

impl ReverbNode {
    fn process_block(&mut self, buf: &mut [f32]) {
        let wet = self.wet as f32;
        let dry = 1.0 - wet;
        for s in buf.iter_mut() {
            let reverberated = self.convolver.process(*s);
            *s = *s * dry + reverberated * wet;
        }
    }
}

/// Cascaded all-pass stages, first stage swept by the LFO, last stage fed
/// back toward the input.
struct PhaserNode {
    stages: Vec<BiquadFilter>,
    lfo: Lfo,
    rate: f64,
    depth: f64,
    feedback: f64,
    last: f64,
}

impl PhaserNode {
    fn new(sample_rate: f64) -> Self {
        let stages = (0..PHASER_STAGES)
            .map(|i| {
                let centre = PHASER_BASE_HZ + i as f64 * PHASER_STRIDE_HZ;
                BiquadFilter::with_params(FilterType::Allpass, sample_rate, centre, PHASER_Q, 0.0)
            })
            .collect();
        PhaserNode {
            stages,
            lfo: Lfo::new(sample_rate),
            rate: 0.5,
            depth: 0.5,
            feedback: 0.3,
            last: 0.0,
        }
    }

    fn process_block(&mut self, buf: &mut [f32]) {
        for s in buf.iter_mut() {
            let dry = *s as f64;
            let sweep = self.lfo.next_sample(self.rate) * self.depth * PHASER_SWEEP_HZ;
            self.stages[0].set_frequency(PHASER_BASE_HZ + sweep);

            let mut y = dry + self.last * self.feedback;
            for stage in &mut self.stages {
                y = stage.process(y);
            }
            self.last = y;
            *s = (0.5 * (dry + y)) as f32;
        }
    }
}

/// A single delay line whose time is swept by an LFO, with feedback.
/// Flanger and chorus differ only in base delay and sweep width.
struct ModulatedDelayNode {
    line: DelayLine,
    lfo: Lfo,
    base_seconds: f64,
    sweep_seconds: f64,
    rate: f64,
    depth: f64,
    feedback: f64,
}

impl ModulatedDelayNode {
    fn new(sample_rate: f64, base_seconds: f64, sweep_seconds: f64) -> Self {
        ModulatedDelayNode {
            line: DelayLine::new(sample_rate, MODULATED_MAX_SECONDS),
            lfo: Lfo::new(sample_rate),
            base_seconds,
            sweep_seconds,
            rate: 1.0,
            depth: 0.5,
            feedback: 0.0,
        }
    }

    fn process_block(&mut self, buf: &mut [f32]) {
        let fb = self.feedback as f32;
        for s in buf.iter_mut() {
            let dry = *s;
            let offset = self.lfo.next_sample(self.rate) * self.depth * self.sweep_seconds;
            let delayed = self.line.read(self.line.samples_for(self.base_seconds + offset));
            self.line.write(dry + delayed * fb);
            *s = 0.5 * (dry + delayed);
        }
    }
}

/// Drive gain followed by a curve fixed at build time.
struct DistortionNode {
    shaper: WaveShaper,
    drive: f64,
}

impl DistortionNode {
    fn process_block(&mut self, buf: &mut [f32]) {
        let gain = drive_gain(self.drive) as f32;
        for s in buf.iter_mut() {
            *s = self.shaper.process(*s * gain);
        }
    }
}

enum GraphNode {
    Eq(BiquadFilter),
    Filter(BiquadFilter),
    Compression(Compressor),
    Delay(EchoNode),
    Reverb(ReverbNode),
    Phaser(PhaserNode),
    Modulated(ModulatedDelayNode),
    Distortion(DistortionNode),
}

impl GraphNode {
    /// `values` holds every parameter of the family.
    fn build(effect: EffectType, values: &ParamSnapshot, topology: FilterTopology, config: &EngineConfig) -> Self {
        let sr = config.sample_rate;
        let value = |p: EffectParam| values.get(p).unwrap_or_default();
        let mut node = match effect {
            EffectType::Eq => GraphNode::Eq(BiquadFilter::new(FilterType::Peaking, sr)),
            EffectType::Filter => GraphNode::Filter(BiquadFilter::new(topology.into(), sr)),
            EffectType::Compression => GraphNode::Compression(Compressor::new(sr)),
            EffectType::Delay => GraphNode::Delay(EchoNode {
                line: DelayLine::new(sr, config.max_delay_seconds),
                time_ms: 0.0,
                feedback: 0.0,
            }),
            EffectType::Reverb => {
                // Room size shapes the impulse once; it is not a live control.
                let impulse = generate_impulse(value(P::RoomSize), sr, config.impulse_seed);
                GraphNode::Reverb(ReverbNode {
                    convolver: Convolver::new(&impulse, PARTITION_SIZE),
                    wet: 0.0,
                })
            }
            EffectType::Phaser => GraphNode::Phaser(PhaserNode::new(sr)),
            EffectType::Flanger => {
                GraphNode::Modulated(ModulatedDelayNode::new(sr, FLANGER_BASE_SECONDS, FLANGER_SWEEP_SECONDS))
            }
            EffectType::Chorus => {
                GraphNode::Modulated(ModulatedDelayNode::new(sr, CHORUS_BASE_SECONDS, CHORUS_SWEEP_SECONDS))
            }
            EffectType::Distortion => GraphNode::Distortion(DistortionNode {
                shaper: WaveShaper::new(make_curve(value(P::Drive), config.curve_samples)),
                drive: 0.0,
            }),
        };
        node.apply(values);
        node
    }

    /// Push control values into the DSP state.
    fn apply(&mut self, values: &ParamSnapshot) {
        for (param, v) in values.iter() {
            match (&mut *self, param) {
                (GraphNode::Eq(f) | GraphNode::Filter(f), P::Frequency) => f.set_frequency(v),
                (GraphNode::Eq(f) | GraphNode::Filter(f), P::Q) => f.set_q(v),
                (GraphNode::Eq(f), P::Gain) => f.set_gain_db(v),
                (GraphNode::Compression(c), P::Threshold) => c.set_threshold(v),
                (GraphNode::Compression(c), P::Ratio) => c.set_ratio(v),
                (GraphNode::Compression(c), P::Attack) => {
                    let release = values.get(P::Release).unwrap_or(250.0);
                    c.set_times(v, release);
                }
                (GraphNode::Compression(c), P::Release) => {
                    let attack = values.get(P::Attack).unwrap_or(3.0);
                    c.set_times(attack, v);
                }
                (GraphNode::Delay(d), P::Time) => d.time_ms = v,
                (GraphNode::Delay(d), P::Feedback) => d.feedback = feedback_fraction(v),
                (GraphNode::Reverb(r), P::WetMix) => r.wet = percent(v),
                (GraphNode::Phaser(ph), P::Rate) => ph.rate = v,
                (GraphNode::Phaser(ph), P::Depth) => ph.depth = percent(v),
                (GraphNode::Phaser(ph), P::Feedback) => ph.feedback = feedback_fraction(v),
                (GraphNode::Modulated(m), P::Rate) => m.rate = v,
                (GraphNode::Modulated(m), P::Depth) => m.depth = percent(v),
                (GraphNode::Modulated(m), P::Feedback) => m.feedback = feedback_fraction(v),
                (GraphNode::Distortion(d), P::Drive) => d.drive = v,
                _ => {}
            }
        }
    }

    /// Clear filter memory, delay buffers and reverb tails.
    fn reset(&mut self) {
        match self {
            GraphNode::Eq(f) | GraphNode::Filter(f) => f.reset(),
            GraphNode::Compression(c) => c.reset(),
            GraphNode::Delay(d) => d.line.clear(),
            GraphNode::Reverb(r) => r.convolver.reset(),
            GraphNode::Phaser(p) => {
                p.stages.iter_mut().for_each(BiquadFilter::reset);
                p.last = 0.0;
            }
            GraphNode::Modulated(m) => m.line.clear(),
            GraphNode::Distortion(_) => {}
        }
    }

    fn process_block(&mut self, buf: &mut [f32]) {
        match self {
            GraphNode::Eq(f) | GraphNode::Filter(f) => f.process_block(buf),
            GraphNode::Compression(c) => c.process_block(buf),
            GraphNode::Delay(d) => d.process_block(buf),
            GraphNode::Reverb(r) => r.process_block(buf),
            GraphNode::Phaser(p) => p.process_block(buf),
            GraphNode::Modulated(m) => m.process_block(buf),
            GraphNode::Distortion(d) => d.process_block(buf),
        }
    }
}

// ── Graph instances ─────────────────────────────────────────

/// Identifies one built graph instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphId(u64);

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "graph#{}", self.0)
    }
}

struct GraphShared {
    id: GraphId,
    effect: EffectType,
    topology: FilterTopology,
    controls: BTreeMap<EffectParam, ParamHandle>,
    connected: AtomicBool,
    node: Mutex<GraphNode>,
}

/// A live effect graph. Clones refer to the same instance.
#[derive(Clone)]
pub struct EffectGraph {
    shared: Arc<GraphShared>,
}

impl fmt::Debug for EffectGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectGraph")
            .field("id", &self.shared.id)
            .field("effect", &self.shared.effect)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl EffectGraph {
    pub fn id(&self) -> GraphId {
        self.shared.id
    }

    pub fn effect(&self) -> EffectType {
        self.shared.effect
    }

    pub fn topology(&self) -> FilterTopology {
        self.shared.topology
    }

    /// Current control value of a parameter.
    pub fn param(&self, param: EffectParam) -> Option<f64> {
        self.shared.controls.get(&param).map(ParamHandle::get)
    }

    pub fn param_named(&self, name: &str) -> Result<f64> {
        let d = self.effect().lookup(name)?;
        self.param(d.param).ok_or_else(|| EngineError::UnknownParameter {
            effect: self.effect(),
            name: name.to_string(),
        })
    }

    /// Retarget an automatable parameter. Takes effect on the next block.
    pub fn set_param(&self, param: EffectParam, value: f64) -> Result<()> {
        let effect = self.effect();
        let descriptor = effect.descriptor(param).ok_or_else(|| EngineError::UnknownParameter {
            effect,
            name: param.name().to_string(),
        })?;
        if !descriptor.automatable {
            return Err(EngineError::ParameterNotAutomatable { effect, param });
        }
        if let Some(handle) = self.shared.controls.get(&param) {
            handle.set(value);
        }
        Ok(())
    }

    pub fn set_param_named(&self, name: &str, value: f64) -> Result<()> {
        let d = self.effect().lookup(name)?;
        self.set_param(d.param, value)
    }

    /// Read every control into a snapshot.
    pub fn snapshot(&self) -> ParamSnapshot {
        let mut snapshot = ParamSnapshot::default();
        for (param, handle) in &self.shared.controls {
            snapshot.set(*param, handle.get());
        }
        snapshot
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }

    pub(crate) fn disconnect(&self) {
        if self.shared.connected.swap(false, Ordering::AcqRel) {
            debug!(graph = %self.id(), effect = %self.effect(), "disconnected effect graph");
        }
    }

    /// Silence any state left over from an earlier playback.
    pub(crate) fn reset(&self) {
        self.shared.node.lock().unwrap_or_else(PoisonError::into_inner).reset();
    }

    pub fn same_instance(&self, other: &EffectGraph) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Process a block in place using the live control values.
    pub fn process_block(&self, buf: &mut [f32]) {
        self.render(&self.snapshot(), buf);
    }

    /// Process a block in place with explicit values. A disconnected graph
    /// writes silence.
    pub fn render(&self, values: &ParamSnapshot, buf: &mut [f32]) {
        if !self.is_connected() {
            buf.fill(0.0);
            return;
        }
        let mut node = self.shared.node.lock().unwrap_or_else(PoisonError::into_inner);
        node.apply(values);
        node.process_block(buf);
    }
}

// ── Builder ─────────────────────────────────────────────────

/// Builds effect graphs and owns the one that is currently live.
pub struct EffectGraphBuilder {
    config: EngineConfig,
    current: Option<EffectGraph>,
    next_id: u64,
}

impl EffectGraphBuilder {
    pub fn new(config: EngineConfig) -> Self {
        EffectGraphBuilder {
            config,
            current: None,
            next_id: 1,
        }
    }

    /// Build a graph for `effect`, disconnecting any previous graph first.
    ///
    /// Every parameter in `params` must belong to the family; absent ones
    /// take the family default.
    pub fn build(&mut self, effect: EffectType, params: &ParamSet) -> Result<EffectGraph> {
        for (param, _) in params.iter() {
            if effect.descriptor(param).is_none() {
                return Err(EngineError::UnknownParameter {
                    effect,
                    name: param.name().to_string(),
                });
            }
        }

        self.release();

        let mut values = ParamSnapshot::default();
        for d in effect.params() {
            values.set(d.param, params.get(d.param).unwrap_or(d.default));
        }

        let node = GraphNode::build(effect, &values, params.topology(), &self.config);
        let controls = values.iter().map(|(p, v)| (p, ParamHandle::new(v))).collect();

        let id = GraphId(self.next_id);
        self.next_id += 1;

        let graph = EffectGraph {
            shared: Arc::new(GraphShared {
                id,
                effect,
                topology: params.topology(),
                controls,
                connected: AtomicBool::new(true),
                node: Mutex::new(node),
            }),
        };
        info!(graph = %id, effect = %effect, "built effect graph");
        self.current = Some(graph.clone());
        Ok(graph)
    }

    /// Build from UI names. Fails with `UnknownEffectType` before touching
    /// the live graph.
    pub fn build_named(&mut self, effect: &str, params: &[(&str, f64)]) -> Result<EffectGraph> {
        let effect: EffectType = effect.parse()?;
        let set = ParamSet::from_named(effect, params.iter().copied())?;
        self.build(effect, &set)
    }

    /// Retarget a parameter of the live graph.
    pub fn update_parameter(&self, name: &str, value: f64) -> Result<()> {
        let graph = self.current.as_ref().ok_or(EngineError::NoGraph)?;
        graph.set_param_named(name, value)
    }

    pub fn current(&self) -> Option<&EffectGraph> {
        self.current.as_ref()
    }

    /// Disconnect and forget the live graph.
    pub fn release(&mut self) {
        if let Some(graph) = self.current.take() {
            graph.disconnect();
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
