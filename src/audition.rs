//! Audition gate: lets the player hear their current guess a limited number
//! of times.
//!
//! An audition writes the guess into the live graph, starts playback (which
//! pins the guess for the length of that play) and then writes the correct
//! value straight back. Reading the graph afterwards only ever shows the
//! answer the puzzle was built with, whether or not the play started.

use tracing::{debug, info};

use crate::effect::{EffectParam, EffectType};
use crate::engine::AudioEngine;
use crate::error::{EngineError, Result};
use crate::playback::Completion;

#[derive(Debug, Clone)]
pub struct AuditionGate {
    effect: EffectType,
    param: EffectParam,
    correct_value: f64,
    remaining_lives: u32,
}

impl AuditionGate {
    pub fn new(effect: EffectType, param: EffectParam, correct_value: f64, lives: u32) -> Self {
        AuditionGate {
            effect,
            param,
            correct_value,
            remaining_lives: lives,
        }
    }

    pub fn remaining_lives(&self) -> u32 {
        self.remaining_lives
    }

    pub fn param(&self) -> EffectParam {
        self.param
    }

    /// Audition `guess` for the parameter called `name`. Returns `false`
    /// when refused or when playback could not start; a life is spent only
    /// when it returns `true`.
    pub fn audition(&mut self, engine: &mut AudioEngine, name: &str, guess: f64) -> bool {
        match self.try_audition(engine, name, guess) {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "audition failed");
                false
            }
        }
    }

    /// Same as [`audition`](Self::audition) but hands back the playback
    /// completion, or the reason for refusal.
    pub fn try_audition(&mut self, engine: &mut AudioEngine, name: &str, guess: f64) -> Result<Completion> {
        if self.remaining_lives == 0 {
            return Err(EngineError::InvalidAuditionState("no lives remaining".into()));
        }
        let graph = engine
            .graph()
            .cloned()
            .ok_or_else(|| EngineError::InvalidAuditionState("no effect graph".into()))?;
        if graph.effect() != self.effect {
            return Err(EngineError::InvalidAuditionState(format!(
                "live graph is {}, puzzle is {}",
                graph.effect(),
                self.effect
            )));
        }
        let param = self.effect.lookup(name)?.param;
        if param != self.param {
            return Err(EngineError::InvalidAuditionState(format!(
                "'{name}' is not the parameter being guessed"
            )));
        }

        graph.set_param(param, guess)?;
        let started = engine.play_graph();
        graph.set_param(param, self.correct_value)?;
        let completion = started?;

        self.remaining_lives -= 1;
        info!(
            effect = %self.effect,
            param = %param,
            guess,
            remaining_lives = self.remaining_lives,
            "audition granted"
        );
        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::graph::ParamSet;
    use crate::playback::{OutputDevice, SampleBuffer};

    struct BrokenOutput;

    impl OutputDevice for BrokenOutput {
        fn start(&mut self) -> Result<()> {
            Err(EngineError::PlaybackFailure("no audio device".into()))
        }

        fn stop(&mut self) {}
    }

    fn filter_engine(correct: f64) -> AudioEngine {
        let mut e = AudioEngine::offline(EngineConfig::default()).unwrap();
        e.load_sample(SampleBuffer::new(vec![0.3; 4096], 44_100)).unwrap();
        e.build_graph(EffectType::Filter, &ParamSet::new().with(EffectParam::Frequency, correct))
            .unwrap();
        e
    }

    #[test]
    fn guess_is_heard_but_answer_is_restored() {
        let mut engine = filter_engine(1200.0);
        let mut gate = AuditionGate::new(EffectType::Filter, EffectParam::Frequency, 1200.0, 5);

        assert!(gate.audition(&mut engine, "frequency", 5000.0));
        assert_eq!(engine.playback().pinned_value(EffectParam::Frequency), Some(5000.0));
        assert_eq!(engine.graph().unwrap().param(EffectParam::Frequency), Some(1200.0));
        assert_eq!(gate.remaining_lives(), 4);
    }

    #[test]
    fn no_lives_refuses_without_side_effects() {
        let mut engine = AudioEngine::offline(EngineConfig::default()).unwrap();
        engine.load_sample(SampleBuffer::new(vec![0.3; 512], 44_100)).unwrap();
        engine
            .build_graph(EffectType::Phaser, &ParamSet::new().with(EffectParam::Rate, 2.0))
            .unwrap();
        let mut gate = AuditionGate::new(EffectType::Phaser, EffectParam::Rate, 2.0, 0);

        assert!(!gate.audition(&mut engine, "rate", 0.8));
        assert_eq!(gate.remaining_lives(), 0);
        assert_eq!(engine.graph().unwrap().param(EffectParam::Rate), Some(2.0));
        assert!(!engine.is_playing());
    }

    #[test]
    fn failed_play_restores_and_keeps_the_life() {
        let mut engine = AudioEngine::new(EngineConfig::default(), Box::new(BrokenOutput)).unwrap();
        engine.load_sample(SampleBuffer::new(vec![0.3; 512], 44_100)).unwrap();
        engine
            .build_graph(EffectType::Filter, &ParamSet::new().with(EffectParam::Frequency, 1200.0))
            .unwrap();
        let mut gate = AuditionGate::new(EffectType::Filter, EffectParam::Frequency, 1200.0, 3);

        let err = gate.try_audition(&mut engine, "frequency", 5000.0).unwrap_err();
        assert!(matches!(err, EngineError::PlaybackFailure(_)));
        assert_eq!(engine.graph().unwrap().param(EffectParam::Frequency), Some(1200.0));
        assert_eq!(gate.remaining_lives(), 3);
        assert!(!engine.is_playing());
    }

    #[test]
    fn missing_sample_restores_and_keeps_the_life() {
        let mut engine = AudioEngine::offline(EngineConfig::default()).unwrap();
        engine
            .build_graph(EffectType::Delay, &ParamSet::new().with(EffectParam::Time, 300.0))
            .unwrap();
        let mut gate = AuditionGate::new(EffectType::Delay, EffectParam::Time, 300.0, 2);

        assert!(!gate.audition(&mut engine, "time", 40.0));
        assert_eq!(engine.graph().unwrap().param(EffectParam::Time), Some(300.0));
        assert_eq!(gate.remaining_lives(), 2);
    }

    #[test]
    fn only_the_guessable_parameter_can_be_auditioned() {
        let mut engine = filter_engine(1200.0);
        let mut gate = AuditionGate::new(EffectType::Filter, EffectParam::Frequency, 1200.0, 5);

        let err = gate.try_audition(&mut engine, "q", 4.0).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAuditionState(_)));
        let err = gate.try_audition(&mut engine, "gain", 4.0).unwrap_err();
        assert!(matches!(err, EngineError::UnknownParameter { .. }));
        assert_eq!(engine.graph().unwrap().param(EffectParam::Q), Some(0.707));
        assert_eq!(gate.remaining_lives(), 5);
    }

    #[test]
    fn no_graph_is_refused() {
        let mut engine = AudioEngine::offline(EngineConfig::default()).unwrap();
        let mut gate = AuditionGate::new(EffectType::Eq, EffectParam::Frequency, 800.0, 5);
        let err = gate.try_audition(&mut engine, "frequency", 500.0).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAuditionState(_)));
        assert_eq!(gate.remaining_lives(), 5);
    }

    #[test]
    fn lives_run_out() {
        let mut engine = filter_engine(1200.0);
        let mut gate = AuditionGate::new(EffectType::Filter, EffectParam::Frequency, 1200.0, 2);
        assert!(gate.audition(&mut engine, "frequency", 300.0));
        assert!(gate.audition(&mut engine, "frequency", 400.0));
        assert!(!gate.audition(&mut engine, "frequency", 500.0));
        assert_eq!(gate.remaining_lives(), 0);
        // The second audition replaced the first; its guess is what is heard.
        assert_eq!(engine.playback().pinned_value(EffectParam::Frequency), Some(400.0));
    }
}
