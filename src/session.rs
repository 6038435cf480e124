//! One player's attempt at one puzzle.
//!
//! `GuessSession` ties the pieces together: it builds the puzzle graph with
//! the hidden value, tracks the guess as both slider position and physical
//! value, routes auditions through the [`AuditionGate`] and scores the guess
//! once on submission.

use tracing::{info, warn};

use crate::audition::AuditionGate;
use crate::effect::EffectSpec;
use crate::engine::AudioEngine;
use crate::error::{EngineError, Result};
use crate::mapper::{POSITION_MAX, format_value, midpoint, to_physical, to_position};
use crate::playback::{Completion, SampleBuffer};
use crate::puzzle::PuzzleDefinition;
use crate::scoring::{ScoreResult, evaluate};

pub struct GuessSession {
    puzzle: PuzzleDefinition,
    spec: EffectSpec,
    engine: AudioEngine,
    gate: AuditionGate,
    guess_position: f64,
    guess_value: f64,
    result: Option<ScoreResult>,
}

impl GuessSession {
    /// Validate the puzzle and build its graph on `engine`. The guess starts
    /// at the middle of the slider.
    pub fn new(puzzle: PuzzleDefinition, mut engine: AudioEngine) -> Result<Self> {
        puzzle.validate()?;
        engine.build_graph(puzzle.effect_type, &puzzle.graph_parameters())?;
        let spec = puzzle.spec();
        let gate = AuditionGate::new(
            puzzle.effect_type,
            puzzle.guessable_parameter,
            puzzle.correct_value,
            puzzle.lives_allocated,
        );
        info!(
            effect = %puzzle.effect_type,
            param = %puzzle.guessable_parameter,
            lives = puzzle.lives_allocated,
            sample = %puzzle.sample_identity,
            "session started"
        );
        Ok(GuessSession {
            guess_value: midpoint(&spec),
            guess_position: POSITION_MAX / 2.0,
            puzzle,
            spec,
            engine,
            gate,
            result: None,
        })
    }

    pub fn load_sample(&mut self, sample: SampleBuffer) -> Result<()> {
        self.engine.load_sample(sample)
    }

    pub fn puzzle(&self) -> &PuzzleDefinition {
        &self.puzzle
    }

    pub fn spec(&self) -> &EffectSpec {
        &self.spec
    }

    // ── Guess ──

    /// Move the slider. Positions outside `[0, 100]` are clamped; NaN and
    /// infinities leave the guess where it was.
    pub fn set_guess_position(&mut self, position: f64) {
        if !position.is_finite() {
            warn!(position, "ignored non-finite slider position");
            return;
        }
        let position = position.clamp(0.0, POSITION_MAX);
        self.guess_position = position;
        self.guess_value = to_physical(&self.spec, position);
    }

    /// Set the guess in physical units, clamped to the parameter range.
    pub fn set_guess_value(&mut self, value: f64) {
        if !value.is_finite() {
            warn!(value, "ignored non-finite guess value");
            return;
        }
        let value = value.clamp(self.spec.min_value, self.spec.max_value);
        self.guess_value = value;
        self.guess_position = to_position(&self.spec, value);
    }

    pub fn guess_position(&self) -> f64 {
        self.guess_position
    }

    pub fn guess_value(&self) -> f64 {
        self.guess_value
    }

    pub fn guess_label(&self) -> String {
        format_value(self.guess_value, self.spec.unit)
    }

    // ── Listening ──

    pub fn play_dry(&mut self) -> bool {
        match self.engine.play_dry() {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "dry playback failed");
                false
            }
        }
    }

    /// Play the puzzle sound: the sample through the graph at the hidden value.
    pub fn play_effect(&mut self) -> bool {
        match self.engine.play_graph() {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "effect playback failed");
                false
            }
        }
    }

    pub fn stop(&mut self) {
        self.engine.stop();
    }

    pub fn is_playing(&self) -> bool {
        self.engine.is_playing()
    }

    /// Audition the current guess.
    pub fn audition(&mut self) -> bool {
        let name = self.puzzle.guessable_parameter.name();
        self.audition_value(name, self.guess_value)
    }

    /// Audition an explicit value for a named parameter.
    pub fn audition_value(&mut self, name: &str, value: f64) -> bool {
        if self.result.is_some() {
            return false;
        }
        self.gate.audition(&mut self.engine, name, value)
    }

    /// Audition the current guess and return its completion.
    pub fn try_audition(&mut self) -> Result<Completion> {
        if self.result.is_some() {
            return Err(EngineError::InvalidAuditionState("guess already submitted".into()));
        }
        let name = self.puzzle.guessable_parameter.name();
        self.gate.try_audition(&mut self.engine, name, self.guess_value)
    }

    pub fn remaining_lives(&self) -> u32 {
        self.gate.remaining_lives()
    }

    /// Pull the next block of output audio.
    pub fn render(&mut self, out: &mut [f32]) -> usize {
        self.engine.render(out)
    }

    // ── Submission ──

    /// Score the current guess. Later calls return the first result.
    pub fn submit(&mut self) -> ScoreResult {
        if let Some(result) = self.result {
            return result;
        }
        let result = evaluate(self.guess_value, self.puzzle.correct_value, &self.spec);
        info!(
            effect = %self.puzzle.effect_type,
            guess = self.guess_value,
            score = result.score,
            "guess submitted"
        );
        self.result = Some(result);
        result
    }

    pub fn score(&self) -> Option<ScoreResult> {
        self.result
    }

    pub fn is_submitted(&self) -> bool {
        self.result.is_some()
    }

    /// The hidden value, available once the guess is in.
    pub fn reveal(&self) -> Option<f64> {
        self.result.map(|_| self.puzzle.correct_value)
    }

    pub fn engine(&self) -> &AudioEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut AudioEngine {
        &mut self.engine
    }

    /// Tear down the engine and hand back the puzzle.
    pub fn close(mut self) -> PuzzleDefinition {
        self.engine.close();
        self.puzzle
    }
}
