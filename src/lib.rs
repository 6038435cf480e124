pub mod audition;
pub mod config;
pub mod dsp;
pub mod effect;
pub mod engine;
pub mod error;
pub mod graph;
pub mod mapper;
pub mod playback;
pub mod puzzle;
pub mod renderer;
pub mod scoring;
pub mod session;

pub use crate::audition::AuditionGate;
pub use crate::config::EngineConfig;
pub use crate::effect::{EffectParam, EffectSpec, EffectType, FilterTopology, ParamDescriptor, Unit};
pub use crate::engine::AudioEngine;
pub use crate::error::EngineError;
pub use crate::graph::{EffectGraph, EffectGraphBuilder, GraphId, ParamSet};
pub use crate::playback::{Completion, OutputDevice, PlaybackController, PlaybackOutcome, SampleBuffer};
pub use crate::puzzle::PuzzleDefinition;
pub use crate::scoring::{AccuracyBand, ScoreResult, Streak};
pub use crate::session::GuessSession;

use serde::Serialize;
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn spec_of(effect: &str) -> std::result::Result<EffectSpec, JsValue> {
    effect.parse::<EffectType>().map(|e| e.spec()).map_err(js_error)
}

/// WASM-exposed: return the fxguess-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed: slider position (0–100) to physical value for a family's
/// guessable parameter.
#[wasm_bindgen]
pub fn to_physical(effect: &str, position: f64) -> std::result::Result<f64, JsValue> {
    Ok(mapper::to_physical(&spec_of(effect)?, position))
}

/// WASM-exposed: physical value to slider position.
#[wasm_bindgen]
pub fn to_position(effect: &str, value: f64) -> std::result::Result<f64, JsValue> {
    Ok(mapper::to_position(&spec_of(effect)?, value))
}

/// WASM-exposed: display label for a value of a family's guessable parameter.
#[wasm_bindgen]
pub fn format_value(effect: &str, value: f64) -> std::result::Result<String, JsValue> {
    Ok(mapper::format_value(value, spec_of(effect)?.unit))
}

/// WASM-exposed: score a guess (25–100).
#[wasm_bindgen]
pub fn score_guess(effect: &str, guess: f64, correct: f64) -> std::result::Result<u8, JsValue> {
    Ok(scoring::score(guess, correct, &spec_of(effect)?))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogEntry {
    effect_type: EffectType,
    spec: EffectSpec,
    params: &'static [ParamDescriptor],
}

/// WASM-exposed: every family with its guessable range and full parameter list.
#[wasm_bindgen]
pub fn effect_specs() -> std::result::Result<JsValue, JsValue> {
    let catalog: Vec<CatalogEntry> = EffectType::ALL
        .into_iter()
        .map(|effect_type| CatalogEntry {
            effect_type,
            spec: effect_type.spec(),
            params: effect_type.params(),
        })
        .collect();
    serde_wasm_bindgen::to_value(&catalog).map_err(js_error)
}

/// WASM-exposed game session. The host's AudioWorklet pulls audio with
/// `render`.
#[wasm_bindgen]
pub struct WasmGame {
    session: GuessSession,
}

#[wasm_bindgen]
impl WasmGame {
    /// Load a puzzle from JSON and an interleaved sample, mixed down to mono.
    #[wasm_bindgen(constructor)]
    pub fn new(
        puzzle_json: &str,
        samples: &[f32],
        channels: u16,
        sample_rate: u32,
    ) -> std::result::Result<WasmGame, JsValue> {
        let puzzle = PuzzleDefinition::from_json(puzzle_json).map_err(js_error)?;
        let engine = AudioEngine::offline(EngineConfig::with_sample_rate(sample_rate as f64)).map_err(js_error)?;
        let mut session = GuessSession::new(puzzle, engine).map_err(js_error)?;
        session
            .load_sample(SampleBuffer::from_interleaved(samples, channels, sample_rate))
            .map_err(js_error)?;
        Ok(WasmGame { session })
    }

    pub fn set_guess_position(&mut self, position: f64) {
        self.session.set_guess_position(position);
    }

    pub fn guess_position(&self) -> f64 {
        self.session.guess_position()
    }

    pub fn guess_value(&self) -> f64 {
        self.session.guess_value()
    }

    pub fn guess_label(&self) -> String {
        self.session.guess_label()
    }

    pub fn play_dry(&mut self) -> bool {
        self.session.play_dry()
    }

    pub fn play_effect(&mut self) -> bool {
        self.session.play_effect()
    }

    pub fn audition(&mut self) -> bool {
        self.session.audition()
    }

    pub fn stop(&mut self) {
        self.session.stop();
    }

    pub fn is_playing(&self) -> bool {
        self.session.is_playing()
    }

    /// Fill `out` with the next block; returns source frames consumed.
    pub fn render(&mut self, out: &mut [f32]) -> usize {
        self.session.render(out)
    }

    pub fn remaining_lives(&self) -> u32 {
        self.session.remaining_lives()
    }

    pub fn submit(&mut self) -> u8 {
        self.session.submit().score
    }

    pub fn reveal(&self) -> Option<f64> {
        self.session.reveal()
    }
}
