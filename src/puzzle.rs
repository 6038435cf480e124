//! Daily puzzle definitions.
//!
//! A puzzle names an effect family, the parameter the player guesses, the
//! hidden correct value and the fixed values of every other parameter.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::effect::{EffectParam, EffectSpec, EffectType, FilterTopology};
use crate::error::{EngineError, Result};
use crate::graph::ParamSet;

/// Lives a puzzle gets when its JSON leaves them out.
pub const DEFAULT_LIVES: u32 = 5;

fn default_lives() -> u32 {
    DEFAULT_LIVES
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleDefinition {
    pub effect_type: EffectType,
    pub guessable_parameter: EffectParam,
    pub correct_value: f64,
    pub fixed_parameters: BTreeMap<EffectParam, f64>,
    pub lives_allocated: u32,
    /// Opaque key the sample loader resolves.
    pub sample_identity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_type: Option<FilterTopology>,
}

/// Wire form: names stay strings until they are resolved against the family.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPuzzle {
    effect_type: String,
    #[serde(default)]
    guessable_parameter: Option<String>,
    correct_value: f64,
    #[serde(default)]
    fixed_parameters: BTreeMap<String, f64>,
    #[serde(default = "default_lives")]
    lives_allocated: u32,
    #[serde(default)]
    sample_identity: String,
    #[serde(default)]
    filter_type: Option<FilterTopology>,
}

impl PuzzleDefinition {
    /// A puzzle on the family's standard guessable parameter.
    pub fn new(effect_type: EffectType, correct_value: f64) -> Self {
        PuzzleDefinition {
            effect_type,
            guessable_parameter: effect_type.guessable().param,
            correct_value,
            fixed_parameters: BTreeMap::new(),
            lives_allocated: DEFAULT_LIVES,
            sample_identity: String::new(),
            filter_type: None,
        }
    }

    pub fn with_fixed(mut self, param: EffectParam, value: f64) -> Self {
        self.fixed_parameters.insert(param, value);
        self
    }

    pub fn with_lives(mut self, lives: u32) -> Self {
        self.lives_allocated = lives;
        self
    }

    pub fn with_filter_type(mut self, topology: FilterTopology) -> Self {
        self.filter_type = Some(topology);
        self
    }

    pub fn with_sample(mut self, identity: impl Into<String>) -> Self {
        self.sample_identity = identity.into();
        self
    }

    /// Parse and validate a puzzle. Unknown effect names fail with
    /// `UnknownEffectType`, foreign parameter names with `UnknownParameter`.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawPuzzle = serde_json::from_str(json)?;
        let effect_type: EffectType = raw.effect_type.parse()?;
        let guessable_parameter = match raw.guessable_parameter.as_deref() {
            Some(name) => effect_type.lookup(name)?.param,
            None => effect_type.guessable().param,
        };
        let fixed_parameters = raw
            .fixed_parameters
            .iter()
            .map(|(name, value)| Ok((effect_type.lookup(name)?.param, *value)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        let puzzle = PuzzleDefinition {
            effect_type,
            guessable_parameter,
            correct_value: raw.correct_value,
            fixed_parameters,
            lives_allocated: raw.lives_allocated,
            sample_identity: raw.sample_identity,
            filter_type: raw.filter_type,
        };
        puzzle.validate()?;
        Ok(puzzle)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        let effect = self.effect_type;
        let guessable = effect
            .descriptor(self.guessable_parameter)
            .ok_or_else(|| EngineError::UnknownParameter {
                effect,
                name: self.guessable_parameter.name().to_string(),
            })?;
        if !guessable.automatable {
            return Err(EngineError::InvalidPuzzle(format!(
                "{effect} parameter '{}' is fixed at build time and cannot be guessed",
                guessable.param
            )));
        }
        if !(self.correct_value.is_finite() && guessable.contains(self.correct_value)) {
            return Err(EngineError::InvalidPuzzle(format!(
                "correct value {} is outside {}..={}",
                self.correct_value, guessable.min, guessable.max
            )));
        }
        if self.fixed_parameters.contains_key(&self.guessable_parameter) {
            return Err(EngineError::InvalidPuzzle(format!(
                "'{}' is both guessable and fixed",
                self.guessable_parameter
            )));
        }
        for (param, value) in &self.fixed_parameters {
            if effect.descriptor(*param).is_none() {
                return Err(EngineError::UnknownParameter {
                    effect,
                    name: param.name().to_string(),
                });
            }
            if !value.is_finite() {
                return Err(EngineError::InvalidPuzzle(format!("fixed '{param}' is not a number")));
            }
        }
        if self.lives_allocated == 0 {
            return Err(EngineError::InvalidPuzzle("a puzzle needs at least one life".into()));
        }
        if self.filter_type.is_some() && effect != EffectType::Filter {
            return Err(EngineError::InvalidPuzzle(format!(
                "filterType does not apply to {effect}"
            )));
        }
        Ok(())
    }

    /// Range of the guessable parameter.
    pub fn spec(&self) -> EffectSpec {
        self.effect_type
            .descriptor(self.guessable_parameter)
            .map(|d| d.spec())
            .unwrap_or_else(|| self.effect_type.spec())
    }

    /// Fixed values plus the correct value: what the puzzle graph is built with.
    pub fn graph_parameters(&self) -> ParamSet {
        let mut set = ParamSet::new().with_topology(self.filter_type.unwrap_or_default());
        for (param, value) in &self.fixed_parameters {
            set.insert(*param, *value);
        }
        set.insert(self.guessable_parameter, self.correct_value);
        set
    }
}
