//! Effect families and their parameter descriptors.
//!
//! Each of the nine families owns a fixed descriptor list. Parameter names
//! are resolved against that list only, so `"frequency"` on an EQ and
//! `"frequency"` on a filter are distinct descriptors with their own ranges.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// The nine effect families a puzzle can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectType {
    Eq,
    Reverb,
    Compression,
    Delay,
    Phaser,
    Flanger,
    Chorus,
    Distortion,
    Filter,
}

/// Every automatable or fixed knob across all families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EffectParam {
    Frequency,
    Gain,
    Q,
    Threshold,
    Ratio,
    Attack,
    Release,
    Time,
    Feedback,
    WetMix,
    RoomSize,
    Rate,
    Depth,
    Drive,
}

/// Physical unit of a parameter, used for display formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Hz,
    #[serde(rename = "dB")]
    Decibels,
    #[serde(rename = "%")]
    Percent,
    #[serde(rename = "ms")]
    Milliseconds,
    Ratio,
    None,
}

/// Filter topology for the `Filter` family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterTopology {
    #[default]
    Lowpass,
    Highpass,
    Bandpass,
    Notch,
}

/// Static description of one parameter of one family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamDescriptor {
    pub param: EffectParam,
    pub unit: Unit,
    pub min: f64,
    pub max: f64,
    /// Value used when a preset leaves the parameter out.
    pub default: f64,
    pub logarithmic: bool,
    /// `false` means the value is baked into the graph at build time.
    pub automatable: bool,
}

impl ParamDescriptor {
    const fn new(param: EffectParam, unit: Unit, min: f64, max: f64, default: f64) -> Self {
        ParamDescriptor {
            param,
            unit,
            min,
            max,
            default,
            logarithmic: false,
            automatable: true,
        }
    }

    const fn log(mut self) -> Self {
        self.logarithmic = true;
        self
    }

    const fn fixed(mut self) -> Self {
        self.automatable = false;
        self
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Range metadata in the shape the mapper and scorer consume.
    pub fn spec(&self) -> EffectSpec {
        EffectSpec {
            parameter_name: self.param,
            unit: self.unit,
            min_value: self.min,
            max_value: self.max,
            logarithmic: self.logarithmic,
        }
    }
}

/// Range of the guessable parameter of a family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectSpec {
    pub parameter_name: EffectParam,
    pub unit: Unit,
    pub min_value: f64,
    pub max_value: f64,
    pub logarithmic: bool,
}

impl EffectSpec {
    pub fn new(parameter_name: EffectParam, unit: Unit, min_value: f64, max_value: f64, logarithmic: bool) -> Self {
        EffectSpec {
            parameter_name,
            unit,
            min_value,
            max_value,
            logarithmic,
        }
    }

    pub fn span(&self) -> f64 {
        self.max_value - self.min_value
    }
}

use EffectParam as P;

static EQ_PARAMS: [ParamDescriptor; 3] = [
    ParamDescriptor::new(P::Frequency, Unit::Hz, 20.0, 20_000.0, 1_000.0).log(),
    ParamDescriptor::new(P::Gain, Unit::Decibels, -24.0, 24.0, 6.0),
    ParamDescriptor::new(P::Q, Unit::None, 0.1, 18.0, 1.0).log(),
];

static FILTER_PARAMS: [ParamDescriptor; 2] = [
    ParamDescriptor::new(P::Frequency, Unit::Hz, 20.0, 20_000.0, 1_000.0).log(),
    ParamDescriptor::new(P::Q, Unit::None, 0.1, 18.0, 0.707).log(),
];

static COMPRESSION_PARAMS: [ParamDescriptor; 4] = [
    ParamDescriptor::new(P::Threshold, Unit::Decibels, -60.0, 0.0, -24.0),
    ParamDescriptor::new(P::Ratio, Unit::Ratio, 1.0, 20.0, 4.0),
    ParamDescriptor::new(P::Attack, Unit::Milliseconds, 0.1, 100.0, 3.0).log(),
    ParamDescriptor::new(P::Release, Unit::Milliseconds, 10.0, 1_000.0, 250.0).log(),
];

static DELAY_PARAMS: [ParamDescriptor; 2] = [
    ParamDescriptor::new(P::Time, Unit::Milliseconds, 10.0, 1_000.0, 250.0).log(),
    ParamDescriptor::new(P::Feedback, Unit::Percent, 0.0, 90.0, 40.0),
];

static REVERB_PARAMS: [ParamDescriptor; 2] = [
    ParamDescriptor::new(P::WetMix, Unit::Percent, 0.0, 100.0, 30.0),
    ParamDescriptor::new(P::RoomSize, Unit::Percent, 0.0, 100.0, 50.0).fixed(),
];

static PHASER_PARAMS: [ParamDescriptor; 3] = [
    ParamDescriptor::new(P::Rate, Unit::Hz, 0.1, 10.0, 0.5).log(),
    ParamDescriptor::new(P::Depth, Unit::Percent, 0.0, 100.0, 50.0),
    ParamDescriptor::new(P::Feedback, Unit::Percent, 0.0, 90.0, 30.0),
];

static FLANGER_PARAMS: [ParamDescriptor; 3] = [
    ParamDescriptor::new(P::Rate, Unit::Hz, 0.05, 5.0, 0.25).log(),
    ParamDescriptor::new(P::Depth, Unit::Percent, 0.0, 100.0, 60.0),
    ParamDescriptor::new(P::Feedback, Unit::Percent, 0.0, 90.0, 50.0),
];

static CHORUS_PARAMS: [ParamDescriptor; 3] = [
    ParamDescriptor::new(P::Rate, Unit::Hz, 0.1, 8.0, 1.5).log(),
    ParamDescriptor::new(P::Depth, Unit::Percent, 0.0, 100.0, 40.0),
    ParamDescriptor::new(P::Feedback, Unit::Percent, 0.0, 90.0, 15.0),
];

static DISTORTION_PARAMS: [ParamDescriptor; 1] = [
    ParamDescriptor::new(P::Drive, Unit::None, 0.0, 100.0, 30.0),
];

impl EffectType {
    pub const ALL: [EffectType; 9] = [
        EffectType::Eq,
        EffectType::Reverb,
        EffectType::Compression,
        EffectType::Delay,
        EffectType::Phaser,
        EffectType::Flanger,
        EffectType::Chorus,
        EffectType::Distortion,
        EffectType::Filter,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EffectType::Eq => "eq",
            EffectType::Reverb => "reverb",
            EffectType::Compression => "compression",
            EffectType::Delay => "delay",
            EffectType::Phaser => "phaser",
            EffectType::Flanger => "flanger",
            EffectType::Chorus => "chorus",
            EffectType::Distortion => "distortion",
            EffectType::Filter => "filter",
        }
    }

    /// All parameters of this family.
    pub fn params(&self) -> &'static [ParamDescriptor] {
        match self {
            EffectType::Eq => &EQ_PARAMS,
            EffectType::Reverb => &REVERB_PARAMS,
            EffectType::Compression => &COMPRESSION_PARAMS,
            EffectType::Delay => &DELAY_PARAMS,
            EffectType::Phaser => &PHASER_PARAMS,
            EffectType::Flanger => &FLANGER_PARAMS,
            EffectType::Chorus => &CHORUS_PARAMS,
            EffectType::Distortion => &DISTORTION_PARAMS,
            EffectType::Filter => &FILTER_PARAMS,
        }
    }

    pub fn descriptor(&self, param: EffectParam) -> Option<&'static ParamDescriptor> {
        self.params().iter().find(|d| d.param == param)
    }

    /// Resolve a UI parameter name against this family only.
    pub fn lookup(&self, name: &str) -> Result<&'static ParamDescriptor> {
        self.params()
            .iter()
            .find(|d| d.param.name() == name)
            .ok_or_else(|| EngineError::UnknownParameter {
                effect: *self,
                name: name.to_string(),
            })
    }

    /// The parameter a puzzle of this family asks the player to guess.
    pub fn guessable(&self) -> &'static ParamDescriptor {
        match self {
            EffectType::Eq => &EQ_PARAMS[0],
            EffectType::Filter => &FILTER_PARAMS[0],
            EffectType::Reverb => &REVERB_PARAMS[0],
            EffectType::Compression => &COMPRESSION_PARAMS[0],
            EffectType::Delay => &DELAY_PARAMS[0],
            EffectType::Phaser => &PHASER_PARAMS[0],
            EffectType::Chorus => &CHORUS_PARAMS[0],
            EffectType::Flanger => &FLANGER_PARAMS[2],
            EffectType::Distortion => &DISTORTION_PARAMS[0],
        }
    }

    pub fn spec(&self) -> EffectSpec {
        self.guessable().spec()
    }
}

impl fmt::Display for EffectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EffectType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        EffectType::ALL
            .into_iter()
            .find(|e| e.name() == lower)
            .ok_or_else(|| EngineError::UnknownEffectType(s.to_string()))
    }
}

impl EffectParam {
    pub fn name(&self) -> &'static str {
        match self {
            EffectParam::Frequency => "frequency",
            EffectParam::Gain => "gain",
            EffectParam::Q => "q",
            EffectParam::Threshold => "threshold",
            EffectParam::Ratio => "ratio",
            EffectParam::Attack => "attack",
            EffectParam::Release => "release",
            EffectParam::Time => "time",
            EffectParam::Feedback => "feedback",
            EffectParam::WetMix => "wetMix",
            EffectParam::RoomSize => "roomSize",
            EffectParam::Rate => "rate",
            EffectParam::Depth => "depth",
            EffectParam::Drive => "drive",
        }
    }
}

impl fmt::Display for EffectParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
