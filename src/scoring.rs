//! Guess scoring with fixed accuracy bands.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::effect::EffectSpec;

/// Lowest score any submitted guess can earn.
pub const SCORE_FLOOR: u8 = 25;
/// Scores at or above this keep a streak alive.
pub const STREAK_THRESHOLD: u8 = 75;

/// Accuracy tier a guess falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccuracyBand {
    /// Exact.
    Perfect,
    /// Within 5% of the range.
    Excellent,
    /// Within 15%.
    Good,
    /// Within 30%.
    Fair,
    Miss,
}

impl AccuracyBand {
    pub fn of(percent_off: f64) -> Self {
        if percent_off == 0.0 {
            AccuracyBand::Perfect
        } else if percent_off <= 5.0 {
            AccuracyBand::Excellent
        } else if percent_off <= 15.0 {
            AccuracyBand::Good
        } else if percent_off <= 30.0 {
            AccuracyBand::Fair
        } else {
            AccuracyBand::Miss
        }
    }
}

/// Full outcome of scoring one guess.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub score: u8,
    pub percent_off: f64,
    pub band: AccuracyBand,
}

/// Distance between guess and answer as a percentage of the family's guessable range.
pub fn percent_off(guess: f64, correct: f64, spec: &EffectSpec) -> f64 {
    let span = spec.span();
    let diff = (guess - correct).abs();
    if diff == 0.0 {
        0.0
    } else if span <= 0.0 {
        100.0
    } else {
        diff / span * 100.0
    }
}

pub fn evaluate(guess: f64, correct: f64, spec: &EffectSpec) -> ScoreResult {
    let off = percent_off(guess, correct, spec);
    if !off.is_finite() {
        warn!(guess, correct, "non-finite guess scored at the floor");
        return ScoreResult {
            score: SCORE_FLOOR,
            percent_off: off,
            band: AccuracyBand::Miss,
        };
    }
    let band = AccuracyBand::of(off);
    let score = match band {
        AccuracyBand::Perfect => 100,
        AccuracyBand::Excellent => 90,
        AccuracyBand::Good => 75,
        AccuracyBand::Fair => 50,
        // Capped at the Fair score so the curve never climbs back up past 30%.
        AccuracyBand::Miss => (100.0 - off).floor().clamp(SCORE_FLOOR as f64, 50.0) as u8,
    };
    debug!(guess, correct, percent_off = off, ?band, score, "scored guess");
    ScoreResult {
        score,
        percent_off: off,
        band,
    }
}

/// Score a guess on the 25–100 scale.
pub fn score(guess: f64, correct: f64, spec: &EffectSpec) -> u8 {
    evaluate(guess, correct, spec).score
}

/// Consecutive-day run of good scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    pub current: u32,
    pub best: u32,
}

impl Streak {
    /// Fold one day's score into the streak and return the new length.
    pub fn record(&mut self, score: u8) -> u32 {
        if score >= STREAK_THRESHOLD {
            self.current += 1;
            self.best = self.best.max(self.current);
        } else {
            self.current = 0;
        }
        self.current
    }
}
