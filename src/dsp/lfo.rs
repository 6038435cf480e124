//! Low-frequency oscillator for modulated effects.
//!
//! The LFO free-runs from construction; there is no note-on. Rate is
//! passed on every tick so a retargeted rate takes effect without a
//! phase jump.

use std::f64::consts::PI;

/// A free-running bipolar sine in `[-1, 1]`.
#[derive(Debug, Clone)]
pub struct Lfo {
    phase: f64,
    sample_rate: f64,
}

impl Lfo {
    pub fn new(sample_rate: f64) -> Self {
        Lfo {
            phase: 0.0,
            sample_rate,
        }
    }

    /// Generate the next sample at `rate_hz`.
    #[inline]
    pub fn next_sample(&mut self, rate_hz: f64) -> f64 {
        let sample = (2.0 * PI * self.phase).sin();

        self.phase += rate_hz.max(0.0) / self.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }

        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_zero_at_start() {
        let mut lfo = Lfo::new(44100.0);
        let sample = lfo.next_sample(2.0);
        assert!(sample.abs() < 1e-10, "Sine should start near 0, got {sample}");
    }

    #[test]
    fn sine_range() {
        let mut lfo = Lfo::new(44100.0);
        for _ in 0..44100 {
            let s = lfo.next_sample(5.0);
            assert!((-1.0..=1.0).contains(&s), "Sine out of range: {s}");
        }
    }

    #[test]
    fn phase_wraps_after_a_full_cycle() {
        let mut lfo = Lfo::new(1000.0);
        for _ in 0..1250 {
            lfo.next_sample(1.0);
        }
        assert!((lfo.phase - 0.25).abs() < 1e-9, "phase drifted to {}", lfo.phase);
    }

    #[test]
    fn rate_change_keeps_phase_continuous() {
        let mut lfo = Lfo::new(1000.0);
        let a = lfo.next_sample(1.0);
        let b = lfo.next_sample(10.0);
        assert!((b - a).abs() < 0.01, "jump from {a} to {b}");
    }
}
