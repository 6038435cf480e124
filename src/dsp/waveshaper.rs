//! Waveshaping distortion with a precomputed transfer curve.

use std::f64::consts::PI;

/// Curve scale constant: 20 degrees in radians.
const CURVE_K: f64 = 20.0 * PI / 180.0;

/// Sample `((3 + drive) · x · k) / (π + drive · |x|)` at `samples` points
/// spread evenly over `x ∈ [-1, 1]`.
pub fn make_curve(drive: f64, samples: usize) -> Vec<f32> {
    let samples = samples.max(2);
    let drive = drive.max(0.0);
    (0..samples)
        .map(|i| {
            let x = i as f64 * 2.0 / (samples - 1) as f64 - 1.0;
            ((3.0 + drive) * x * CURVE_K / (PI + drive * x.abs())) as f32
        })
        .collect()
}

/// Applies a transfer curve the way WebAudio's WaveShaperNode does:
/// input is clamped to `[-1, 1]` and read from the table with linear
/// interpolation.
#[derive(Debug, Clone)]
pub struct WaveShaper {
    curve: Vec<f32>,
}

impl WaveShaper {
    /// A curve shorter than two points is padded with zeros, which
    /// shapes everything to silence.
    pub fn new(mut curve: Vec<f32>) -> Self {
        if curve.len() < 2 {
            curve.resize(2, 0.0);
        }
        WaveShaper { curve }
    }

    #[inline]
    pub fn process(&self, input: f32) -> f32 {
        let last = self.curve.len() - 1;
        let pos = (input.clamp(-1.0, 1.0) + 1.0) * 0.5 * last as f32;
        let idx = (pos as usize).min(last);
        let frac = pos - idx as f32;
        let s0 = self.curve[idx];
        let s1 = self.curve[(idx + 1).min(last)];
        s0 + frac * (s1 - s0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_is_odd_and_monotonic() {
        let curve = make_curve(50.0, 1025);
        let n = curve.len();
        for i in 0..n {
            assert!((curve[i] + curve[n - 1 - i]).abs() < 1e-6, "not odd at {i}");
        }
        assert!(curve.windows(2).all(|w| w[1] >= w[0]));
        assert!(curve[n / 2].abs() < 1e-7);
    }

    #[test]
    fn more_drive_saturates_harder() {
        let soft = WaveShaper::new(make_curve(0.0, 4096));
        let hard = WaveShaper::new(make_curve(100.0, 4096));
        // Ratio of small-signal to full-scale gain: closer to 1 means more linear.
        let linearity = |s: &WaveShaper| (s.process(0.1) / 0.1) / s.process(1.0);
        assert!(linearity(&hard) > linearity(&soft) * 2.0);
    }

    #[test]
    fn short_curves_do_not_panic() {
        assert_eq!(WaveShaper::new(Vec::new()).process(0.7), 0.0);
        let single = WaveShaper::new(vec![0.5]);
        assert!(single.process(-1.0) == 0.5 && single.process(1.0) == 0.0);
    }

    #[test]
    fn lookup_matches_formula_and_clamps() {
        let drive = 20.0;
        let shaper = WaveShaper::new(make_curve(drive, 4097));
        let x = 0.5_f64;
        let expected = ((3.0 + drive) * x * CURVE_K / (PI + drive * x)) as f32;
        assert!((shaper.process(0.5) - expected).abs() < 1e-4);
        assert_eq!(shaper.process(4.0), shaper.process(1.0));
        assert_eq!(shaper.process(-4.0), shaper.process(-1.0));
    }
}
