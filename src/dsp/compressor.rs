//! Compressor: feed-forward dynamics processing.
//!
//! Threshold, ratio, knee, attack and release follow the WebAudio
//! DynamicsCompressorNode. Attack and release are taken in milliseconds to
//! match the puzzle presets.

/// Knee width in dB used by the compression graph.
pub const DEFAULT_KNEE_DB: f64 = 6.0;

/// A mono dynamics compressor.
#[derive(Debug, Clone)]
pub struct Compressor {
    sample_rate: f64,

    /// Threshold in dB (typical: -60 to 0).
    threshold: f64,
    /// Compression ratio (e.g., 4.0 = 4:1 compression).
    ratio: f64,
    /// Knee width in dB (0 = hard knee, higher = softer transition).
    knee: f64,
    attack_ms: f64,
    release_ms: f64,

    attack_coef: f64,
    release_coef: f64,
    envelope: f64, // Current envelope level (linear)
}

impl Compressor {
    /// Create a new compressor with default settings.
    pub fn new(sample_rate: f64) -> Self {
        let mut c = Self {
            sample_rate,
            threshold: -24.0,
            ratio: 4.0,
            knee: DEFAULT_KNEE_DB,
            attack_ms: 3.0,
            release_ms: 250.0,
            attack_coef: 0.0,
            release_coef: 0.0,
            envelope: 0.0,
        };
        c.update_time_constants();
        c
    }

    /// Create a compressor with specific parameters.
    pub fn with_params(sample_rate: f64, threshold: f64, ratio: f64, attack_ms: f64, release_ms: f64) -> Self {
        let mut c = Self::new(sample_rate);
        c.set_threshold(threshold);
        c.set_ratio(ratio);
        c.set_times(attack_ms, release_ms);
        c
    }

    pub fn set_threshold(&mut self, threshold_db: f64) {
        self.threshold = threshold_db.clamp(-100.0, 0.0);
    }

    pub fn set_ratio(&mut self, ratio: f64) {
        self.ratio = ratio.clamp(1.0, 20.0);
    }

    /// Set attack and release in milliseconds.
    pub fn set_times(&mut self, attack_ms: f64, release_ms: f64) {
        let attack_ms = attack_ms.clamp(0.01, 1000.0);
        let release_ms = release_ms.clamp(1.0, 5000.0);
        if attack_ms != self.attack_ms || release_ms != self.release_ms {
            self.attack_ms = attack_ms;
            self.release_ms = release_ms;
            self.update_time_constants();
        }
    }

    fn update_time_constants(&mut self) {
        self.attack_coef = (-1.0 / (self.attack_ms / 1000.0 * self.sample_rate)).exp();
        self.release_coef = (-1.0 / (self.release_ms / 1000.0 * self.sample_rate)).exp();
    }

    /// Convert linear amplitude to dB.
    #[inline]
    fn linear_to_db(linear: f64) -> f64 {
        if linear <= 0.0 {
            -120.0
        } else {
            20.0 * linear.log10()
        }
    }

    /// Convert dB to linear amplitude.
    #[inline]
    fn db_to_linear(db: f64) -> f64 {
        10.0_f64.powf(db / 20.0)
    }

    /// Compute gain reduction for a given input level (in dB).
    #[inline]
    fn compute_gain(&self, input_db: f64) -> f64 {
        let threshold = self.threshold;
        let slope = 1.0 - 1.0 / self.ratio;
        let knee = self.knee;

        if knee <= 0.0 {
            // Hard knee
            if input_db <= threshold {
                0.0
            } else {
                (threshold - input_db) * slope
            }
        } else {
            let half_knee = knee / 2.0;
            let knee_start = threshold - half_knee;
            let knee_end = threshold + half_knee;

            if input_db <= knee_start {
                0.0
            } else if input_db >= knee_end {
                (threshold - input_db) * slope
            } else {
                // In the knee region - quadratic interpolation
                let x = input_db - knee_start;
                -slope * x * x / (2.0 * knee)
            }
        }
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let input_level = input.abs() as f64;

        // Envelope follower (peak detection with attack/release)
        let coef = if input_level > self.envelope {
            self.attack_coef
        } else {
            self.release_coef
        };
        self.envelope = coef * self.envelope + (1.0 - coef) * input_level;

        let gain_reduction_db = self.compute_gain(Self::linear_to_db(self.envelope));
        let gain = Self::db_to_linear(gain_reduction_db) as f32;

        input * gain
    }

    /// Process a mono block in-place.
    pub fn process_block(&mut self, buf: &mut [f32]) {
        for s in buf.iter_mut() {
            *s = self.process(*s);
        }
    }

    /// Drop the envelope so the next signal starts uncompressed.
    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }
}
