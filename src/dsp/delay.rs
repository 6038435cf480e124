//! Delay line: circular buffer with fractional read-back.
//!
//! Shared by the echo, flanger and chorus graphs. Feedback is wired by the
//! caller: read the delayed sample first, then write `input + fb * delayed`.

/// A mono delay line holding up to `max_delay_seconds` of audio.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
    sample_rate: f64,
}

impl DelayLine {
    /// Create a delay line.
    ///
    /// # Arguments
    /// - `sample_rate`: Audio sample rate in Hz.
    /// - `max_delay_seconds`: Maximum supported delay time.
    pub fn new(sample_rate: f64, max_delay_seconds: f64) -> Self {
        let buffer_size = (sample_rate * max_delay_seconds.max(0.0)) as usize + 2;
        Self {
            buffer: vec![0.0; buffer_size],
            write_pos: 0,
            sample_rate,
        }
    }

    /// Longest delay, in samples, that can be read back.
    pub fn max_delay_samples(&self) -> f64 {
        (self.buffer.len() - 1) as f64
    }

    /// Convert seconds to a clamped delay in samples.
    #[inline]
    pub fn samples_for(&self, seconds: f64) -> f64 {
        (seconds * self.sample_rate).clamp(1.0, self.max_delay_samples())
    }

    /// Read the sample written `delay_samples` writes ago, linearly
    /// interpolated between neighbours. `delay_samples` must be ≥ 1.
    #[inline]
    pub fn read(&self, delay_samples: f64) -> f32 {
        let buffer_len = self.buffer.len();
        let delay_samples = delay_samples.clamp(1.0, self.max_delay_samples());
        let delay_int = delay_samples as usize;
        let frac = (delay_samples - delay_int as f64) as f32;

        let read_pos_0 = if self.write_pos >= delay_int {
            self.write_pos - delay_int
        } else {
            buffer_len - (delay_int - self.write_pos)
        };

        let read_pos_1 = if read_pos_0 == 0 {
            buffer_len - 1
        } else {
            read_pos_0 - 1
        };

        let s0 = self.buffer[read_pos_0];
        let s1 = self.buffer[read_pos_1];

        // Linear interpolation
        s0 + frac * (s1 - s0)
    }

    /// Push one sample and advance.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One tick of an echo: read, then write input plus feedback.
    fn tick(line: &mut DelayLine, input: f32, delay_samples: f64, feedback: f32) -> f32 {
        let delayed = line.read(delay_samples);
        line.write(input + delayed * feedback);
        delayed
    }

    #[test]
    fn test_delay_outputs_delayed_signal() {
        let sample_rate = 44100.0;
        let mut line = DelayLine::new(sample_rate, 1.0);
        let delay = line.samples_for(0.01); // 441 samples

        // Send an impulse
        assert_eq!(tick(&mut line, 1.0, delay, 0.0), 0.0);

        for _ in 1..441 {
            assert!(tick(&mut line, 0.0, delay, 0.0).abs() < 1e-6);
        }

        // At delay time, the impulse should appear
        assert!((tick(&mut line, 0.0, delay, 0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_delay_feedback() {
        let mut line = DelayLine::new(1000.0, 1.0);
        let delay = line.samples_for(0.01); // 10 samples

        tick(&mut line, 1.0, delay, 0.5);
        for _ in 1..10 {
            tick(&mut line, 0.0, delay, 0.5);
        }
        let first_echo = tick(&mut line, 0.0, delay, 0.5);
        assert!((first_echo - 1.0).abs() < 1e-6);

        for _ in 1..10 {
            tick(&mut line, 0.0, delay, 0.5);
        }
        // Second echo should be attenuated by feedback
        let second_echo = tick(&mut line, 0.0, delay, 0.5);
        assert!((second_echo - 0.5).abs() < 1e-6);
    }

    #[test]
    fn fractional_delay_interpolates() {
        let mut line = DelayLine::new(1000.0, 0.1);
        line.write(1.0);
        line.write(0.0);
        // 1.5 samples back sits halfway between the 0.0 and the 1.0
        assert!((line.read(1.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn delay_is_clamped_to_buffer() {
        let line = DelayLine::new(1000.0, 0.01);
        assert_eq!(line.samples_for(5.0), line.max_delay_samples());
        assert_eq!(line.samples_for(0.0), 1.0);
    }
}
