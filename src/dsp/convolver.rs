//! Convolution reverb building blocks.
//!
//! [`generate_impulse`] synthesises an exponentially decaying noise burst;
//! [`Convolver`] runs a signal through it with uniformly partitioned
//! overlap-save FFT convolution, so the cost per sample grows with the
//! number of partitions rather than with the impulse length.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Time constant of the impulse decay envelope, in seconds.
pub const IMPULSE_DECAY_SECONDS: f64 = 0.1;
/// Impulse length at room size 100.
pub const MAX_IMPULSE_SECONDS: f64 = 2.0;
/// Convolution partition length; also the wet-path latency in samples.
pub const PARTITION_SIZE: usize = 512;

/// Impulse length in samples for a room size on `[0, 100]`.
pub fn impulse_length(room_size: f64, sample_rate: f64) -> usize {
    let seconds = room_size.clamp(0.0, 100.0) / 100.0 * MAX_IMPULSE_SECONDS;
    ((seconds * sample_rate) as usize).max(1)
}

/// Uniform noise attenuated by `exp(-i / (sample_rate * 0.1))`, scaled to
/// unit energy. The same seed always yields the same impulse.
pub fn generate_impulse(room_size: f64, sample_rate: f64, seed: u64) -> Vec<f32> {
    let len = impulse_length(room_size, sample_rate);
    let decay = sample_rate * IMPULSE_DECAY_SECONDS;
    let mut rng = StdRng::seed_from_u64(seed);

    let mut impulse: Vec<f32> = (0..len)
        .map(|i| {
            let noise: f64 = rng.gen_range(-1.0..=1.0);
            (noise * (-(i as f64) / decay).exp()) as f32
        })
        .collect();

    let energy: f32 = impulse.iter().map(|s| s * s).sum();
    if energy > 0.0 {
        let scale = energy.sqrt().recip();
        impulse.iter_mut().for_each(|s| *s *= scale);
    }
    impulse
}

/// Streaming mono convolver with a fixed impulse.
pub struct Convolver {
    block: usize,
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    /// Spectra of the zero-padded impulse partitions.
    partitions: Vec<Vec<Complex<f32>>>,
    /// Ring of input-window spectra, newest at `head`.
    history: Vec<Vec<Complex<f32>>>,
    head: usize,
    window: Vec<f32>,
    input: Vec<f32>,
    output: Vec<f32>,
    pos: usize,
    accum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl Convolver {
    pub fn new(impulse: &[f32], block: usize) -> Self {
        let block = block.max(1);
        let fft_len = 2 * block;
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_len);
        let ifft = planner.plan_fft_inverse(fft_len);
        let scratch_len = fft
            .get_inplace_scratch_len()
            .max(ifft.get_inplace_scratch_len());
        let mut scratch = vec![Complex::default(); scratch_len];

        let partitions: Vec<Vec<Complex<f32>>> = impulse
            .chunks(block)
            .map(|chunk| {
                let mut spectrum = vec![Complex::default(); fft_len];
                for (c, &s) in spectrum.iter_mut().zip(chunk) {
                    *c = Complex::new(s, 0.0);
                }
                fft.process_with_scratch(&mut spectrum, &mut scratch);
                spectrum
            })
            .collect();
        let count = partitions.len().max(1);

        Convolver {
            block,
            fft,
            ifft,
            partitions,
            history: vec![vec![Complex::default(); fft_len]; count],
            head: 0,
            window: vec![0.0; fft_len],
            input: vec![0.0; block],
            output: vec![0.0; block],
            pos: 0,
            accum: vec![Complex::default(); fft_len],
            scratch,
        }
    }

    /// Push one input sample, pull one output sample.
    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        self.input[self.pos] = x;
        let y = self.output[self.pos];
        self.pos += 1;
        if self.pos == self.block {
            self.pos = 0;
            self.run_partition();
        }
        y
    }

    fn run_partition(&mut self) {
        let block = self.block;
        let fft_len = 2 * block;
        let count = self.history.len();

        // Slide: [previous block | current block]
        self.window.copy_within(block.., 0);
        self.window[block..].copy_from_slice(&self.input);

        let slot = &mut self.history[self.head];
        for (c, &s) in slot.iter_mut().zip(&self.window) {
            *c = Complex::new(s, 0.0);
        }
        self.fft.process_with_scratch(slot, &mut self.scratch);

        self.accum.fill(Complex::default());
        for (p, h) in self.partitions.iter().enumerate() {
            let x = &self.history[(self.head + count - p) % count];
            for k in 0..fft_len {
                self.accum[k] += x[k] * h[k];
            }
        }
        self.ifft.process_with_scratch(&mut self.accum, &mut self.scratch);

        // Overlap-save: only the second half is free of wrap-around.
        let norm = 1.0 / fft_len as f32;
        for (out, c) in self.output.iter_mut().zip(&self.accum[block..]) {
            *out = c.re * norm;
        }

        self.head = (self.head + 1) % count;
    }

    /// Forget all buffered input so no tail carries over.
    pub fn reset(&mut self) {
        for spectrum in &mut self.history {
            spectrum.fill(Complex::default());
        }
        self.window.fill(0.0);
        self.input.fill(0.0);
        self.output.fill(0.0);
        self.pos = 0;
        self.head = 0;
    }
}
