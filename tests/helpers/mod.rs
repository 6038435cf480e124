//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::f32::consts::PI;

use fxguess_core::{AudioEngine, EngineConfig, EngineError, GuessSession, OutputDevice, PuzzleDefinition, SampleBuffer};

pub const SAMPLE_RATE: u32 = 44_100;

/// Route test logs through the fmt subscriber; `RUST_LOG=debug` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A 220 Hz sine, half scale.
pub fn sine_sample(frames: usize) -> SampleBuffer {
    let data = (0..frames)
        .map(|i| (2.0 * PI * 220.0 * i as f32 / SAMPLE_RATE as f32).sin() * 0.5)
        .collect();
    SampleBuffer::new(data, SAMPLE_RATE)
}

pub fn session(puzzle: PuzzleDefinition) -> GuessSession {
    init_tracing();
    let engine = AudioEngine::offline(EngineConfig::default()).expect("default config is valid");
    let mut session = GuessSession::new(puzzle, engine).expect("puzzle is valid");
    session.load_sample(sine_sample(4096)).expect("engine is open");
    session
}

/// Render blocks until playback stops; returns consumed frames.
pub fn play_out(session: &mut GuessSession) -> usize {
    let mut block = [0.0_f32; 128];
    let mut frames = 0;
    while session.is_playing() {
        frames += session.render(&mut block);
    }
    frames
}

/// An output that never starts.
pub struct DeadOutput;

impl OutputDevice for DeadOutput {
    fn start(&mut self) -> fxguess_core::error::Result<()> {
        Err(EngineError::PlaybackFailure("device unavailable".into()))
    }

    fn stop(&mut self) {}
}

pub fn peak(buf: &[f32]) -> f32 {
    buf.iter().fold(0.0_f32, |m, s| m.max(s.abs()))
}
