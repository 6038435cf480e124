//! Offline renderer: runs a sample through an effect graph without an
//! audio device, to f32 samples or 16-bit mono WAV bytes.

use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::config::EngineConfig;
use crate::effect::EffectType;
use crate::engine::AudioEngine;
use crate::error::Result;
use crate::graph::ParamSet;
use crate::playback::SampleBuffer;

/// Pull blocks from `engine` until its playback ends. The result has one
/// frame per source frame; no tail is rendered past the end of the sample.
pub fn drain(engine: &mut AudioEngine) -> Vec<f32> {
    let block_size = engine.config().block_size.max(1);
    let mut block = vec![0.0_f32; block_size];
    let mut out = Vec::new();
    while engine.is_playing() {
        let n = engine.render(&mut block);
        out.extend_from_slice(&block[..n]);
    }
    out
}

/// Offline engine running at the sample's own rate.
fn engine_for(config: &EngineConfig, sample: &SampleBuffer) -> Result<AudioEngine> {
    let config = EngineConfig {
        sample_rate: sample.sample_rate() as f64,
        ..config.clone()
    };
    let mut engine = AudioEngine::offline(config)?;
    engine.load_sample(sample.clone())?;
    Ok(engine)
}

/// Render `sample` through a freshly built graph.
pub fn render_through(
    config: &EngineConfig,
    effect: EffectType,
    params: &ParamSet,
    sample: &SampleBuffer,
) -> Result<Vec<f32>> {
    let mut engine = engine_for(config, sample)?;
    engine.build_graph(effect, params)?;
    engine.play_graph()?;
    Ok(drain(&mut engine))
}

/// Render `sample` with no processing.
pub fn render_dry(config: &EngineConfig, sample: &SampleBuffer) -> Result<Vec<f32>> {
    let mut engine = engine_for(config, sample)?;
    engine.play_dry()?;
    Ok(drain(&mut engine))
}

/// Encode mono f32 samples as 16-bit PCM WAV.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    let mut writer = WavWriter::new(&mut cursor, spec)?;
    for &s in samples {
        let pcm = (s as f64 * 32767.0).round().clamp(-32768.0, 32767.0) as i16;
        writer.write_sample(pcm)?;
    }
    writer.finalize()?;
    Ok(cursor.into_inner())
}

/// Render through a graph and encode the result as WAV.
pub fn render_wav(
    config: &EngineConfig,
    effect: EffectType,
    params: &ParamSet,
    sample: &SampleBuffer,
) -> Result<Vec<u8>> {
    let samples = render_through(config, effect, params, sample)?;
    encode_wav(&samples, sample.sample_rate())
}
