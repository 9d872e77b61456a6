// tests/test_utils/mod.rs
//
// Shared signal generators and helpers for the integration tests.

#![allow(dead_code)]

use std::f32::consts::PI;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use spectrolayer::config::Configuration;
use spectrolayer::core::{AudioSource, MemoryAudioSource, OffscreenView};
use spectrolayer::layer::SpectrogramLayer;

/// Mono sine at `freq` Hz.
pub fn sine(freq: f32, sample_rate: u32, seconds: f32, amplitude: f32) -> Vec<f32> {
    let frames = (sample_rate as f32 * seconds) as usize;
    (0..frames)
        .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin() * amplitude)
        .collect()
}

/// Linear sweep from `f0` to `f1` Hz.
pub fn chirp(f0: f32, f1: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
    let frames = (sample_rate as f32 * seconds) as usize;
    let rate = (f1 - f0) / seconds;
    (0..frames)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * PI * (f0 * t + 0.5 * rate * t * t)).sin() * 0.5
        })
        .collect()
}

pub fn source(samples: Vec<f32>, sample_rate: u32) -> Arc<dyn AudioSource> {
    Arc::new(MemoryAudioSource::from_mono(samples, sample_rate))
}

pub fn sine_source(freq: f32, sample_rate: u32, seconds: f32) -> Arc<dyn AudioSource> {
    source(sine(freq, sample_rate, seconds, 0.5), sample_rate)
}

/// Layer over `source` with `config`.
pub fn layer_with(config: Configuration, source: Arc<dyn AudioSource>) -> SpectrogramLayer {
    let mut layer = SpectrogramLayer::new(config);
    layer.set_source(Some(source));
    layer
}

/// View whose width covers the whole source.
pub fn full_view(id: u64, source: &Arc<dyn AudioSource>, width: usize, height: usize) -> OffscreenView {
    let frames = (source.end_frame() - source.start_frame()) as usize;
    OffscreenView::covering(id, source.start_frame(), frames, width, height)
}

/// Write 16-bit mono WAV for CLI tests.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("Failed to create WAV");
    for s in samples {
        writer
            .write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            .expect("Failed to write sample");
    }
    writer.finalize().expect("Failed to finalize WAV");
}

/// Scratch directory unique to this test process.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("spectrolayer_{}_{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).expect("Failed to create scratch dir");
    dir
}
