// src/core/audio.rs
//
// Read-only audio source contract consumed by the transform model.

use hound::{SampleFormat, WavReader};
use log::debug;
use std::path::Path;

use crate::error::Result;

/// Sample-frame index. Frames may be negative relative to a source start.
pub type Frame = i64;

/// Read contract for an externally supplied audio source.
///
/// The pipeline never mutates a source. Implementations must be safe to read
/// from a background thread because the transform model may fill its columns
/// off the rendering thread.
pub trait AudioSource: Send + Sync {
    fn sample_rate(&self) -> u32;

    fn channel_count(&self) -> usize;

    fn start_frame(&self) -> Frame;

    /// One past the last frame.
    fn end_frame(&self) -> Frame;

    /// False while the source is still being decoded or is unusable.
    fn is_ready(&self) -> bool {
        true
    }

    /// Fill `out` with frames `start..start + out.len()` of `channel`, or the
    /// mixdown of all channels when `channel` is `None`. Frames outside the
    /// source are written as zero. Returns the number of in-range frames.
    fn read_frames(&self, channel: Option<usize>, start: Frame, out: &mut [f32]) -> usize;
}

/// Change notification forwarded by the owner of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceChange {
    /// The whole source was replaced or reloaded.
    Replaced,
    /// Samples in `start..end` were modified in place.
    ChangedWithin { start: Frame, end: Frame },
}

/// Map a configuration channel number onto a read selector (`-1` is mixdown).
pub fn channel_selector(channel: i32) -> Option<usize> {
    if channel < 0 {
        None
    } else {
        Some(channel as usize)
    }
}

/// Audio held in memory as interleaved `f32` samples.
#[derive(Debug, Clone)]
pub struct MemoryAudioSource {
    /// Interleaved samples normalized to [-1.0, 1.0]
    samples: Vec<f32>,
    sample_rate: u32,
    channels: usize,
    start_frame: Frame,
}

impl MemoryAudioSource {
    pub fn from_interleaved(samples: Vec<f32>, channels: usize, sample_rate: u32) -> Self {
        let channels = channels.max(1);
        Self {
            samples,
            sample_rate,
            channels,
            start_frame: 0,
        }
    }

    pub fn from_mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::from_interleaved(samples, 1, sample_rate)
    }

    /// Decode a WAV file of integer or float samples.
    pub fn from_wav(path: &Path) -> Result<Self> {
        let mut reader = WavReader::open(path)?;
        let spec = reader.spec();
        let samples: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader.samples::<f32>().collect::<std::result::Result<_, _>>()?,
            SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<_, _>>()?
            }
        };
        debug!(
            "Loaded {}: {} Hz, {} channels, {}-bit {:?}, {} samples",
            path.display(),
            spec.sample_rate,
            spec.channels,
            spec.bits_per_sample,
            spec.sample_format,
            samples.len()
        );
        Ok(Self::from_interleaved(samples, spec.channels as usize, spec.sample_rate))
    }

    /// Place the first sample at `frame` on the shared timeline.
    pub fn with_start_frame(mut self, frame: Frame) -> Self {
        self.start_frame = frame;
        self
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn duration_secs(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }

    fn sample(&self, channel: Option<usize>, index: usize) -> f32 {
        let base = index * self.channels;
        match channel {
            Some(ch) => self.samples[base + ch.min(self.channels - 1)],
            None if self.channels == 1 => self.samples[base],
            None => {
                let sum: f32 = self.samples[base..base + self.channels].iter().sum();
                sum / self.channels as f32
            }
        }
    }
}

impl AudioSource for MemoryAudioSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channel_count(&self) -> usize {
        self.channels
    }

    fn start_frame(&self) -> Frame {
        self.start_frame
    }

    fn end_frame(&self) -> Frame {
        self.start_frame + self.frame_count() as Frame
    }

    fn read_frames(&self, channel: Option<usize>, start: Frame, out: &mut [f32]) -> usize {
        let count = self.frame_count() as Frame;
        let mut read = 0;
        for (i, slot) in out.iter_mut().enumerate() {
            let index = start + i as Frame - self.start_frame;
            if index >= 0 && index < count {
                *slot = self.sample(channel, index as usize);
                read += 1;
            } else {
                *slot = 0.0;
            }
        }
        read
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_mixdown() {
        let source = MemoryAudioSource::from_interleaved(vec![0.5, -0.5, 0.3, 0.1], 2, 44100);
        let mut out = [9.0f32; 2];
        assert_eq!(source.read_frames(None, 0, &mut out), 2);
        assert!((out[0] - 0.0).abs() < 0.001);
        assert!((out[1] - 0.2).abs() < 0.001);

        assert_eq!(source.read_frames(Some(1), 0, &mut out), 2);
        assert!((out[0] + 0.5).abs() < 0.001);
    }

    #[test]
    fn test_read_out_of_range_is_zero() {
        let source = MemoryAudioSource::from_mono(vec![1.0; 4], 8000).with_start_frame(10);
        assert_eq!(source.end_frame(), 14);
        let mut out = [7.0f32; 6];
        let read = source.read_frames(Some(0), 8, &mut out);
        assert_eq!(read, 4);
        assert_eq!(out, [0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_channel_selector() {
        assert_eq!(channel_selector(-1), None);
        assert_eq!(channel_selector(1), Some(1));
    }

    #[test]
    fn test_from_wav_int16() {
        let path = std::env::temp_dir().join(format!("spectrolayer_audio_{}.wav", std::process::id()));
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..100 {
            writer.write_sample(16384i16).unwrap();
            writer.write_sample(-16384i16).unwrap();
        }
        writer.finalize().unwrap();

        let source = MemoryAudioSource::from_wav(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(source.sample_rate(), 22050);
        assert_eq!(source.channel_count(), 2);
        assert_eq!(source.frame_count(), 100);
        let mut out = [0.0f32; 1];
        source.read_frames(Some(1), 5, &mut out);
        assert!((out[0] + 0.5).abs() < 1e-4);
    }
}
