// src/core/model/fft_model.rs
//
// Sliding-window FFT over an audio source, computed column by column and
// cached for the lifetime of the model.

use log::{debug, error, trace};
use num_complex::Complex32;
use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use crate::core::audio::{channel_selector, AudioSource, Frame};
use crate::core::dsp::{princarg, FftProcessor, WindowType};
use crate::error::{Result, SpectrogramError};

/// Bytes of cache storage per (column, bin) cell: magnitude plus phase.
const BYTES_PER_CELL: u64 = 8;

/// Everything that determines the content of a transform model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FftModelKey {
    /// Bumped by the owner whenever its source is replaced or modified.
    pub source_generation: u64,
    pub channel: i32,
    pub window_type: WindowType,
    pub window_size: usize,
    pub hop_size: usize,
    pub fft_size: usize,
}

struct Column {
    magnitudes: Vec<f32>,
    phases: Vec<f32>,
}

struct Shared {
    source: Arc<dyn AudioSource>,
    key: FftModelKey,
    processor: FftProcessor,
    start_frame: Frame,
    sample_rate: u32,
    width: usize,
    height: usize,
    columns: Vec<OnceLock<Column>>,
    filled: AtomicUsize,
    cancelled: AtomicBool,
}

impl Shared {
    fn column(&self, index: usize) -> &Column {
        self.columns[index].get_or_init(|| {
            let column = self.compute(index);
            self.filled.fetch_add(1, Ordering::Relaxed);
            column
        })
    }

    fn compute(&self, index: usize) -> Column {
        let window_size = self.key.window_size;
        let centre = self.start_frame + (index * self.key.hop_size) as Frame;
        let first = centre - (window_size / 2) as Frame;

        let mut frame = vec![0.0f32; window_size];
        self.source
            .read_frames(channel_selector(self.key.channel), first, &mut frame);

        let spectrum: Vec<Complex32> = self.processor.complex_spectrum(&frame);
        Column {
            magnitudes: spectrum.iter().map(|c| c.norm()).collect(),
            phases: spectrum.iter().map(|c| c.arg()).collect(),
        }
    }
}

/// Frequency-domain view of one channel of an audio source.
///
/// Columns are computed on first access and then kept; a model is never
/// patched, only replaced. Reads are safe from several threads, which lets an
/// optional background job fill the model while the renderer queries it.
pub struct FftModel {
    shared: Arc<Shared>,
}

impl FftModel {
    /// Build a model, failing if its cache would exceed `memory_limit` bytes.
    pub fn new(source: Arc<dyn AudioSource>, key: FftModelKey, memory_limit: u64) -> Result<Self> {
        if key.window_size == 0 || key.hop_size == 0 || key.fft_size < key.window_size {
            return Err(SpectrogramError::InvalidParameter(format!(
                "window {} / hop {} / fft {}",
                key.window_size, key.hop_size, key.fft_size
            )));
        }
        if !source.is_ready() {
            return Err(SpectrogramError::NoSource);
        }

        let start_frame = source.start_frame();
        let frames = (source.end_frame() - start_frame).max(0) as usize;
        let width = if frames == 0 { 0 } else { frames / key.hop_size + 1 };
        let height = key.fft_size / 2 + 1;

        let required = width as u64 * height as u64 * BYTES_PER_CELL;
        if required > memory_limit {
            error!(
                "FFT model needs {} bytes for {}x{} cells, limit is {}",
                required, width, height, memory_limit
            );
            return Err(SpectrogramError::TransformAllocation {
                required_bytes: required,
                limit_bytes: memory_limit,
            });
        }

        debug!(
            "FftModel::new: {} columns x {} bins (window {}, hop {}, fft {})",
            width, height, key.window_size, key.hop_size, key.fft_size
        );

        let processor = FftProcessor::new(key.window_size, key.fft_size, key.window_type);
        let sample_rate = source.sample_rate();
        let columns = (0..width).map(|_| OnceLock::new()).collect();

        Ok(Self {
            shared: Arc::new(Shared {
                source,
                key,
                processor,
                start_frame,
                sample_rate,
                width,
                height,
                columns,
                filled: AtomicUsize::new(0),
                cancelled: AtomicBool::new(false),
            }),
        })
    }

    /// Fill every column on the rayon pool. Stops early when the model is dropped.
    pub fn start_background_fill(&self) {
        let shared = Arc::clone(&self.shared);
        rayon::spawn(move || {
            for index in 0..shared.width {
                if shared.cancelled.load(Ordering::Relaxed) {
                    trace!("background fill cancelled at column {}", index);
                    return;
                }
                shared.column(index);
            }
            trace!("background fill complete: {} columns", shared.width);
        });
    }

    pub fn key(&self) -> &FftModelKey {
        &self.shared.key
    }

    pub fn width(&self) -> usize {
        self.shared.width
    }

    pub fn height(&self) -> usize {
        self.shared.height
    }

    pub fn sample_rate(&self) -> u32 {
        self.shared.sample_rate
    }

    pub fn window_size(&self) -> usize {
        self.shared.key.window_size
    }

    pub fn window_increment(&self) -> usize {
        self.shared.key.hop_size
    }

    pub fn fft_size(&self) -> usize {
        self.shared.key.fft_size
    }

    pub fn start_frame(&self) -> Frame {
        self.shared.start_frame
    }

    /// Source frame at the centre of a column.
    pub fn frame_for_column(&self, column: usize) -> Frame {
        self.shared.start_frame + (column * self.shared.key.hop_size) as Frame
    }

    /// Percentage of columns computed so far; never decreases.
    pub fn completion(&self) -> u8 {
        if self.shared.width == 0 {
            return 100;
        }
        let filled = self.shared.filled.load(Ordering::Relaxed);
        ((filled * 100) / self.shared.width).min(100) as u8
    }

    pub fn is_complete(&self) -> bool {
        self.completion() >= 100
    }

    /// All magnitudes of one column, or `None` out of range.
    pub fn column_magnitudes(&self, column: usize) -> Option<&[f32]> {
        if column >= self.shared.width {
            return None;
        }
        Some(&self.shared.column(column).magnitudes)
    }

    pub fn column_phases(&self, column: usize) -> Option<&[f32]> {
        if column >= self.shared.width {
            return None;
        }
        Some(&self.shared.column(column).phases)
    }

    pub fn magnitude_at(&self, column: usize, bin: usize) -> f32 {
        self.column_magnitudes(column)
            .and_then(|m| m.get(bin).copied())
            .unwrap_or(0.0)
    }

    pub fn phase_at(&self, column: usize, bin: usize) -> f32 {
        self.column_phases(column)
            .and_then(|p| p.get(bin).copied())
            .unwrap_or(0.0)
    }

    /// True if the bin's magnitude exceeds both its frequency neighbours.
    pub fn is_local_peak(&self, column: usize, bin: usize) -> bool {
        let Some(mags) = self.column_magnitudes(column) else {
            return false;
        };
        is_peak_in(mags, bin)
    }

    pub fn is_over_threshold(&self, column: usize, bin: usize, threshold: f32) -> bool {
        self.magnitude_at(column, bin) > threshold
    }

    /// Refine a bin's nominal frequency from the phase advance to the next column.
    ///
    /// Returns `None` for the last column (no successor to compare against)
    /// or for coordinates outside the model.
    pub fn estimate_stable_frequency(&self, column: usize, bin: usize) -> Option<f64> {
        if column + 1 >= self.shared.width || bin >= self.shared.height {
            return None;
        }
        let sr = self.shared.sample_rate as f64;
        let hop = self.shared.key.hop_size as f64;
        let fft_size = self.shared.key.fft_size as f64;

        let old_phase = self.phase_at(column, bin) as f64;
        let new_phase = self.phase_at(column + 1, bin) as f64;

        let expected = old_phase + (2.0 * PI * bin as f64 * hop) / fft_size;
        let error = princarg(new_phase - expected);

        Some((sr * (expected + error - old_phase)) / (2.0 * PI * hop))
    }

    /// Nominal centre frequency of a (possibly fractional) bin.
    pub fn bin_frequency(&self, bin: f64) -> f64 {
        bin * self.shared.sample_rate as f64 / self.shared.key.fft_size as f64
    }
}

impl Drop for FftModel {
    fn drop(&mut self) {
        self.shared.cancelled.store(true, Ordering::Relaxed);
    }
}

/// Local-peak test on a magnitude slice.
pub(crate) fn is_peak_in(mags: &[f32], bin: usize) -> bool {
    let Some(&m) = mags.get(bin) else {
        return false;
    };
    if bin > 0 && m <= mags[bin - 1] {
        return false;
    }
    if bin + 1 < mags.len() && m <= mags[bin + 1] {
        return false;
    }
    true
}
