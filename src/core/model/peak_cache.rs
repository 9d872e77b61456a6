// src/core/model/peak_cache.rs
//
// Block-pooled peak magnitudes over a transform model, for overview rendering.

use std::sync::OnceLock;

use super::fft_model::FftModel;

pub const DEFAULT_PEAK_DIVISOR: usize = 8;

/// Maximum magnitude per `divisor x divisor` block of a transform model.
///
/// A cache belongs to exactly one model instance and is discarded with it.
/// Each block column is pooled in one pass the first time any block in it is
/// requested.
pub struct PeakCache {
    divisor: usize,
    source_width: usize,
    source_height: usize,
    block_columns: Vec<OnceLock<Vec<f32>>>,
}

impl PeakCache {
    pub fn new(model: &FftModel, divisor: usize) -> Self {
        let divisor = divisor.max(1);
        let width = model.width().div_ceil(divisor);
        Self {
            divisor,
            source_width: model.width(),
            source_height: model.height(),
            block_columns: (0..width).map(|_| OnceLock::new()).collect(),
        }
    }

    pub fn divisor(&self) -> usize {
        self.divisor
    }

    /// Number of block columns.
    pub fn width(&self) -> usize {
        self.block_columns.len()
    }

    /// Number of block rows.
    pub fn height(&self) -> usize {
        self.source_height.div_ceil(self.divisor)
    }

    /// Peak magnitude of the block at block coordinates `(bx, by)`.
    pub fn block_peak(&self, model: &FftModel, bx: usize, by: usize) -> f32 {
        debug_assert_eq!(model.width(), self.source_width);
        if bx >= self.width() || by >= self.height() {
            return 0.0;
        }
        let pooled = self.block_columns[bx].get_or_init(|| self.pool_column(model, bx));
        pooled[by]
    }

    /// Peak magnitude of the block containing model cell `(column, bin)`.
    pub fn get_peak(&self, model: &FftModel, column: usize, bin: usize) -> f32 {
        self.block_peak(model, column / self.divisor, bin / self.divisor)
    }

    fn pool_column(&self, model: &FftModel, bx: usize) -> Vec<f32> {
        let mut peaks = vec![0.0f32; self.height()];
        let first = bx * self.divisor;
        let last = (first + self.divisor).min(self.source_width);
        for column in first..last {
            let Some(mags) = model.column_magnitudes(column) else {
                continue;
            };
            for (bin, &m) in mags.iter().enumerate() {
                let slot = &mut peaks[bin / self.divisor];
                if m > *slot {
                    *slot = m;
                }
            }
        }
        peaks
    }
}
