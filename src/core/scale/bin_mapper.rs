// src/core/scale/bin_mapper.rs
//
// Pixel row <-> frequency <-> fractional FFT bin conversions.

use serde::{Deserialize, Serialize};

/// Frequency axis scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BinScale {
    #[default]
    Linear,
    Log,
}

/// Row for `frequency` on a display of `height` pixels spanning `min_f..max_f`.
///
/// Row 0 is the top of the display (highest frequency).
pub fn y_for_frequency(frequency: f64, min_f: f64, max_f: f64, logarithmic: bool, height: f64) -> f64 {
    let (f, lo, hi) = if logarithmic {
        (log_or_floor(frequency), log_or_floor(nonzero(min_f)), log_or_floor(max_f))
    } else {
        (frequency, min_f, max_f)
    };
    if hi <= lo {
        return height;
    }
    height - (height * (f - lo)) / (hi - lo)
}

/// Inverse of [`y_for_frequency`].
pub fn frequency_for_y(y: f64, min_f: f64, max_f: f64, logarithmic: bool, height: f64) -> f64 {
    if height <= 0.0 {
        return min_f;
    }
    if logarithmic {
        let lo = log_or_floor(nonzero(min_f));
        let hi = log_or_floor(max_f);
        10.0f64.powf(lo + ((height - y) * (hi - lo)) / height)
    } else {
        min_f + ((height - y) * (max_f - min_f)) / height
    }
}

fn nonzero(f: f64) -> f64 {
    if f == 0.0 {
        1.0
    } else {
        f
    }
}

fn log_or_floor(f: f64) -> f64 {
    if f > 0.0 {
        f.log10()
    } else {
        -10.0
    }
}

/// Maps between display rows and FFT bins for one display geometry.
///
/// `min_frequency` and `max_frequency` are the effective (bin-quantised)
/// bounds of the display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinMapper {
    sample_rate: f64,
    fft_size: usize,
    min_frequency: f64,
    max_frequency: f64,
    scale: BinScale,
    height: f64,
}

impl BinMapper {
    pub fn new(
        sample_rate: u32,
        fft_size: usize,
        min_frequency: f64,
        max_frequency: f64,
        scale: BinScale,
        height: usize,
    ) -> Self {
        Self {
            sample_rate: sample_rate as f64,
            fft_size: fft_size.max(1),
            min_frequency,
            max_frequency,
            scale,
            height: height as f64,
        }
    }

    pub fn scale(&self) -> BinScale {
        self.scale
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn min_frequency(&self) -> f64 {
        self.min_frequency
    }

    pub fn max_frequency(&self) -> f64 {
        self.max_frequency
    }

    fn logarithmic(&self) -> bool {
        self.scale == BinScale::Log
    }

    pub fn frequency_for_bin(&self, bin: f64) -> f64 {
        bin * self.sample_rate / self.fft_size as f64
    }

    pub fn bin_for_frequency(&self, frequency: f64) -> f64 {
        frequency * self.fft_size as f64 / self.sample_rate
    }

    pub fn y_for_frequency(&self, frequency: f64) -> f64 {
        y_for_frequency(
            frequency,
            self.min_frequency,
            self.max_frequency,
            self.logarithmic(),
            self.height,
        )
    }

    pub fn frequency_for_y(&self, y: f64) -> f64 {
        frequency_for_y(
            y,
            self.min_frequency,
            self.max_frequency,
            self.logarithmic(),
            self.height,
        )
    }

    pub fn y_for_bin(&self, bin: f64) -> f64 {
        self.y_for_frequency(self.frequency_for_bin(bin))
    }

    pub fn bin_for_y(&self, y: f64) -> f64 {
        self.bin_for_frequency(self.frequency_for_y(y))
    }

    /// Fractional bin range `(low, high)` covered by row `y`, or `None` off
    /// the display.
    pub fn y_bin_range(&self, y: i32) -> Option<(f64, f64)> {
        if y < 0 || y as f64 >= self.height {
            return None;
        }
        Some((self.bin_for_y(y as f64), self.bin_for_y(y as f64 - 1.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_endpoints() {
        let m = BinMapper::new(44100, 1024, 0.0, 22050.0, BinScale::Linear, 512);
        assert!((m.y_for_frequency(0.0) - 512.0).abs() < 1e-9);
        assert!(m.y_for_frequency(22050.0).abs() < 1e-9);
        assert!((m.frequency_for_y(256.0) - 11025.0).abs() < 1e-9);
        assert!((m.bin_for_y(0.0) - 512.0).abs() < 1e-9);
    }

    #[test]
    fn test_log_round_trip() {
        let m = BinMapper::new(44100, 2048, 21.5, 11025.0, BinScale::Log, 300);
        for bin in [2.0, 10.0, 100.0, 500.0, 1000.0] {
            let y = m.y_for_bin(bin);
            assert!((m.bin_for_y(y) - bin).abs() < 1e-6, "bin {}", bin);
        }
    }

    #[test]
    fn test_log_zero_minimum_treated_as_one_hz() {
        let y = y_for_frequency(1.0, 0.0, 1000.0, true, 100.0);
        assert!((y - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_row_range_covers_row_above() {
        let m = BinMapper::new(8000, 256, 0.0, 4000.0, BinScale::Linear, 128);
        let (q0, q1) = m.y_bin_range(64).unwrap();
        assert!(q1 > q0);
        assert!((q1 - q0 - 1.0).abs() < 1e-9);
        assert!(m.y_bin_range(-1).is_none());
        assert!(m.y_bin_range(128).is_none());
    }
}
