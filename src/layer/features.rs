// src/layer/features.rs
//
// Pixel <-> time/frequency queries, hover descriptions and snapping.

use image::RgbaImage;

use super::SpectrogramLayer;
use crate::core::audio::Frame;
use crate::core::dsp::{multiplier_to_db, pitch_label_for_frequency, DB_FLOOR};
use crate::core::render::{x_bin_range, BinDisplay};
use crate::core::scale::BinScale;
use crate::core::view::{Rect, View};

/// How a frame is moved onto a feature boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapType {
    Left,
    Right,
    Nearest,
    Neighbouring,
}

/// Full value range of the layer's vertical axis.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueExtents {
    pub min: f64,
    pub max: f64,
    pub logarithmic: bool,
    pub unit: String,
}

/// Magnitude (scaled to 0..1 full scale) and phase extents under a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BinValueRange {
    pub magnitude_min: f64,
    pub magnitude_max: f64,
    pub phase_min: f64,
    pub phase_max: f64,
}

/// Bin frequency extents under a pixel, plus the refined frequencies of
/// the peaks found there.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AdjustedFrequencyRange {
    pub freq_min: f64,
    pub freq_max: f64,
    pub adjusted_min: f64,
    pub adjusted_max: f64,
}

fn format_seconds(seconds: f64) -> String {
    if seconds < 0.0 {
        return format!("-{}", format_seconds(-seconds));
    }
    let minutes = (seconds / 60.0).floor() as i64;
    if minutes > 0 {
        format!("{}:{:06.3}", minutes, seconds - minutes as f64 * 60.0)
    } else {
        format!("{:.3}", seconds)
    }
}

fn format_hz(frequency: f64) -> String {
    let rounded = (frequency * 1000.0).round() / 1000.0;
    format!("{}", rounded)
}

fn format_db(db: f64) -> String {
    if db == DB_FLOOR {
        "-Inf".to_string()
    } else {
        format!("{}", db.round() as i64)
    }
}

impl SpectrogramLayer {
    pub fn value_extents(&self) -> Option<ValueExtents> {
        let sr = self.sample_rate()? as f64;
        Some(ValueExtents {
            min: sr / self.fft_size() as f64,
            max: sr / 2.0,
            logarithmic: self.bin_scale() == BinScale::Log,
            unit: "Hz".to_string(),
        })
    }

    pub fn y_for_frequency(&self, view: &dyn View, frequency: f64) -> f64 {
        view.y_for_frequency(
            frequency,
            self.effective_min_frequency(),
            self.effective_max_frequency(),
            self.bin_scale() == BinScale::Log,
        )
    }

    pub fn frequency_for_y(&self, view: &dyn View, y: f64) -> f64 {
        view.frequency_for_y(
            y,
            self.effective_min_frequency(),
            self.effective_max_frequency(),
            self.bin_scale() == BinScale::Log,
        )
    }

    pub fn y_for_bin(&self, view: &dyn View, bin: f64) -> Option<f64> {
        self.bin_mapper(view).map(|m| m.y_for_bin(bin))
    }

    pub fn bin_for_y(&self, view: &dyn View, y: f64) -> Option<f64> {
        self.bin_mapper(view).map(|m| m.bin_for_y(y))
    }

    /// Fractional bin range of row `y`.
    pub fn y_bin_range(&self, view: &dyn View, y: i32) -> Option<(f64, f64)> {
        self.bin_mapper(view)?.y_bin_range(y)
    }

    /// Fractional model-column range of pixel column `x`.
    pub fn x_bin_range(&mut self, view: &dyn View, x: i32) -> Option<(f64, f64)> {
        let model = self.get_fft_model()?;
        x_bin_range(model, view, x)
    }

    /// Time span in seconds of the audio contributing to pixel column `x`,
    /// window overlap included.
    pub fn x_bin_source_range(&mut self, view: &dyn View, x: i32) -> Option<(f64, f64)> {
        let (s0, s1) = self.x_bin_range(view, x)?;
        let sr = self.sample_rate()? as f64;
        let s0i = (s0 + 0.001) as i64;
        let s1i = s1 as i64;
        let inc = self.window_increment() as i64;
        let overlap = (self.window_size() as i64 - inc) / 2;
        let w0 = s0i * inc - overlap;
        let w1 = s1i * inc + inc + overlap - 1;
        Some((w0 as f64 / sr, w1 as f64 / sr))
    }

    /// Frequency span of the bins under row `y`.
    pub fn y_bin_source_range(&self, view: &dyn View, y: i32) -> Option<(f64, f64)> {
        let (q0, q1) = self.y_bin_range(view, y)?;
        let sr = self.sample_rate()? as f64;
        let n = self.fft_size() as f64;
        let q0i = (q0 + 0.001) as i64;
        let q1i = q1 as i64;
        Some((sr * q0i as f64 / n, sr * (q1i + 1) as f64 / n))
    }

    /// Stable-frequency extents of the bins under a pixel that pass the
    /// display filter. `None` if no bin qualifies.
    pub fn adjusted_y_bin_source_range(&mut self, view: &dyn View, x: i32, y: i32) -> Option<AdjustedFrequencyRange> {
        let (q0, q1) = self.y_bin_range(view, y)?;
        let peaks_only = matches!(
            self.bin_display(),
            BinDisplay::PeakBins | BinDisplay::PeakFrequencies
        );
        let fft_size = self.fft_size() as f64;
        let threshold = (self.threshold() as f64 * fft_size / 2.0) as f32;

        let model = self.get_fft_model()?;
        let (s0, s1) = x_bin_range(model, view, x)?;
        let sr = model.sample_rate() as f64;
        let width = model.width() as i64;
        let height = model.height() as i64;

        let (s0i, s1i) = ((s0 + 0.001) as i64, s1 as i64);
        let (q0i, q1i) = ((q0 + 0.001) as i64, q1 as i64);

        let mut range = AdjustedFrequencyRange {
            freq_min: sr * q0i as f64 / fft_size,
            freq_max: sr * q1i as f64 / fft_size,
            ..Default::default()
        };
        let mut found = false;

        for q in q0i.max(0)..=q1i.min(height - 1) {
            for s in s0i.max(0)..=s1i.min(width - 1) {
                let (col, bin) = (s as usize, q as usize);
                if peaks_only && !model.is_local_peak(col, bin) {
                    continue;
                }
                if !model.is_over_threshold(col, bin, threshold) {
                    continue;
                }
                if s >= width - 1 {
                    continue;
                }
                let freq = model
                    .estimate_stable_frequency(col, bin)
                    .unwrap_or(sr * q as f64 / fft_size);
                if !found || freq < range.adjusted_min {
                    range.adjusted_min = freq;
                }
                if !found || freq > range.adjusted_max {
                    range.adjusted_max = freq;
                }
                found = true;
            }
        }

        found.then_some(range)
    }

    /// Magnitude and phase extents over the model cells under a pixel.
    pub fn xy_bin_source_range(&mut self, view: &dyn View, x: i32, y: i32) -> Option<BinValueRange> {
        let (q0, q1) = self.y_bin_range(view, y)?;
        let half = self.fft_size() as f64 / 2.0;
        let model = self.get_fft_model()?;
        let (s0, s1) = x_bin_range(model, view, x)?;

        let (s0i, s1i) = ((s0 + 0.001) as i64, s1 as i64);
        let (q0i, q1i) = ((q0 + 0.001) as i64, q1 as i64);
        let width = model.width() as i64;
        let height = model.height() as i64;

        let mut range = BinValueRange::default();
        let mut have = false;
        for q in q0i.max(0)..=q1i.min(height - 1) {
            for s in s0i.max(0)..=s1i.min(width - 1) {
                let phase = model.phase_at(s as usize, q as usize) as f64;
                let magnitude = model.magnitude_at(s as usize, q as usize) as f64 / half;
                if !have {
                    range = BinValueRange {
                        magnitude_min: magnitude,
                        magnitude_max: magnitude,
                        phase_min: phase,
                        phase_max: phase,
                    };
                    have = true;
                    continue;
                }
                range.phase_min = range.phase_min.min(phase);
                range.phase_max = range.phase_max.max(phase);
                range.magnitude_min = range.magnitude_min.min(magnitude);
                range.magnitude_max = range.magnitude_max.max(magnitude);
            }
        }
        have.then_some(range)
    }

    /// Multi-line description of what lies under a pixel; empty when
    /// there is nothing to describe.
    pub fn feature_description(&mut self, view: &dyn View, x: i32, y: i32) -> String {
        if !self.source_ready() {
            return String::new();
        }
        let Some((t0, t1)) = self.x_bin_source_range(view, x) else {
            return String::new();
        };
        let values = self.xy_bin_source_range(view, x, y);

        let mut peak_text = String::new();
        let mut peak_pitch_text = String::new();
        let (freq_min, freq_max) = if self.bin_display() == BinDisplay::PeakFrequencies {
            let Some(adjusted) = self.adjusted_y_bin_source_range(view, x, y) else {
                return String::new();
            };
            let (amin, amax) = (adjusted.adjusted_min, adjusted.adjusted_max);
            peak_text = if amin != amax {
                format!("Peak Frequency:\t{} - {} Hz\n", format_hz(amin), format_hz(amax))
            } else {
                format!("Peak Frequency:\t{} Hz\n", format_hz(amin))
            };
            let (pmin, pmax) = (pitch_label_for_frequency(amin), pitch_label_for_frequency(amax));
            peak_pitch_text = if pmin != pmax {
                format!("Peak Pitch:\t{} - {}\n", pmin, pmax)
            } else {
                format!("Peak Pitch:\t{}\n", pmin)
            };
            (adjusted.freq_min, adjusted.freq_max)
        } else {
            match self.y_bin_source_range(view, y) {
                Some(range) => range,
                None => return String::new(),
            }
        };

        let mut text = if t0 != t1 {
            format!("Time:\t{} - {}\n", format_seconds(t0), format_seconds(t1))
        } else {
            format!("Time:\t{}\n", format_seconds(t0))
        };

        if freq_min != freq_max {
            text.push_str(&format!(
                "{}Bin Frequency:\t{} - {} Hz\n{}Bin Pitch:\t{} - {}\n",
                peak_text,
                format_hz(freq_min),
                format_hz(freq_max),
                peak_pitch_text,
                pitch_label_for_frequency(freq_min),
                pitch_label_for_frequency(freq_max)
            ));
        } else {
            text.push_str(&format!(
                "{}Bin Frequency:\t{} Hz\n{}Bin Pitch:\t{}\n",
                peak_text,
                format_hz(freq_min),
                peak_pitch_text,
                pitch_label_for_frequency(freq_min)
            ));
        }

        if let Some(v) = values {
            let db_min = multiplier_to_db(v.magnitude_min);
            let db_max = multiplier_to_db(v.magnitude_max);
            if db_min.round() != db_max.round() {
                text.push_str(&format!("dB:\t{} - {}", format_db(db_min), format_db(db_max)));
            } else {
                text.push_str(&format!("dB:\t{}", format_db(db_min)));
            }
            if v.phase_min != v.phase_max {
                text.push_str(&format!("\nPhase:\t{} - {}", v.phase_min, v.phase_max));
            } else {
                text.push_str(&format!("\nPhase:\t{}", v.phase_min));
            }
        }
        text
    }

    /// Snap `frame` to a window-increment boundary. Returns the snapped
    /// frame and the resolution.
    pub fn snap_to_feature_frame(&self, frame: Frame, snap: SnapType) -> Option<(Frame, usize)> {
        let resolution = self.window_increment();
        if resolution == 0 {
            return None;
        }
        let res = resolution as Frame;
        let left = frame.div_euclid(res) * res;
        let right = left + res;
        let snapped = match snap {
            SnapType::Left => left,
            SnapType::Right => right,
            SnapType::Nearest | SnapType::Neighbouring => {
                if frame - left > right - frame {
                    right
                } else {
                    left
                }
            }
        };
        Some((snapped, resolution))
    }

    /// Outline of the model cells under a pixel, for highlighting them.
    pub fn local_feature_rect(&mut self, view: &dyn View, x: i32, y: i32) -> Option<Rect> {
        let (s0, s1) = self.x_bin_range(view, x)?;
        let (f0, f1) = self.y_bin_source_range(view, y)?;
        let inc = self.window_increment() as Frame;
        let s0i = (s0 + 0.001) as Frame;
        let s1i = s1 as Frame;
        let x0 = view.x_for_frame(s0i * inc);
        let x1 = view.x_for_frame((s1i + 1) * inc);
        let y1 = self.y_for_frequency(view, f1) as i32;
        let y0 = self.y_for_frequency(view, f0) as i32;
        Some(Rect::new(x0, y1, x1 - x0 + 1, y0 - y1 + 1))
    }

    /// Outline the model cells under `(x, y)` in the view's foreground
    /// colour. Returns the outlined rectangle, unclipped.
    pub fn illuminate_local_features(
        &mut self,
        view: &dyn View,
        target: &mut RgbaImage,
        x: i32,
        y: i32,
    ) -> Option<Rect> {
        let rect = self.local_feature_rect(view, x, y)?;
        let colour = view.foreground();
        let (w, h) = (target.width() as i32, target.height() as i32);
        let mut plot = |px: i32, py: i32| {
            if px >= 0 && px < w && py >= 0 && py < h {
                target.put_pixel(px as u32, py as u32, colour);
            }
        };
        let (right, bottom) = (rect.right() - 1, rect.bottom() - 1);
        for px in rect.x..=right {
            plot(px, rect.y);
            plot(px, bottom);
        }
        for py in rect.y..=bottom {
            plot(rect.x, py);
            plot(right, py);
        }
        Some(rect)
    }
}
