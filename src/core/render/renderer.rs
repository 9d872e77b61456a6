// src/core/render/renderer.rs
//
// Incremental, optionally time-bounded rendering of a transform model into
// a view's image cache.

use image::{Rgba, RgbaImage};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::image_cache::ImageCache;
use crate::core::colour::ColourScale;
use crate::core::colour::ColourScaleType;
use crate::core::model::{is_peak_in, FftModel, PeakCache};
use crate::core::normalization::{ColumnNormalization, MagnitudeRange};
use crate::core::scale::BinMapper;
use crate::core::view::{Rect, View};

/// Default wall-clock budget of one time-constrained pass.
pub const DEFAULT_TIME_BUDGET: Duration = Duration::from_millis(50);

/// Which bins contribute to a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BinDisplay {
    #[default]
    AllBins,
    PeakBins,
    PeakFrequencies,
}

/// Fixed rendering parameters. A change to any of them means a new renderer.
#[derive(Debug, Clone)]
pub struct RenderParameters {
    pub colour_scale: ColourScale,
    pub normalization: ColumnNormalization,
    pub normalize_visible_area: bool,
    pub bin_display: BinDisplay,
    /// Applied to magnitudes before normalization-independent display.
    pub scale_factor: f64,
    /// Interpolate between bins when a row is narrower than one bin.
    pub interpolate: bool,
}

/// What the renderer reads from.
pub struct Sources<'a> {
    pub fft: Option<&'a FftModel>,
    pub peaks: Option<&'a PeakCache>,
    pub bins: BinMapper,
}

/// Outcome of one render call.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderResult {
    /// Columns computed by this call.
    pub rendered: Rect,
    /// Region of the target updated from the cache, computed or not.
    pub painted: Rect,
    /// Range of the values computed by this call.
    pub range: MagnitudeRange,
}

/// Renders one view's worth of spectrogram, reusing earlier work.
///
/// The renderer owns the view's [`ImageCache`]. Geometry changes are
/// detected on each call: a whole-pixel scroll keeps what it can, anything
/// else throws the cache away.
pub struct Renderer {
    params: RenderParameters,
    cache: ImageCache,
    budget: Duration,
    visible_max: Option<f32>,
}

/// Per-call constants shared by every column.
struct Pass<'a> {
    fft: &'a FftModel,
    peaks: Option<&'a PeakCache>,
    bins: &'a BinMapper,
    rows: Vec<Option<(f64, f64)>>,
    background: Rgba<u8>,
}

impl Renderer {
    pub fn new(params: RenderParameters) -> Self {
        Self {
            params,
            cache: ImageCache::new(),
            budget: DEFAULT_TIME_BUDGET,
            visible_max: None,
        }
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    pub fn parameters(&self) -> &RenderParameters {
        &self.params
    }

    pub fn time_budget(&self) -> Duration {
        self.budget
    }

    pub fn image(&self) -> &RgbaImage {
        self.cache.image()
    }

    /// Peak used to rescale values when normalizing to the visible area.
    pub fn set_visible_max(&mut self, max: Option<f32>) {
        if self.visible_max != max {
            self.visible_max = max;
            self.cache.invalidate();
        }
    }

    pub fn visible_max(&self) -> Option<f32> {
        self.visible_max
    }

    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }

    /// True if the view's size, zoom or start frame differ from the cache.
    pub fn geometry_changed(&self, view: &dyn View) -> bool {
        self.cache.size() != (view.paint_width() as u32, view.paint_height() as u32)
            || self.cache.zoom_level() != view.zoom_level()
            || self.cache.start_frame() != view.start_frame()
    }

    /// Render every column of `rect` regardless of cost.
    pub fn render(
        &mut self,
        sources: &Sources,
        view: &dyn View,
        target: &mut RgbaImage,
        rect: Rect,
    ) -> RenderResult {
        self.render_inner(sources, view, target, rect, None)
    }

    /// Render columns of `rect` until the time budget runs out.
    ///
    /// At least one column is rendered per call, so repeated calls always
    /// make progress.
    pub fn render_time_constrained(
        &mut self,
        sources: &Sources,
        view: &dyn View,
        target: &mut RgbaImage,
        rect: Rect,
    ) -> RenderResult {
        let budget = self.budget;
        self.render_inner(sources, view, target, rect, Some(budget))
    }

    /// Largest contiguous region of the view not yet in the cache.
    pub fn largest_uncached_rect(&self, view: &dyn View) -> Rect {
        let w = view.paint_width() as i32;
        let h = view.paint_height() as i32;
        if self.geometry_changed(view) || !self.cache.is_valid() {
            return Rect::new(0, 0, w, h);
        }
        let vl = self.cache.valid_left();
        let vr = self.cache.valid_right();
        if vl == 0 && vr >= w {
            return Rect::default();
        }
        if vl >= w - vr {
            Rect::new(0, 0, vl, h)
        } else {
            Rect::new(vr, 0, w - vr, h)
        }
    }

    /// Display colour for a value as the colour scale sees it.
    pub fn colour_for_value(&self, value: f64) -> Rgba<u8> {
        self.params.colour_scale.colour(value)
    }

    fn update_geometry(&mut self, view: &dyn View) {
        self.cache
            .resize(view.paint_width() as u32, view.paint_height() as u32);
        self.cache.set_zoom_level(view.zoom_level());
        self.cache.scroll_to(view.start_frame());
    }

    fn render_inner(
        &mut self,
        sources: &Sources,
        view: &dyn View,
        target: &mut RgbaImage,
        rect: Rect,
        budget: Option<Duration>,
    ) -> RenderResult {
        let Some(fft) = sources.fft else {
            trace!("Renderer: no transform model, nothing rendered");
            return RenderResult::default();
        };

        self.update_geometry(view);

        let w = view.paint_width() as i32;
        let h = view.paint_height() as i32;
        let rect = rect.intersect(&Rect::new(0, 0, w, h));
        if rect.is_empty() {
            return RenderResult::default();
        }

        let pass = Pass {
            fft,
            peaks: sources.peaks,
            bins: &sources.bins,
            rows: (0..h).map(|y| sources.bins.y_bin_range(y)).collect(),
            background: self.params.colour_scale.background(),
        };
        let mut result = RenderResult::default();
        let started = Instant::now();

        // One side of the valid area per iteration, so every span rendered
        // touches it
        loop {
            let (left, width, right_to_left) = self.cache.adjust_to_touch_valid_area(rect.x, rect.width);
            if width <= 0 {
                break;
            }
            let columns: Vec<i32> = if right_to_left {
                (left..left + width).rev().collect()
            } else {
                (left..left + width).collect()
            };

            let mut done_lo = i32::MAX;
            let mut done_hi = i32::MIN;
            let mut out_of_time = false;
            for x in columns {
                let colours = self.render_column(&pass, view, x, &mut result.range);
                self.cache.put_column(x, &colours);
                done_lo = done_lo.min(x);
                done_hi = done_hi.max(x);
                if budget.is_some_and(|limit| started.elapsed() >= limit) {
                    out_of_time = true;
                    break;
                }
            }

            if done_hi >= done_lo {
                self.cache.mark_valid(done_lo, done_hi - done_lo + 1);
                let span = Rect::new(done_lo, 0, done_hi - done_lo + 1, h);
                result.rendered = result.rendered.united(&span);
            }
            debug!(
                "Renderer: {} of {} columns in {:?} (budget {:?})",
                done_hi - done_lo + 1,
                width,
                started.elapsed(),
                budget
            );
            if out_of_time {
                break;
            }
        }

        result.painted = self.cache.copy_to(target, rect);
        result
    }

    fn render_column(&self, pass: &Pass, view: &dyn View, x: i32, range: &mut MagnitudeRange) -> Vec<Rgba<u8>> {
        let h = pass.rows.len();
        let mut colours = vec![pass.background; h];

        let Some((c0, c1)) = column_range(pass.fft, view, x) else {
            return colours;
        };

        let values = if self.params.colour_scale.scale() == ColourScaleType::Phase {
            self.phase_values(pass, c0, c1)
        } else if self.use_peak_cache(pass, c0, c1) {
            self.peak_cache_values(pass, c0, c1)
        } else {
            self.magnitude_values(pass, c0, c1)
        };

        let scale = &self.params.colour_scale;
        let is_phase = scale.scale() == ColourScaleType::Phase;
        for (y, value) in values.into_iter().enumerate() {
            let Some(mut v) = value else {
                continue;
            };
            if !is_phase {
                range.sample(v);
                if self.params.normalize_visible_area {
                    if let Some(max) = self.visible_max.filter(|m| *m > 0.0) {
                        v /= max;
                    }
                }
            }
            colours[y] = scale.colour(v as f64);
        }
        colours
    }

    fn use_peak_cache(&self, pass: &Pass, c0: usize, c1: usize) -> bool {
        let Some(peaks) = pass.peaks else {
            return false;
        };
        if self.params.bin_display == BinDisplay::PeakFrequencies
            || self.params.normalization != ColumnNormalization::None
        {
            return false;
        }
        let divisor = peaks.divisor();
        if c1 + 1 - c0 < divisor {
            return false;
        }
        // Rows are uniform under a linear scale; under log, look at the
        // narrowest (bottom) row.
        let bins_per_row = pass
            .rows
            .iter()
            .flatten()
            .map(|(q0, q1)| q1 - q0)
            .fold(f64::INFINITY, f64::min);
        bins_per_row >= divisor as f64
    }

    /// Scaled, per-column normalized magnitudes of model column `c`.
    fn prepared_column(&self, pass: &Pass, c: usize) -> Option<Vec<f32>> {
        let mags = pass.fft.column_magnitudes(c)?;
        let factor = self.params.scale_factor as f32;
        let mut column: Vec<f32> = mags.iter().map(|m| m * factor).collect();
        self.params.normalization.normalize(&mut column);
        Some(column)
    }

    fn magnitude_values(&self, pass: &Pass, c0: usize, c1: usize) -> Vec<Option<f32>> {
        let h = pass.rows.len();
        let mut values: Vec<Option<f32>> = vec![None; h];
        let height = pass.fft.height();

        for c in c0..=c1 {
            let Some(column) = self.prepared_column(pass, c) else {
                continue;
            };

            if self.params.bin_display == BinDisplay::PeakFrequencies {
                self.place_peak_frequencies(pass, c, &column, &mut values);
                continue;
            }

            for (y, row) in pass.rows.iter().enumerate() {
                let Some((q0, q1)) = *row else {
                    continue;
                };
                let Some((b0, b1)) = bin_span(q0, q1, height) else {
                    continue;
                };
                let v = match self.params.bin_display {
                    BinDisplay::AllBins => {
                        if self.params.interpolate && q1 - q0 < 1.0 {
                            interpolate(&column, (q0 + q1) / 2.0)
                        } else {
                            column[b0..=b1].iter().fold(0.0f32, |m, &v| m.max(v))
                        }
                    }
                    _ => (b0..=b1)
                        .filter(|&b| is_peak_in(&column, b))
                        .map(|b| column[b])
                        .fold(0.0f32, f32::max),
                };
                let slot = &mut values[y];
                *slot = Some(slot.map_or(v, |old| old.max(v)));
            }
        }

        // Rows with no peak placed on them read as silence
        if self.params.bin_display == BinDisplay::PeakFrequencies {
            for (value, row) in values.iter_mut().zip(&pass.rows) {
                if row.is_some() && value.is_none() {
                    *value = Some(0.0);
                }
            }
        }
        values
    }

    /// Draw each local peak over threshold at the row of its refined frequency.
    fn place_peak_frequencies(&self, pass: &Pass, c: usize, column: &[f32], values: &mut [Option<f32>]) {
        let threshold = self.params.colour_scale.params().threshold;
        let factor = self.params.scale_factor;
        let h = values.len() as f64;
        for bin in 1..column.len().saturating_sub(1) {
            if !is_peak_in(column, bin) {
                continue;
            }
            let raw = pass.fft.magnitude_at(c, bin) as f64 * factor;
            if raw <= threshold {
                continue;
            }
            let frequency = pass
                .fft
                .estimate_stable_frequency(c, bin)
                .unwrap_or_else(|| pass.fft.bin_frequency(bin as f64));
            let y = pass.bins.y_for_frequency(frequency);
            if y < 0.0 || y >= h {
                continue;
            }
            let slot = &mut values[y as usize];
            let v = column[bin];
            *slot = Some(slot.map_or(v, |old| old.max(v)));
        }
    }

    fn peak_cache_values(&self, pass: &Pass, c0: usize, c1: usize) -> Vec<Option<f32>> {
        let Some(peaks) = pass.peaks else {
            return vec![None; pass.rows.len()];
        };
        let divisor = peaks.divisor();
        let height = pass.fft.height();
        let factor = self.params.scale_factor as f32;
        pass.rows
            .iter()
            .map(|row| {
                let (q0, q1) = (*row)?;
                let (b0, b1) = bin_span(q0, q1, height)?;
                let mut peak = 0.0f32;
                for bx in c0 / divisor..=c1 / divisor {
                    for by in b0 / divisor..=b1 / divisor {
                        peak = peak.max(peaks.block_peak(pass.fft, bx, by));
                    }
                }
                Some(peak * factor)
            })
            .collect()
    }

    /// Phase of the strongest bin under each row, from the first covered column.
    fn phase_values(&self, pass: &Pass, c0: usize, _c1: usize) -> Vec<Option<f32>> {
        let height = pass.fft.height();
        let (Some(mags), Some(phases)) = (pass.fft.column_magnitudes(c0), pass.fft.column_phases(c0)) else {
            return vec![None; pass.rows.len()];
        };
        pass.rows
            .iter()
            .map(|row| {
                let (q0, q1) = (*row)?;
                let (b0, b1) = bin_span(q0, q1, height)?;
                let strongest = (b0..=b1).fold(b0, |best, b| if mags[b] > mags[best] { b } else { best });
                Some(phases[strongest])
            })
            .collect()
    }
}

/// Model columns covered by pixel column `x`, or `None` outside the model.
pub(crate) fn column_range(fft: &FftModel, view: &dyn View, x: i32) -> Option<(usize, usize)> {
    let (s0, s1) = x_bin_range(fft, view, x)?;
    let width = fft.width();
    if width == 0 {
        return None;
    }
    let c0 = (s0 + 0.001).floor().max(0.0) as usize;
    let c1 = (s1.floor().max(0.0) as usize).max(c0);
    if c0 >= width {
        return None;
    }
    Some((c0, c1.min(width - 1)))
}

/// Fractional model-column range covered by pixel column `x`.
pub(crate) fn x_bin_range(fft: &FftModel, view: &dyn View, x: i32) -> Option<(f64, f64)> {
    let start = fft.start_frame();
    let extent = fft.width().saturating_sub(1) as i64 * fft.window_increment() as i64;
    let f0 = view.frame_for_x(x) - start;
    let f1 = view.frame_for_x(x + 1) - start - 1;
    if f1 < 0 || f0 > extent {
        return None;
    }
    let hop = fft.window_increment() as f64;
    Some((f0 as f64 / hop, f1 as f64 / hop))
}

/// Integer bins covered by a fractional bin range, clipped to the model.
fn bin_span(q0: f64, q1: f64, height: usize) -> Option<(usize, usize)> {
    let b0 = (q0 + 0.001).floor();
    let b1 = q1.floor().max(b0);
    if b1 < 0.0 || b0 >= height as f64 {
        return None;
    }
    let b0 = b0.max(0.0) as usize;
    let b1 = (b1 as usize).min(height - 1);
    Some((b0, b1))
}

fn interpolate(column: &[f32], bin: f64) -> f32 {
    if column.is_empty() {
        return 0.0;
    }
    let bin = bin.clamp(0.0, (column.len() - 1) as f64);
    let lo = bin.floor() as usize;
    let hi = (lo + 1).min(column.len() - 1);
    let frac = (bin - lo as f64) as f32;
    column[lo] * (1.0 - frac) + column[hi] * frac
}
