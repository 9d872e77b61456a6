// src/layer/spectrogram.rs
//
// Spectrogram layer: owns the configuration, the live transform model and
// peak cache, and one renderer per attached view.

use image::{Rgba, RgbaImage};
use log::{debug, error, trace, warn};
use std::collections::{HashMap, HashSet};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

use super::features::SnapType;
use super::session::Attributes;
use super::{EventBus, Layer, LayerEvent, PropertyRange};
use crate::config::{is_valid_window_size, Configuration, Preferences};
use crate::core::audio::{AudioSource, Frame, SourceChange};
use crate::core::colour::{ColourMap, ColourScale, ColourScaleParams, ColourScaleType};
use crate::core::dsp::WindowType;
use crate::core::model::{FftModel, FftModelKey, PeakCache};
use crate::core::normalization::{ColumnNormalization, MagnitudeRange};
use crate::core::render::{BinDisplay, RenderParameters, RenderResult, Renderer, Sources};
use crate::core::scale::{BinMapper, BinScale, RangeMapper, SpectrogramRangeMapper};
use crate::core::view::{Rect, View, ViewId};

/// The live transform model with the peak cache built over it.
///
/// Both are created and dropped together.
struct Transform {
    model: FftModel,
    peaks: PeakCache,
}

/// Time-frequency display of one channel of an audio source.
///
/// Every setter is a no-op when the value is unchanged. Otherwise it drops
/// exactly the derived state that depends on the field, applies the value
/// and publishes [`LayerEvent::ParametersChanged`]. The transform model is
/// rebuilt lazily, the next time it is asked for with a different key.
pub struct SpectrogramLayer {
    pub(super) config: Configuration,
    pub(super) preferences: Preferences,
    pub(super) source: Option<Arc<dyn AudioSource>>,
    source_generation: u64,
    transform: Option<Transform>,
    transform_builds: u64,
    error: Option<String>,
    failed_key: Option<FftModelKey>,
    renderers: HashMap<ViewId, Renderer>,
    view_mags: HashMap<ViewId, MagnitudeRange>,
    dormant: HashSet<ViewId>,
    last_emitted_zoom_step: Option<i32>,
    synchronous: bool,
    pub(super) events: EventBus,
}

impl SpectrogramLayer {
    pub fn new(config: Configuration) -> Self {
        Self::with_preferences(config, Preferences::default())
    }

    pub fn with_preferences(config: Configuration, preferences: Preferences) -> Self {
        let mut config = config;
        config.window_type = preferences.window_type;
        Self {
            config,
            preferences,
            source: None,
            source_generation: 0,
            transform: None,
            transform_builds: 0,
            error: None,
            failed_key: None,
            renderers: HashMap::new(),
            view_mags: HashMap::new(),
            dormant: HashSet::new(),
            last_emitted_zoom_step: None,
            synchronous: false,
            events: EventBus::new(),
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    // ---- source -------------------------------------------------------

    /// Attach a source, or detach with `None`.
    pub fn set_source(&mut self, source: Option<Arc<dyn AudioSource>>) {
        let same = match (&self.source, &source) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        if same {
            return;
        }
        self.source = source;
        self.source_generation += 1;
        self.invalidate_renderers();
        self.invalidate_magnitudes();
        self.invalidate_fft_model();
        self.events.publish(LayerEvent::ModelReplaced);
    }

    pub fn source(&self) -> Option<&Arc<dyn AudioSource>> {
        self.source.as_ref()
    }

    /// React to a change notification from the attached source.
    ///
    /// Both kinds of change drop every cache; per-range invalidation is not
    /// attempted.
    pub fn source_changed(&mut self, change: SourceChange) {
        if self.source.is_none() {
            return;
        }
        match change {
            SourceChange::Replaced => debug!("SpectrogramLayer: source replaced"),
            SourceChange::ChangedWithin { start, end } => {
                debug!("SpectrogramLayer: source changed within {}..{}", start, end)
            }
        }
        self.source_generation += 1;
        self.invalidate_renderers();
        self.invalidate_magnitudes();
        self.invalidate_fft_model();
        self.events.publish(LayerEvent::ModelReplaced);
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.source.as_ref().map(|s| s.sample_rate())
    }

    pub(super) fn source_ready(&self) -> bool {
        self.source.as_ref().is_some_and(|s| s.is_ready())
    }

    // ---- notifications --------------------------------------------------

    pub fn subscribe(&mut self) -> Receiver<LayerEvent> {
        self.events.subscribe()
    }

    fn parameters_changed(&mut self) {
        self.events.publish(LayerEvent::ParametersChanged);
    }

    /// Publish `VerticalZoomChanged` if the current step moved since the
    /// last time it was published.
    pub(super) fn check_vertical_zoom(&mut self) {
        if self.source.is_none() {
            return;
        }
        let step = self.current_vertical_zoom_step();
        if self.last_emitted_zoom_step != Some(step) {
            self.last_emitted_zoom_step = Some(step);
            self.events.publish(LayerEvent::VerticalZoomChanged);
        }
    }

    // ---- invalidation ---------------------------------------------------

    fn invalidate_renderers(&mut self) {
        if !self.renderers.is_empty() {
            debug!("SpectrogramLayer: dropping {} renderers", self.renderers.len());
        }
        self.renderers.clear();
    }

    fn invalidate_magnitudes(&mut self) {
        self.view_mags.clear();
    }

    fn invalidate_fft_model(&mut self) {
        self.error = None;
        self.failed_key = None;
        if self.transform.take().is_some() {
            debug!("SpectrogramLayer: transform model discarded");
            self.events.publish(LayerEvent::SliceableModelReplaced);
        }
    }

    // ---- configuration --------------------------------------------------

    pub fn channel(&self) -> i32 {
        self.config.channel
    }

    pub fn set_channel(&mut self, channel: i32) {
        if self.config.channel == channel {
            return;
        }
        self.invalidate_renderers();
        self.config.channel = channel;
        self.invalidate_fft_model();
        self.parameters_changed();
    }

    pub fn window_size(&self) -> usize {
        self.config.window_size
    }

    /// Sizes that are not a power of two in 32..=32768 are ignored.
    pub fn set_window_size(&mut self, size: usize) {
        if self.config.window_size == size {
            return;
        }
        if !is_valid_window_size(size) {
            warn!("Ignoring unsupported window size {}", size);
            return;
        }
        self.invalidate_renderers();
        self.config.window_size = size;
        self.invalidate_fft_model();
        self.parameters_changed();
    }

    pub fn window_hop_level(&self) -> u32 {
        self.config.window_hop_level
    }

    pub fn set_window_hop_level(&mut self, level: u32) {
        let level = level.min(5);
        if self.config.window_hop_level == level {
            return;
        }
        self.invalidate_renderers();
        self.config.window_hop_level = level;
        self.invalidate_fft_model();
        self.parameters_changed();
    }

    pub fn window_type(&self) -> WindowType {
        self.config.window_type
    }

    pub fn set_window_type(&mut self, window_type: WindowType) {
        if self.config.window_type == window_type {
            return;
        }
        self.invalidate_renderers();
        self.config.window_type = window_type;
        self.invalidate_fft_model();
        self.parameters_changed();
    }

    pub fn gain(&self) -> f32 {
        self.config.gain
    }

    pub fn set_gain(&mut self, gain: f32) {
        if self.config.gain == gain {
            return;
        }
        self.invalidate_renderers();
        self.config.gain = gain;
        self.parameters_changed();
    }

    pub fn threshold(&self) -> f32 {
        self.config.threshold
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        if self.config.threshold == threshold {
            return;
        }
        self.invalidate_renderers();
        self.config.threshold = threshold;
        self.parameters_changed();
    }

    pub fn min_frequency(&self) -> i32 {
        self.config.min_frequency
    }

    pub fn set_min_frequency(&mut self, frequency: i32) {
        if self.config.min_frequency == frequency {
            return;
        }
        self.invalidate_renderers();
        self.invalidate_magnitudes();
        self.config.min_frequency = frequency;
        self.parameters_changed();
        self.check_vertical_zoom();
    }

    pub fn max_frequency(&self) -> i32 {
        self.config.max_frequency
    }

    pub fn set_max_frequency(&mut self, frequency: i32) {
        if self.config.max_frequency == frequency {
            return;
        }
        self.invalidate_renderers();
        self.invalidate_magnitudes();
        self.config.max_frequency = frequency;
        self.parameters_changed();
        self.check_vertical_zoom();
    }

    pub fn colour_rotation(&self) -> i32 {
        self.config.colour_rotation
    }

    /// Rotation is clamped to `0..=256`.
    pub fn set_colour_rotation(&mut self, rotation: i32) {
        let rotation = rotation.clamp(0, 256);
        if self.config.colour_rotation == rotation {
            return;
        }
        self.invalidate_renderers();
        self.config.colour_rotation = rotation;
        self.parameters_changed();
    }

    pub fn colour_scale(&self) -> ColourScaleType {
        self.config.colour_scale
    }

    pub fn set_colour_scale(&mut self, scale: ColourScaleType) {
        if self.config.colour_scale == scale {
            return;
        }
        self.invalidate_renderers();
        self.config.colour_scale = scale;
        self.parameters_changed();
    }

    pub fn colour_map(&self) -> ColourMap {
        self.config.colour_map
    }

    pub fn set_colour_map(&mut self, map: ColourMap) {
        if self.config.colour_map == map {
            return;
        }
        self.invalidate_renderers();
        self.config.colour_map = map;
        self.parameters_changed();
    }

    pub fn bin_scale(&self) -> BinScale {
        self.config.bin_scale
    }

    pub fn set_bin_scale(&mut self, scale: BinScale) {
        if self.config.bin_scale == scale {
            return;
        }
        self.invalidate_renderers();
        self.config.bin_scale = scale;
        self.parameters_changed();
    }

    pub fn bin_display(&self) -> BinDisplay {
        self.config.bin_display
    }

    pub fn set_bin_display(&mut self, display: BinDisplay) {
        if self.config.bin_display == display {
            return;
        }
        self.invalidate_renderers();
        self.config.bin_display = display;
        self.parameters_changed();
    }

    pub fn normalization(&self) -> ColumnNormalization {
        self.config.normalization
    }

    pub fn set_normalization(&mut self, normalization: ColumnNormalization) {
        if self.config.normalization == normalization {
            return;
        }
        self.invalidate_renderers();
        self.invalidate_magnitudes();
        self.config.normalization = normalization;
        self.parameters_changed();
    }

    pub fn normalize_visible_area(&self) -> bool {
        self.config.normalize_visible_area
    }

    pub fn set_normalize_visible_area(&mut self, normalize: bool) {
        if self.config.normalize_visible_area == normalize {
            return;
        }
        self.invalidate_renderers();
        self.invalidate_magnitudes();
        self.config.normalize_visible_area = normalize;
        self.parameters_changed();
    }

    /// Apply changed preferences: a new window type goes through its
    /// setter, a new smoothing mode rebuilds everything derived.
    pub fn set_preferences(&mut self, preferences: Preferences) {
        let old = self.preferences;
        self.preferences = preferences;
        if old.window_type != preferences.window_type {
            self.set_window_type(preferences.window_type);
        }
        if old.smoothing != preferences.smoothing {
            self.invalidate_fft_model();
            self.invalidate_renderers();
            self.invalidate_magnitudes();
            self.parameters_changed();
        }
    }

    /// Paint with `render` (true) or `render_time_constrained` (false).
    pub fn set_synchronous_painting(&mut self, synchronous: bool) {
        self.synchronous = synchronous;
    }

    pub fn synchronous_painting(&self) -> bool {
        self.synchronous
    }

    pub fn has_light_background(&self) -> bool {
        self.config.colour_map.has_light_background()
    }

    // ---- derived sizes --------------------------------------------------

    /// Frames between the starts of consecutive windows.
    pub fn window_increment(&self) -> usize {
        let ws = self.config.window_size;
        match self.config.window_hop_level {
            0 => ws,
            1 => (ws * 3) / 4,
            n => (ws >> (n - 1)).max(1),
        }
    }

    pub fn fft_oversampling(&self) -> usize {
        if self.config.bin_display != BinDisplay::AllBins {
            return 1;
        }
        if self.preferences.smoothing.zero_padded() {
            4
        } else {
            1
        }
    }

    pub fn fft_size(&self) -> usize {
        self.config.window_size * self.fft_oversampling()
    }

    /// Min frequency quantised to a bin; bin 1 when unset.
    pub fn effective_min_frequency(&self) -> f64 {
        let Some(sr) = self.sample_rate() else {
            return self.config.min_frequency as f64;
        };
        let sr = sr as f64;
        let fft_size = self.fft_size() as f64;
        if self.config.min_frequency > 0 {
            let bin = ((self.config.min_frequency as f64 * fft_size) / sr + 0.01) as i64;
            bin.max(1) as f64 * sr / fft_size
        } else {
            sr / fft_size
        }
    }

    /// Max frequency quantised to a bin; Nyquist when unset.
    pub fn effective_max_frequency(&self) -> f64 {
        let Some(sr) = self.sample_rate() else {
            return self.config.max_frequency as f64;
        };
        let sr = sr as f64;
        let fft_size = self.fft_size();
        if self.config.max_frequency > 0 {
            let bin = ((self.config.max_frequency as f64 * fft_size as f64) / sr + 0.1) as i64;
            bin.min(fft_size as i64 / 2) as f64 * sr / fft_size as f64
        } else {
            sr / 2.0
        }
    }

    /// Row/bin mapper for a view's current height.
    pub fn bin_mapper(&self, view: &dyn View) -> Option<BinMapper> {
        let sr = self.sample_rate()?;
        Some(BinMapper::new(
            sr,
            self.fft_size(),
            self.effective_min_frequency(),
            self.effective_max_frequency(),
            self.config.bin_scale,
            view.paint_height(),
        ))
    }

    // ---- vertical zoom ----------------------------------------------------

    /// Number of zoom steps and the step matching the initial max frequency.
    pub fn vertical_zoom_steps(&self) -> Option<(i32, i32)> {
        let sr = self.sample_rate()?;
        let mapper = SpectrogramRangeMapper::new(sr);
        let max_step = mapper.position_for_value(0.0);
        let min_step = mapper.position_for_value(sr as f64 / 2.0);
        let initial_max = if self.config.initial_max_frequency == 0 {
            (sr / 2) as f64
        } else {
            self.config.initial_max_frequency as f64
        };
        let default_step = mapper.position_for_value(initial_max) - min_step;
        Some((max_step - min_step, default_step))
    }

    pub fn current_vertical_zoom_step(&self) -> i32 {
        let Some(sr) = self.sample_rate() else {
            return 0;
        };
        let (min, max) = self.display_extents();
        SpectrogramRangeMapper::new(sr).position_for_value(max - min)
    }

    /// Zoom so the visible span matches `step`, keeping the midpoint
    /// (geometric midpoint on a log axis), clamped to DC..Nyquist.
    pub fn set_vertical_zoom_step(&mut self, step: i32) {
        let Some(sr) = self.sample_rate() else {
            return;
        };
        if step == self.current_vertical_zoom_step() {
            return;
        }

        let (dmin, dmax) = self.display_extents();
        let mapper = SpectrogramRangeMapper::new(sr);
        let newdist = mapper.value_for_position(step);

        let (mut newmin, mut newmax) = if self.config.bin_scale == BinScale::Log {
            let newmax = (newdist + (newdist * newdist + 4.0 * dmin * dmax).sqrt()) / 2.0;
            (newmax - newdist, newmax)
        } else {
            let dmid = (dmax + dmin) / 2.0;
            (dmid - newdist / 2.0, dmid + newdist / 2.0)
        };

        let nyquist = sr as f64 / 2.0;
        if newmin < 0.0 {
            newmax += -newmin;
            newmin = 0.0;
        }
        if newmax > nyquist {
            newmax = nyquist;
        }

        debug!(
            "SpectrogramLayer::set_vertical_zoom_step: {}: {:.1} -> {:.1} (span {:.1})",
            step, newmin, newmax, newdist
        );
        self.set_min_frequency(newmin.round() as i32);
        self.set_max_frequency(newmax.round() as i32);
    }

    pub fn vertical_zoom_mapper(&self) -> Option<SpectrogramRangeMapper> {
        self.sample_rate().map(SpectrogramRangeMapper::new)
    }

    // ---- display extents ------------------------------------------------

    pub fn display_extents(&self) -> (f64, f64) {
        (self.effective_min_frequency(), self.effective_max_frequency())
    }

    /// Set both frequency bounds at once. Returns false with no source.
    pub fn set_display_extents(&mut self, min: f64, max: f64) -> bool {
        let Some(sr) = self.sample_rate() else {
            return false;
        };
        let min = min.max(0.0);
        let max = max.min(sr as f64 / 2.0);
        let minf = min.round() as i32;
        let maxf = max.round() as i32;
        if self.config.min_frequency == minf && self.config.max_frequency == maxf {
            return true;
        }
        self.invalidate_renderers();
        self.invalidate_magnitudes();
        self.config.min_frequency = minf;
        self.config.max_frequency = maxf;
        self.parameters_changed();
        self.check_vertical_zoom();
        true
    }

    // ---- transform model --------------------------------------------------

    fn model_key(&self) -> FftModelKey {
        FftModelKey {
            source_generation: self.source_generation,
            channel: self.config.channel,
            window_type: self.config.window_type,
            window_size: self.config.window_size,
            hop_size: self.window_increment(),
            fft_size: self.fft_size(),
        }
    }

    /// Build the transform model if the live one is missing or stale.
    /// Returns whether a usable model is now present.
    fn ensure_transform(&mut self) -> bool {
        let Some(source) = self.source.clone() else {
            return false;
        };
        if !source.is_ready() {
            return false;
        }
        let key = self.model_key();
        if let Some(transform) = &self.transform {
            if *transform.model.key() == key {
                return true;
            }
        }
        if self.failed_key == Some(key) {
            return false;
        }
        if self.transform.take().is_some() {
            trace!("SpectrogramLayer: transform key changed, rebuilding");
        }

        let tunables = self.config.tunables;
        match FftModel::new(source, key, tunables.memory_limit_bytes) {
            Ok(model) => {
                if tunables.background_fill {
                    model.start_background_fill();
                }
                let peaks = PeakCache::new(&model, tunables.peak_divisor);
                self.transform = Some(Transform { model, peaks });
                self.transform_builds += 1;
                self.error = None;
                self.failed_key = None;
                debug!(
                    "SpectrogramLayer: transform model built (window {}, hop {}, fft {})",
                    key.window_size, key.hop_size, key.fft_size
                );
                self.events.publish(LayerEvent::SliceableModelReplaced);
                true
            }
            Err(e) => {
                let message = format!("Failed to create the FFT model for this spectrogram: {}", e);
                error!("{}", message);
                self.error = Some(message.clone());
                self.failed_key = Some(key);
                self.events.publish(LayerEvent::TransformFailed(message));
                false
            }
        }
    }

    /// The transform model for the current configuration, built on demand.
    ///
    /// Repeated calls with an unchanged configuration return the same
    /// instance. `None` without a ready source or after a construction
    /// failure, which stays latched until a reconfiguration.
    pub fn get_fft_model(&mut self) -> Option<&FftModel> {
        if !self.ensure_transform() {
            return None;
        }
        self.transform.as_ref().map(|t| &t.model)
    }

    pub fn get_peak_cache(&mut self) -> Option<&PeakCache> {
        if !self.ensure_transform() {
            return None;
        }
        self.transform.as_ref().map(|t| &t.peaks)
    }

    /// The live transform model, without building one.
    pub fn fft_model(&self) -> Option<&FftModel> {
        self.transform.as_ref().map(|t| &t.model)
    }

    /// How many transform models this layer has constructed.
    pub fn fft_model_builds(&self) -> u64 {
        self.transform_builds
    }

    pub fn completion(&self) -> u8 {
        self.fft_model().map_or(100, |m| m.completion())
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    // ---- views --------------------------------------------------------------

    pub fn set_layer_dormant(&mut self, view: ViewId, dormant: bool) {
        if dormant {
            if !self.dormant.insert(view) {
                return;
            }
            debug!("SpectrogramLayer: view {:?} dormant", view);
            self.invalidate_renderers();
        } else {
            self.dormant.remove(&view);
        }
    }

    pub fn is_layer_dormant(&self, view: ViewId) -> bool {
        self.dormant.contains(&view)
    }

    /// Forget all render state held for a view.
    pub fn detach_view(&mut self, view: ViewId) {
        self.renderers.remove(&view);
        self.view_mags.remove(&view);
        self.dormant.remove(&view);
    }

    pub fn has_renderer(&self, view: ViewId) -> bool {
        self.renderers.contains_key(&view)
    }

    pub fn magnitude_range(&self, view: ViewId) -> Option<MagnitudeRange> {
        self.view_mags.get(&view).copied()
    }

    /// Colour a value would be drawn in on `view`, for a colour legend.
    pub fn colour_for_value(&self, view: ViewId, value: f64) -> Rgba<u8> {
        match self.renderers.get(&view) {
            Some(renderer) => renderer.colour_for_value(value),
            None => ColourScale::new(self.colour_scale_params()).colour(value),
        }
    }

    fn colour_scale_params(&self) -> ColourScaleParams {
        let mut params = ColourScaleParams {
            colour_map: self.config.colour_map,
            scale: self.config.colour_scale,
            rotation: self.config.colour_rotation,
            ..Default::default()
        };
        if self.config.colour_scale != ColourScaleType::Phase {
            params.gain = self.config.gain as f64;
            params.threshold = self.config.threshold as f64;
        }
        if self.config.colour_scale == ColourScaleType::Linear
            && self.config.normalization == ColumnNormalization::None
        {
            params.max_value = 0.1;
            if params.max_value <= params.threshold {
                params.max_value = params.threshold + 0.1;
            }
        }
        params
    }

    fn render_parameters(&self) -> RenderParameters {
        let scale_factor = if self.config.colour_scale == ColourScaleType::Phase {
            1.0
        } else {
            2.0 / self.fft_size() as f64
        };
        RenderParameters {
            colour_scale: ColourScale::new(self.colour_scale_params()),
            normalization: self.config.normalization,
            normalize_visible_area: self.config.normalize_visible_area,
            bin_display: self.config.bin_display,
            scale_factor,
            interpolate: self.preferences.smoothing.interpolated(),
        }
    }

    // ---- painting -----------------------------------------------------------

    /// Paint `rect` of `view` into `target`.
    ///
    /// In time-constrained mode a repaint of whatever is still uncached is
    /// requested from the view. Nothing is painted without a ready source
    /// or a usable transform model.
    pub fn paint(&mut self, view: &dyn View, target: &mut RgbaImage, rect: Rect) -> RenderResult {
        if !self.source_ready() {
            return RenderResult::default();
        }
        let id = view.id();
        if self.dormant.remove(&id) {
            debug!("SpectrogramLayer::paint: view {:?} was dormant, waking it", id);
        }
        let Some(bins) = self.bin_mapper(view) else {
            return RenderResult::default();
        };
        if !self.ensure_transform() {
            return RenderResult::default();
        }

        let params = self.render_parameters();
        let budget = Duration::from_millis(self.config.tunables.time_budget_ms);
        let normalize_visible = self.config.normalize_visible_area;
        let synchronous = self.synchronous;

        let Some(transform) = self.transform.as_ref() else {
            return RenderResult::default();
        };
        let sources = Sources {
            fft: Some(&transform.model),
            peaks: Some(&transform.peaks),
            bins,
        };
        let renderer = self
            .renderers
            .entry(id)
            .or_insert_with(|| Renderer::new(params).with_time_budget(budget));

        let mut mag_range = if renderer.geometry_changed(view) {
            MagnitudeRange::default()
        } else {
            self.view_mags.get(&id).copied().unwrap_or_default()
        };

        let result = if synchronous {
            renderer.render(&sources, view, target, rect)
        } else {
            renderer.render_time_constrained(&sources, view, target, rect)
        };
        trace!(
            "SpectrogramLayer::paint: rendered {:?}, range {:?}",
            result.rendered,
            result.range
        );

        mag_range.sample_range(&result.range);

        // Rescale to the visible peak once the whole view has been seen
        if normalize_visible
            && mag_range.is_set()
            && renderer.largest_uncached_rect(view).is_empty()
            && renderer.visible_max() != Some(mag_range.max())
        {
            renderer.set_visible_max(Some(mag_range.max()));
            if synchronous {
                renderer.render(&sources, view, target, rect);
            }
        }

        if !synchronous {
            let uncached = renderer.largest_uncached_rect(view);
            if !uncached.is_empty() {
                view.request_repaint(uncached);
            }
        }

        if mag_range.is_set() && self.view_mags.get(&id) != Some(&mag_range) {
            self.view_mags.insert(id, mag_range);
        }
        result
    }

    /// Render the whole view synchronously into a new image. Whatever the
    /// layer cannot paint keeps the view's background colour.
    pub fn render_image(&mut self, view: &dyn View) -> RgbaImage {
        let width = view.paint_width() as u32;
        let height = view.paint_height() as u32;
        let mut image = RgbaImage::from_pixel(width, height, view.background());
        let was_synchronous = self.synchronous;
        self.synchronous = true;
        self.paint(view, &mut image, Rect::new(0, 0, width as i32, height as i32));
        self.synchronous = was_synchronous;
        image
    }
}

impl Default for SpectrogramLayer {
    fn default() -> Self {
        Self::new(Configuration::default())
    }
}

impl Layer for SpectrogramLayer {
    fn layer_name(&self) -> &str {
        "Spectrogram"
    }

    fn paint(&mut self, view: &dyn View, target: &mut RgbaImage, rect: Rect) -> RenderResult {
        SpectrogramLayer::paint(self, view, target, rect)
    }

    fn property_names(&self) -> Vec<&'static str> {
        self.properties().into_iter().map(|p| p.name()).collect()
    }

    fn property_range_and_value(&self, name: &str) -> Option<PropertyRange> {
        super::Property::from_name(name).map(|p| self.property_range(p))
    }

    fn property_value_label(&self, name: &str, value: i32) -> Option<String> {
        super::Property::from_name(name).map(|p| p.value_label(value))
    }

    fn set_property(&mut self, name: &str, value: i32) -> bool {
        match super::Property::from_name(name) {
            Some(p) => {
                self.set_property_value(p, value);
                true
            }
            None => false,
        }
    }

    fn to_attributes(&self) -> Attributes {
        SpectrogramLayer::to_attributes(self)
    }

    fn set_attributes(&mut self, attributes: &Attributes) {
        SpectrogramLayer::set_attributes(self, attributes)
    }

    fn subscribe(&mut self) -> Receiver<LayerEvent> {
        SpectrogramLayer::subscribe(self)
    }

    fn completion(&self) -> u8 {
        SpectrogramLayer::completion(self)
    }

    fn error(&self) -> Option<&str> {
        SpectrogramLayer::error(self)
    }

    fn set_layer_dormant(&mut self, view: ViewId, dormant: bool) {
        SpectrogramLayer::set_layer_dormant(self, view, dormant)
    }

    fn is_layer_dormant(&self, view: ViewId) -> bool {
        SpectrogramLayer::is_layer_dormant(self, view)
    }

    fn has_light_background(&self) -> bool {
        SpectrogramLayer::has_light_background(self)
    }

    fn snap_to_feature_frame(&self, frame: Frame, snap: SnapType) -> Option<(Frame, usize)> {
        SpectrogramLayer::snap_to_feature_frame(self, frame, snap)
    }

    fn feature_description(&mut self, view: &dyn View, x: i32, y: i32) -> String {
        SpectrogramLayer::feature_description(self, view, x, y)
    }
}
