// tests/render_test.rs
//
// Painting through the layer: time-constrained passes, cache reuse on
// scroll, and normalization to the visible area.

mod test_utils;

use image::RgbaImage;
use spectrolayer::config::Configuration;
use spectrolayer::core::{BinScale, ColumnNormalization, Rect, View};
use spectrolayer::layer::SpectrogramLayer;
use test_utils::*;

fn zero_budget_config() -> Configuration {
    let mut config = Configuration::default();
    config.tunables.time_budget_ms = 0;
    config
}

#[test]
fn test_zero_budget_renders_one_column_per_pass() {
    let source = chirp(200.0, 3000.0, 8000, 1.0);
    let source = test_utils::source(source, 8000);
    let view = full_view(1, &source, 64, 32);
    let mut layer = layer_with(zero_budget_config(), source);

    let mut target = RgbaImage::new(64, 32);
    let result = layer.paint(&view, &mut target, view.paint_rect());
    assert_eq!(result.rendered.width, 1);
    assert_eq!(result.painted.width, 1);

    let requests = view.take_repaint_requests();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].is_empty());
    assert_eq!(requests[0].width, 63);

    let result = layer.paint(&view, &mut target, requests[0]);
    assert_eq!(result.rendered.width, 1);
}

#[test]
fn test_incremental_passes_match_synchronous_render() {
    let samples = chirp(200.0, 3000.0, 8000, 1.0);
    let source = test_utils::source(samples, 8000);
    let view = full_view(1, &source, 64, 32);

    let mut reference = layer_with(Configuration::default(), source.clone());
    let expected = reference.render_image(&view);

    let mut layer = layer_with(zero_budget_config(), source);
    let mut target = RgbaImage::new(64, 32);
    let mut rect = view.paint_rect();
    let mut passes = 0;
    loop {
        layer.paint(&view, &mut target, rect);
        passes += 1;
        match view.take_repaint_requests().pop() {
            Some(next) => rect = next,
            None => break,
        }
        assert!(passes <= 64, "painting made no progress");
    }

    assert_eq!(passes, 64);
    for (x, y, pixel) in expected.enumerate_pixels() {
        assert_eq!(target.get_pixel(x, y), pixel, "pixel ({}, {})", x, y);
    }
}

#[test]
fn test_scroll_reuses_cached_columns() {
    let source = sine_source(1000.0, 8000, 2.0);
    let mut view = full_view(1, &source, 64, 32);
    view.set_zoom_level(100);
    let mut layer = layer_with(Configuration::default(), source);
    layer.set_synchronous_painting(true);

    let mut target = RgbaImage::new(64, 32);
    let result = layer.paint(&view, &mut target, view.paint_rect());
    assert_eq!(result.rendered.width, 64);

    // Repainting the same geometry renders nothing
    let result = layer.paint(&view, &mut target, view.paint_rect());
    assert!(result.rendered.is_empty());
    assert_eq!(result.painted.width, 64);

    view.set_start_frame(view.start_frame() + 10 * 100);
    let result = layer.paint(&view, &mut target, view.paint_rect());
    assert_eq!(result.rendered, Rect::new(54, 0, 10, 32));

    // A zoom change discards the cache
    view.set_zoom_level(50);
    let result = layer.paint(&view, &mut target, view.paint_rect());
    assert_eq!(result.rendered.width, 64);
}

#[test]
fn test_parameter_change_drops_view_cache() {
    let source = sine_source(1000.0, 8000, 1.0);
    let view = full_view(7, &source, 32, 16);
    let mut layer = layer_with(Configuration::default(), source);
    layer.set_synchronous_painting(true);

    let mut target = RgbaImage::new(32, 16);
    layer.paint(&view, &mut target, view.paint_rect());
    assert!(layer.has_renderer(view.id()));

    layer.set_colour_rotation(64);
    assert!(!layer.has_renderer(view.id()));
    let result = layer.paint(&view, &mut target, view.paint_rect());
    assert_eq!(result.rendered.width, 32);
    assert_eq!(layer.fft_model_builds(), 1);
}

#[test]
fn test_magnitude_range_tracked_per_view() {
    let source = sine_source(1000.0, 8000, 1.0);
    let view = full_view(3, &source, 32, 16);
    let mut layer = layer_with(Configuration::default(), source);

    assert!(layer.magnitude_range(view.id()).is_none());
    layer.render_image(&view);
    let range = layer.magnitude_range(view.id()).unwrap();
    assert!(range.is_set());
    assert!(range.max() > range.min());
}

#[test]
fn test_visible_area_normalization_brightens_quiet_signal() {
    let quiet = test_utils::source(sine(1000.0, 8000, 1.0, 0.01), 8000);
    let view = full_view(1, &quiet, 32, 64);

    let mut plain = layer_with(Configuration::default(), quiet.clone());
    let plain_image = plain.render_image(&view);

    let mut normalized = layer_with(Configuration::default(), quiet);
    normalized.set_normalize_visible_area(true);
    let normalized_image = normalized.render_image(&view);

    assert_ne!(plain_image, normalized_image);
    assert_eq!(normalized.normalization(), ColumnNormalization::None);
}

#[test]
fn test_log_bin_mapper_is_monotonic() {
    let source = sine_source(440.0, 44100, 0.2);
    let view = full_view(1, &source, 16, 200);
    let mut layer = layer_with(Configuration::default(), source);
    layer.set_bin_scale(BinScale::Log);

    let mapper = layer.bin_mapper(&view).unwrap();
    let mut previous = f64::INFINITY;
    for y in 0..200 {
        let (low, high) = mapper.y_bin_range(y).unwrap();
        assert!(low < high);
        assert!(low < previous);
        previous = low;
    }
    assert!(mapper.y_bin_range(200).is_none());

    let bin = mapper.bin_for_y(mapper.y_for_bin(100.0));
    assert!((bin - 100.0).abs() < 1e-6);
}

#[test]
fn test_paint_without_source_is_empty() {
    let mut layer = SpectrogramLayer::default();
    let view = spectrolayer::core::OffscreenView::new(1, 16, 16, 64);
    let mut target = RgbaImage::new(16, 16);
    let result = layer.paint(&view, &mut target, view.paint_rect());
    assert!(result.rendered.is_empty());
    assert!(result.painted.is_empty());
}

fn painted_layer(view: &spectrolayer::core::OffscreenView) -> SpectrogramLayer {
    let mut layer = layer_with(Configuration::default(), sine_source(1000.0, 8000, 1.0));
    layer.render_image(view);
    assert!(layer.has_renderer(view.id()));
    assert!(layer.magnitude_range(view.id()).is_some());
    assert!(layer.fft_model().is_some());
    layer
}

#[test]
fn test_gain_drops_renderers_but_keeps_model() {
    let view = full_view(2, &sine_source(1000.0, 8000, 1.0), 32, 16);
    let mut layer = painted_layer(&view);

    layer.set_gain(3.0);
    assert!(!layer.has_renderer(view.id()));
    assert!(layer.fft_model().is_some());
    assert!(layer.magnitude_range(view.id()).is_some());
}

#[test]
fn test_window_size_drops_renderers_and_model() {
    let view = full_view(2, &sine_source(1000.0, 8000, 1.0), 32, 16);
    let mut layer = painted_layer(&view);

    layer.set_window_size(512);
    assert!(!layer.has_renderer(view.id()));
    assert!(layer.fft_model().is_none());

    layer.render_image(&view);
    assert_eq!(layer.fft_model().unwrap().window_size(), 512);
    assert_eq!(layer.fft_model_builds(), 2);
}

#[test]
fn test_frequency_bounds_and_normalization_clear_magnitudes() {
    let view = full_view(2, &sine_source(1000.0, 8000, 1.0), 32, 16);

    let mut layer = painted_layer(&view);
    layer.set_min_frequency(100);
    assert!(layer.magnitude_range(view.id()).is_none());
    assert!(!layer.has_renderer(view.id()));
    assert!(layer.fft_model().is_some());

    let mut layer = painted_layer(&view);
    layer.set_max_frequency(3000);
    assert!(layer.magnitude_range(view.id()).is_none());

    let mut layer = painted_layer(&view);
    layer.set_normalization(ColumnNormalization::Max1);
    assert!(layer.magnitude_range(view.id()).is_none());
    assert!(!layer.has_renderer(view.id()));
    assert!(layer.fft_model().is_some());
}

#[test]
fn test_straddling_request_extends_valid_area() {
    let samples = chirp(200.0, 3000.0, 8000, 1.0);
    let source = test_utils::source(samples, 8000);
    let view = full_view(4, &source, 64, 32);
    let expected = layer_with(Configuration::default(), source.clone()).render_image(&view);

    let mut layer = layer_with(zero_budget_config(), source);
    let mut target = RgbaImage::new(64, 32);
    layer.set_synchronous_painting(true);
    let result = layer.paint(&view, &mut target, Rect::new(20, 0, 20, 32));
    assert_eq!(result.rendered, Rect::new(20, 0, 20, 32));

    // The right gap is wider, so the one budgeted column lands next to it
    layer.set_synchronous_painting(false);
    let result = layer.paint(&view, &mut target, view.paint_rect());
    assert_eq!(result.rendered, Rect::new(40, 0, 1, 32));
    assert_eq!(result.painted, Rect::new(20, 0, 21, 32));

    layer.set_synchronous_painting(true);
    let result = layer.paint(&view, &mut target, view.paint_rect());
    assert_eq!(result.rendered, Rect::new(0, 0, 64, 32));
    assert_eq!(result.painted, Rect::new(0, 0, 64, 32));
    for (x, y, pixel) in expected.enumerate_pixels() {
        assert_eq!(target.get_pixel(x, y), pixel, "pixel ({}, {})", x, y);
    }
}
