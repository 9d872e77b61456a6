// tests/layer_test.rs
//
// Layer configuration, lazy model construction and notifications.

mod test_utils;

use spectrolayer::config::{Configuration, ConfigurationBuilder, LayerPreset, Preferences, SpectrogramSmoothing};
use spectrolayer::core::{BinDisplay, ColumnNormalization, FftModel, SourceChange, View};
use spectrolayer::layer::{Layer, LayerEvent, SpectrogramLayer};
use test_utils::*;

#[test]
fn test_default_fft_geometry() {
    let mut layer = layer_with(Configuration::default(), sine_source(440.0, 44100, 1.0));
    assert_eq!(layer.window_increment(), 512);
    assert_eq!(layer.fft_size(), 4096);

    let model = layer.get_fft_model().unwrap();
    assert_eq!(model.height(), 2049);
    assert_eq!(model.window_increment(), 512);
}

#[test]
fn test_peak_bins_scenario() {
    let config = ConfigurationBuilder::from_preset(LayerPreset::Default)
        .bin_display(BinDisplay::PeakBins)
        .build()
        .unwrap();
    let layer = layer_with(config, sine_source(1000.0, 44100, 0.5));

    assert_eq!(layer.window_increment(), 512);
    assert_eq!(layer.fft_size(), 1024);
    let max = layer.effective_max_frequency();
    assert!(max <= 8000.0 && max > 7950.0, "effective max {}", max);
    let min = layer.effective_min_frequency();
    assert!((min - 44100.0 / 1024.0).abs() < 1e-9);
}

#[test]
fn test_model_reused_until_reconfigured() {
    let mut layer = layer_with(Configuration::default(), sine_source(440.0, 8000, 1.0));

    let first = layer.get_fft_model().unwrap() as *const FftModel;
    let second = layer.get_fft_model().unwrap() as *const FftModel;
    assert_eq!(first, second);
    assert_eq!(layer.fft_model_builds(), 1);

    // Display-only parameters keep the model
    layer.set_gain(4.0);
    layer.set_colour_rotation(30);
    layer.set_normalization(ColumnNormalization::Max1);
    layer.get_fft_model().unwrap();
    assert_eq!(layer.fft_model_builds(), 1);

    layer.set_window_size(2048);
    let model = layer.get_fft_model().unwrap();
    assert_eq!(model.window_size(), 2048);
    assert_eq!(layer.fft_model_builds(), 2);

    layer.set_window_hop_level(3);
    layer.get_fft_model().unwrap();
    assert_eq!(layer.fft_model_builds(), 3);
}

#[test]
fn test_smoothing_preference_rebuilds() {
    let mut layer = layer_with(Configuration::default(), sine_source(440.0, 8000, 1.0));
    layer.get_fft_model().unwrap();

    layer.set_preferences(Preferences {
        smoothing: SpectrogramSmoothing::None,
        ..Default::default()
    });
    assert_eq!(layer.fft_size(), 1024);
    assert_eq!(layer.get_fft_model().unwrap().fft_size(), 1024);
    assert_eq!(layer.fft_model_builds(), 2);
}

#[test]
fn test_source_events() {
    let mut layer = SpectrogramLayer::default();
    let rx = layer.subscribe();
    let source = sine_source(440.0, 8000, 0.5);

    layer.set_source(Some(source.clone()));
    assert_eq!(rx.try_recv(), Ok(LayerEvent::ModelReplaced));

    layer.set_source(Some(source));
    assert!(rx.try_recv().is_err());

    layer.get_fft_model().unwrap();
    assert_eq!(rx.try_recv(), Ok(LayerEvent::SliceableModelReplaced));

    layer.source_changed(SourceChange::ChangedWithin { start: 0, end: 100 });
    let events: Vec<_> = rx.try_iter().collect();
    assert!(events.contains(&LayerEvent::ModelReplaced));
    assert!(layer.fft_model().is_none());
}

#[test]
fn test_vertical_zoom_steps() {
    let layer = layer_with(Configuration::default(), sine_source(440.0, 44100, 0.2));
    let (count, default) = layer.vertical_zoom_steps().unwrap();
    assert!(count > 60);
    assert_eq!(default, 6);
}

#[test]
fn test_zoom_to_current_step_is_noop() {
    let mut layer = layer_with(Configuration::default(), sine_source(440.0, 44100, 0.2));
    let rx = layer.subscribe();
    let step = layer.current_vertical_zoom_step();
    let (min, max) = (layer.min_frequency(), layer.max_frequency());

    layer.set_vertical_zoom_step(step);
    assert!(rx.try_recv().is_err());
    assert_eq!((layer.min_frequency(), layer.max_frequency()), (min, max));
}

#[test]
fn test_zoom_in_narrows_span() {
    let mut layer = layer_with(Configuration::default(), sine_source(440.0, 44100, 0.2));
    let rx = layer.subscribe();
    let (min0, max0) = layer.display_extents();
    let step = layer.current_vertical_zoom_step();

    layer.set_vertical_zoom_step(step + 4);
    let (min1, max1) = layer.display_extents();
    assert!(max1 - min1 < max0 - min0);
    assert!(min1 >= 0.0 && max1 <= 22050.0);

    let events: Vec<_> = rx.try_iter().collect();
    assert!(events.contains(&LayerEvent::ParametersChanged));
    assert!(events.contains(&LayerEvent::VerticalZoomChanged));
    assert_ne!(layer.current_vertical_zoom_step(), step);
}

#[test]
fn test_transform_failure_reported_once() {
    let mut config = Configuration::default();
    config.tunables.memory_limit_bytes = 1024;
    let mut layer = SpectrogramLayer::new(config);
    let rx = layer.subscribe();
    layer.set_source(Some(sine_source(440.0, 44100, 2.0)));

    for _ in 0..3 {
        assert!(layer.get_fft_model().is_none());
    }
    assert!(Layer::error(&layer).is_some());
    let failures = rx
        .try_iter()
        .filter(|e| matches!(e, LayerEvent::TransformFailed(_)))
        .count();
    assert_eq!(failures, 1);

    let view = full_view(1, layer.source().unwrap(), 32, 16);
    let mut image = image::RgbaImage::new(32, 16);
    let result = layer.paint(&view, &mut image, view.paint_rect());
    assert!(result.rendered.is_empty());

    let image = layer.render_image(&view);
    assert!(image.pixels().all(|p| *p == view.background()));
}

#[test]
fn test_property_surface() {
    let mut layer = SpectrogramLayer::default();
    let names = layer.property_names();
    assert_eq!(names.first(), Some(&"Colour"));
    assert_eq!(names.last(), Some(&"Frequency Scale"));
    assert!(!names.contains(&"Min Frequency"));

    assert!(layer.set_property("Window Size", 4));
    assert_eq!(layer.window_size(), 512);
    assert!(!layer.set_property("Volume", 3));

    let range = layer.property_range_and_value("Window Increment").unwrap();
    assert_eq!((range.min, range.max, range.default, range.value), (0, 5, 2, 2));
    assert_eq!(layer.property_value_label("Window Increment", 1).as_deref(), Some("25 %"));
}
