// tests/session_test.rs
//
// Saving and restoring layer settings through session attributes.

use spectrolayer::config::{Configuration, LayerPreset};
use spectrolayer::core::{
    BinDisplay, BinScale, ColourMap, ColourScaleType, ColumnNormalization, MemoryAudioSource, OffscreenView,
};
use std::sync::Arc;
use spectrolayer::layer::{format_attributes, parse_attributes, Layer, SpectrogramLayer};

#[test]
fn test_round_trip_through_text() {
    let mut layer = SpectrogramLayer::new(Configuration::from_preset(LayerPreset::MelodicPeaks));
    layer.set_channel(1);
    layer.set_gain(2.5);
    layer.set_colour_rotation(17);
    layer.set_normalization(ColumnNormalization::Hybrid);
    layer.set_normalize_visible_area(true);

    let text = format_attributes(&layer.to_attributes());
    let attributes = parse_attributes(&text).unwrap();

    let mut restored = SpectrogramLayer::default();
    restored.set_attributes(&attributes);

    assert_eq!(restored.channel(), 1);
    assert_eq!(restored.window_size(), layer.window_size());
    assert_eq!(restored.window_hop_level(), layer.window_hop_level());
    assert_eq!(restored.gain(), 2.5);
    assert_eq!(restored.colour_rotation(), 17);
    assert_eq!(restored.colour_map(), layer.colour_map());
    assert_eq!(restored.colour_scale(), layer.colour_scale());
    assert_eq!(restored.bin_scale(), layer.bin_scale());
    assert_eq!(restored.bin_display(), BinDisplay::PeakFrequencies);
    assert_eq!(restored.min_frequency(), layer.min_frequency());
    assert_eq!(restored.max_frequency(), layer.max_frequency());
    assert_eq!(restored.normalization(), ColumnNormalization::Hybrid);
    assert!(restored.normalize_visible_area());
}

#[test]
fn test_restore_through_layer_trait() {
    let mut source_layer = SpectrogramLayer::default();
    source_layer.set_colour_map(ColourMap::Sunset);
    source_layer.set_colour_scale(ColourScaleType::Meter);
    source_layer.set_bin_scale(BinScale::Log);

    let attributes = Layer::to_attributes(&source_layer);
    let mut restored: Box<dyn Layer> = Box::new(SpectrogramLayer::default());
    restored.set_attributes(&attributes);
    assert_eq!(restored.to_attributes(), attributes);
}

#[test]
fn test_legacy_normalize_columns() {
    let attributes = parse_attributes("normalizeColumns=\"true\" normalizeVisibleArea=\"false\"").unwrap();
    let mut layer = SpectrogramLayer::default();
    layer.set_attributes(&attributes);
    assert_eq!(layer.normalization(), ColumnNormalization::Max1);
    assert!(!layer.normalize_visible_area());
}

#[test]
fn test_legacy_hybrid_gain_correction() {
    let mut layer = SpectrogramLayer::default();
    let divisor = (layer.fft_size() / 2) as f32;
    let text = format!("normalizeHybrid=\"true\" gain=\"{}\"", divisor * 3.0);
    layer.set_attributes(&parse_attributes(&text).unwrap());

    assert_eq!(layer.normalization(), ColumnNormalization::Hybrid);
    assert!((layer.gain() - 3.0).abs() < 1e-6);
}

#[test]
fn test_new_style_hybrid_keeps_gain() {
    let text = "columnNormalization=\"hybrid\" normalizeHybrid=\"true\" gain=\"8\"";
    let mut layer = SpectrogramLayer::default();
    layer.set_attributes(&parse_attributes(text).unwrap());

    assert_eq!(layer.normalization(), ColumnNormalization::Hybrid);
    assert_eq!(layer.gain(), 8.0);
}

#[test]
fn test_window_overlap_fallback() {
    let mut layer = SpectrogramLayer::default();
    layer.set_attributes(&parse_attributes("windowOverlap=\"50\"").unwrap());
    assert_eq!(layer.window_hop_level(), 2);
    assert_eq!(layer.window_increment(), layer.window_size() / 2);

    layer.set_attributes(&parse_attributes("windowOverlap=\"0\"").unwrap());
    assert_eq!(layer.window_hop_level(), 0);
    assert_eq!(layer.window_increment(), layer.window_size());
}

#[test]
fn test_malformed_text_rejected() {
    assert!(parse_attributes("gain=\"1.0").is_err());
    assert!(parse_attributes("gain=1.0").is_err());
    assert!(parse_attributes("").unwrap().is_empty());
}

#[test]
fn test_out_of_range_window_size_ignored() {
    let mut layer = SpectrogramLayer::default();
    let size = layer.window_size();
    for bad in ["4611686018427387904", "1000", "16", "65536"] {
        let text = format!("windowSize=\"{}\"", bad);
        layer.set_attributes(&parse_attributes(&text).unwrap());
        assert_eq!(layer.window_size(), size, "accepted windowSize {}", bad);
    }

    layer.set_attributes(&parse_attributes("windowSize=\"2048\"").unwrap());
    assert_eq!(layer.window_size(), 2048);
}

#[test]
fn test_paint_after_bad_window_size() {
    let samples: Vec<f32> = (0..8000).map(|i| (i as f32 * 0.3).sin() * 0.5).collect();
    let mut layer = SpectrogramLayer::default();
    layer.set_source(Some(Arc::new(MemoryAudioSource::from_mono(samples, 8000))));
    layer.set_attributes(&parse_attributes("windowSize=\"4611686018427387904\"").unwrap());

    let view = OffscreenView::covering(1, 0, 8000, 16, 16);
    let image = layer.render_image(&view);
    assert_eq!(image.dimensions(), (16, 16));
    assert_eq!(layer.fft_model_builds(), 1);
}
