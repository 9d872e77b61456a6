//! Terminal output for the CLI

use colorful::Colorful;
use std::path::Path;
use std::time::Duration;

use crate::config::{Configuration, LayerPreset};
use crate::core::dsp::multiplier_to_db;
use crate::core::normalization::MagnitudeRange;

/// What a render run produced, for the summary.
#[derive(Debug, Clone)]
pub struct RenderSummary {
    pub sample_rate: u32,
    pub channels: usize,
    pub duration_secs: f64,
    pub width: usize,
    pub height: usize,
    pub fft_size: usize,
    pub window_increment: usize,
    pub frequency_range: (f64, f64),
    pub passes: usize,
    pub elapsed: Duration,
    pub magnitudes: Option<MagnitudeRange>,
    pub error: Option<String>,
}

pub fn print_summary(input: &Path, output: &Path, summary: &RenderSummary) {
    println!("{}", input.display().to_string().as_str().bold());
    println!(
        "  {} Hz, {} channel(s), {:.2} s",
        summary.sample_rate, summary.channels, summary.duration_secs
    );
    println!(
        "  FFT {} / hop {}  {:.0} - {:.0} Hz",
        summary.fft_size, summary.window_increment, summary.frequency_range.0, summary.frequency_range.1
    );

    if let Some(range) = summary.magnitudes.filter(|r| r.is_set()) {
        println!(
            "  {}",
            format!(
                "Magnitude: {:.1} to {:.1} dB",
                multiplier_to_db(range.min() as f64),
                multiplier_to_db(range.max() as f64)
            )
            .as_str()
            .dim()
        );
    }

    if let Some(error) = &summary.error {
        println!("  {} {}", "✗".red(), error.as_str().red());
        return;
    }

    println!(
        "  {} {} ({}x{}, {} pass{}, {:.2?})",
        "✓".green(),
        output.display().to_string().as_str().green(),
        summary.width,
        summary.height,
        summary.passes,
        if summary.passes == 1 { "" } else { "es" },
        summary.elapsed
    );
}

/// Print available presets
pub fn print_presets() {
    println!("Available presets:\n");
    for preset in LayerPreset::all() {
        let config = Configuration::from_preset(preset);
        let max = if config.max_frequency == 0 {
            "Nyquist".to_string()
        } else {
            format!("{} Hz", config.max_frequency)
        };
        println!("  {}", preset.name().bold());
        println!(
            "    Window {} / hop level {}, {} Hz - {}",
            config.window_size, config.window_hop_level, config.min_frequency, max
        );
        println!(
            "    {} map, {:?} scale, {:?} bins, {:?} axis",
            config.colour_map.name(),
            config.colour_scale,
            config.bin_display,
            config.bin_scale
        );
        println!();
    }
}
