//! Command-line arguments

use clap::Parser;
use std::path::PathBuf;

use crate::config::{Configuration, ConfigurationBuilder, LayerPreset};
use crate::core::colour::{ColourMap, ColourScaleType};
use crate::core::dsp::WindowType;
use crate::core::normalization::ColumnNormalization;
use crate::core::render::BinDisplay;
use crate::core::scale::BinScale;
use crate::error::Result;

#[derive(Parser, Debug, Clone)]
#[command(name = "spectrolayer")]
#[command(about = "Render a WAV file as a spectrogram image")]
pub struct Args {
    /// Input WAV file
    #[arg(required_unless_present = "list_presets")]
    pub input: Option<PathBuf>,

    /// Output PNG path
    #[arg(short, long, default_value = "spectrogram.png")]
    pub output: PathBuf,

    /// Construction preset (default, full-range-db, melodic-range, melodic-peaks)
    #[arg(short, long, default_value = "default", value_parser = parse_preset)]
    pub preset: LayerPreset,

    /// JSON configuration file; replaces the preset
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Image width in pixels
    #[arg(long, default_value = "1200")]
    pub width: usize,

    /// Image height in pixels
    #[arg(long, default_value = "512")]
    pub height: usize,

    /// Source channel, -1 for the mixdown
    #[arg(long, allow_hyphen_values = true)]
    pub channel: Option<i32>,

    /// Window size in frames (power of two)
    #[arg(short = 'w', long)]
    pub window_size: Option<usize>,

    /// Window hop level, 0 (no overlap) to 5 (93.75 %)
    #[arg(long)]
    pub hop_level: Option<u32>,

    /// Window shape
    #[arg(long, value_parser = parse_window)]
    pub window_type: Option<WindowType>,

    /// Gain in dB
    #[arg(short, long, allow_hyphen_values = true)]
    pub gain: Option<f32>,

    /// Colour map name, e.g. "sunset" or "white-on-black"
    #[arg(long, value_parser = parse_colour_map)]
    pub colour: Option<ColourMap>,

    /// Colour scale (linear, meter, db, phase)
    #[arg(long, value_parser = parse_colour_scale)]
    pub colour_scale: Option<ColourScaleType>,

    /// Logarithmic frequency axis
    #[arg(long)]
    pub log_frequency: bool,

    /// Bins to draw (all, peaks, frequencies)
    #[arg(long, value_parser = parse_bin_display)]
    pub bin_display: Option<BinDisplay>,

    /// Column normalization (none, max1, sum1, hybrid, visible)
    #[arg(long)]
    pub normalization: Option<String>,

    /// Minimum displayed frequency in Hz
    #[arg(long)]
    pub min_frequency: Option<i32>,

    /// Maximum displayed frequency in Hz, 0 for Nyquist
    #[arg(long)]
    pub max_frequency: Option<i32>,

    /// Paint with repeated time-budgeted passes instead of one full pass
    #[arg(long)]
    pub incremental: bool,

    /// Time budget of one incremental pass, in milliseconds
    #[arg(long, env = "SPECTROLAYER_BUDGET_MS")]
    pub budget_ms: Option<u64>,

    /// Print the layer's session attributes after rendering
    #[arg(long)]
    pub print_attributes: bool,

    /// List available presets and exit
    #[arg(long)]
    pub list_presets: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_preset(s: &str) -> std::result::Result<LayerPreset, String> {
    LayerPreset::from_name(s).ok_or_else(|| format!("Unknown preset: {}", s))
}

fn parse_window(s: &str) -> std::result::Result<WindowType, String> {
    WindowType::from_name(s).ok_or_else(|| format!("Unknown window type: {}", s))
}

fn parse_colour_map(s: &str) -> std::result::Result<ColourMap, String> {
    ColourMap::from_name(s).ok_or_else(|| format!("Unknown colour map: {}", s))
}

fn parse_colour_scale(s: &str) -> std::result::Result<ColourScaleType, String> {
    match s.to_lowercase().as_str() {
        "linear" => Ok(ColourScaleType::Linear),
        "meter" => Ok(ColourScaleType::Meter),
        "db" | "log" | "dbv" => Ok(ColourScaleType::Log),
        "phase" => Ok(ColourScaleType::Phase),
        _ => Err(format!("Unknown colour scale: {}", s)),
    }
}

fn parse_bin_display(s: &str) -> std::result::Result<BinDisplay, String> {
    match s.to_lowercase().as_str() {
        "all" | "all-bins" => Ok(BinDisplay::AllBins),
        "peaks" | "peak-bins" => Ok(BinDisplay::PeakBins),
        "frequencies" | "peak-frequencies" => Ok(BinDisplay::PeakFrequencies),
        _ => Err(format!("Unknown bin display: {}", s)),
    }
}

/// Column normalization plus the visible-area flag.
pub fn parse_normalization(s: &str) -> std::result::Result<(ColumnNormalization, bool), String> {
    match s.to_lowercase().as_str() {
        "none" => Ok((ColumnNormalization::None, false)),
        "max1" | "peak" => Ok((ColumnNormalization::Max1, false)),
        "sum1" => Ok((ColumnNormalization::Sum1, false)),
        "hybrid" => Ok((ColumnNormalization::Hybrid, false)),
        "visible" => Ok((ColumnNormalization::None, true)),
        _ => Err(format!("Unknown normalization: {}", s)),
    }
}

impl Args {
    /// Layer configuration from the JSON file or preset, with flag overrides.
    pub fn configuration(&self) -> Result<Configuration> {
        let base = match &self.config {
            Some(path) => Configuration::load_json(path)?,
            None => Configuration::from_preset(self.preset),
        };
        let mut builder = ConfigurationBuilder::from_config(base);

        if let Some(channel) = self.channel {
            builder = builder.channel(channel);
        }
        if let Some(size) = self.window_size {
            builder = builder.window_size(size);
        }
        if let Some(level) = self.hop_level {
            builder = builder.window_hop_level(level);
        }
        if let Some(db) = self.gain {
            builder = builder.gain_db(db);
        }
        if let Some(map) = self.colour {
            builder = builder.colour_map(map);
        }
        if let Some(scale) = self.colour_scale {
            builder = builder.colour_scale(scale);
        }
        if self.log_frequency {
            builder = builder.bin_scale(BinScale::Log);
        }
        if let Some(display) = self.bin_display {
            builder = builder.bin_display(display);
        }

        let mut config = builder.build()?;
        if let Some(window_type) = self.window_type {
            config.window_type = window_type;
        }
        if let Some(text) = &self.normalization {
            let (normalization, visible) = parse_normalization(text)
                .map_err(crate::error::SpectrogramError::InvalidParameter)?;
            config.normalization = normalization;
            config.normalize_visible_area = visible;
        }
        if let Some(min) = self.min_frequency {
            config.min_frequency = min;
        }
        if let Some(max) = self.max_frequency {
            config.max_frequency = max;
        }
        if let Some(ms) = self.budget_ms {
            config.tunables.time_budget_ms = ms;
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("spectrolayer").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_preset() {
        let args = parse(&["--preset", "melodic-peaks", "in.wav"]);
        let config = args.configuration().unwrap();
        assert_eq!(config.window_size, 4096);
        assert_eq!(config.bin_display, BinDisplay::PeakFrequencies);
    }

    #[test]
    fn test_overrides() {
        let args = parse(&[
            "in.wav",
            "-w",
            "2048",
            "--gain",
            "-6",
            "--colour",
            "sunset",
            "--normalization",
            "visible",
            "--max-frequency",
            "0",
        ]);
        let config = args.configuration().unwrap();
        assert_eq!(config.window_size, 2048);
        assert!((config.gain - 0.501).abs() < 0.01);
        assert_eq!(config.colour_map, ColourMap::Sunset);
        assert!(config.normalize_visible_area);
        assert_eq!(config.max_frequency, 0);
    }

    #[test]
    fn test_invalid_values() {
        let cli = ["spectrolayer", "--preset", "loud", "in.wav"];
        assert!(Args::try_parse_from(cli).is_err());
        let args = parse(&["in.wav", "-w", "1000"]);
        assert!(args.configuration().is_err());
        let args = parse(&["in.wav", "--normalization", "median"]);
        assert!(args.configuration().is_err());
    }

    #[test]
    fn test_list_presets_needs_no_input() {
        let args = parse(&["--list-presets"]);
        assert!(args.list_presets);
        assert!(args.input.is_none());
    }
}
