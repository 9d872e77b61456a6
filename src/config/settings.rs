// src/config/settings.rs
//
// Layer configuration, construction presets and user preferences

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::colour::{ColourMap, ColourScaleType};
use crate::core::dsp::WindowType;
use crate::core::normalization::ColumnNormalization;
use crate::core::render::BinDisplay;
use crate::core::scale::BinScale;
use crate::error::{Result, SpectrogramError};

/// Smallest and largest analysis window a layer accepts
pub const MIN_WINDOW_SIZE: usize = 32;
pub const MAX_WINDOW_SIZE: usize = 32768;

/// Power of two in `MIN_WINDOW_SIZE..=MAX_WINDOW_SIZE`
pub fn is_valid_window_size(size: usize) -> bool {
    size.is_power_of_two() && (MIN_WINDOW_SIZE..=MAX_WINDOW_SIZE).contains(&size)
}

/// Construction presets for a spectrogram layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LayerPreset {
    /// General purpose: 10 Hz - 8 kHz, dB colour scale
    #[default]
    Default,
    /// Default with the full range up to Nyquist
    FullRangeDb,
    /// Long windows, log frequency axis, 40 - 1500 Hz
    MelodicRange,
    /// Peak frequencies only, column-normalized, 40 - 2000 Hz
    MelodicPeaks,
}

impl LayerPreset {
    pub fn all() -> Vec<Self> {
        vec![
            Self::Default,
            Self::FullRangeDb,
            Self::MelodicRange,
            Self::MelodicPeaks,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::FullRangeDb => "full-range-db",
            Self::MelodicRange => "melodic-range",
            Self::MelodicPeaks => "melodic-peaks",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|p| p.name() == name)
    }
}

/// How the displayed spectrum is smoothed between bins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SpectrogramSmoothing {
    None,
    Interpolated,
    ZeroPadded,
    #[default]
    ZeroPaddedAndInterpolated,
}

impl SpectrogramSmoothing {
    pub fn zero_padded(self) -> bool {
        matches!(self, Self::ZeroPadded | Self::ZeroPaddedAndInterpolated)
    }

    pub fn interpolated(self) -> bool {
        matches!(self, Self::Interpolated | Self::ZeroPaddedAndInterpolated)
    }
}

/// Application-wide preferences consulted by every layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Preferences {
    pub window_type: WindowType,
    pub smoothing: SpectrogramSmoothing,
}

/// Performance knobs that do not change what is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tunables {
    /// Wall-clock budget of one time-constrained paint pass
    pub time_budget_ms: u64,
    /// Block size of the peak cache
    pub peak_divisor: usize,
    /// Largest transform model cache allowed, in bytes
    pub memory_limit_bytes: u64,
    /// Compute the transform model on the rayon pool ahead of painting
    pub background_fill: bool,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            time_budget_ms: 50,
            peak_divisor: 8,
            memory_limit_bytes: 1 << 30,
            background_fill: false,
        }
    }
}

/// Every setting of a spectrogram layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Source channel, or -1 for the mixdown of all channels
    pub channel: i32,
    pub window_size: usize,
    /// 0 = no overlap, 1 = 25%, n >= 2 = window / 2^(n-1)
    pub window_hop_level: u32,
    pub window_type: WindowType,
    /// Linear multiplier
    pub gain: f32,
    /// Linear magnitude below which nothing is drawn
    pub threshold: f32,
    pub colour_map: ColourMap,
    pub colour_scale: ColourScaleType,
    /// 0..=256
    pub colour_rotation: i32,
    pub bin_scale: BinScale,
    pub bin_display: BinDisplay,
    pub normalization: ColumnNormalization,
    pub normalize_visible_area: bool,
    /// Hz; 0 means DC
    pub min_frequency: i32,
    /// Hz; 0 means Nyquist
    pub max_frequency: i32,

    // Values the property surface treats as defaults
    pub initial_gain: f32,
    pub initial_threshold: f32,
    pub initial_rotation: i32,
    pub initial_max_frequency: i32,

    pub tunables: Tunables,
}

impl Default for Configuration {
    fn default() -> Self {
        Self::from_preset(LayerPreset::Default)
    }
}

impl Configuration {
    /// Create configuration from preset
    pub fn from_preset(preset: LayerPreset) -> Self {
        let base = Self::standard();
        match preset {
            LayerPreset::Default => base,
            LayerPreset::FullRangeDb => Self {
                max_frequency: 0,
                initial_max_frequency: 0,
                ..base
            },
            LayerPreset::MelodicRange => Self {
                window_size: 8192,
                window_hop_level: 4,
                max_frequency: 1500,
                initial_max_frequency: 1500,
                min_frequency: 40,
                colour_scale: ColourScaleType::Linear,
                colour_map: ColourMap::Sunset,
                bin_scale: BinScale::Log,
                ..base
            },
            LayerPreset::MelodicPeaks => Self {
                window_size: 4096,
                window_hop_level: 5,
                max_frequency: 2000,
                initial_max_frequency: 2000,
                min_frequency: 40,
                bin_scale: BinScale::Log,
                colour_scale: ColourScaleType::Linear,
                colour_map: ColourMap::Sunset,
                bin_display: BinDisplay::PeakFrequencies,
                normalization: ColumnNormalization::Max1,
                ..base
            },
        }
    }

    fn standard() -> Self {
        Self {
            channel: 0,
            window_size: 1024,
            window_hop_level: 2,
            window_type: WindowType::Hann,
            gain: 1.0,
            threshold: 1.0e-8,
            colour_map: ColourMap::Green,
            colour_scale: ColourScaleType::Log,
            colour_rotation: 0,
            bin_scale: BinScale::Linear,
            bin_display: BinDisplay::AllBins,
            normalization: ColumnNormalization::None,
            normalize_visible_area: false,
            min_frequency: 10,
            max_frequency: 8000,
            initial_gain: 1.0,
            initial_threshold: 1.0e-8,
            initial_rotation: 0,
            initial_max_frequency: 8000,
            tunables: Tunables::default(),
        }
    }

    /// Load a configuration from a JSON file; missing fields take defaults.
    pub fn load_json(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check values a setter would otherwise have to clamp or reject.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_window_size(self.window_size) {
            return Err(SpectrogramError::InvalidParameter(format!(
                "window size {} is not a power of two in {}..={}",
                self.window_size, MIN_WINDOW_SIZE, MAX_WINDOW_SIZE
            )));
        }
        if self.window_hop_level > 5 {
            return Err(SpectrogramError::InvalidParameter(format!(
                "window hop level {} is above 5",
                self.window_hop_level
            )));
        }
        if self.min_frequency < 0 || self.max_frequency < 0 {
            return Err(SpectrogramError::InvalidParameter(
                "frequency bounds must not be negative".to_string(),
            ));
        }
        if !(0..=256).contains(&self.colour_rotation) {
            return Err(SpectrogramError::InvalidParameter(format!(
                "colour rotation {} is outside 0..=256",
                self.colour_rotation
            )));
        }
        Ok(())
    }
}

/// Builder for custom configurations
pub struct ConfigurationBuilder {
    config: Configuration,
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        Self {
            config: Configuration::default(),
        }
    }

    pub fn from_preset(preset: LayerPreset) -> Self {
        Self {
            config: Configuration::from_preset(preset),
        }
    }

    pub fn from_config(config: Configuration) -> Self {
        Self { config }
    }

    pub fn channel(mut self, channel: i32) -> Self {
        self.config.channel = channel;
        self
    }

    pub fn window_size(mut self, size: usize) -> Self {
        self.config.window_size = size;
        self
    }

    pub fn window_hop_level(mut self, level: u32) -> Self {
        self.config.window_hop_level = level;
        self
    }

    pub fn gain_db(mut self, db: f32) -> Self {
        self.config.gain = 10.0f32.powf(db / 20.0);
        self
    }

    pub fn colour_map(mut self, map: ColourMap) -> Self {
        self.config.colour_map = map;
        self
    }

    pub fn colour_scale(mut self, scale: ColourScaleType) -> Self {
        self.config.colour_scale = scale;
        self
    }

    pub fn bin_scale(mut self, scale: BinScale) -> Self {
        self.config.bin_scale = scale;
        self
    }

    pub fn bin_display(mut self, display: BinDisplay) -> Self {
        self.config.bin_display = display;
        self
    }

    pub fn normalization(mut self, normalization: ColumnNormalization) -> Self {
        self.config.normalization = normalization;
        self
    }

    pub fn frequency_range(mut self, min: i32, max: i32) -> Self {
        self.config.min_frequency = min;
        self.config.max_frequency = max;
        self
    }

    pub fn tunables(mut self, tunables: Tunables) -> Self {
        self.config.tunables = tunables;
        self
    }

    pub fn build(self) -> Result<Configuration> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let melodic = Configuration::from_preset(LayerPreset::MelodicPeaks);
        assert_eq!(melodic.window_size, 4096);
        assert_eq!(melodic.bin_display, BinDisplay::PeakFrequencies);
        assert_eq!(melodic.normalization, ColumnNormalization::Max1);

        let full = Configuration::from_preset(LayerPreset::FullRangeDb);
        assert_eq!(full.max_frequency, 0);
        assert_eq!(full.window_size, 1024);
        assert_eq!(LayerPreset::from_name("melodic-range"), Some(LayerPreset::MelodicRange));
    }

    #[test]
    fn test_builder_validates() {
        let config = ConfigurationBuilder::from_preset(LayerPreset::Default)
            .window_size(2048)
            .gain_db(20.0)
            .build()
            .unwrap();
        assert_eq!(config.window_size, 2048);
        assert!((config.gain - 10.0).abs() < 1e-4);

        assert!(ConfigurationBuilder::new().window_size(1000).build().is_err());
        assert!(ConfigurationBuilder::new().window_hop_level(6).build().is_err());
    }

    #[test]
    fn test_json_partial() {
        let config: Configuration = serde_json::from_str(r#"{"window_size": 512, "colour_map": "Sunset"}"#).unwrap();
        assert_eq!(config.window_size, 512);
        assert_eq!(config.colour_map, ColourMap::Sunset);
        assert_eq!(config.max_frequency, 8000);

        let json = config.to_json().unwrap();
        let back: Configuration = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_smoothing_flags() {
        assert!(SpectrogramSmoothing::ZeroPaddedAndInterpolated.zero_padded());
        assert!(SpectrogramSmoothing::ZeroPaddedAndInterpolated.interpolated());
        assert!(!SpectrogramSmoothing::Interpolated.zero_padded());
        assert!(!SpectrogramSmoothing::None.interpolated());
    }
}
