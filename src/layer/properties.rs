// src/layer/properties.rs
//
// Integer property surface of the spectrogram layer, as a generic property
// editor sees it.

use super::SpectrogramLayer;
use crate::core::colour::{ColourMap, ColourScaleType};
use crate::core::dsp::{db_to_multiplier, multiplier_to_db};
use crate::core::normalization::ColumnNormalization;
use crate::core::render::BinDisplay;
use crate::core::scale::{BinScale, LinearRangeMapper};

const MIN_FREQUENCIES: [i32; 10] = [0, 10, 20, 40, 100, 250, 500, 1000, 4000, 10000];
const MAX_FREQUENCIES: [i32; 10] = [500, 1000, 1500, 2000, 4000, 6000, 8000, 12000, 16000, 0];

/// Named, editable properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Colour,
    ColourScale,
    WindowSize,
    WindowIncrement,
    Normalization,
    BinDisplay,
    Threshold,
    Gain,
    ColourRotation,
    MinFrequency,
    MaxFrequency,
    FrequencyScale,
}

/// How an editor should present a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// Continuous control over an integer range
    Range,
    /// Choice from labelled values
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyRange {
    pub min: i32,
    pub max: i32,
    pub default: i32,
    pub value: i32,
}

impl Property {
    /// Properties a layer lists, in display order. The frequency bounds are
    /// settable by name but not listed.
    pub fn listed() -> Vec<Self> {
        vec![
            Self::Colour,
            Self::ColourScale,
            Self::WindowSize,
            Self::WindowIncrement,
            Self::Normalization,
            Self::BinDisplay,
            Self::Threshold,
            Self::Gain,
            Self::ColourRotation,
            Self::FrequencyScale,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Colour => "Colour",
            Self::ColourScale => "Colour Scale",
            Self::WindowSize => "Window Size",
            Self::WindowIncrement => "Window Increment",
            Self::Normalization => "Normalization",
            Self::BinDisplay => "Bin Display",
            Self::Threshold => "Threshold",
            Self::Gain => "Gain",
            Self::ColourRotation => "Colour Rotation",
            Self::MinFrequency => "Min Frequency",
            Self::MaxFrequency => "Max Frequency",
            Self::FrequencyScale => "Frequency Scale",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::listed()
            .into_iter()
            .chain([Self::MinFrequency, Self::MaxFrequency])
            .find(|p| p.name() == name)
    }

    /// Human-readable label; differs from the name only for the increment.
    pub fn label(self) -> &'static str {
        match self {
            Self::WindowIncrement => "Window Overlap",
            other => other.name(),
        }
    }

    pub fn group(self) -> Option<&'static str> {
        match self {
            Self::BinDisplay | Self::FrequencyScale => Some("Bins"),
            Self::WindowSize | Self::WindowIncrement => Some("Window"),
            Self::Colour | Self::Threshold | Self::ColourRotation => Some("Colour"),
            Self::Normalization | Self::Gain | Self::ColourScale => Some("Scale"),
            Self::MinFrequency | Self::MaxFrequency => None,
        }
    }

    pub fn kind(self) -> PropertyKind {
        match self {
            Self::Gain | Self::ColourRotation | Self::Threshold => PropertyKind::Range,
            _ => PropertyKind::Value,
        }
    }

    /// Label for one value of the property.
    pub fn value_label(self, value: i32) -> String {
        let label = match self {
            Self::Colour => {
                return ColourMap::from_id(value)
                    .map(|m| m.name().to_string())
                    .unwrap_or_else(|| "<unknown>".to_string())
            }
            Self::ColourScale => match value {
                1 => "Meter",
                2 => "dBV^2",
                3 => "dBV",
                4 => "Phase",
                _ => "Linear",
            },
            Self::Normalization => "",
            Self::WindowSize => return (32i64 << value.clamp(0, 20)).to_string(),
            Self::WindowIncrement => match value {
                1 => "25 %",
                2 => "50 %",
                3 => "75 %",
                4 => "87.5 %",
                5 => "93.75 %",
                _ => "None",
            },
            Self::MinFrequency => match value {
                1 => "10 Hz",
                2 => "20 Hz",
                3 => "40 Hz",
                4 => "100 Hz",
                5 => "250 Hz",
                6 => "500 Hz",
                7 => "1 KHz",
                8 => "4 KHz",
                9 => "10 KHz",
                _ => "No min",
            },
            Self::MaxFrequency => match value {
                1 => "1 KHz",
                2 => "1.5 KHz",
                3 => "2 KHz",
                4 => "4 KHz",
                5 => "6 KHz",
                6 => "8 KHz",
                7 => "12 KHz",
                8 => "16 KHz",
                9 => "No max",
                _ => "500 Hz",
            },
            Self::FrequencyScale => match value {
                1 => "Log",
                _ => "Linear",
            },
            Self::BinDisplay => match value {
                1 => "Peak Bins",
                2 => "Frequencies",
                _ => "All Bins",
            },
            Self::Threshold | Self::Gain | Self::ColourRotation => "<unknown>",
        };
        label.to_string()
    }

    /// Mapper between control position and displayed value, for range
    /// properties that have one.
    pub fn range_mapper(self) -> Option<LinearRangeMapper> {
        match self {
            Self::Gain => Some(LinearRangeMapper::new(-50, 50, -25.0, 25.0, "dB")),
            Self::Threshold => Some(LinearRangeMapper::new(-81, -1, -81.0, -1.0, "dB")),
            _ => None,
        }
    }
}

/// Property/session integer for a colour scale. Both log settings map to
/// the dB scale.
pub fn colour_scale_from_int(value: i32) -> ColourScaleType {
    match value {
        1 => ColourScaleType::Meter,
        2 | 3 => ColourScaleType::Log,
        4 => ColourScaleType::Phase,
        _ => ColourScaleType::Linear,
    }
}

pub fn colour_scale_to_int(scale: ColourScaleType) -> i32 {
    match scale {
        ColourScaleType::Linear => 0,
        ColourScaleType::Meter => 1,
        ColourScaleType::Log => 3,
        ColourScaleType::Phase => 4,
        ColourScaleType::PlusMinusOne | ColourScaleType::Absolute => 0,
    }
}

/// Normalization property value: 2 stands for visible-area normalization.
pub fn column_norm_from_int(value: i32) -> (ColumnNormalization, bool) {
    match value {
        1 => (ColumnNormalization::Max1, false),
        2 => (ColumnNormalization::None, true),
        3 => (ColumnNormalization::Hybrid, false),
        _ => (ColumnNormalization::None, false),
    }
}

pub fn column_norm_to_int(normalization: ColumnNormalization, visible: bool) -> i32 {
    if visible {
        return 2;
    }
    match normalization {
        ColumnNormalization::Max1 => 1,
        ColumnNormalization::Hybrid => 3,
        ColumnNormalization::None | ColumnNormalization::Sum1 => 0,
    }
}

fn bin_scale_to_int(scale: BinScale) -> i32 {
    match scale {
        BinScale::Linear => 0,
        BinScale::Log => 1,
    }
}

fn bin_display_to_int(display: BinDisplay) -> i32 {
    match display {
        BinDisplay::AllBins => 0,
        BinDisplay::PeakBins => 1,
        BinDisplay::PeakFrequencies => 2,
    }
}

fn gain_to_db(gain: f32) -> i32 {
    (20.0 * (gain as f64).log10()).round() as i32
}

impl SpectrogramLayer {
    pub fn properties(&self) -> Vec<Property> {
        Property::listed()
    }

    /// Range, default and current value of a property.
    pub fn property_range(&self, property: Property) -> PropertyRange {
        let config = &self.config;
        let (min, max, default, value) = match property {
            Property::Gain => (
                -50,
                50,
                gain_to_db(config.initial_gain).clamp(-50, 50),
                gain_to_db(config.gain).clamp(-50, 50),
            ),
            Property::Threshold => (
                -81,
                -1,
                (multiplier_to_db(config.initial_threshold as f64).round() as i32).clamp(-81, -1),
                (multiplier_to_db(config.threshold as f64).round() as i32).clamp(-81, -1),
            ),
            Property::ColourRotation => (0, 256, config.initial_rotation, config.colour_rotation),
            Property::ColourScale => (0, 4, 2, colour_scale_to_int(config.colour_scale)),
            Property::Colour => (0, ColourMap::count() as i32 - 1, 0, config.colour_map.id()),
            Property::WindowSize => {
                let mut ws = config.window_size;
                let mut level = 0;
                while ws > 32 {
                    ws >>= 1;
                    level += 1;
                }
                (0, 10, 5, level)
            }
            Property::WindowIncrement => (0, 5, 2, config.window_hop_level as i32),
            Property::MinFrequency => (
                0,
                9,
                1,
                MIN_FREQUENCIES
                    .iter()
                    .position(|&f| f == config.min_frequency)
                    .unwrap_or(0) as i32,
            ),
            Property::MaxFrequency => (
                0,
                9,
                6,
                MAX_FREQUENCIES
                    .iter()
                    .position(|&f| f == config.max_frequency)
                    .unwrap_or(9) as i32,
            ),
            Property::FrequencyScale => (0, 1, 0, bin_scale_to_int(config.bin_scale)),
            Property::BinDisplay => (0, 2, 0, bin_display_to_int(config.bin_display)),
            Property::Normalization => (
                0,
                3,
                0,
                column_norm_to_int(config.normalization, config.normalize_visible_area),
            ),
        };
        PropertyRange {
            min,
            max,
            default,
            value,
        }
    }

    /// Apply an integer property value through the matching setter.
    pub fn set_property_value(&mut self, property: Property, value: i32) {
        match property {
            Property::Gain => self.set_gain(10.0f32.powf(value as f32 / 20.0)),
            Property::Threshold => {
                if value == -81 {
                    self.set_threshold(0.0);
                } else {
                    self.set_threshold(db_to_multiplier(value as f64) as f32);
                }
            }
            Property::ColourRotation => self.set_colour_rotation(value),
            Property::Colour => {
                if let Some(map) = ColourMap::from_id(value) {
                    self.set_colour_map(map);
                }
            }
            Property::WindowSize => self.set_window_size(32usize << value.clamp(0, 10)),
            Property::WindowIncrement => self.set_window_hop_level(value.clamp(0, 5) as u32),
            Property::MinFrequency => {
                let index = usize::try_from(value).unwrap_or(0).min(9);
                self.set_min_frequency(MIN_FREQUENCIES[index]);
            }
            Property::MaxFrequency => {
                let index = usize::try_from(value).map_or(9, |i| i.min(9));
                self.set_max_frequency(MAX_FREQUENCIES[index]);
            }
            Property::ColourScale => self.set_colour_scale(colour_scale_from_int(value)),
            Property::FrequencyScale => self.set_bin_scale(if value == 1 {
                BinScale::Log
            } else {
                BinScale::Linear
            }),
            Property::BinDisplay => self.set_bin_display(match value {
                1 => BinDisplay::PeakBins,
                2 => BinDisplay::PeakFrequencies,
                _ => BinDisplay::AllBins,
            }),
            Property::Normalization => {
                let (normalization, visible) = column_norm_from_int(value);
                self.set_normalization(normalization);
                self.set_normalize_visible_area(visible);
            }
        }
    }
}
