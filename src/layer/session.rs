// src/layer/session.rs
//
// Saving and restoring layer settings as flat `name="value"` attributes.

use log::{debug, warn};
use std::collections::BTreeMap;
use std::str::FromStr;

use super::properties::{colour_scale_from_int, colour_scale_to_int};
use super::SpectrogramLayer;
use crate::core::colour::ColourMap;
use crate::core::normalization::ColumnNormalization;
use crate::core::render::BinDisplay;
use crate::core::scale::BinScale;
use crate::error::{Result, SpectrogramError};

/// Attribute name to raw string value.
pub type Attributes = BTreeMap<String, String>;

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn unescape(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Render attributes as `name="value"` pairs separated by spaces.
pub fn format_attributes(attributes: &Attributes) -> String {
    attributes
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape(v)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse the output of [`format_attributes`].
pub fn parse_attributes(text: &str) -> Result<Attributes> {
    let mut attributes = Attributes::new();
    let mut rest = text.trim_start();
    while !rest.is_empty() {
        let eq = rest.find('=').ok_or_else(|| {
            SpectrogramError::InvalidParameter(format!("attribute without value near '{}'", rest))
        })?;
        let name = rest[..eq].trim();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(SpectrogramError::InvalidParameter(format!(
                "bad attribute name '{}'",
                name
            )));
        }
        let after = rest[eq + 1..].trim_start();
        let Some(quoted) = after.strip_prefix('"') else {
            return Err(SpectrogramError::InvalidParameter(format!(
                "value of '{}' is not quoted",
                name
            )));
        };
        let close = quoted.find('"').ok_or_else(|| {
            SpectrogramError::InvalidParameter(format!("unterminated value of '{}'", name))
        })?;
        attributes.insert(name.to_string(), unescape(&quoted[..close]));
        rest = quoted[close + 1..].trim_start();
    }
    Ok(attributes)
}

fn read<T: FromStr>(attributes: &Attributes, name: &str) -> Option<T> {
    let raw = attributes.get(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring unparseable {} attribute \"{}\"", name, raw);
            None
        }
    }
}

fn is_true(attributes: &Attributes, name: &str) -> bool {
    attributes.get(name).is_some_and(|v| v.trim() == "true")
}

fn hop_level_for_overlap(percent: u32) -> Option<u32> {
    match percent {
        0 => Some(0),
        25 => Some(1),
        50 => Some(2),
        75 => Some(3),
        90 => Some(4),
        _ => None,
    }
}

impl SpectrogramLayer {
    /// Every persistent setting as attributes.
    ///
    /// Normalization is written both new-style (`columnNormalization`) and
    /// as the older `normalizeColumns` flag. The legacy hybrid flag is never
    /// written.
    pub fn to_attributes(&self) -> Attributes {
        let c = &self.config;
        let mut a = Attributes::new();
        let mut put = |k: &str, v: String| {
            a.insert(k.to_string(), v);
        };
        put("channel", c.channel.to_string());
        put("windowSize", c.window_size.to_string());
        put("windowHopLevel", c.window_hop_level.to_string());
        put("gain", c.gain.to_string());
        put("threshold", c.threshold.to_string());
        put("minFrequency", c.min_frequency.to_string());
        put("maxFrequency", c.max_frequency.to_string());
        put("colourScale", colour_scale_to_int(c.colour_scale).to_string());
        put("colourScheme", c.colour_map.id().to_string());
        put("colourRotation", c.colour_rotation.to_string());
        put(
            "frequencyScale",
            match c.bin_scale {
                BinScale::Linear => "0",
                BinScale::Log => "1",
            }
            .to_string(),
        );
        put(
            "binDisplay",
            match c.bin_display {
                BinDisplay::AllBins => "0",
                BinDisplay::PeakBins => "1",
                BinDisplay::PeakFrequencies => "2",
            }
            .to_string(),
        );
        put(
            "columnNormalization",
            match c.normalization {
                ColumnNormalization::Max1 => "peak",
                ColumnNormalization::Hybrid => "hybrid",
                ColumnNormalization::None | ColumnNormalization::Sum1 => "none",
            }
            .to_string(),
        );
        put(
            "normalizeColumns",
            (c.normalization == ColumnNormalization::Max1).to_string(),
        );
        put("normalizeVisibleArea", c.normalize_visible_area.to_string());
        a
    }

    /// Restore settings through the ordinary setters. Absent or unparseable
    /// attributes leave their setting alone, except `normalizeVisibleArea`
    /// which is always applied.
    pub fn set_attributes(&mut self, attributes: &Attributes) {
        if let Some(channel) = read::<i32>(attributes, "channel") {
            self.set_channel(channel);
        }
        if let Some(size) = read::<usize>(attributes, "windowSize") {
            self.set_window_size(size);
        }
        match read::<u32>(attributes, "windowHopLevel") {
            Some(level) => self.set_window_hop_level(level),
            None => {
                if let Some(percent) = read::<u32>(attributes, "windowOverlap") {
                    match hop_level_for_overlap(percent) {
                        Some(level) => self.set_window_hop_level(level),
                        None => warn!("Ignoring unsupported windowOverlap {}", percent),
                    }
                }
            }
        }
        if let Some(gain) = read::<f32>(attributes, "gain") {
            self.set_gain(gain);
        }
        if let Some(threshold) = read::<f32>(attributes, "threshold") {
            self.set_threshold(threshold);
        }
        if let Some(min) = read::<u32>(attributes, "minFrequency") {
            debug!("SpectrogramLayer::set_attributes: min frequency {}", min);
            self.set_min_frequency(min as i32);
        }
        if let Some(max) = read::<u32>(attributes, "maxFrequency") {
            debug!("SpectrogramLayer::set_attributes: max frequency {}", max);
            self.set_max_frequency(max as i32);
        }
        if let Some(scale) = read::<i32>(attributes, "colourScale") {
            self.set_colour_scale(colour_scale_from_int(scale));
        }
        if let Some(id) = read::<i32>(attributes, "colourScheme") {
            match ColourMap::from_id(id) {
                Some(map) => self.set_colour_map(map),
                None => warn!("Unknown colourScheme {}", id),
            }
        }
        if let Some(rotation) = read::<i32>(attributes, "colourRotation") {
            self.set_colour_rotation(rotation);
        }
        if let Some(scale) = read::<i32>(attributes, "frequencyScale") {
            match scale {
                0 => self.set_bin_scale(BinScale::Linear),
                1 => self.set_bin_scale(BinScale::Log),
                other => warn!("Unknown frequencyScale {}", other),
            }
        }
        if let Some(display) = read::<i32>(attributes, "binDisplay") {
            match display {
                0 => self.set_bin_display(BinDisplay::AllBins),
                1 => self.set_bin_display(BinDisplay::PeakBins),
                2 => self.set_bin_display(BinDisplay::PeakFrequencies),
                other => warn!("Unknown binDisplay {}", other),
            }
        }

        let new_style = attributes
            .get("columnNormalization")
            .filter(|v| !v.is_empty());
        match new_style.map(String::as_str) {
            Some("peak") => self.set_normalization(ColumnNormalization::Max1),
            Some("hybrid") => self.set_normalization(ColumnNormalization::Hybrid),
            Some("none") => self.set_normalization(ColumnNormalization::None),
            Some(other) => warn!("Unknown or unsupported columnNormalization \"{}\"", other),
            None => {
                if is_true(attributes, "normalizeColumns") {
                    self.set_normalization(ColumnNormalization::Max1);
                }
                if is_true(attributes, "normalizeHybrid") {
                    self.set_normalization(ColumnNormalization::Hybrid);
                }
            }
        }

        self.set_normalize_visible_area(is_true(attributes, "normalizeVisibleArea"));

        // Legacy hybrid sessions were saved with gain scaled up by half the FFT size
        if new_style.is_none() && self.normalization() == ColumnNormalization::Hybrid {
            let divisor = (self.fft_size() / 2).max(1) as f32;
            debug!(
                "SpectrogramLayer::set_attributes: legacy hybrid gain {} / {}",
                self.gain(),
                divisor
            );
            self.set_gain(self.gain() / divisor);
        }
    }
}
