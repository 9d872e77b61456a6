// src/core/colour/colour_scale.rs
//
// Value to palette-index mapping.

use image::Rgba;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::colour_map::{ColourMap, Palette, PALETTE_SIZE};
use crate::core::dsp::{multiplier_to_db, multiplier_to_meter};

/// How values are spread across the palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ColourScaleType {
    Linear,
    Meter,
    #[default]
    Log,
    Phase,
    PlusMinusOne,
    Absolute,
}

/// Inputs to a [`ColourScale`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColourScaleParams {
    pub colour_map: ColourMap,
    pub scale: ColourScaleType,
    pub min_value: f64,
    pub max_value: f64,
    pub threshold: f64,
    pub gain: f64,
    /// Cyclic shift of palette indices `1..=255`.
    pub rotation: i32,
}

impl Default for ColourScaleParams {
    fn default() -> Self {
        Self {
            colour_map: ColourMap::Green,
            scale: ColourScaleType::Log,
            min_value: 0.0,
            max_value: 1.0,
            threshold: 0.0,
            gain: 1.0,
            rotation: 0,
        }
    }
}

/// Pure mapping from a magnitude (or phase) to a palette index and colour.
///
/// Index 0 means "below threshold" and is drawn in the map's background
/// colour. Equal inputs always produce equal outputs.
#[derive(Debug, Clone)]
pub struct ColourScale {
    params: ColourScaleParams,
    mapped_min: f64,
    mapped_max: f64,
    palette: Palette,
}

const MAX_PIXEL: i32 = PALETTE_SIZE as i32 - 1;

/// Smallest value that a log scale will represent.
const LOG_FLOOR: f64 = 1e-10;

impl ColourScale {
    pub fn new(params: ColourScaleParams) -> Self {
        let (mapped_min, mapped_max) = match params.scale {
            ColourScaleType::Log => {
                let floor = params.min_value.max(params.threshold).max(LOG_FLOOR);
                let top = params.max_value.max(floor * 10.0);
                (multiplier_to_db(floor), multiplier_to_db(top))
            }
            ColourScaleType::PlusMinusOne => (-1.0, 1.0),
            ColourScaleType::Absolute => (params.min_value.abs(), params.max_value.abs()),
            _ => (params.min_value, params.max_value),
        };
        Self {
            params,
            mapped_min,
            mapped_max,
            palette: Palette::new(params.colour_map),
        }
    }

    pub fn params(&self) -> &ColourScaleParams {
        &self.params
    }

    pub fn scale(&self) -> ColourScaleType {
        self.params.scale
    }

    /// Palette index for `value`, before rotation.
    pub fn pixel(&self, value: f64) -> u8 {
        if value.is_nan() {
            return 0;
        }

        if self.params.scale == ColourScaleType::Phase {
            let half = (MAX_PIXEL - 1) as f64 / 2.0;
            let pixel = 1 + (value * half / PI + half) as i32;
            return pixel.clamp(1, MAX_PIXEL) as u8;
        }

        let value = value * self.params.gain;
        if value < self.params.threshold {
            return 0;
        }

        let mapped = match self.params.scale {
            ColourScaleType::Log => multiplier_to_db(value),
            ColourScaleType::Absolute => value.abs(),
            _ => value,
        };

        if self.params.scale == ColourScaleType::Meter {
            let span = self.mapped_max - self.mapped_min;
            let proportion = if span > 0.0 {
                ((mapped - self.mapped_min) / span).clamp(0.0, 1.0)
            } else {
                0.0
            };
            return (multiplier_to_meter(proportion, MAX_PIXEL - 1) + 1) as u8;
        }

        let span = self.mapped_max - self.mapped_min;
        let proportion = if span > 0.0 {
            ((mapped - self.mapped_min) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let pixel = (proportion * (MAX_PIXEL - 1) as f64) as i32 + 1;
        pixel.clamp(1, MAX_PIXEL) as u8
    }

    /// Palette index for `value` after rotation.
    pub fn colour_index(&self, value: f64) -> u8 {
        rotate_index(self.pixel(value), self.params.rotation)
    }

    pub fn colour(&self, value: f64) -> Rgba<u8> {
        self.palette.colour(self.colour_index(value))
    }

    pub fn background(&self) -> Rgba<u8> {
        self.palette.colour(0)
    }
}

/// Shift a palette index cyclically inside `1..=255`, leaving 0 in place.
pub fn rotate_index(index: u8, rotation: i32) -> u8 {
    if index == 0 {
        return 0;
    }
    let span = MAX_PIXEL;
    (1 + (index as i32 - 1 + rotation).rem_euclid(span)) as u8
}
