//! Colour maps and value-to-colour scales

mod colour_map;
mod colour_scale;

pub use colour_map::{ColourMap, Palette, PALETTE_SIZE};
pub use colour_scale::{rotate_index, ColourScale, ColourScaleParams, ColourScaleType};
