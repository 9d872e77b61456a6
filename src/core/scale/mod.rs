//! Frequency axis mapping and zoom step mappers

mod bin_mapper;
mod range_mapper;

pub use bin_mapper::{frequency_for_y, y_for_frequency, BinMapper, BinScale};
pub use range_mapper::{LinearRangeMapper, RangeMapper, SpectrogramRangeMapper};
