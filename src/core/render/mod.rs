//! Per-view image caching and incremental rendering

mod image_cache;
mod renderer;

pub use image_cache::ImageCache;
pub(crate) use renderer::{column_range, x_bin_range};
pub use renderer::{
    BinDisplay, RenderParameters, RenderResult, Renderer, Sources, DEFAULT_TIME_BUDGET,
};
