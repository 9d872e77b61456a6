//! Spectrogram data pipeline: audio source contract, transform model,
//! colour mapping, frequency axis mapping and incremental rendering

pub mod audio;
pub mod colour;
pub mod dsp;
pub mod model;
pub mod normalization;
pub mod render;
pub mod scale;
pub mod view;

pub use audio::{AudioSource, Frame, MemoryAudioSource, SourceChange};
pub use colour::{ColourMap, ColourScale, ColourScaleParams, ColourScaleType};
pub use model::{FftModel, FftModelKey, PeakCache};
pub use normalization::{ColumnNormalization, MagnitudeRange};
pub use render::{BinDisplay, RenderResult, Renderer};
pub use scale::{BinMapper, BinScale};
pub use view::{OffscreenView, Rect, View, ViewId};
