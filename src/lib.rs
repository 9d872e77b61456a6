//! spectrolayer - Incremental spectrogram layer rendering
//!
//! A spectrogram layer turns one channel of an audio source into a
//! time-frequency image. The expensive parts are cached: the sliding-window
//! FFT is computed once per configuration, and every attached view keeps a
//! scrollable image cache so repaints only compute what is new.
//!
//! ## Features
//!
//! - **Lazy FFT model**: built on first use, rebuilt only when the window,
//!   hop, channel or source changes, with a memory ceiling
//! - **Time-budgeted painting**: render as many columns as fit in a budget
//!   and ask the view to repaint the rest
//! - **Colour scales**: linear, meter, dB and phase over a set of colour maps
//! - **Column normalization**: per-column peak, sum, hybrid, or visible-area
//! - **Peak displays**: all bins, local-peak bins, or peaks placed at their
//!   phase-refined frequency
//! - **Session attributes**: save and restore settings, including legacy forms
//!
//! ## Module Structure
//!
//! - `core` - audio source contract, FFT model, colour, scales and rendering
//! - `layer` - the spectrogram layer, its properties and session attributes
//! - `config` - configuration, presets and preferences
//! - `cli` - command-line interface
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use spectrolayer::config::{Configuration, LayerPreset};
//! use spectrolayer::core::{MemoryAudioSource, OffscreenView};
//! use spectrolayer::layer::SpectrogramLayer;
//! use std::sync::Arc;
//!
//! let source = MemoryAudioSource::from_wav(path)?;
//! let frames = source.frame_count();
//!
//! let mut layer = SpectrogramLayer::new(Configuration::from_preset(LayerPreset::Default));
//! layer.set_source(Some(Arc::new(source)));
//!
//! let view = OffscreenView::covering(1, 0, frames, 1200, 512);
//! let image = layer.render_image(&view);
//! image.save("spectrogram.png")?;
//! ```
//!
//! ## Presets
//!
//! | Preset        | Window | Range          | Display                       |
//! |---------------|--------|----------------|-------------------------------|
//! | default       | 1024   | 10 - 8000 Hz   | dB, all bins                  |
//! | full-range-db | 1024   | 10 Hz - Nyquist| dB, all bins                  |
//! | melodic-range | 8192   | 40 - 1500 Hz   | linear, log axis              |
//! | melodic-peaks | 4096   | 40 - 2000 Hz   | peak frequencies, normalized  |

// Data pipeline
pub mod core;

// Layers
pub mod layer;

// Command-line interface
pub mod cli;

// Configuration and presets
pub mod config;

pub mod error;

// Re-export commonly used types at crate root for convenience
pub use config::{Configuration, ConfigurationBuilder, LayerPreset, Preferences, SpectrogramSmoothing};
pub use core::{
    AudioSource, BinDisplay, BinScale, ColourMap, ColourScaleType, ColumnNormalization, FftModel,
    Frame, MemoryAudioSource, OffscreenView, Rect, View, ViewId,
};
pub use error::{Result, SpectrogramError};
pub use layer::{Layer, LayerEvent, SpectrogramLayer};
