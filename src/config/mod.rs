//! Configuration module for spectrogram layers

mod settings;

pub use settings::{
    is_valid_window_size, Configuration, ConfigurationBuilder, LayerPreset, Preferences,
    SpectrogramSmoothing, Tunables, MAX_WINDOW_SIZE, MIN_WINDOW_SIZE,
};
