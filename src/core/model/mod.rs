//! Transform models derived from an audio source

mod fft_model;
mod peak_cache;

pub use fft_model::{FftModel, FftModelKey};
pub(crate) use fft_model::is_peak_in;
pub use peak_cache::{PeakCache, DEFAULT_PEAK_DIVISOR};
