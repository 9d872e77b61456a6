//! Window function implementations

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Window function types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum WindowType {
    Rectangular,
    Bartlett,
    Hamming,
    #[default]
    Hann,
    Blackman,
    Gaussian,
    Parzen,
    Nuttall,
    BlackmanHarris,
}

impl WindowType {
    pub fn all() -> Vec<Self> {
        vec![
            Self::Rectangular,
            Self::Bartlett,
            Self::Hamming,
            Self::Hann,
            Self::Blackman,
            Self::Gaussian,
            Self::Parzen,
            Self::Nuttall,
            Self::BlackmanHarris,
        ]
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "rectangular" | "rect" => Some(Self::Rectangular),
            "bartlett" | "triangular" => Some(Self::Bartlett),
            "hamming" => Some(Self::Hamming),
            "hann" | "hanning" => Some(Self::Hann),
            "blackman" => Some(Self::Blackman),
            "gaussian" => Some(Self::Gaussian),
            "parzen" => Some(Self::Parzen),
            "nuttall" => Some(Self::Nuttall),
            "blackman-harris" | "blackmanharris" => Some(Self::BlackmanHarris),
            _ => None,
        }
    }
}

/// Create window function
pub fn create_window(size: usize, window_type: WindowType) -> Vec<f32> {
    let n = size as f32;
    (0..size)
        .map(|i| {
            let x = i as f32;
            match window_type {
                WindowType::Rectangular => 1.0,
                WindowType::Bartlett => {
                    let half = n / 2.0;
                    1.0 - ((x - half) / half).abs()
                }
                WindowType::Hamming => {
                    0.54 - 0.46 * (2.0 * PI * x / n).cos()
                }
                WindowType::Hann => {
                    0.5 * (1.0 - (2.0 * PI * x / n).cos())
                }
                WindowType::Blackman => {
                    0.42 - 0.5 * (2.0 * PI * x / n).cos()
                        + 0.08 * (4.0 * PI * x / n).cos()
                }
                WindowType::Gaussian => {
                    // sigma = 0.25 of the half-width
                    let half = n / 2.0;
                    let r = (x - half) / (0.25 * half);
                    (-0.5 * r * r).exp()
                }
                WindowType::Parzen => {
                    let half = n / 2.0;
                    let r = ((x - half) / half).abs();
                    if r <= 0.5 {
                        1.0 - 6.0 * r * r + 6.0 * r * r * r
                    } else {
                        2.0 * (1.0 - r).powi(3)
                    }
                }
                WindowType::Nuttall => {
                    0.355768 - 0.487396 * (2.0 * PI * x / n).cos()
                        + 0.144232 * (4.0 * PI * x / n).cos()
                        - 0.012604 * (6.0 * PI * x / n).cos()
                }
                WindowType::BlackmanHarris => {
                    0.35875 - 0.48829 * (2.0 * PI * x / n).cos()
                        + 0.14128 * (4.0 * PI * x / n).cos()
                        - 0.01168 * (6.0 * PI * x / n).cos()
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window() {
        let window = create_window(4, WindowType::Hann);
        assert!((window[0]).abs() < 0.01);  // Should be ~0 at edges
        assert!((window[2] - 1.0).abs() < 0.01);  // Should be ~1 at center
    }

    #[test]
    fn test_windows_peak_at_centre() {
        for wt in WindowType::all() {
            let window = create_window(64, wt);
            assert_eq!(window.len(), 64);
            let centre = window[32];
            assert!(centre > 0.9, "{:?} centre = {}", wt, centre);
            assert!(window.iter().all(|&w| w <= centre + 1e-6), "{:?}", wt);
        }
    }

    #[test]
    fn test_window_names() {
        assert_eq!(WindowType::from_name("Hanning"), Some(WindowType::Hann));
        assert_eq!(WindowType::from_name("blackman-harris"), Some(WindowType::BlackmanHarris));
        assert_eq!(WindowType::from_name("kaiser"), None);
    }
}
