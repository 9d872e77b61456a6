//! FFT processing with windowing

use rustfft::{Fft, FftPlanner, num_complex::Complex};
use std::sync::Arc;
use super::windows::{WindowType, create_window};

/// Windowed, zero-padded FFT of fixed-size frames.
///
/// The windowed frame is centred in the FFT buffer and rotated so its centre
/// sits at index 0, which makes the phase of every bin relative to the frame
/// centre. Phase-difference frequency estimation depends on this.
pub struct FftProcessor {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    window_size: usize,
    fft_size: usize,
}

impl FftProcessor {
    pub fn new(window_size: usize, fft_size: usize, window_type: WindowType) -> Self {
        let fft_size = fft_size.max(window_size);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        Self {
            fft,
            window: create_window(window_size, window_type),
            window_size,
            fft_size,
        }
    }

    /// Compute the complex spectrum (bins `0..=fft_size/2`) of one frame.
    ///
    /// Frames shorter than the window are zero-filled at the end.
    pub fn complex_spectrum(&self, frame: &[f32]) -> Vec<Complex<f32>> {
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.fft_size];
        let offset = (self.fft_size - self.window_size) / 2;

        for (i, (&s, &w)) in frame.iter().zip(self.window.iter()).enumerate() {
            buffer[offset + i] = Complex::new(s * w, 0.0);
        }

        buffer.rotate_left(self.fft_size / 2);
        self.fft.process(&mut buffer);

        buffer.truncate(self.fft_size / 2 + 1);
        buffer
    }

    /// Compute magnitude spectrum
    pub fn magnitude_spectrum(&self, frame: &[f32]) -> Vec<f32> {
        self.complex_spectrum(frame)
            .iter()
            .map(|c| (c.re * c.re + c.im * c.im).sqrt())
            .collect()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of bins produced per frame
    pub fn height(&self) -> usize {
        self.fft_size / 2 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_spectrum_height() {
        let processor = FftProcessor::new(1024, 4096, WindowType::Hann);
        let frame = vec![0.0f32; 1024];
        assert_eq!(processor.complex_spectrum(&frame).len(), 2049);
        assert_eq!(processor.height(), 2049);
    }

    #[test]
    fn test_sine_peak_bin() {
        let processor = FftProcessor::new(1024, 1024, WindowType::Hann);
        // Exactly bin 64
        let frame: Vec<f32> = (0..1024)
            .map(|i| (2.0 * PI * 64.0 * i as f32 / 1024.0).sin())
            .collect();
        let mags = processor.magnitude_spectrum(&frame);
        let peak = mags
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 64);
        // Hann-windowed unit sine peaks at about N/4
        assert!((mags[64] - 256.0).abs() < 2.0, "peak magnitude {}", mags[64]);
    }
}
