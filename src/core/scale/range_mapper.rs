// src/core/scale/range_mapper.rs
//
// Integer position <-> value mappings used by zoom controls and property
// editors.

/// Maps an integer control position onto a value and back.
pub trait RangeMapper {
    fn position_for_value(&self, value: f64) -> i32;

    fn value_for_position(&self, position: i32) -> f64;

    fn unit(&self) -> &str;
}

/// Linear mapping of `min_pos..=max_pos` onto `min_value..=max_value`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRangeMapper {
    min_pos: i32,
    max_pos: i32,
    min_value: f64,
    max_value: f64,
    unit: String,
}

impl LinearRangeMapper {
    pub fn new(min_pos: i32, max_pos: i32, min_value: f64, max_value: f64, unit: &str) -> Self {
        Self {
            min_pos,
            max_pos,
            min_value,
            max_value,
            unit: unit.to_string(),
        }
    }
}

impl RangeMapper for LinearRangeMapper {
    fn position_for_value(&self, value: f64) -> i32 {
        let span = self.max_value - self.min_value;
        if span == 0.0 {
            return self.min_pos;
        }
        let proportion = (value - self.min_value) / span;
        let position = self.min_pos as f64 + proportion * (self.max_pos - self.min_pos) as f64;
        (position.round() as i32).clamp(self.min_pos.min(self.max_pos), self.min_pos.max(self.max_pos))
    }

    fn value_for_position(&self, position: i32) -> f64 {
        let lo = self.min_pos.min(self.max_pos);
        let hi = self.min_pos.max(self.max_pos);
        let position = position.clamp(lo, hi);
        let span = (self.max_pos - self.min_pos) as f64;
        if span == 0.0 {
            return self.min_value;
        }
        self.min_value + (position - self.min_pos) as f64 / span * (self.max_value - self.min_value)
    }

    fn unit(&self) -> &str {
        &self.unit
    }
}

/// Vertical zoom steps for a spectrogram.
///
/// Step 0 spans DC to Nyquist; each further step divides the visible
/// frequency span by the fourth root of 2, down to a span of 0.1 Hz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrogramRangeMapper {
    dist: f64,
    step: f64,
}

/// Smallest span a zoom step can reach, in Hz.
const MIN_SPAN: f64 = 0.1;

impl SpectrogramRangeMapper {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            dist: sample_rate as f64 / 2.0,
            step: 2.0f64.sqrt().sqrt(),
        }
    }
}

impl RangeMapper for SpectrogramRangeMapper {
    fn position_for_value(&self, value: f64) -> i32 {
        let mut dist = self.dist;
        let mut n = 0;
        while dist > value + 0.00001 && dist > MIN_SPAN {
            dist /= self.step;
            n += 1;
        }
        n
    }

    fn value_for_position(&self, position: i32) -> f64 {
        let mut dist = self.dist;
        for _ in 0..position.max(0) {
            dist /= self.step;
        }
        dist
    }

    fn unit(&self) -> &str {
        "Hz"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_mapper() {
        let gain = LinearRangeMapper::new(-50, 50, -25.0, 25.0, "dB");
        assert_eq!(gain.position_for_value(0.0), 0);
        assert_eq!(gain.position_for_value(25.0), 50);
        assert_eq!(gain.position_for_value(100.0), 50);
        assert!((gain.value_for_position(-50) + 25.0).abs() < 1e-12);
        assert_eq!(gain.unit(), "dB");
    }

    #[test]
    fn test_zoom_steps() {
        let m = SpectrogramRangeMapper::new(44100);
        assert_eq!(m.position_for_value(22050.0), 0);
        assert!((m.value_for_position(4) - 11025.0).abs() < 1e-6);
        assert_eq!(m.position_for_value(11025.0), 4);
        // Spans between steps round towards the narrower step
        assert_eq!(m.position_for_value(12000.0), 4);
        assert!(m.position_for_value(0.0) > 60);
    }
}
