// src/core/normalization.rs
//
// Per-column magnitude rescaling and the observed-range tracker used for
// visible-area normalization.

use serde::{Deserialize, Serialize};

/// Per-column normalization policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ColumnNormalization {
    #[default]
    None,
    /// Scale each column so its peak is 1.
    Max1,
    /// Scale each column so its absolute values sum to 1.
    Sum1,
    /// Column peak scaled to `log10(peak + 1)`.
    Hybrid,
}

impl ColumnNormalization {
    /// Rescale a column in place.
    pub fn normalize(self, column: &mut [f32]) {
        let factor = match self {
            Self::None => return,
            Self::Max1 => {
                let max = column_max(column);
                if max <= 0.0 {
                    return;
                }
                1.0 / max
            }
            Self::Sum1 => {
                let sum: f32 = column.iter().map(|v| v.abs()).sum();
                if sum <= 0.0 {
                    return;
                }
                1.0 / sum
            }
            Self::Hybrid => {
                let max = column_max(column);
                if max <= 0.0 {
                    return;
                }
                (max + 1.0).log10() / max
            }
        };
        for v in column.iter_mut() {
            *v *= factor;
        }
    }
}

fn column_max(column: &[f32]) -> f32 {
    column.iter().fold(0.0f32, |m, &v| m.max(v.abs()))
}

/// Running min/max over magnitudes seen while rendering.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MagnitudeRange {
    min: f32,
    max: f32,
    set: bool,
}

impl MagnitudeRange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.set
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    /// Widen to include `value`. Returns true if the range changed.
    pub fn sample(&mut self, value: f32) -> bool {
        if !self.set {
            self.min = value;
            self.max = value;
            self.set = true;
            return true;
        }
        let mut changed = false;
        if value < self.min {
            self.min = value;
            changed = true;
        }
        if value > self.max {
            self.max = value;
            changed = true;
        }
        changed
    }

    /// Widen to include another range.
    pub fn sample_range(&mut self, other: &MagnitudeRange) -> bool {
        if !other.set {
            return false;
        }
        let a = self.sample(other.min);
        let b = self.sample(other.max);
        a || b
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
