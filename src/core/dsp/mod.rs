//! Digital Signal Processing utilities

mod fft;
mod windows;

pub use fft::FftProcessor;
pub use windows::{create_window, WindowType};

use std::f64::consts::PI;

/// Level reported for a zero multiplier.
pub const DB_FLOOR: f64 = -1000.0;

/// Convert a linear amplitude multiplier to decibels.
pub fn multiplier_to_db(multiplier: f64) -> f64 {
    if multiplier <= 0.0 {
        return DB_FLOOR;
    }
    20.0 * multiplier.log10()
}

/// Convert decibels to a linear amplitude multiplier.
pub fn db_to_multiplier(db: f64) -> f64 {
    if db <= DB_FLOOR {
        return 0.0;
    }
    10.0f64.powf(db / 20.0)
}

/// IEC 60268-18 meter deflection (0-100) for a level in dB.
pub fn iec_deflection(db: f64) -> f64 {
    if db < -70.0 {
        0.0
    } else if db < -60.0 {
        (db + 70.0) * 0.25
    } else if db < -50.0 {
        (db + 60.0) * 0.5 + 2.5
    } else if db < -40.0 {
        (db + 50.0) * 0.75 + 7.5
    } else if db < -30.0 {
        (db + 40.0) * 1.5 + 15.0
    } else if db < -20.0 {
        (db + 30.0) * 2.0 + 30.0
    } else {
        (db + 20.0) * 2.5 + 50.0
    }
}

/// Map a linear multiplier onto a meter position in `0..=max_level`.
pub fn multiplier_to_meter(multiplier: f64, max_level: i32) -> i32 {
    let deflection = iec_deflection(multiplier_to_db(multiplier));
    let level = (deflection * max_level as f64 / 100.0) as i32;
    level.clamp(0, max_level)
}

/// Wrap a phase value into `[-pi, pi)`.
pub fn princarg(angle: f64) -> f64 {
    (angle + PI).rem_euclid(2.0 * PI) - PI
}

const PITCH_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Whether a frequency falls inside the MIDI pitch range.
pub fn is_frequency_in_midi_range(frequency: f64) -> bool {
    let (pitch, _) = midi_pitch_for_frequency(frequency);
    (0..=127).contains(&pitch)
}

/// Nearest MIDI pitch (A4 = 440 Hz = 69) and the offset from it in cents.
pub fn midi_pitch_for_frequency(frequency: f64) -> (i32, f64) {
    if frequency <= 0.0 {
        return (-1, 0.0);
    }
    let exact = 69.0 + 12.0 * (frequency / 440.0).log2();
    let pitch = exact.round();
    (pitch as i32, (exact - pitch) * 100.0)
}

/// Pitch label such as `A4` or `C#3+12c`.
pub fn pitch_label_for_frequency(frequency: f64) -> String {
    let (pitch, cents) = midi_pitch_for_frequency(frequency);
    if pitch < 0 {
        return String::new();
    }
    let name = PITCH_NAMES[(pitch % 12) as usize];
    let octave = pitch / 12 - 1;
    let cents = cents.round() as i32;
    if cents == 0 {
        format!("{}{}", name, octave)
    } else {
        format!("{}{}{:+}c", name, octave, cents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_conversion() {
        assert!((multiplier_to_db(1.0)).abs() < 1e-12);
        assert!((multiplier_to_db(0.1) + 20.0).abs() < 1e-9);
        assert_eq!(multiplier_to_db(0.0), DB_FLOOR);
        assert!((db_to_multiplier(-20.0) - 0.1).abs() < 1e-12);
        assert_eq!(db_to_multiplier(DB_FLOOR), 0.0);
    }

    #[test]
    fn test_meter_scale() {
        assert_eq!(multiplier_to_meter(0.0, 254), 0);
        assert_eq!(multiplier_to_meter(1.0, 254), 254);
        let quiet = multiplier_to_meter(db_to_multiplier(-40.0), 254);
        let loud = multiplier_to_meter(db_to_multiplier(-10.0), 254);
        assert!(quiet < loud);
    }

    #[test]
    fn test_princarg() {
        assert!((princarg(2.5 * PI) - 0.5 * PI).abs() < 1e-9);
        assert!((princarg(0.5) - 0.5).abs() < 1e-12);
        assert!((princarg(-0.5 - 2.0 * PI) + 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_pitch_labels() {
        assert_eq!(pitch_label_for_frequency(440.0), "A4");
        assert_eq!(pitch_label_for_frequency(261.6256), "C4");
        assert!(pitch_label_for_frequency(450.0).starts_with("A4+"));
        assert!(is_frequency_in_midi_range(1000.0));
        assert!(!is_frequency_in_midi_range(20000.0));
    }
}
