// src/core/colour/colour_map.rs
//
// Named colour maps and the 256-entry palettes built from them.

use image::Rgba;
use serde::{Deserialize, Serialize};

/// Number of palette entries; index 0 is reserved for "no value".
pub const PALETTE_SIZE: usize = 256;

/// Colour map for spectrogram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ColourMap {
    #[default]
    Green,
    Sunset,
    WhiteOnBlack,
    BlackOnWhite,
    Cherry,
    Wasp,
    Ice,
    FruitSalad,
    Banded,
    Highlight,
    Printer,
    HighGain,
}

impl ColourMap {
    pub fn all() -> Vec<Self> {
        vec![
            Self::Green,
            Self::Sunset,
            Self::WhiteOnBlack,
            Self::BlackOnWhite,
            Self::Cherry,
            Self::Wasp,
            Self::Ice,
            Self::FruitSalad,
            Self::Banded,
            Self::Highlight,
            Self::Printer,
            Self::HighGain,
        ]
    }

    pub fn count() -> usize {
        Self::all().len()
    }

    /// Map from the integer id used by sessions and the property surface.
    pub fn from_id(id: i32) -> Option<Self> {
        if id < 0 {
            return None;
        }
        Self::all().get(id as usize).copied()
    }

    pub fn id(self) -> i32 {
        Self::all().iter().position(|&m| m == self).unwrap_or(0) as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Green => "Green",
            Self::Sunset => "Sunset",
            Self::WhiteOnBlack => "White on Black",
            Self::BlackOnWhite => "Black on White",
            Self::Cherry => "Cherry",
            Self::Wasp => "Wasp",
            Self::Ice => "Ice",
            Self::FruitSalad => "Fruit Salad",
            Self::Banded => "Banded",
            Self::Highlight => "Highlight",
            Self::Printer => "Printer",
            Self::HighGain => "High Gain",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let wanted: String = name.to_lowercase().chars().filter(|c| c.is_alphanumeric()).collect();
        Self::all().into_iter().find(|m| {
            let n: String = m.name().to_lowercase().chars().filter(|c| c.is_alphanumeric()).collect();
            n == wanted
        })
    }

    pub fn has_light_background(self) -> bool {
        matches!(self, Self::BlackOnWhite | Self::Printer)
    }

    /// Colour drawn where nothing is above threshold.
    pub fn background(self) -> Rgba<u8> {
        if self.has_light_background() {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([0, 0, 0, 255])
        }
    }

    /// Colour for a proportion in [0, 1].
    pub fn map(self, proportion: f64) -> Rgba<u8> {
        let n = proportion.clamp(0.0, 1.0);
        let (r, g, b) = match self {
            Self::Green => hsv_to_rgb((256.0 - n * 106.0) / 360.0, 0.4 + n * 0.6, 0.3 + n * 0.7),
            Self::Sunset => {
                let r = ((n - 0.24) * 2.38).clamp(0.0, 1.0);
                let g = ((n - 0.64) * 2.777).clamp(0.0, 1.0);
                let mut b = 3.6 * n;
                if n > 0.277 {
                    b = 2.0 - b;
                }
                (r, g, b.clamp(0.0, 1.0))
            }
            Self::WhiteOnBlack => (n, n, n),
            Self::BlackOnWhite => (1.0 - n, 1.0 - n, 1.0 - n),
            Self::Cherry => (n.sqrt(), n * n * 0.6, n * 0.3),
            Self::Wasp => (n, n, n * n * n),
            Self::Ice => (n * n, n.powf(1.5), n.sqrt()),
            Self::FruitSalad => hsv_to_rgb(n, 1.0, 1.0),
            Self::Banded => {
                let band = (n * 10.0).floor();
                let v = if band as i32 % 2 == 0 { 0.5 + n * 0.5 } else { n * 0.5 };
                hsv_to_rgb(n * 0.8, 0.8, v)
            }
            Self::Highlight => {
                if n > 0.99 {
                    (1.0, 1.0, 1.0)
                } else {
                    (n * 0.3, n * 0.3, n * 0.4)
                }
            }
            Self::Printer => {
                let stepped = 1.0 - (n * 8.0).floor() / 8.0;
                (stepped, stepped, stepped)
            }
            Self::HighGain => {
                let v = n.sqrt();
                (v, v, v)
            }
        };
        Rgba([to_u8(r), to_u8(g), to_u8(b), 255])
    }
}

fn to_u8(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn hsv_to_rgb(h: f64, s: f64, v: f64) -> (f64, f64, f64) {
    let h = h.rem_euclid(1.0) * 6.0;
    let i = h.floor();
    let f = h - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match i as i32 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}

/// Precomputed colours for palette indices `0..256` of one colour map.
#[derive(Debug, Clone)]
pub struct Palette {
    map: ColourMap,
    table: Vec<Rgba<u8>>,
}

impl Palette {
    pub fn new(map: ColourMap) -> Self {
        let mut table = Vec::with_capacity(PALETTE_SIZE);
        table.push(map.background());
        for index in 1..PALETTE_SIZE {
            let proportion = (index - 1) as f64 / (PALETTE_SIZE - 2) as f64;
            table.push(map.map(proportion));
        }
        Self { map, table }
    }

    pub fn colour_map(&self) -> ColourMap {
        self.map
    }

    pub fn colour(&self, index: u8) -> Rgba<u8> {
        self.table[index as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_round_trip() {
        for map in ColourMap::all() {
            assert_eq!(ColourMap::from_id(map.id()), Some(map));
        }
        assert_eq!(ColourMap::from_id(-1), None);
        assert_eq!(ColourMap::from_id(99), None);
    }

    #[test]
    fn test_names() {
        assert_eq!(ColourMap::from_name("white on black"), Some(ColourMap::WhiteOnBlack));
        assert_eq!(ColourMap::from_name("fruitsalad"), Some(ColourMap::FruitSalad));
        assert_eq!(ColourMap::from_name("plaid"), None);
    }

    #[test]
    fn test_palette_extremes() {
        let palette = Palette::new(ColourMap::WhiteOnBlack);
        assert_eq!(palette.colour(0), Rgba([0, 0, 0, 255]));
        assert_eq!(palette.colour(1), Rgba([0, 0, 0, 255]));
        assert_eq!(palette.colour(255), Rgba([255, 255, 255, 255]));
        assert!(ColourMap::BlackOnWhite.has_light_background());
        assert!(!ColourMap::Green.has_light_background());
    }
}
