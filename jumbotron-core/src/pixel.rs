//! Cell and color leaf types.
//!
//! `Pixel` is the wire cell the device serves: an RGB triple plus an
//! independent brightness scalar. Field names match the device JSON
//! exactly, so the struct doubles as the serde wire type.

use serde::{Deserialize, Serialize};

use crate::error::JumboError;

// ── Pixel ────────────────────────────────────────────────────────

/// One cell of the LED matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pixel {
    /// Red intensity, 0–255.
    pub r: u8,
    /// Green intensity, 0–255.
    pub g: u8,
    /// Blue intensity, 0–255.
    pub b: u8,
    /// Brightness scalar, 0–255 (the device may honor a narrower range).
    pub brightness: u8,
}

impl Pixel {
    pub const fn new(r: u8, g: u8, b: u8, brightness: u8) -> Self {
        Self { r, g, b, brightness }
    }

    /// `true` when the cell is fully dark (zero color, zero brightness).
    pub fn is_dark(&self) -> bool {
        self.r == 0 && self.g == 0 && self.b == 0 && self.brightness == 0
    }

    /// The cell's color as an [`Rgb`] triple.
    pub fn rgb(&self) -> Rgb {
        Rgb {
            r: self.r,
            g: self.g,
            b: self.b,
        }
    }
}

// ── Rgb ──────────────────────────────────────────────────────────

/// An RGB triple without brightness, as carried by mutation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb = Rgb { r: 255, g: 255, b: 255 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Parse a `#RRGGBB` color string into a triple.
///
/// The conversion is exact: each channel is the integer value of its
/// two hex digits. Anything that is not a `#` followed by six hex
/// digits is rejected.
pub fn hex_to_rgb(hex: &str) -> Result<Rgb, JumboError> {
    let digits = hex
        .strip_prefix('#')
        .ok_or_else(|| JumboError::InvalidHexColor(hex.to_string()))?;
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(JumboError::InvalidHexColor(hex.to_string()));
    }

    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16)
            .map_err(|_| JumboError::InvalidHexColor(hex.to_string()))
    };

    Ok(Rgb {
        r: channel(0..2)?,
        g: channel(2..4)?,
        b: channel(4..6)?,
    })
}

/// Format a triple as an uppercase `#RRGGBB` string.
pub fn rgb_to_hex(rgb: Rgb) -> String {
    format!("#{:02X}{:02X}{:02X}", rgb.r, rgb.g, rgb.b)
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_to_rgb_exact() {
        let rgb = hex_to_rgb("#FF00A0").unwrap();
        assert_eq!(rgb, Rgb::new(255, 0, 160));

        assert_eq!(hex_to_rgb("#000000").unwrap(), Rgb::BLACK);
        assert_eq!(hex_to_rgb("#ffffff").unwrap(), Rgb::WHITE);
    }

    #[test]
    fn hex_roundtrip() {
        for hex in ["#000000", "#FF00A0", "#123456", "#ABCDEF"] {
            let rgb = hex_to_rgb(hex).unwrap();
            assert_eq!(rgb_to_hex(rgb), *hex);
        }
    }

    #[test]
    fn hex_rejects_malformed() {
        for bad in ["FF00A0", "#FF00A", "#FF00A0B", "#GG0000", "", "#"] {
            assert!(
                matches!(hex_to_rgb(bad), Err(JumboError::InvalidHexColor(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn pixel_wire_field_names() {
        let p = Pixel::new(1, 2, 3, 40);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"r":1,"g":2,"b":3,"brightness":40}"#);

        let back: Pixel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn default_pixel_is_dark() {
        assert!(Pixel::default().is_dark());
        assert!(!Pixel::new(0, 0, 0, 255).is_dark());
    }
}
