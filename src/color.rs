//! CSS-style color values as used by the color inputs and the project file.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Straight-alpha RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const BLACK: Color = Color([0, 0, 0, 255]);
    pub const WHITE: Color = Color([255, 255, 255, 255]);
    pub const TRANSPARENT: Color = Color([0, 0, 0, 0]);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color([r, g, b, 255])
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color([r, g, b, a])
    }

    pub fn to_rgba(self) -> image::Rgba<u8> {
        image::Rgba(self.0)
    }

    pub fn alpha(self) -> u8 {
        self.0[3]
    }

    /// `#rrggbb` for opaque colors, `#rrggbbaa` otherwise.
    pub fn to_hex(self) -> String {
        let [r, g, b, a] = self.0;
        if a == 255 {
            format!("#{:02x}{:02x}{:02x}", r, g, b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", r, g, b, a)
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorParseError(pub String);

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid color '{}'", self.0)
    }
}

impl std::error::Error for ColorParseError {}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let err = || ColorParseError(s.to_string());

        if let Some(hex) = trimmed.strip_prefix('#') {
            if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(err());
            }
            let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).map(|v| v * 17);
            let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
            return match hex.len() {
                3 => Ok(Color::rgb(
                    nibble(0).map_err(|_| err())?,
                    nibble(1).map_err(|_| err())?,
                    nibble(2).map_err(|_| err())?,
                )),
                6 | 8 => {
                    let a = if hex.len() == 8 { byte(6).map_err(|_| err())? } else { 255 };
                    Ok(Color::rgba(
                        byte(0).map_err(|_| err())?,
                        byte(2).map_err(|_| err())?,
                        byte(4).map_err(|_| err())?,
                        a,
                    ))
                }
                _ => Err(err()),
            };
        }

        // rgb(r, g, b) / rgba(r, g, b, a) with a in 0..=1
        let lower = trimmed.to_ascii_lowercase();
        let (body, has_alpha) = if let Some(b) = lower.strip_prefix("rgba(") {
            (b, true)
        } else if let Some(b) = lower.strip_prefix("rgb(") {
            (b, false)
        } else {
            return Err(err());
        };
        let body = body.strip_suffix(')').ok_or_else(err)?;
        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        if parts.len() != if has_alpha { 4 } else { 3 } {
            return Err(err());
        }
        let channel = |p: &str| -> Result<u8, ColorParseError> {
            let v: f32 = p.parse().map_err(|_| err())?;
            Ok(v.round().clamp(0.0, 255.0) as u8)
        };
        let a = if has_alpha {
            let v: f32 = parts[3].parse().map_err(|_| err())?;
            (v.clamp(0.0, 1.0) * 255.0).round() as u8
        } else {
            255
        };
        Ok(Color::rgba(channel(parts[0])?, channel(parts[1])?, channel(parts[2])?, a))
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
