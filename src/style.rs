//! Colors and render options.

use std::fmt;
use std::str::FromStr;

use image::Rgba;
use qrcode::EcLevel;
use serde::{Deserialize, Serialize};

use crate::error::{QrError, Result};

/// Side length of the on-screen preview, in pixels.
pub const PREVIEW_SIZE: u32 = 256;

/// Largest side length accepted for rendering, in pixels.
pub const MAX_SIZE: u32 = 8192;

/// An RGBA color parsed from a CSS-style hex string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parses `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`; the `#` is optional.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.trim();
        let digits = digits.strip_prefix('#').unwrap_or(digits);
        let invalid = || QrError::InvalidColor(hex.to_string());

        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        // Short forms double every digit: "f0a" -> "ff00aa".
        let expanded: String = match digits.len() {
            3 | 4 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 | 8 => digits.to_string(),
            _ => return Err(invalid()),
        };

        let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).map_err(|_| invalid());
        let alpha = if expanded.len() == 8 { channel(6)? } else { 255 };

        Ok(Self::rgba(channel(0)?, channel(2)?, channel(4)?, alpha))
    }

    pub fn to_hex(&self) -> String {
        if self.is_opaque() {
            self.to_hex_rgb()
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// `#rrggbb`, ignoring alpha.
    pub fn to_hex_rgb(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn is_opaque(&self) -> bool {
        self.a == 255
    }

    /// The same color with the alpha channel forced to fully opaque.
    pub fn opaque(self) -> Self {
        Self { a: 255, ..self }
    }

    /// Alpha as a 0.0..=1.0 fraction, for SVG opacity attributes.
    pub fn alpha_fraction(&self) -> f32 {
        f32::from(self.a) / 255.0
    }
}

impl From<Color> for Rgba<u8> {
    fn from(c: Color) -> Self {
        Rgba([c.r, c.g, c.b, c.a])
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = QrError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for Color {
    type Error = QrError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_hex(&value)
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_hex()
    }
}

/// Options handed to the encoding engine.
///
/// Colors and size vary; the error-correction level and margin do not.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderStyle {
    pub foreground: Color,
    pub background: Color,
    /// Requested side length in pixels.
    pub size: u32,
}

impl RenderStyle {
    /// Always the strictest level, trading capacity for redundancy.
    pub const ERROR_CORRECTION: EcLevel = EcLevel::H;

    /// Quiet zone around the symbol, in modules.
    pub const MARGIN: u32 = 0;

    /// Fails with [`QrError::InvalidSize`] unless `1 <= size <= MAX_SIZE`.
    pub fn new(foreground: Color, background: Color, size: u32) -> Result<Self> {
        if size == 0 || size > MAX_SIZE {
            return Err(QrError::InvalidSize(size));
        }
        Ok(Self { foreground, background, size })
    }

    /// Style used for the live preview.
    pub fn preview(foreground: Color, background: Color) -> Self {
        Self { foreground, background, size: PREVIEW_SIZE }
    }

    pub fn error_correction(&self) -> EcLevel {
        Self::ERROR_CORRECTION
    }

    pub fn margin(&self) -> u32 {
        Self::MARGIN
    }
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self::preview(Color::BLACK, Color::WHITE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!(Color::from_hex("#000000").unwrap(), Color::BLACK);
        assert_eq!(Color::from_hex("FFFFFF").unwrap(), Color::WHITE);
        assert_eq!(Color::from_hex("#f0a").unwrap(), Color::rgb(0xff, 0x00, 0xaa));
        assert_eq!(Color::from_hex("#f0a8").unwrap(), Color::rgba(0xff, 0x00, 0xaa, 0x88));
        assert_eq!(Color::from_hex("#12345678").unwrap(), Color::rgba(0x12, 0x34, 0x56, 0x78));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for input in ["", "#", "#12", "#12345", "#1234567", "#gggggg", "red", "#ffffff0000"] {
            assert!(Color::from_hex(input).is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn test_hex_output() {
        assert_eq!(Color::rgb(255, 0, 128).to_hex(), "#ff0080");
        assert_eq!(Color::rgba(255, 255, 255, 0).to_hex(), "#ffffff00");
        assert_eq!(Color::rgba(1, 2, 3, 0).opaque(), Color::rgb(1, 2, 3));
    }

    #[test]
    fn test_render_style_constants() {
        let style = RenderStyle::new(Color::BLACK, Color::WHITE, 512).unwrap();
        assert_eq!(style.error_correction(), EcLevel::H);
        assert_eq!(style.margin(), 0);
        assert_eq!(RenderStyle::default().size, PREVIEW_SIZE);
        assert!(RenderStyle::new(Color::BLACK, Color::WHITE, 0).is_err());
    }

    #[test]
    fn test_render_style_size_bounds() {
        assert!(RenderStyle::new(Color::BLACK, Color::WHITE, 1).is_ok());
        assert!(RenderStyle::new(Color::BLACK, Color::WHITE, MAX_SIZE).is_ok());
        assert!(matches!(
            RenderStyle::new(Color::BLACK, Color::WHITE, 60_000),
            Err(QrError::InvalidSize(60_000))
        ));
    }
}
