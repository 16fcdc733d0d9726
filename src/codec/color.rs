use std::fmt;

use crate::foundation::error::{TextRenderError, TextRenderResult};

/// Opaque RGB color carried by `fill` and `stroke` commands.
///
/// Serializes as a lowercase `#rrggbb` string.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl HexColor {
    pub const BLACK: Self = Self { r: 0, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` (the leading `#` is optional).
    pub fn parse(s: &str) -> TextRenderResult<Self> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(TextRenderError::validation(format!(
                "color must be #rrggbb, got {s:?}"
            )));
        }
        let packed = u32::from_str_radix(hex, 16).map_err(|e| {
            TextRenderError::validation(format!("color must be #rrggbb, got {s:?}: {e}"))
        })?;
        Ok(unpack_rgb(packed))
    }

    /// Like [`HexColor::parse`], falling back to black the way the engine packs bad colors.
    pub fn parse_or_black(s: &str) -> Self {
        Self::parse(s).unwrap_or(Self::BLACK)
    }

    pub fn packed(self) -> u32 {
        pack_rgb(self.r, self.g, self.b)
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl From<HexColor> for String {
    fn from(c: HexColor) -> Self {
        c.to_string()
    }
}

impl TryFrom<String> for HexColor {
    type Error = TextRenderError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

/// Pack three channels into a 24-bit `0xRRGGBB` integer.
pub fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
}

/// Split a 24-bit `0xRRGGBB` integer into channels. Bits above 24 are ignored.
pub fn unpack_rgb(packed: u32) -> HexColor {
    HexColor {
        r: ((packed >> 16) & 0xff) as u8,
        g: ((packed >> 8) & 0xff) as u8,
        b: (packed & 0xff) as u8,
    }
}

/// Unpack a color as stored in the command buffer (an `f32` holding an integer).
pub fn unpack_buffer_color(value: f32) -> HexColor {
    // saturating float->int; fractional parts are dropped
    unpack_rgb(value as u32)
}

#[cfg(test)]
#[path = "../../tests/unit/codec/color.rs"]
mod tests;
