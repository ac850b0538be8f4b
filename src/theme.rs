//! # Theme & Palette
//!
//! A theme is a 4-color palette: `primary` and `accent` carry the brand,
//! `secondary` and `light` are tints of the primary used for chart fills and
//! band backgrounds. Presets are fixed tuples; a custom theme supplies only
//! primary/accent and derives the tints per RGB channel.

use serde::{Deserialize, Serialize};

/// An opaque RGB color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a `#rgb` or `#rrggbb` hex string. Malformed components fall
    /// back to zero, matching lenient CSS-style parsing.
    pub fn hex(hex: &str) -> Self {
        let hex = hex.trim_start_matches('#');
        let (r, g, b) = match hex.len() {
            3 => {
                let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).unwrap_or(0);
                let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).unwrap_or(0);
                let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).unwrap_or(0);
                (r, g, b)
            }
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
                let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
                let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
                (r, g, b)
            }
            _ => (0, 0, 0),
        };
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Channel values as 0.0–1.0 floats, the form PDF color operators take.
    pub fn to_unit(self) -> (f64, f64, f64) {
        (
            self.r as f64 / 255.0,
            self.g as f64 / 255.0,
            self.b as f64 / 255.0,
        )
    }

    /// Blend toward white: `round(c + (255 - c) * (1 - opacity))` per
    /// channel. `opacity = 1.0` is the color itself, `0.0` is white.
    pub fn lighter(self, opacity: f64) -> Self {
        let tint = |c: u8| -> u8 {
            let v = c as f64 + (255.0 - c as f64) * (1.0 - opacity);
            v.round().clamp(0.0, 255.0) as u8
        };
        Self {
            r: tint(self.r),
            g: tint(self.g),
            b: tint(self.b),
        }
    }
}

impl From<Color> for String {
    fn from(c: Color) -> String {
        c.to_hex()
    }
}

impl TryFrom<String> for Color {
    type Error = std::convert::Infallible;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Ok(Color::hex(&s))
    }
}

/// The built-in palettes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThemePreset {
    Indigo,
    Emerald,
    Rose,
    Amber,
    Slate,
}

/// A resolved 4-color palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub primary: Color,
    pub accent: Color,
    pub secondary: Color,
    pub light: Color,
}

const SECONDARY_OPACITY: f64 = 0.7;
const LIGHT_OPACITY: f64 = 0.15;

impl Theme {
    /// Resolve a preset to its fixed tuple.
    pub fn preset(preset: ThemePreset) -> Self {
        let (primary, accent, secondary, light) = match preset {
            ThemePreset::Indigo => ("#6366f1", "#8b5cf6", "#9294f5", "#e8e8fd"),
            ThemePreset::Emerald => ("#10b981", "#34d399", "#58cea7", "#dbf4ec"),
            ThemePreset::Rose => ("#f43f5e", "#fb7185", "#f7798e", "#fde2e7"),
            ThemePreset::Amber => ("#f59e0b", "#fbbf24", "#f8bb54", "#fdf0da"),
            ThemePreset::Slate => ("#475569", "#64748b", "#7e8896", "#e3e5e8"),
        };
        Self {
            primary: Color::hex(primary),
            accent: Color::hex(accent),
            secondary: Color::hex(secondary),
            light: Color::hex(light),
        }
    }

    /// Derive a full palette from a primary/accent pair. The secondary and
    /// light tints come from `lighter` at 0.7 and 0.15 opacity.
    pub fn custom(primary: Color, accent: Color) -> Self {
        Self {
            primary,
            accent,
            secondary: primary.lighter(SECONDARY_OPACITY),
            light: primary.lighter(LIGHT_OPACITY),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Theme::preset(ThemePreset::Indigo)
    }
}
