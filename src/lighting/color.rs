// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use std::fmt;
use std::ops::{Add, AddAssign};

/// Error returned when a color string can't be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color '{0}', expected #rrggbb or a color name")]
pub struct ParseColorError(String);

/// An additive RGB color with each component nominally in 0.0..=1.0. Sums of
/// colors are not clamped; use [`Color::to_rgb8`] for a displayable value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0);
    pub const RED: Color = Color::new(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::new(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::new(0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);
    pub const AMBER: Color = Color::new(1.0, 0.75, 0.0);

    pub const fn new(r: f64, g: f64, b: f64) -> Color {
        Color { r, g, b }
    }

    /// Creates a color from 8 bit components.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Color {
        Color::new(
            f64::from(r) / 255.0,
            f64::from(g) / 255.0,
            f64::from(b) / 255.0,
        )
    }

    /// Parses `#rrggbb` or one of a handful of color names.
    pub fn parse(value: &str) -> Result<Color, ParseColorError> {
        let trimmed = value.trim();
        if let Some(hex) = trimmed.strip_prefix('#') {
            if hex.len() != 6 || !hex.is_ascii() {
                return Err(ParseColorError(value.to_string()));
            }
            let component = |range: std::ops::Range<usize>| {
                u8::from_str_radix(&hex[range], 16).map_err(|_| ParseColorError(value.to_string()))
            };
            return Ok(Color::from_rgb8(
                component(0..2)?,
                component(2..4)?,
                component(4..6)?,
            ));
        }

        match trimmed.to_lowercase().as_str() {
            "black" => Ok(Color::BLACK),
            "red" => Ok(Color::RED),
            "green" => Ok(Color::GREEN),
            "blue" => Ok(Color::BLUE),
            "white" => Ok(Color::WHITE),
            "amber" => Ok(Color::AMBER),
            _ => Err(ParseColorError(value.to_string())),
        }
    }

    /// Multiplies every component by the given factor.
    pub fn scale(&self, factor: f64) -> Color {
        Color::new(self.r * factor, self.g * factor, self.b * factor)
    }

    /// Converts to 8 bit components, clamping out of range values.
    pub fn to_rgb8(&self) -> (u8, u8, u8) {
        let convert = |c: f64| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        (convert(self.r), convert(self.g), convert(self.b))
    }
}

impl Add for Color {
    type Output = Color;

    fn add(self, other: Color) -> Color {
        Color::new(self.r + other.r, self.g + other.g, self.b + other.b)
    }
}

impl AddAssign for Color {
    fn add_assign(&mut self, other: Color) {
        *self = *self + other;
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (r, g, b) = self.to_rgb8();
        write!(f, "#{:02x}{:02x}{:02x}", r, g, b)
    }
}
