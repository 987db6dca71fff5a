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

use super::Color;

/// A named category of channel. Channel types are shared by reference between
/// fixture channels and state phases; two types are the same type only if they
/// are the same allocation.
#[derive(Debug)]
pub struct ChannelType {
    /// The name of the channel type, e.g. "red" or "dimmer".
    name: String,
    /// The color this channel contributes at full level.
    primary_color: Color,
}

impl ChannelType {
    /// Creates a new channel type.
    pub fn new(name: &str, primary_color: Color) -> ChannelType {
        ChannelType {
            name: name.to_string(),
            primary_color,
        }
    }

    /// Gets the name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the primary color.
    pub fn primary_color(&self) -> Color {
        self.primary_color
    }

    /// The color contributed by a channel of this type at the given level.
    pub fn contribution(&self, level: u8) -> Color {
        self.primary_color.scale(f64::from(level) / 255.0)
    }
}
