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

use serde::{Deserialize, Serialize};

use crate::dmx::{self, DEFAULT_START_CODE, UNIVERSE_SIZE};

/// A YAML representation of a DMX universe.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Universe {
    /// The name of the universe.
    name: String,
    /// The number of channels.
    #[serde(default = "default_size")]
    size: usize,
    /// The start code sent ahead of the channel levels.
    #[serde(default)]
    start_code: u8,
}

fn default_size() -> usize {
    UNIVERSE_SIZE
}

impl Universe {
    /// Creates a new universe configuration.
    pub fn new(name: &str, size: Option<usize>, start_code: Option<u8>) -> Universe {
        Universe {
            name: name.to_string(),
            size: size.unwrap_or(UNIVERSE_SIZE),
            start_code: start_code.unwrap_or(DEFAULT_START_CODE),
        }
    }

    /// Gets the name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the channel count.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Gets the start code.
    pub fn start_code(&self) -> u8 {
        self.start_code
    }

    /// Creates the runtime universe.
    pub(super) fn to_universe(&self) -> dmx::Universe {
        dmx::Universe::with_start_code(&self.name, self.size, self.start_code)
    }
}
