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

use crate::lighting::ParseColorError;

/// Typed error for lighting config failures so callers can distinguish
/// e.g. file-not-found from a dangling group reference without string matching.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config load/parse error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Config serialization error: {0}")]
    Serialize(#[from] serde_yml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Channel type '{channel_type}' has a bad color: {source}")]
    Color {
        channel_type: String,
        source: ParseColorError,
    },

    #[error("Invalid duration '{value}': {reason}")]
    Duration { value: String, reason: String },

    #[error("Duplicate {kind} '{key}'")]
    DuplicateKey { kind: &'static str, key: String },

    #[error("Fixture '{fixture}' refers to unknown group '{group}'")]
    UnknownGroup { fixture: String, group: String },

    #[error("Fixture '{fixture}' refers to unknown channel type '{channel_type}'")]
    UnknownChannelType {
        fixture: String,
        channel_type: String,
    },

    #[error("Fixture '{fixture}' refers to unknown universe {universe}")]
    UnknownUniverse { fixture: String, universe: u32 },

    #[error("Fixture '{fixture}' has channels past the last addressable universe (start channel {start_channel}, universe {universe})")]
    InvalidAddress {
        fixture: String,
        start_channel: usize,
        universe: u32,
    },

    #[error("Fixture '{fixture}' has initial state '{state}', which its group does not define")]
    UnknownState { fixture: String, state: String },
}
