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

//! DMX universes: the addressable channel buffer, the per-index channel views
//! over it, and the patch that binds those views to fixture channels.

mod buffer;
mod channel;
mod error;
mod universe;

pub use buffer::{Buffer, ChannelChange, Dispatch};
pub use channel::BufferChannel;
pub use error::BufferError;
pub use universe::Universe;

/// A DMX universe is 512 channels.
pub const UNIVERSE_SIZE: usize = 512;

/// The start code for standard lighting-control frames.
pub const DEFAULT_START_CODE: u8 = 0;
