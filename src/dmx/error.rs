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

/// Errors raised by bounds-checked buffer access. A failing call never
/// modifies the buffer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("block of {len} bytes at offset {start} does not fit a universe of {size} channels")]
    BlockOutOfBounds { start: isize, len: usize, size: usize },
    #[error("channel {index} is outside a universe of {size} channels")]
    ChannelOutOfBounds { index: usize, size: usize },
}
