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

//! Named lighting states. A state is an ordered list of timed phases that a
//! per-state scheduler cycles through; states are organized into groups that
//! share a channel type list.

mod group;
mod phase;
mod registry;
mod state;

pub use group::StateGroup;
pub use phase::{PhaseLevel, StatePhase};
pub use registry::StateRegistry;
pub use state::{PhaseEvent, State};
