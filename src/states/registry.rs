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

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use super::{State, StateGroup};

/// All state groups, by name.
#[derive(Debug, Default)]
pub struct StateRegistry {
    groups: BTreeMap<String, StateGroup>,
}

impl StateRegistry {
    /// Creates an empty registry.
    pub fn new() -> StateRegistry {
        StateRegistry::default()
    }

    /// Adds a group, returning any group it replaced.
    pub fn insert(&mut self, group: StateGroup) -> Option<StateGroup> {
        self.groups.insert(group.name().to_string(), group)
    }

    /// Gets a group by name.
    pub fn group(&self, name: &str) -> Option<&StateGroup> {
        self.groups.get(name)
    }

    /// Gets a group by name for editing.
    pub fn group_mut(&mut self, name: &str) -> Option<&mut StateGroup> {
        self.groups.get_mut(name)
    }

    /// Gets a state by group name and state key.
    pub fn state(&self, group: &str, key: &str) -> Option<Arc<State>> {
        self.groups.get(group).and_then(|group| group.state(key))
    }

    /// Iterates over the groups in name order.
    pub fn groups(&self) -> impl Iterator<Item = &StateGroup> {
        self.groups.values()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Correlates every phase level of every state with the channel type at
    /// the same position in its group.
    pub fn add_channel_types(&self) {
        for group in self.groups.values() {
            debug!(group = group.name(), "Assigning channel types");
            group.assign_channel_types();
        }
    }
}
