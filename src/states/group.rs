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

use std::sync::Arc;

use tracing::warn;

use super::State;
use crate::lighting::ChannelType;

/// A named set of states sharing an ordered channel type list. Every phase of
/// every state carries exactly one level per channel type.
#[derive(Debug)]
pub struct StateGroup {
    name: String,
    channel_types: Vec<Arc<ChannelType>>,
    states: Vec<Arc<State>>,
}

impl StateGroup {
    /// Creates a new group and validates its states against the channel types.
    pub fn new(
        name: &str,
        channel_types: Vec<Arc<ChannelType>>,
        states: Vec<Arc<State>>,
    ) -> StateGroup {
        let group = StateGroup {
            name: name.to_string(),
            channel_types,
            states,
        };
        group.validate();
        group
    }

    /// Gets the name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the channel types.
    pub fn channel_types(&self) -> &[Arc<ChannelType>] {
        &self.channel_types
    }

    /// Gets the states in order.
    pub fn states(&self) -> &[Arc<State>] {
        &self.states
    }

    /// Gets a state by key.
    pub fn state(&self, key: &str) -> Option<Arc<State>> {
        self.states.iter().find(|state| state.key() == key).cloned()
    }

    /// Replaces the channel types and revalidates.
    pub fn set_channel_types(&mut self, channel_types: Vec<Arc<ChannelType>>) {
        self.channel_types = channel_types;
        self.validate();
    }

    /// Replaces the states and revalidates.
    pub fn set_states(&mut self, states: Vec<Arc<State>>) {
        self.states = states;
        self.validate();
    }

    /// Appends a state and revalidates.
    pub fn add_state(&mut self, state: Arc<State>) {
        self.states.push(state);
        self.validate();
    }

    /// Correlates every phase level with its channel type.
    pub fn assign_channel_types(&self) {
        for state in self.states.iter() {
            state.assign_channel_types(&self.channel_types);
        }
    }

    /// Pads or truncates every phase to the channel type count. Nothing is
    /// touched until the group has channel types.
    fn validate(&self) {
        if self.channel_types.is_empty() {
            return;
        }

        for state in self.states.iter() {
            let changed = state.reconcile_levels(&self.channel_types);
            if changed > 0 {
                warn!(
                    group = self.name,
                    state = state.key(),
                    phases = changed,
                    channel_types = self.channel_types.len(),
                    "Phase levels did not match the channel types and were adjusted"
                );
            }
        }
    }
}
