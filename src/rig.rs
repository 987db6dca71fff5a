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

//! The assembled lighting rig: universes, fixtures patched into them, and the
//! state groups fixtures draw their states from.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::dmx::Universe;
use crate::lighting::Fixture;
use crate::states::StateRegistry;

#[derive(Debug, thiserror::Error)]
pub enum RigError {
    #[error("Unknown fixture '{0}'")]
    UnknownFixture(String),

    #[error("Fixture '{0}' has no state group")]
    NoStateGroup(String),

    #[error("Fixture '{fixture}' has no state '{state}' in group '{group}'")]
    UnknownState {
        fixture: String,
        group: String,
        state: String,
    },
}

pub struct Rig {
    universes: Vec<Universe>,
    fixtures: BTreeMap<String, Arc<Fixture>>,
    initial_states: BTreeMap<String, String>,
    registry: StateRegistry,
}

impl Rig {
    /// Creates a rig without fixtures.
    pub fn new(universes: Vec<Universe>, registry: StateRegistry) -> Rig {
        Rig {
            universes,
            fixtures: BTreeMap::new(),
            initial_states: BTreeMap::new(),
            registry,
        }
    }

    /// Adds a fixture, replacing any fixture with the same key. The initial
    /// state is applied by [`Rig::apply_initial_states`].
    pub fn add_fixture(&mut self, fixture: Arc<Fixture>, initial_state: Option<&str>) {
        let key = fixture.key().to_string();
        match initial_state {
            Some(state) => self.initial_states.insert(key.clone(), state.to_string()),
            None => self.initial_states.remove(&key),
        };
        self.fixtures.insert(key, fixture);
    }

    pub fn universes(&self) -> &[Universe] {
        &self.universes
    }

    pub fn universe(&self, index: usize) -> Option<&Universe> {
        self.universes.get(index)
    }

    pub fn fixtures(&self) -> impl Iterator<Item = &Arc<Fixture>> {
        self.fixtures.values()
    }

    pub fn fixture(&self, key: &str) -> Option<&Arc<Fixture>> {
        self.fixtures.get(key)
    }

    pub fn registry(&self) -> &StateRegistry {
        &self.registry
    }

    /// Binds every fixture channel to the universe channel at its address.
    /// Returns the number of bound channels.
    pub fn patch_all(&self) -> usize {
        let mut bound = 0;
        for fixture in self.fixtures.values() {
            let universe_indices: BTreeSet<u32> = fixture
                .channels()
                .iter()
                .map(|channel| channel.universe_index())
                .collect();
            for universe_index in universe_indices {
                match self.universes.get(universe_index as usize) {
                    Some(universe) => bound += universe.patch_fixture(fixture, universe_index),
                    None => warn!(
                        fixture = fixture.key(),
                        universe_index, "Fixture channels land in a universe that doesn't exist"
                    ),
                }
            }
        }
        info!(bound, fixtures = self.fixtures.len(), "Patched rig");
        bound
    }

    /// Applies a state from the fixture's group to the fixture, or clears the
    /// fixture when no state is given.
    pub fn apply_state(
        &self,
        fixture_key: &str,
        state_key: Option<&str>,
        flash_now: bool,
    ) -> Result<(), RigError> {
        let fixture = self
            .fixtures
            .get(fixture_key)
            .ok_or_else(|| RigError::UnknownFixture(fixture_key.to_string()))?;

        let state = match state_key {
            Some(state_key) => {
                let group = fixture
                    .state_group()
                    .ok_or_else(|| RigError::NoStateGroup(fixture_key.to_string()))?;
                Some(self.registry.state(&group, state_key).ok_or_else(|| {
                    RigError::UnknownState {
                        fixture: fixture_key.to_string(),
                        group,
                        state: state_key.to_string(),
                    }
                })?)
            }
            None => None,
        };

        info!(fixture = fixture_key, state = ?state_key, "Applying state");
        fixture.apply_state(state, flash_now);
        Ok(())
    }

    /// Applies every fixture's configured initial state.
    pub fn apply_initial_states(&self) -> Result<(), RigError> {
        for (fixture, state) in self.initial_states.iter() {
            self.apply_state(fixture, Some(state), true)?;
        }
        Ok(())
    }

    /// Detaches every fixture from its state and clears its levels.
    pub fn clear_all(&self) {
        for fixture in self.fixtures.values() {
            fixture.apply_state(None, false);
        }
    }
}

impl fmt::Debug for Rig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rig")
            .field("universes", &self.universes)
            .field("fixtures", &self.fixtures.keys().collect::<Vec<_>>())
            .field("groups", &self.registry.len())
            .finish()
    }
}
