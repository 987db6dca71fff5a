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

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::dmx::UNIVERSE_SIZE;
use crate::lighting::{self, ChannelType};
use crate::states::StateRegistry;

/// A YAML representation of a fixture.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Fixture {
    /// The unique key of the fixture.
    key: String,
    /// The display name. Defaults to the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    /// The channel id of the first channel.
    start_channel: usize,
    /// The index of the universe the fixture starts in.
    #[serde(default)]
    universe: u32,
    /// The state group the fixture draws its states from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    group: Option<String>,
    /// The channel type name of every channel, in order.
    #[serde(default)]
    channels: Vec<String>,
    /// The state applied when the rig starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<String>,
}

impl Fixture {
    pub fn new(
        key: &str,
        start_channel: usize,
        universe: u32,
        group: Option<&str>,
        channels: Vec<String>,
    ) -> Fixture {
        Fixture {
            key: key.to_string(),
            name: None,
            start_channel,
            universe,
            group: group.map(str::to_string),
            channels,
            state: None,
        }
    }

    /// Gets the key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Gets the universe index.
    pub fn universe(&self) -> u32 {
        self.universe
    }

    /// Gets the initial state.
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    /// Returns true if the last channel's id, once folded into the universe
    /// index, still has a universe index that fits.
    fn addressable(&self) -> bool {
        let Some(last) = self.channels.len().checked_sub(1) else {
            return true;
        };
        self.start_channel
            .checked_add(last)
            .and_then(|id| u32::try_from(id / UNIVERSE_SIZE).ok())
            .and_then(|overflow| self.universe.checked_add(overflow))
            .is_some()
    }

    /// Creates the runtime fixture, resolving channel types against the
    /// fixture's group.
    pub(super) fn to_fixture(
        &self,
        registry: &StateRegistry,
    ) -> Result<Arc<lighting::Fixture>, ConfigError> {
        if !self.addressable() {
            return Err(ConfigError::InvalidAddress {
                fixture: self.key.clone(),
                start_channel: self.start_channel,
                universe: self.universe,
            });
        }

        let group = match &self.group {
            Some(name) => Some(registry.group(name).ok_or_else(|| ConfigError::UnknownGroup {
                fixture: self.key.clone(),
                group: name.clone(),
            })?),
            None => None,
        };

        let channel_types = self
            .channels
            .iter()
            .map(|name| {
                group
                    .and_then(|group| {
                        group
                            .channel_types()
                            .iter()
                            .find(|channel_type| channel_type.name() == name.as_str())
                    })
                    .cloned()
                    .ok_or_else(|| ConfigError::UnknownChannelType {
                        fixture: self.key.clone(),
                        channel_type: name.clone(),
                    })
            })
            .collect::<Result<Vec<Arc<ChannelType>>, _>>()?;

        if let Some(state) = &self.state {
            if !group.is_some_and(|group| group.state(state).is_some()) {
                return Err(ConfigError::UnknownState {
                    fixture: self.key.clone(),
                    state: state.clone(),
                });
            }
        }

        let fixture = lighting::Fixture::with_types(
            &self.key,
            self.name.as_deref().unwrap_or(&self.key),
            self.start_channel,
            self.universe,
            &channel_types,
        );
        fixture.set_state_group(self.group.clone());
        Ok(fixture)
    }
}

#[cfg(test)]
mod test {
    use super::Fixture;
    use crate::config::{ChannelType, ConfigError, StateGroup};
    use crate::states::StateRegistry;

    fn registry() -> StateRegistry {
        let mut registry = StateRegistry::new();
        registry.insert(
            StateGroup::new("dim", vec![ChannelType::new("dimmer", "white")], Vec::new())
                .to_group()
                .unwrap(),
        );
        registry
    }

    fn dimmers(count: usize) -> Vec<String> {
        vec!["dimmer".to_string(); count]
    }

    #[test]
    fn test_to_fixture() {
        let fixture = Fixture::new("par", 1023, 2, Some("dim"), dimmers(2))
            .to_fixture(&registry())
            .unwrap();
        let addresses: Vec<(usize, u32)> = fixture
            .channels()
            .iter()
            .map(|channel| (channel.id(), channel.universe_index()))
            .collect();
        assert_eq!(vec![(511, 3), (0, 4)], addresses);
        assert_eq!(Some("dim".to_string()), fixture.state_group());
    }

    #[test]
    fn test_channel_id_overflow() {
        let fixture = Fixture::new("par", usize::MAX, 0, Some("dim"), dimmers(2));
        assert!(matches!(
            fixture.to_fixture(&registry()),
            Err(ConfigError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_universe_index_overflow() {
        let fixture = Fixture::new("par", 512, u32::MAX, Some("dim"), dimmers(1));
        assert!(matches!(
            fixture.to_fixture(&registry()),
            Err(ConfigError::InvalidAddress { universe: u32::MAX, .. })
        ));

        // The last universe itself is fine.
        let fixture = Fixture::new("par", 511, u32::MAX, Some("dim"), dimmers(1));
        assert!(fixture.to_fixture(&registry()).is_ok());
    }
}
