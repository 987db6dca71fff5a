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

//! The YAML lighting configuration: universes, state groups and fixtures.
//! Legacy state layouts are accepted and normalized into phase lists.

use std::fs;
use std::path::Path;

use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::rig::Rig;
use crate::states::StateRegistry;

mod error;
mod fixture;
mod group;
mod universe;

pub use error::ConfigError;
pub use fixture::Fixture;
pub use group::{ChannelType, Phase, State, StateGroup};
pub use universe::Universe;

/// A YAML representation of a full lighting setup.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct LightingConfig {
    /// The DMX universes, addressed by position.
    #[serde(default)]
    universes: Vec<Universe>,
    /// The state groups.
    #[serde(default)]
    groups: Vec<StateGroup>,
    /// The fixtures.
    #[serde(default)]
    fixtures: Vec<Fixture>,
}

impl LightingConfig {
    /// Creates a new lighting configuration.
    pub fn new(
        universes: Vec<Universe>,
        groups: Vec<StateGroup>,
        fixtures: Vec<Fixture>,
    ) -> LightingConfig {
        LightingConfig {
            universes,
            groups,
            fixtures,
        }
    }

    /// Deserializes a file from the path into a lighting configuration.
    pub fn deserialize(path: &Path) -> Result<LightingConfig, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<LightingConfig>()?)
    }

    /// Deserializes a YAML string into a lighting configuration.
    pub fn from_yaml(yaml: &str) -> Result<LightingConfig, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize::<LightingConfig>()?)
    }

    /// Serializes the configuration and writes it to the path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let serialized = serde_yml::to_string(self)?;
        debug!(serialized);
        fs::write(path, serialized)?;
        info!(path = %path.display(), "Saved lighting config");
        Ok(())
    }

    pub fn universes(&self) -> &[Universe] {
        &self.universes
    }

    pub fn groups(&self) -> &[StateGroup] {
        &self.groups
    }

    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    /// Returns a copy with every legacy state rewritten as a phase list.
    pub fn normalize(&self) -> Result<LightingConfig, ConfigError> {
        Ok(LightingConfig {
            universes: self.universes.clone(),
            groups: self
                .groups
                .iter()
                .map(StateGroup::normalize)
                .collect::<Result<Vec<_>, _>>()?,
            fixtures: self.fixtures.clone(),
        })
    }

    /// Builds the state registry.
    pub fn registry(&self) -> Result<StateRegistry, ConfigError> {
        group::check_unique("group", self.groups.iter().map(StateGroup::name))?;

        let mut registry = StateRegistry::new();
        for group in self.groups.iter() {
            registry.insert(group.to_group()?);
        }
        registry.add_channel_types();
        Ok(registry)
    }

    /// Builds the runtime rig with every fixture patched into its universes.
    pub fn build(&self) -> Result<Rig, ConfigError> {
        group::check_unique("universe", self.universes.iter().map(Universe::name))?;
        group::check_unique("fixture", self.fixtures.iter().map(Fixture::key))?;

        let registry = self.registry()?;
        let fixtures = self
            .fixtures
            .iter()
            .map(|fixture| {
                if fixture.universe() as usize >= self.universes.len() {
                    return Err(ConfigError::UnknownUniverse {
                        fixture: fixture.key().to_string(),
                        universe: fixture.universe(),
                    });
                }
                Ok((fixture.to_fixture(&registry)?, fixture.state()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut rig = Rig::new(
            self.universes
                .iter()
                .map(|universe| universe.to_universe())
                .collect(),
            registry,
        );
        for (fixture, state) in fixtures {
            rig.add_fixture(fixture, state);
        }
        rig.patch_all();
        Ok(rig)
    }
}
