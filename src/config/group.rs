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

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use duration_string::DurationString;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ConfigError;
use crate::lighting::{self, Color};
use crate::states;

/// Parses a duration string such as `500ms` or `2s`. A missing duration is zero.
pub(super) fn parse_duration(value: Option<&str>) -> Result<Duration, ConfigError> {
    match value {
        Some(value) => Ok(DurationString::from_string(value.to_string())
            .map_err(|e| ConfigError::Duration {
                value: value.to_string(),
                reason: e.to_string(),
            })?
            .into()),
        None => Ok(Duration::ZERO),
    }
}

fn is_zero(value: &i32) -> bool {
    *value == 0
}

/// A YAML representation of a channel type.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ChannelType {
    /// The name of the channel type.
    name: String,
    /// The primary color, as `#rrggbb` or a color name.
    color: String,
}

impl ChannelType {
    pub fn new(name: &str, color: &str) -> ChannelType {
        ChannelType {
            name: name.to_string(),
            color: color.to_string(),
        }
    }

    /// Gets the name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn to_channel_type(&self) -> Result<lighting::ChannelType, ConfigError> {
        let color = Color::parse(&self.color).map_err(|source| ConfigError::Color {
            channel_type: self.name.clone(),
            source,
        })?;
        Ok(lighting::ChannelType::new(&self.name, color))
    }
}

/// A YAML representation of a single phase.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Phase {
    /// One level per channel type.
    #[serde(default)]
    levels: Vec<u8>,
    /// How long the phase is held. Missing means indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration: Option<String>,
}

impl Phase {
    pub fn new(levels: Vec<u8>, duration: Option<&str>) -> Phase {
        Phase {
            levels,
            duration: duration.map(str::to_string),
        }
    }

    fn to_phase(&self) -> Result<states::StatePhase, ConfigError> {
        Ok(states::StatePhase::new(
            self.levels.clone(),
            parse_duration(self.duration.as_deref())?,
        ))
    }
}

/// A YAML representation of a state. States are either written as a list of
/// phases, or in the legacy layout of a primary level set with an optional
/// flash level set.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct State {
    /// The key of the state.
    key: String,
    /// The number of phases emitted before cycling stops. 0 is unlimited.
    #[serde(default, skip_serializing_if = "is_zero")]
    cycle_steps: i32,
    /// The phase cycling resumes at after the last phase.
    #[serde(default, skip_serializing_if = "is_zero")]
    loop_back: i32,
    /// The phases.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    phases: Vec<Phase>,

    /// Legacy primary levels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    levels: Option<Vec<u8>>,
    /// Legacy primary duration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration: Option<String>,
    /// Legacy flash levels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    flash_levels: Option<Vec<u8>>,
    /// Legacy flash duration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    flash_duration: Option<String>,
}

impl State {
    /// Creates a state in the phase list layout.
    pub fn new(key: &str, phases: Vec<Phase>, cycle_steps: i32, loop_back: i32) -> State {
        State {
            key: key.to_string(),
            cycle_steps,
            loop_back,
            phases,
            levels: None,
            duration: None,
            flash_levels: None,
            flash_duration: None,
        }
    }

    /// Creates a state in the legacy layout.
    pub fn legacy(
        key: &str,
        levels: Vec<u8>,
        duration: Option<&str>,
        flash: Option<(Vec<u8>, Option<&str>)>,
    ) -> State {
        let (flash_levels, flash_duration) = match flash {
            Some((levels, duration)) => (Some(levels), duration.map(str::to_string)),
            None => (None, None),
        };
        State {
            key: key.to_string(),
            cycle_steps: 0,
            loop_back: 0,
            phases: Vec::new(),
            levels: Some(levels),
            duration: duration.map(str::to_string),
            flash_levels,
            flash_duration,
        }
    }

    /// Gets the key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Gets the phases. Legacy states have none until normalized.
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    fn is_legacy(&self) -> bool {
        self.levels.is_some()
            || self.duration.is_some()
            || self.flash_levels.is_some()
            || self.flash_duration.is_some()
    }

    /// Rewrites a legacy state as a phase list. When a flash pair is present
    /// and the primary duration is zero, the primary inherits the flash
    /// duration so that the pair alternates.
    pub fn normalize(&self) -> Result<State, ConfigError> {
        if !self.phases.is_empty() {
            if self.is_legacy() {
                warn!(
                    state = self.key,
                    "State has both phases and legacy levels, ignoring the legacy levels"
                );
            }
            return Ok(State::new(
                &self.key,
                self.phases.clone(),
                self.cycle_steps,
                self.loop_back,
            ));
        }

        let mut primary = Phase {
            levels: self.levels.clone().unwrap_or_default(),
            duration: self.duration.clone(),
        };
        let mut phases = Vec::new();
        match &self.flash_levels {
            Some(flash_levels) => {
                if parse_duration(primary.duration.as_deref())?.is_zero() {
                    primary.duration = self.flash_duration.clone();
                }
                phases.push(primary);
                phases.push(Phase {
                    levels: flash_levels.clone(),
                    duration: self.flash_duration.clone(),
                });
            }
            None => phases.push(primary),
        }

        Ok(State::new(&self.key, phases, self.cycle_steps, self.loop_back))
    }

    fn to_state(&self) -> Result<states::State, ConfigError> {
        let normalized = self.normalize()?;
        Ok(states::State::new(
            &normalized.key,
            normalized
                .phases
                .iter()
                .map(Phase::to_phase)
                .collect::<Result<Vec<_>, _>>()?,
            normalized.cycle_steps,
            normalized.loop_back,
        ))
    }
}

/// A YAML representation of a state group.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct StateGroup {
    /// The name of the group.
    name: String,
    /// The ordered channel types every state in the group provides levels for.
    #[serde(default)]
    channel_types: Vec<ChannelType>,
    /// The states.
    #[serde(default)]
    states: Vec<State>,
}

impl StateGroup {
    pub fn new(name: &str, channel_types: Vec<ChannelType>, states: Vec<State>) -> StateGroup {
        StateGroup {
            name: name.to_string(),
            channel_types,
            states,
        }
    }

    /// Gets the name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the channel types.
    pub fn channel_types(&self) -> &[ChannelType] {
        &self.channel_types
    }

    /// Gets the states.
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// Rewrites every legacy state as a phase list.
    pub fn normalize(&self) -> Result<StateGroup, ConfigError> {
        Ok(StateGroup {
            name: self.name.clone(),
            channel_types: self.channel_types.clone(),
            states: self
                .states
                .iter()
                .map(State::normalize)
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    /// Creates the runtime group.
    pub(super) fn to_group(&self) -> Result<states::StateGroup, ConfigError> {
        check_unique("channel type", self.channel_types.iter().map(ChannelType::name))?;
        check_unique("state", self.states.iter().map(State::key))?;

        let channel_types = self
            .channel_types
            .iter()
            .map(|channel_type| channel_type.to_channel_type().map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        let group_states = self
            .states
            .iter()
            .map(|state| state.to_state().map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(states::StateGroup::new(&self.name, channel_types, group_states))
    }
}

/// Fails on the first key that occurs twice.
pub(super) fn check_unique<'a>(
    kind: &'static str,
    keys: impl Iterator<Item = &'a str>,
) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(key) {
            return Err(ConfigError::DuplicateKey {
                kind,
                key: key.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use config::{Config, File, FileFormat};

    use super::{parse_duration, Phase, State, StateGroup};
    use crate::config::ConfigError;

    fn parse_group(yaml: &str) -> StateGroup {
        Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize::<StateGroup>()
            .unwrap()
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(Duration::ZERO, parse_duration(None).unwrap());
        assert_eq!(Duration::from_millis(500), parse_duration(Some("500ms")).unwrap());
        assert_eq!(Duration::from_secs(2), parse_duration(Some("2s")).unwrap());
        assert!(matches!(
            parse_duration(Some("soon")),
            Err(ConfigError::Duration { .. })
        ));
    }

    #[test]
    fn test_legacy_flash_pair() {
        let state = State::legacy("alarm", vec![255, 0, 0], None, Some((vec![0, 0, 0], Some("250ms"))));
        let normalized = state.normalize().unwrap();

        assert_eq!(
            vec![
                Phase::new(vec![255, 0, 0], Some("250ms")),
                Phase::new(vec![0, 0, 0], Some("250ms")),
            ],
            normalized.phases()
        );
    }

    #[test]
    fn test_legacy_keeps_primary_duration() {
        let state = State::legacy("alarm", vec![255], Some("1s"), Some((vec![0], Some("250ms"))));
        let normalized = state.normalize().unwrap();

        assert_eq!(Some("1s"), normalized.phases()[0].duration.as_deref());
        assert_eq!(Some("250ms"), normalized.phases()[1].duration.as_deref());
    }

    #[test]
    fn test_legacy_single_phase() {
        let normalized = State::legacy("on", vec![10, 20], None, None).normalize().unwrap();
        assert_eq!(vec![Phase::new(vec![10, 20], None)], normalized.phases());
        assert!(!normalized.is_legacy());
    }

    #[test]
    fn test_parse_group() {
        let group = parse_group(
            r##"
            name: rgb
            channel_types:
              - name: red
                color: "#ff0000"
              - name: green
                color: green
              - name: blue
                color: blue
            states:
              - key: alarm
                cycle_steps: 6
                loop_back: 1
                phases:
                  - levels: [255, 0, 0]
                    duration: 500ms
                  - levels: [0, 0, 255]
                    duration: 1s
              - key: legacy
                levels: [255, 255, 255]
                flash_levels: [0, 0, 0]
                flash_duration: 100ms
            "##,
        );

        let group = group.to_group().unwrap();
        assert_eq!(3, group.channel_types().len());

        let alarm = group.state("alarm").unwrap();
        assert_eq!(6, alarm.cycle_step_count());
        assert_eq!(1, alarm.loop_back_step());
        assert_eq!(Duration::from_secs(1), alarm.phase(1).unwrap().duration());

        let legacy = group.state("legacy").unwrap();
        assert!(legacy.is_flashing());
        assert_eq!(Duration::from_millis(100), legacy.phase(0).unwrap().duration());
    }

    #[test]
    fn test_pads_short_phases() {
        let group = parse_group(
            r##"
            name: rgb
            channel_types:
              - name: red
                color: red
              - name: green
                color: green
            states:
              - key: red
                phases:
                  - levels: [255]
            "##,
        )
        .to_group()
        .unwrap();

        assert_eq!(vec![255, 0], group.state("red").unwrap().phase(0).unwrap().levels());
    }

    #[test]
    fn test_bad_color() {
        let group = StateGroup::new(
            "bad",
            vec![super::ChannelType::new("uv", "#zz0000")],
            Vec::new(),
        );
        assert!(matches!(
            group.to_group(),
            Err(ConfigError::Color { channel_type, .. }) if channel_type == "uv"
        ));
    }

    #[test]
    fn test_duplicate_state() {
        let group = StateGroup::new(
            "dup",
            Vec::new(),
            vec![
                State::new("on", Vec::new(), 0, 0),
                State::new("on", Vec::new(), 0, 0),
            ],
        );
        assert!(matches!(
            group.to_group(),
            Err(ConfigError::DuplicateKey { kind: "state", key }) if key == "on"
        ));
    }
}
