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
use std::time::Duration;

use crate::lighting::ChannelType;

/// One target level within a phase, optionally correlated with the channel
/// type at the same position in the owning group.
#[derive(Debug, Clone)]
pub struct PhaseLevel {
    level: u8,
    channel_type: Option<Arc<ChannelType>>,
}

impl PhaseLevel {
    pub fn new(level: u8) -> PhaseLevel {
        PhaseLevel {
            level,
            channel_type: None,
        }
    }

    /// Gets the level.
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Gets the channel type this level was correlated with.
    pub fn channel_type(&self) -> Option<&Arc<ChannelType>> {
        self.channel_type.as_ref()
    }
}

/// A set of channel levels held for a duration. A zero duration means the
/// phase is held until something else happens.
#[derive(Debug, Clone)]
pub struct StatePhase {
    levels: Vec<PhaseLevel>,
    duration: Duration,
}

impl StatePhase {
    /// Creates a new phase.
    pub fn new(levels: Vec<u8>, duration: Duration) -> StatePhase {
        StatePhase {
            levels: levels.into_iter().map(PhaseLevel::new).collect(),
            duration,
        }
    }

    /// Gets the plain levels.
    pub fn levels(&self) -> Vec<u8> {
        self.levels.iter().map(PhaseLevel::level).collect()
    }

    /// Gets the levels along with their channel types.
    pub fn entries(&self) -> &[PhaseLevel] {
        &self.levels
    }

    /// Gets the number of levels.
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Gets the duration.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub(super) fn set_duration(&mut self, duration: Duration) {
        self.duration = duration;
    }

    /// Pads with zero levels or truncates so that there is exactly one level
    /// per channel type. Returns true if anything had to change.
    pub(super) fn reconcile(&mut self, channel_types: &[Arc<ChannelType>]) -> bool {
        let count = self.levels.len();
        if count == channel_types.len() {
            return false;
        }
        self.levels.truncate(channel_types.len());
        self.levels
            .extend(channel_types[count.min(channel_types.len())..].iter().map(|channel_type| {
                PhaseLevel {
                    level: 0,
                    channel_type: Some(channel_type.clone()),
                }
            }));
        true
    }

    /// Correlates each level with the channel type at the same position.
    pub(super) fn assign_channel_types(&mut self, channel_types: &[Arc<ChannelType>]) {
        for (level, channel_type) in self.levels.iter_mut().zip(channel_types) {
            level.channel_type = Some(channel_type.clone());
        }
    }
}
