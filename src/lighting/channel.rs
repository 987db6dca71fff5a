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

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::warn;

use super::{ChannelType, Fixture};
use crate::dmx::UNIVERSE_SIZE;
use crate::notify::{Notifier, SubscriptionId};

/// Identifies a fixture channel by its fixture's key and its position within
/// that fixture.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelKey {
    pub fixture: String,
    pub position: usize,
}

impl ChannelKey {
    pub fn new(fixture: &str, position: usize) -> ChannelKey {
        ChannelKey {
            fixture: fixture.to_string(),
            position,
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.fixture, self.position)
    }
}

/// Where a fixture channel lands: a zero-based channel id within a universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Address {
    id: usize,
    universe_index: u32,
}

/// A logical channel owned by a [`Fixture`].
pub struct FixtureChannel {
    /// Stable identity of this channel.
    key: ChannelKey,
    /// The current level.
    level: AtomicU8,
    /// Channel id and universe index.
    address: Mutex<Address>,
    /// The channel type, unresolved until assigned.
    channel_type: RwLock<Option<Arc<ChannelType>>>,
    /// The owning fixture.
    fixture: Weak<Fixture>,
    /// Level change subscribers.
    level_changed: Notifier<u8>,
}

impl FixtureChannel {
    pub(super) fn new(
        key: ChannelKey,
        id: usize,
        universe_index: u32,
        channel_type: Option<Arc<ChannelType>>,
        fixture: Weak<Fixture>,
    ) -> FixtureChannel {
        FixtureChannel {
            key,
            level: AtomicU8::new(0),
            address: Mutex::new(Address { id, universe_index }),
            channel_type: RwLock::new(channel_type),
            fixture,
            level_changed: Notifier::new(),
        }
    }

    /// Gets the key.
    pub fn key(&self) -> &ChannelKey {
        &self.key
    }

    /// Gets the current level.
    pub fn level(&self) -> u8 {
        self.level.load(Ordering::SeqCst)
    }

    /// Sets the level. Setting the current level does nothing; otherwise the
    /// owning fixture's mixed color is refreshed and subscribers are notified.
    pub fn set_level(&self, level: u8) {
        if self.level.swap(level, Ordering::SeqCst) == level {
            return;
        }
        if let Some(fixture) = self.fixture.upgrade() {
            fixture.refresh_mixed_color();
        }
        self.level_changed.notify(&level);
    }

    /// Subscribes to level changes.
    pub fn subscribe_level<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&u8) + Send + Sync + 'static,
    {
        self.level_changed.subscribe(callback)
    }

    /// Removes a level subscription.
    pub fn unsubscribe_level(&self, id: SubscriptionId) -> bool {
        self.level_changed.unsubscribe(id)
    }

    /// Gets the channel id.
    pub fn id(&self) -> usize {
        self.address.lock().id
    }

    /// Gets the universe index.
    pub fn universe_index(&self) -> u32 {
        self.address.lock().universe_index
    }

    /// Moves this channel to a new id and universe index.
    pub fn set_address(&self, id: usize, universe_index: u32) {
        *self.address.lock() = Address { id, universe_index };
    }

    /// Gets the channel type.
    pub fn channel_type(&self) -> Option<Arc<ChannelType>> {
        self.channel_type.read().clone()
    }

    /// Sets the channel type, letting the owning fixture react.
    pub fn set_channel_type(&self, channel_type: Option<Arc<ChannelType>>) {
        *self.channel_type.write() = channel_type;
        if let Some(fixture) = self.fixture.upgrade() {
            fixture.channel_type_changed();
        }
    }

    /// Folds an id of 512 or more into the universe index, so that id 515 in
    /// universe 0 becomes id 3 in universe 1. An address whose universe index
    /// would not fit is left as it is.
    pub(super) fn fix_id(&self) -> bool {
        let mut address = self.address.lock();
        if address.id < UNIVERSE_SIZE {
            return false;
        }
        let universe_index = u32::try_from(address.id / UNIVERSE_SIZE)
            .ok()
            .and_then(|overflow| address.universe_index.checked_add(overflow));
        match universe_index {
            Some(universe_index) => {
                address.universe_index = universe_index;
                address.id %= UNIVERSE_SIZE;
                true
            }
            None => {
                warn!(
                    channel = %self.key,
                    id = address.id,
                    universe_index = address.universe_index,
                    "Channel id overflows the universe index, leaving it uncorrected"
                );
                false
            }
        }
    }
}

impl fmt::Debug for FixtureChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let address = *self.address.lock();
        f.debug_struct("FixtureChannel")
            .field("key", &self.key)
            .field("level", &self.level())
            .field("id", &address.id)
            .field("universe_index", &address.universe_index)
            .field(
                "channel_type",
                &self.channel_type.read().as_ref().map(|t| t.name().to_string()),
            )
            .finish()
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Weak};

    use super::{ChannelKey, FixtureChannel};

    fn orphan(id: usize, universe_index: u32) -> FixtureChannel {
        FixtureChannel::new(ChannelKey::new("orphan", 0), id, universe_index, None, Weak::new())
    }

    #[test]
    fn test_fix_id() {
        let channel = orphan(515, 0);
        assert!(channel.fix_id());
        assert_eq!(3, channel.id());
        assert_eq!(1, channel.universe_index());

        let channel = orphan(1024, 0);
        assert!(channel.fix_id());
        assert_eq!(0, channel.id());
        assert_eq!(2, channel.universe_index());

        let channel = orphan(511, 4);
        assert!(!channel.fix_id());
        assert_eq!(511, channel.id());
        assert_eq!(4, channel.universe_index());
    }

    #[test]
    fn test_fix_id_universe_overflow() {
        let channel = orphan(1024, u32::MAX);
        assert!(!channel.fix_id());
        assert_eq!(1024, channel.id());
        assert_eq!(u32::MAX, channel.universe_index());
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_fix_id_too_many_universes() {
        let channel = orphan(512usize << 33, 0);
        assert!(!channel.fix_id());
        assert_eq!(512usize << 33, channel.id());
        assert_eq!(0, channel.universe_index());
    }

    #[test]
    fn test_level_notifications() {
        let channel = orphan(0, 0);
        let calls = Arc::new(AtomicUsize::new(0));
        let id = {
            let calls = calls.clone();
            channel.subscribe_level(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };

        channel.set_level(10);
        channel.set_level(10);
        channel.set_level(11);
        assert_eq!(2, calls.load(Ordering::SeqCst));
        assert_eq!(11, channel.level());

        assert!(channel.unsubscribe_level(id));
        channel.set_level(12);
        assert_eq!(2, calls.load(Ordering::SeqCst));
    }
}
