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

use tracing::{debug, warn};

use super::{Buffer, BufferChannel, BufferError, DEFAULT_START_CODE};
use crate::lighting::{ChannelKey, Fixture, FixtureChannel};

/// A named DMX universe: a buffer plus one channel view per index. The master
/// binding of every channel can be queried as a whole through [`Universe::patch`].
pub struct Universe {
    name: String,
    buffer: Arc<Buffer>,
    channels: Vec<BufferChannel>,
}

impl Universe {
    /// Creates a universe with the standard start code.
    pub fn new(name: &str, size: usize) -> Universe {
        Self::with_start_code(name, size, DEFAULT_START_CODE)
    }

    /// Creates a universe with a custom start code.
    pub fn with_start_code(name: &str, size: usize, start_code: u8) -> Universe {
        let buffer = Arc::new(Buffer::with_start_code(size, start_code));
        let channels = (0..size)
            .filter_map(|index| BufferChannel::new(buffer.clone(), index).ok())
            .collect();

        Universe {
            name: name.to_string(),
            buffer,
            channels,
        }
    }

    /// Gets the name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the underlying buffer.
    pub fn buffer(&self) -> &Arc<Buffer> {
        &self.buffer
    }

    /// Gets the number of channels.
    pub fn size(&self) -> usize {
        self.channels.len()
    }

    /// Gets the channel at the zero-based index.
    pub fn channel(&self, index: usize) -> Option<&BufferChannel> {
        self.channels.get(index)
    }

    /// Detaches the channel from its master, if any, and attaches it to the
    /// given one.
    pub fn rebind(
        &self,
        index: usize,
        master: Option<&Arc<FixtureChannel>>,
    ) -> Result<(), BufferError> {
        self.channels
            .get(index)
            .ok_or(BufferError::ChannelOutOfBounds {
                index,
                size: self.size(),
            })?
            .set_master(master)
    }

    /// The current master of every bound channel, by channel index. Masters
    /// that no longer exist are left out.
    pub fn patch(&self) -> BTreeMap<usize, ChannelKey> {
        self.channels
            .iter()
            .filter_map(|channel| channel.master_key().map(|key| (channel.index(), key)))
            .collect()
    }

    /// Binds every channel of the fixture that lives in this universe to the
    /// buffer channel at its id. Returns the number of bound channels.
    pub fn patch_fixture(&self, fixture: &Fixture, universe_index: u32) -> usize {
        let mut bound = 0;
        for channel in fixture.channels() {
            if channel.universe_index() != universe_index {
                continue;
            }
            match self.rebind(channel.id(), Some(&channel)) {
                Ok(()) => bound += 1,
                Err(e) => warn!(
                    universe = self.name,
                    channel = %channel.key(),
                    err = %e,
                    "Unable to patch fixture channel"
                ),
            }
        }
        debug!(universe = self.name, fixture = fixture.key(), bound, "Patched fixture");
        bound
    }

    /// Releases every channel bound to the fixture with the given key.
    pub fn unpatch_fixture(&self, fixture_key: &str) -> usize {
        let mut released = 0;
        for channel in self.channels.iter() {
            let bound = channel
                .master_key()
                .is_some_and(|key| key.fixture == fixture_key);
            if bound && channel.set_master(None).is_ok() {
                released += 1;
            }
        }
        released
    }
}

impl std::fmt::Debug for Universe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Universe")
            .field("name", &self.name)
            .field("size", &self.size())
            .field("patched", &self.patch().len())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::Universe;
    use crate::dmx::BufferError;
    use crate::lighting::{ChannelKey, ChannelType, Color, Fixture};

    fn rgb() -> Vec<Arc<ChannelType>> {
        vec![
            Arc::new(ChannelType::new("red", Color::RED)),
            Arc::new(ChannelType::new("green", Color::GREEN)),
            Arc::new(ChannelType::new("blue", Color::BLUE)),
        ]
    }

    #[test]
    fn test_new() {
        let universe = Universe::with_start_code("main", 16, 0xCC);
        assert_eq!(16, universe.size());
        assert_eq!(0xCC, universe.buffer().start_code());
        assert!(universe.channel(15).is_some());
        assert!(universe.channel(16).is_none());
        assert!(universe.patch().is_empty());
    }

    #[test]
    fn test_patch_fixture() {
        let universe = Universe::new("main", 16);
        let fixture = Fixture::with_types("par", "Par", 4, 0, &rgb());

        assert_eq!(3, universe.patch_fixture(&fixture, 0));
        let patch = universe.patch();
        assert_eq!(Some(&ChannelKey::new("par", 0)), patch.get(&4));
        assert_eq!(Some(&ChannelKey::new("par", 2)), patch.get(&6));

        fixture.channel(1).unwrap().set_level(77);
        assert_eq!(vec![0, 0, 0, 0, 0, 0, 77, 0], universe.buffer().get_block(-1, 8).unwrap());
    }

    #[test]
    fn test_patch_fixture_other_universe() {
        let universe = Universe::new("second", 16);
        // Channels 510 and 511 stay in universe 0, 512 folds over to id 0 of universe 1.
        let fixture = Fixture::with_types("wide", "Wide", 510, 0, &rgb());

        assert_eq!(1, universe.patch_fixture(&fixture, 1));
        assert_eq!(Some(&ChannelKey::new("wide", 2)), universe.patch().get(&0));
    }

    #[test]
    fn test_rebind() {
        let universe = Universe::new("main", 4);
        let fixture = Fixture::with_types("par", "Par", 0, 0, &rgb());

        universe.rebind(3, fixture.channel(0).as_ref()).unwrap();
        universe.rebind(3, fixture.channel(2).as_ref()).unwrap();
        assert_eq!(Some(&ChannelKey::new("par", 2)), universe.patch().get(&3));

        assert_eq!(
            Err(BufferError::ChannelOutOfBounds { index: 4, size: 4 }),
            universe.rebind(4, None)
        );
    }

    #[test]
    fn test_unpatch_fixture() {
        let universe = Universe::new("main", 8);
        let first = Fixture::with_types("a", "A", 0, 0, &rgb());
        let second = Fixture::with_types("b", "B", 3, 0, &rgb());
        universe.patch_fixture(&first, 0);
        universe.patch_fixture(&second, 0);

        assert_eq!(3, universe.unpatch_fixture("a"));
        assert_eq!(vec![3, 4, 5], universe.patch().into_keys().collect::<Vec<_>>());
    }
}
