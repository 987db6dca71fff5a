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
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{Buffer, BufferError};
use crate::lighting::{ChannelKey, FixtureChannel};
use crate::notify::{Notifier, SubscriptionId};

/// A live binding to a master fixture channel.
struct MasterLink {
    channel: Weak<FixtureChannel>,
    key: ChannelKey,
    subscription: SubscriptionId,
}

impl MasterLink {
    fn detach(self) {
        if let Some(channel) = self.channel.upgrade() {
            channel.unsubscribe_level(self.subscription);
        }
    }
}

/// A view over one channel of a [`Buffer`]. The channel may be slaved to a
/// fixture channel, in which case it mirrors the fixture channel's level.
pub struct BufferChannel {
    buffer: Arc<Buffer>,
    index: usize,
    master: Mutex<Option<MasterLink>>,
    master_changed: Notifier<Option<ChannelKey>>,
}

impl BufferChannel {
    /// Creates a view over the channel at the zero-based index.
    pub fn new(buffer: Arc<Buffer>, index: usize) -> Result<BufferChannel, BufferError> {
        if index >= buffer.size() {
            return Err(BufferError::ChannelOutOfBounds {
                index,
                size: buffer.size(),
            });
        }

        Ok(BufferChannel {
            buffer,
            index,
            master: Mutex::new(None),
            master_changed: Notifier::new(),
        })
    }

    /// Gets the zero-based index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Gets the level from the buffer.
    pub fn level(&self) -> u8 {
        // The index was checked at construction and buffers never resize.
        self.buffer.level(self.index).unwrap_or_default()
    }

    /// Writes the level into the buffer.
    pub fn set_level(&self, level: u8) -> Result<(), BufferError> {
        self.buffer.set_channel(self.index, level)
    }

    /// Gets the master channel, if bound and still alive.
    pub fn master(&self) -> Option<Arc<FixtureChannel>> {
        self.master
            .lock()
            .as_ref()
            .and_then(|link| link.channel.upgrade())
    }

    /// Gets the key of the master channel, if bound and still alive.
    pub fn master_key(&self) -> Option<ChannelKey> {
        self.master
            .lock()
            .as_ref()
            .filter(|link| link.channel.strong_count() > 0)
            .map(|link| link.key.clone())
    }

    /// Replaces the master channel. The previous master is detached, the new
    /// master's level is copied into the buffer, and from then on every level
    /// change of the master is mirrored. Master change subscribers are told
    /// about the new binding.
    pub fn set_master(&self, master: Option<&Arc<FixtureChannel>>) -> Result<(), BufferError> {
        let key = {
            let mut link = self.master.lock();
            if let Some(previous) = link.take() {
                debug!(index = self.index, master = %previous.key, "Detaching master");
                previous.detach();
            }

            match master {
                Some(channel) => {
                    let buffer = self.buffer.clone();
                    let index = self.index;
                    let subscription = channel.subscribe_level(move |level| {
                        if let Err(e) = buffer.set_channel(index, *level) {
                            warn!(index, err = %e, "Unable to mirror master level");
                        }
                    });
                    *link = Some(MasterLink {
                        channel: Arc::downgrade(channel),
                        key: channel.key().clone(),
                        subscription,
                    });
                    debug!(index, master = %channel.key(), "Attached master");
                    Some(channel.key().clone())
                }
                None => None,
            }
        };

        if let Some(channel) = master {
            self.set_level(channel.level())?;
        }
        self.master_changed.notify(&key);
        Ok(())
    }

    /// Subscribes to master binding changes.
    pub fn subscribe_master_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Option<ChannelKey>) + Send + Sync + 'static,
    {
        self.master_changed.subscribe(callback)
    }

    /// Removes a master binding subscription.
    pub fn unsubscribe_master_changed(&self, id: SubscriptionId) -> bool {
        self.master_changed.unsubscribe(id)
    }
}

impl Drop for BufferChannel {
    fn drop(&mut self) {
        if let Some(link) = self.master.get_mut().take() {
            link.detach();
        }
    }
}

impl fmt::Debug for BufferChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferChannel")
            .field("index", &self.index)
            .field("level", &self.level())
            .field("master", &self.master_key())
            .finish()
    }
}
