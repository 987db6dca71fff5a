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

use crossbeam_channel::Sender;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use super::{BufferError, DEFAULT_START_CODE};
use crate::notify::{Notifier, SubscriptionId};

/// Receives a read-only snapshot of the full frame (start code included)
/// whenever the buffer dispatches. Runs with the buffer's frame lock held, so
/// it must not access the buffer it was installed on in any way, reads
/// included. Forward the frame elsewhere instead (see [`Buffer::forward_frames`]).
pub type Dispatch = Box<dyn Fn(&[u8]) + Send + Sync>;

/// A single channel whose level changed during a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelChange {
    /// Zero-based logical channel index.
    pub index: usize,
    /// The level before the write.
    pub previous: u8,
    /// The level after the write.
    pub level: u8,
}

/// Mutable frame data, guarded by the buffer's lock.
struct Frame {
    /// Start code followed by the channel levels.
    data: Vec<u8>,
    /// Whether every write is dispatched straight away.
    immediate_dispatch: bool,
    /// Set when a write happened while immediate dispatch was disabled.
    dirty: bool,
}

/// A DMX universe buffer. Byte 0 is the start code, bytes 1..=size are the
/// channel levels, so logical channel `n` lives at offset `n + 1`. The buffer
/// owns its bytes exclusively; all access goes through bounds-checked calls
/// that copy data in or out.
pub struct Buffer {
    /// The number of channels.
    size: usize,
    /// The frame itself.
    frame: Mutex<Frame>,
    /// The transport hook.
    dispatch: RwLock<Option<Dispatch>>,
    /// Per-channel change notifications.
    changes: Notifier<ChannelChange>,
}

impl Buffer {
    /// Creates a zeroed buffer of the given number of channels with the
    /// standard start code.
    pub fn new(size: usize) -> Buffer {
        Self::with_start_code(size, DEFAULT_START_CODE)
    }

    /// Creates a zeroed buffer with a custom start code.
    pub fn with_start_code(size: usize, start_code: u8) -> Buffer {
        let mut data = vec![0u8; size + 1];
        data[0] = start_code;
        Buffer {
            size,
            frame: Mutex::new(Frame {
                data,
                immediate_dispatch: true,
                dirty: false,
            }),
            dispatch: RwLock::new(None),
            changes: Notifier::new(),
        }
    }

    /// The number of channels in this buffer.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The current start code byte.
    pub fn start_code(&self) -> u8 {
        self.frame.lock().data[0]
    }

    /// A copy of the whole frame, start code included.
    pub fn frame(&self) -> Vec<u8> {
        self.frame.lock().data.clone()
    }

    /// Installs the dispatch hook, replacing any previous one.
    pub fn set_dispatch<F>(&self, dispatch: F)
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        *self.dispatch.write() = Some(Box::new(dispatch));
    }

    /// Forwards every dispatched frame to the given channel, typically read by a
    /// transport thread.
    pub fn forward_frames(&self, sender: Sender<Vec<u8>>) {
        self.set_dispatch(move |frame| {
            if sender.send(frame.to_vec()).is_err() {
                debug!("Frame receiver has gone away, dropping frame");
            }
        });
    }

    /// Removes the dispatch hook.
    pub fn clear_dispatch(&self) {
        *self.dispatch.write() = None;
    }

    /// Subscribes to per-channel change notifications.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ChannelChange) + Send + Sync + 'static,
    {
        self.changes.subscribe(callback)
    }

    /// Removes a change subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.changes.unsubscribe(id)
    }

    /// Returns true if writes are dispatched as they happen.
    pub fn immediate_dispatch(&self) -> bool {
        self.frame.lock().immediate_dispatch
    }

    /// Enables or disables immediate dispatch. Re-enabling dispatches once if
    /// anything was written while it was disabled.
    pub fn set_immediate_dispatch(&self, enabled: bool) {
        let mut frame = self.frame.lock();
        let was_enabled = frame.immediate_dispatch;
        frame.immediate_dispatch = enabled;
        if enabled && !was_enabled && frame.dirty {
            frame.dirty = false;
            self.dispatch(&frame.data);
        }
    }

    /// Writes `source` starting at logical channel `start`. A `start` of -1
    /// addresses the start code byte. Only channels whose level actually changed
    /// are notified.
    pub fn set_block(&self, source: &[u8], start: isize) -> Result<(), BufferError> {
        let out_of_bounds = BufferError::BlockOutOfBounds {
            start,
            len: source.len(),
            size: self.size,
        };
        let offset = Self::offset(start, source.len(), self.size).ok_or(out_of_bounds)?;

        let changes: Vec<ChannelChange> = {
            let mut frame = self.frame.lock();
            let range = offset..offset + source.len();
            let previous = frame.data[range.clone()].to_vec();
            frame.data[range].copy_from_slice(source);

            let changes = previous
                .iter()
                .zip(source)
                .enumerate()
                .filter(|(_, (previous, level))| previous != level)
                // Offset 0 is the start code, which is not a channel.
                .filter_map(|(i, (previous, level))| {
                    (offset + i).checked_sub(1).map(|index| ChannelChange {
                        index,
                        previous: *previous,
                        level: *level,
                    })
                })
                .collect();
            self.after_write(&mut frame);
            changes
        };

        for change in changes.iter() {
            self.changes.notify(change);
        }
        Ok(())
    }

    /// Writes a single channel. Writing the current level is a no-op.
    pub fn set_channel(&self, index: usize, level: u8) -> Result<(), BufferError> {
        if index >= self.size {
            return Err(BufferError::ChannelOutOfBounds {
                index,
                size: self.size,
            });
        }

        let change = {
            let mut frame = self.frame.lock();
            let previous = frame.data[index + 1];
            if previous == level {
                return Ok(());
            }
            frame.data[index + 1] = level;
            self.after_write(&mut frame);
            ChannelChange {
                index,
                previous,
                level,
            }
        };

        self.changes.notify(&change);
        Ok(())
    }

    /// Returns a copy of `length` bytes starting at logical channel `start`,
    /// using the same addressing as [`Buffer::set_block`].
    pub fn get_block(&self, start: isize, length: usize) -> Result<Vec<u8>, BufferError> {
        let offset =
            Self::offset(start, length, self.size).ok_or(BufferError::BlockOutOfBounds {
                start,
                len: length,
                size: self.size,
            })?;
        Ok(self.frame.lock().data[offset..offset + length].to_vec())
    }

    /// Reads a single channel level.
    pub fn level(&self, index: usize) -> Result<u8, BufferError> {
        if index >= self.size {
            return Err(BufferError::ChannelOutOfBounds {
                index,
                size: self.size,
            });
        }
        Ok(self.frame.lock().data[index + 1])
    }

    /// Translates a logical start into a frame offset, or None if the block
    /// doesn't fit.
    fn offset(start: isize, len: usize, size: usize) -> Option<usize> {
        if start < -1 {
            return None;
        }
        let end = start.checked_add(isize::try_from(len).ok()?)?;
        if end > isize::try_from(size).ok()? {
            return None;
        }
        usize::try_from(start + 1).ok()
    }

    /// Applies the dispatch policy after a write.
    fn after_write(&self, frame: &mut Frame) {
        if frame.immediate_dispatch {
            self.dispatch(&frame.data);
        } else {
            frame.dirty = true;
        }
    }

    /// Hands the frame to the dispatch hook, if any. Called with the frame lock
    /// held so that dispatched frames arrive in write order.
    fn dispatch(&self, data: &[u8]) {
        if let Some(dispatch) = self.dispatch.read().as_ref() {
            dispatch(data);
        }
    }
}
