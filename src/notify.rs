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

//! Typed subscriber lists. Every notification in the engine (level changes,
//! master binding changes, phase advances, buffer channel changes) goes through
//! a [`Notifier`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Identifies a subscription so that it can be removed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A list of callbacks invoked synchronously, on the notifying thread.
pub struct Notifier<T> {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(SubscriptionId, Callback<T>)>>,
}

impl<T> Notifier<T> {
    /// Creates an empty notifier.
    pub fn new() -> Notifier<T> {
        Notifier {
            next_id: AtomicU64::new(0),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Adds a subscriber and returns its id.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().push((id, Arc::new(callback)));
        id
    }

    /// Removes a subscriber. Returns false if the id was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(subscription, _)| *subscription != id);
        subscribers.len() != before
    }

    /// The number of current subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Returns true if nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calls every subscriber with the value. The subscriber list is copied
    /// first so callbacks may subscribe or unsubscribe without deadlocking.
    pub fn notify(&self, value: &T) {
        let subscribers: Vec<Callback<T>> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in subscribers {
            callback(value);
        }
    }
}

impl<T> Default for Notifier<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::Notifier;

    #[test]
    fn test_subscribe_and_notify() {
        let notifier: Notifier<usize> = Notifier::new();
        let total = Arc::new(AtomicUsize::new(0));

        {
            let total = total.clone();
            notifier.subscribe(move |value| {
                total.fetch_add(*value, Ordering::SeqCst);
            });
        }
        {
            let total = total.clone();
            notifier.subscribe(move |value| {
                total.fetch_add(*value * 10, Ordering::SeqCst);
            });
        }

        notifier.notify(&2);
        assert_eq!(22, total.load(Ordering::SeqCst));
        assert_eq!(2, notifier.len());
    }

    #[test]
    fn test_unsubscribe() {
        let notifier: Notifier<()> = Notifier::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let id = {
            let calls = calls.clone();
            notifier.subscribe(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };

        notifier.notify(&());
        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));
        notifier.notify(&());

        assert_eq!(1, calls.load(Ordering::SeqCst));
        assert!(notifier.is_empty());
    }

    #[test]
    fn test_unsubscribe_from_callback() {
        let notifier: Arc<Notifier<()>> = Arc::new(Notifier::new());
        let slot = Arc::new(parking_lot::Mutex::new(None));

        let id = {
            let weak = Arc::downgrade(&notifier);
            let slot = slot.clone();
            notifier.subscribe(move |_| {
                if let (Some(notifier), Some(id)) = (weak.upgrade(), *slot.lock()) {
                    notifier.unsubscribe(id);
                }
            })
        };
        *slot.lock() = Some(id);

        notifier.notify(&());
        assert!(notifier.is_empty());
    }
}
