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

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use super::{ChannelKey, ChannelType, Color, FixtureChannel};
use crate::notify::{Notifier, SubscriptionId};
use crate::states::{PhaseEvent, State};

/// The state a fixture is following.
#[derive(Default)]
struct ActiveState {
    /// The applied state, if any.
    state: Option<Arc<State>>,
    /// Our phase subscription on that state.
    subscription: Option<SubscriptionId>,
    /// The last levels received from the state.
    levels: Option<Vec<u8>>,
    /// Bumped every time new channel levels are recorded.
    generation: u64,
    /// The levels recorded for the current generation. None leaves the
    /// channels alone, an empty list clears them.
    target: Option<Vec<u8>>,
}

impl ActiveState {
    /// Records the levels the channels should end up with and returns them
    /// with their generation.
    fn record(&mut self, target: Option<Vec<u8>>) -> (u64, Option<Vec<u8>>) {
        self.generation = self.generation.wrapping_add(1);
        self.target = target.clone();
        (self.generation, target)
    }
}

/// A physical lighting device, modeled as an ordered list of channels.
pub struct Fixture {
    /// The key, fixed at construction.
    key: String,
    /// The display name.
    name: RwLock<String>,
    /// The channel id of the first channel.
    start_channel: usize,
    /// The universe index channels are created in.
    universe_index: u32,
    /// The channels of this fixture.
    channels: RwLock<Vec<Arc<FixtureChannel>>>,
    /// The name of the state group this fixture draws its states from.
    state_group: RwLock<Option<String>>,
    /// The currently applied state.
    active: Mutex<ActiveState>,
    /// The blended color of all channels.
    mixed_color: Mutex<Color>,
    /// Mixed color subscribers.
    mixed_color_changed: Notifier<Color>,
}

impl Fixture {
    /// Creates a fixture with one channel per given type. Channel ids run from
    /// `start_channel` upwards; ids past the end of the universe are folded into
    /// the following universes once every channel has a type.
    pub fn new<I>(
        key: &str,
        name: &str,
        start_channel: usize,
        universe_index: u32,
        channel_types: I,
    ) -> Arc<Fixture>
    where
        I: IntoIterator<Item = Option<Arc<ChannelType>>>,
    {
        let fixture = Arc::new_cyclic(|fixture: &Weak<Fixture>| Fixture {
            key: key.to_string(),
            name: RwLock::new(name.to_string()),
            start_channel,
            universe_index,
            channels: RwLock::new(
                channel_types
                    .into_iter()
                    .enumerate()
                    .map(|(position, channel_type)| {
                        Arc::new(FixtureChannel::new(
                            ChannelKey::new(key, position),
                            start_channel.saturating_add(position),
                            universe_index,
                            channel_type,
                            fixture.clone(),
                        ))
                    })
                    .collect(),
            ),
            state_group: RwLock::new(None),
            active: Mutex::new(ActiveState::default()),
            mixed_color: Mutex::new(Color::BLACK),
            mixed_color_changed: Notifier::new(),
        });
        fixture.channel_type_changed();
        fixture
    }

    /// Creates a fixture whose channels all have the given types.
    pub fn with_types(
        key: &str,
        name: &str,
        start_channel: usize,
        universe_index: u32,
        channel_types: &[Arc<ChannelType>],
    ) -> Arc<Fixture> {
        Self::new(
            key,
            name,
            start_channel,
            universe_index,
            channel_types.iter().cloned().map(Some),
        )
    }

    /// Gets the key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Gets the display name.
    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    /// Sets the display name.
    pub fn set_name(&self, name: &str) {
        *self.name.write() = name.to_string();
    }

    /// Gets the start channel.
    pub fn start_channel(&self) -> usize {
        self.start_channel
    }

    /// Gets the channels.
    pub fn channels(&self) -> Vec<Arc<FixtureChannel>> {
        self.channels.read().clone()
    }

    /// Gets the channel at the given position.
    pub fn channel(&self, position: usize) -> Option<Arc<FixtureChannel>> {
        self.channels.read().get(position).cloned()
    }

    /// Gets the number of channels.
    pub fn channel_count(&self) -> usize {
        self.channels.read().len()
    }

    /// Gets the name of the state group.
    pub fn state_group(&self) -> Option<String> {
        self.state_group.read().clone()
    }

    /// Sets the name of the state group.
    pub fn set_state_group(&self, state_group: Option<String>) {
        *self.state_group.write() = state_group;
    }

    /// Gets the currently applied state.
    pub fn current_state(&self) -> Option<Arc<State>> {
        self.active.lock().state.clone()
    }

    /// Gets the blended display color.
    pub fn mixed_color(&self) -> Color {
        *self.mixed_color.lock()
    }

    /// Subscribes to mixed color changes.
    pub fn subscribe_mixed_color<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Color) + Send + Sync + 'static,
    {
        self.mixed_color_changed.subscribe(callback)
    }

    /// Applies a state to this fixture. Nothing happens if the state is already
    /// applied. A flashing state is restarted from its first phase when
    /// `flash_now` is set; a static state has its only phase applied directly.
    /// Applying `None` detaches from the current state and clears all levels.
    pub fn apply_state(self: &Arc<Self>, state: Option<Arc<State>>, flash_now: bool) {
        let (previous, (generation, target)) = {
            let mut active = self.active.lock();
            let unchanged = match (&active.state, &state) {
                (Some(current), Some(next)) => Arc::ptr_eq(current, next),
                (None, None) => true,
                _ => false,
            };
            if unchanged {
                return;
            }

            let previous = active.state.take();
            if let (Some(previous), Some(subscription)) = (&previous, active.subscription.take()) {
                previous.unsubscribe(subscription);
            }
            active.levels = None;

            if let Some(state) = &state {
                let fixture = Arc::downgrade(self);
                let source = Arc::downgrade(state);
                active.subscription = Some(state.subscribe(move |event| {
                    if let Some(fixture) = fixture.upgrade() {
                        fixture.receive_phase(&source, event);
                    }
                }));
                active.state = Some(state.clone());
            }

            let recorded = match &state {
                Some(state) if state.is_flashing() => active.record(None),
                Some(state) => {
                    let levels = state
                        .phase(0)
                        .map(|phase| phase.levels())
                        .unwrap_or_default();
                    active.levels = Some(levels.clone());
                    active.record(Some(levels))
                }
                None => active.record(Some(Vec::new())),
            };
            (previous, recorded)
        };
        self.write_recorded(generation, target);

        debug!(
            fixture = self.key,
            from = ?previous.as_ref().map(|s| s.key()),
            to = ?state.as_ref().map(|s| s.key()),
            "Applying state"
        );

        if let Some(state) = &state {
            if flash_now && state.is_flashing() {
                state.reset_flash(true);
            }
        }

        // A state nobody follows any more stops cycling.
        if let Some(previous) = previous {
            if previous.subscriber_count() == 0 {
                previous.stop();
            }
        }
    }

    /// Sets each channel to the level at its position, or 0 when there is no
    /// such level. Extra levels are ignored.
    pub fn apply_levels(&self, levels: Option<&[u8]>) {
        for (position, channel) in self.channels().iter().enumerate() {
            let level = levels
                .and_then(|levels| levels.get(position))
                .copied()
                .unwrap_or(0);
            channel.set_level(level);
        }
    }

    /// Sets every channel to 0.
    pub fn clear_all(&self) {
        self.apply_levels(None);
    }

    /// Applies the last levels received from the current state again.
    pub fn reapply_current(&self) {
        let (generation, target) = {
            let mut active = self.active.lock();
            match active.levels.clone() {
                Some(levels) => active.record(Some(levels)),
                None => return,
            }
        };
        self.write_recorded(generation, target);
    }

    /// Writes levels recorded under `generation`. The state lock is not held
    /// while channels and their subscribers run, so if a newer generation was
    /// recorded in the meantime its levels are written again on top.
    fn write_recorded(&self, mut generation: u64, mut target: Option<Vec<u8>>) {
        loop {
            if let Some(levels) = &target {
                self.apply_levels(Some(levels));
            }
            let active = self.active.lock();
            if active.generation == generation {
                return;
            }
            generation = active.generation;
            target = active.target.clone();
        }
    }

    /// Reshapes this fixture after a template: same channel count, same channel
    /// types by position, same state group.
    pub fn resync_from_template(self: &Arc<Self>, template: &Fixture) {
        let template_channels = template.channels();
        let channels = {
            let mut channels = self.channels.write();
            channels.truncate(template_channels.len());
            while channels.len() < template_channels.len() {
                let position = channels.len();
                channels.push(Arc::new(FixtureChannel::new(
                    ChannelKey::new(&self.key, position),
                    self.start_channel.saturating_add(position),
                    self.universe_index,
                    None,
                    Arc::downgrade(self),
                )));
            }
            channels.clone()
        };

        for (channel, template_channel) in channels.iter().zip(template_channels.iter()) {
            channel.set_channel_type(template_channel.channel_type());
        }
        self.set_state_group(template.state_group());
        // Truncation may have removed channels without any type change.
        self.refresh_mixed_color();

        debug!(
            fixture = self.key,
            template = template.key(),
            channels = channels.len(),
            "Resynced fixture from template"
        );
    }

    /// Folds every channel id of 512 or more into the universe index.
    pub fn fix_channel_ids(&self) {
        for channel in self.channels().iter() {
            if channel.fix_id() {
                debug!(
                    channel = %channel.key(),
                    id = channel.id(),
                    universe_index = channel.universe_index(),
                    "Corrected overflowing channel id"
                );
            }
        }
    }

    /// Returns true if every channel has a channel type.
    pub fn channel_types_resolved(&self) -> bool {
        self.channels
            .read()
            .iter()
            .all(|channel| channel.channel_type().is_some())
    }

    /// Called by a channel after its type changed.
    pub(super) fn channel_type_changed(&self) {
        // Fixtures that are still being assembled keep their raw ids.
        if self.channel_types_resolved() {
            self.fix_channel_ids();
        }
        self.refresh_mixed_color();
    }

    /// Recomputes the mixed color, notifying subscribers if it changed.
    pub(super) fn refresh_mixed_color(&self) {
        // Summed under the lock so a stale sum can't replace a newer one.
        let color = {
            let mut mixed_color = self.mixed_color.lock();
            let color = self
                .channels()
                .iter()
                .filter_map(|channel| {
                    channel
                        .channel_type()
                        .map(|channel_type| channel_type.contribution(channel.level()))
                })
                .fold(Color::BLACK, |mixed, color| mixed + color);
            if *mixed_color == color {
                return;
            }
            *mixed_color = color;
            color
        };
        self.mixed_color_changed.notify(&color);
    }

    /// Handles a phase advance from a state this fixture follows.
    fn receive_phase(&self, source: &Weak<State>, event: &PhaseEvent) {
        let (generation, target) = {
            let mut active = self.active.lock();
            // Ignore stragglers from a state we have already left.
            let current = active
                .state
                .as_ref()
                .is_some_and(|state| std::ptr::eq(Arc::as_ptr(state), source.as_ptr()));
            if !current {
                return;
            }
            active.levels = Some(event.levels.clone());
            active.record(Some(event.levels.clone()))
        };
        self.write_recorded(generation, target);
    }
}

impl fmt::Debug for Fixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fixture")
            .field("key", &self.key)
            .field("name", &self.name())
            .field("start_channel", &self.start_channel)
            .field("channels", &self.channels())
            .field("state_group", &self.state_group())
            .finish()
    }
}

impl fmt::Display for Fixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {} channels from {})",
            self.name(),
            self.key,
            self.channel_count(),
            self.start_channel
        )
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use crate::lighting::{ChannelType, Color, Fixture};
    use crate::states::{State, StatePhase};
    use crate::testutil::eventually;

    fn rgb() -> Vec<Arc<ChannelType>> {
        vec![
            Arc::new(ChannelType::new("red", Color::RED)),
            Arc::new(ChannelType::new("green", Color::GREEN)),
            Arc::new(ChannelType::new("blue", Color::BLUE)),
        ]
    }

    fn assert_color_near(expected: Color, actual: Color) {
        let close = |a: f64, b: f64| (a - b).abs() < 1e-9;
        assert!(
            close(expected.r, actual.r) && close(expected.g, actual.g) && close(expected.b, actual.b),
            "expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    fn levels(fixture: &Fixture) -> Vec<u8> {
        fixture.channels().iter().map(|c| c.level()).collect()
    }

    #[test]
    fn test_channel_ids() {
        let fixture = Fixture::with_types("par", "Par", 10, 0, &rgb());
        let ids: Vec<usize> = fixture.channels().iter().map(|c| c.id()).collect();
        assert_eq!(vec![10, 11, 12], ids);
        assert_eq!("par/2", fixture.channel(2).unwrap().key().to_string());
    }

    #[test]
    fn test_channel_ids_fixed_on_construction() {
        let fixture = Fixture::with_types("bar", "Bar", 510, 0, &rgb());
        let addresses: Vec<(usize, u32)> = fixture
            .channels()
            .iter()
            .map(|c| (c.id(), c.universe_index()))
            .collect();
        assert_eq!(vec![(510, 0), (511, 0), (0, 1)], addresses);
    }

    #[test]
    fn test_channel_ids_deferred_until_types_resolved() {
        let types = rgb();
        let fixture = Fixture::new("bar", "Bar", 1023, 0, vec![None::<Arc<ChannelType>>, None]);
        // Nothing is corrected while the fixture is half built.
        assert_eq!(1023, fixture.channel(0).unwrap().id());
        assert_eq!(1024, fixture.channel(1).unwrap().id());

        fixture.channel(0).unwrap().set_channel_type(Some(types[0].clone()));
        assert_eq!(1023, fixture.channel(0).unwrap().id());

        fixture.channel(1).unwrap().set_channel_type(Some(types[1].clone()));
        let first = fixture.channel(0).unwrap();
        let second = fixture.channel(1).unwrap();
        assert_eq!((511, 1), (first.id(), first.universe_index()));
        assert_eq!((0, 2), (second.id(), second.universe_index()));
    }

    #[test]
    fn test_apply_levels() {
        let fixture = Fixture::with_types("par", "Par", 0, 0, &rgb());

        fixture.apply_levels(Some(&[1, 2, 3, 4]));
        assert_eq!(vec![1, 2, 3], levels(&fixture));

        fixture.apply_levels(Some(&[9]));
        assert_eq!(vec![9, 0, 0], levels(&fixture));

        fixture.apply_levels(Some(&[5, 6, 7]));
        fixture.clear_all();
        assert_eq!(vec![0, 0, 0], levels(&fixture));
    }

    #[test]
    fn test_mixed_color() {
        let fixture = Fixture::with_types("par", "Par", 0, 0, &rgb());
        assert_eq!(Color::BLACK, fixture.mixed_color());

        fixture.apply_levels(Some(&[255, 0, 128]));
        assert_color_near(
            Color::RED + Color::BLUE.scale(128.0 / 255.0),
            fixture.mixed_color(),
        );

        // Changing a type recalculates too.
        fixture
            .channel(2)
            .unwrap()
            .set_channel_type(Some(Arc::new(ChannelType::new("white", Color::WHITE))));
        assert_color_near(
            Color::RED + Color::WHITE.scale(128.0 / 255.0),
            fixture.mixed_color(),
        );
    }

    #[test]
    fn test_mixed_color_notifications() {
        let fixture = Fixture::with_types("par", "Par", 0, 0, &rgb());
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let calls = calls.clone();
            fixture.subscribe_mixed_color(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }

        fixture.apply_levels(Some(&[255, 0, 0]));
        fixture.apply_levels(Some(&[255, 0, 0]));
        assert_eq!(1, calls.load(Ordering::SeqCst));
    }

    #[test]
    fn test_name_is_mutable_key_is_not() {
        let fixture = Fixture::with_types("par", "Par", 0, 0, &rgb());
        fixture.set_name("Stage left par");
        assert_eq!("Stage left par", fixture.name());
        assert_eq!("par", fixture.key());
    }

    #[test]
    fn test_apply_static_state() {
        let fixture = Fixture::with_types("par", "Par", 0, 0, &rgb());
        let state = Arc::new(State::new(
            "warm",
            vec![StatePhase::new(vec![255, 128, 0], Duration::ZERO)],
            0,
            0,
        ));

        fixture.apply_state(Some(state.clone()), true);
        assert_eq!(vec![255, 128, 0], levels(&fixture));
        assert!(!state.is_running());
        assert!(Arc::ptr_eq(&state, &fixture.current_state().unwrap()));

        // Reapplying restores the state's levels after a reset.
        fixture.clear_all();
        fixture.reapply_current();
        assert_eq!(vec![255, 128, 0], levels(&fixture));

        fixture.apply_state(None, true);
        assert_eq!(vec![0, 0, 0], levels(&fixture));
        assert!(fixture.current_state().is_none());
        assert_eq!(0, state.subscriber_count());
    }

    #[test]
    fn test_apply_flashing_state() {
        let fixture = Fixture::with_types("par", "Par", 0, 0, &rgb());
        let state = Arc::new(State::new(
            "alarm",
            vec![
                StatePhase::new(vec![255, 0, 0], Duration::from_millis(20)),
                StatePhase::new(vec![0, 0, 255], Duration::from_millis(20)),
            ],
            0,
            0,
        ));

        fixture.apply_state(Some(state.clone()), true);
        // The first phase is applied before apply_state returns.
        assert_eq!(vec![255, 0, 0], levels(&fixture));
        assert!(state.is_running());

        let blue = fixture.clone();
        eventually(
            move || blue.channel(2).unwrap().level() == 255,
            "Second phase never applied",
        );

        // Leaving the state stops it, since nobody else follows it.
        fixture.apply_state(None, true);
        assert!(!state.is_running());
        assert_eq!(vec![0, 0, 0], levels(&fixture));
    }

    #[test]
    fn test_apply_flashing_state_without_flash_now() {
        let fixture = Fixture::with_types("par", "Par", 0, 0, &rgb());
        let state = Arc::new(State::new(
            "alarm",
            vec![
                StatePhase::new(vec![255, 0, 0], Duration::from_millis(20)),
                StatePhase::new(vec![0, 0, 255], Duration::from_millis(20)),
            ],
            0,
            0,
        ));

        fixture.apply_state(Some(state.clone()), false);
        assert!(!state.is_running());
        assert_eq!(vec![0, 0, 0], levels(&fixture));

        // Someone else starting the state drives this fixture too.
        state.reset_flash(true);
        assert_eq!(vec![255, 0, 0], levels(&fixture));
        state.reset_flash(false);
    }

    #[test]
    fn test_shared_state_keeps_running() {
        let first = Fixture::with_types("a", "A", 0, 0, &rgb());
        let second = Fixture::with_types("b", "B", 3, 0, &rgb());
        let state = Arc::new(State::new(
            "chase",
            vec![
                StatePhase::new(vec![255, 0, 0], Duration::from_millis(50)),
                StatePhase::new(vec![0, 255, 0], Duration::from_millis(50)),
            ],
            0,
            0,
        ));

        first.apply_state(Some(state.clone()), true);
        second.apply_state(Some(state.clone()), true);
        assert_eq!(2, state.subscriber_count());

        first.apply_state(None, true);
        assert!(state.is_running());

        second.apply_state(None, true);
        assert!(!state.is_running());
    }

    #[test]
    fn test_switching_states_ignores_old_phases() {
        let fixture = Fixture::with_types("par", "Par", 0, 0, &rgb());
        let flashing = Arc::new(State::new(
            "flashing",
            vec![
                StatePhase::new(vec![255, 255, 255], Duration::from_millis(5)),
                StatePhase::new(vec![0, 0, 0], Duration::from_millis(5)),
            ],
            0,
            0,
        ));
        let steady = Arc::new(State::new(
            "steady",
            vec![StatePhase::new(vec![10, 20, 30], Duration::ZERO)],
            0,
            0,
        ));

        fixture.apply_state(Some(flashing.clone()), true);
        fixture.apply_state(Some(steady), true);
        assert!(!flashing.is_running());

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(vec![10, 20, 30], levels(&fixture));
    }

    #[test]
    fn test_resync_from_template() {
        let types = rgb();
        let template = Fixture::with_types("template", "Template", 0, 0, &types[0..2]);
        template.set_state_group(Some("rg".to_string()));

        // Extending.
        let fixture = Fixture::new("par", "Par", 20, 0, vec![None::<Arc<ChannelType>>]);
        fixture.resync_from_template(&template);
        assert_eq!(2, fixture.channel_count());
        assert!(Arc::ptr_eq(
            &types[1],
            &fixture.channel(1).unwrap().channel_type().unwrap()
        ));
        assert_eq!(21, fixture.channel(1).unwrap().id());
        assert_eq!(Some("rg".to_string()), fixture.state_group());

        // Truncating.
        let wide = Fixture::with_types("wide", "Wide", 0, 0, &types);
        wide.apply_levels(Some(&[0, 0, 255]));
        wide.resync_from_template(&template);
        assert_eq!(2, wide.channel_count());
        assert_eq!(Color::BLACK, wide.mixed_color());
    }

    #[test]
    fn test_resync_fixes_overflowing_ids() {
        let types = rgb();
        let template = Fixture::with_types("template", "Template", 0, 0, &types);
        let fixture = Fixture::new("par", "Par", 511, 0, Vec::<Option<Arc<ChannelType>>>::new());

        fixture.resync_from_template(&template);
        let addresses: Vec<(usize, u32)> = fixture
            .channels()
            .iter()
            .map(|c| (c.id(), c.universe_index()))
            .collect();
        assert_eq!(vec![(511, 0), (0, 1), (1, 1)], addresses);
    }

    #[test]
    fn test_subscribers_may_read_fixture_state() {
        let fixture = Fixture::with_types("par", "Par", 0, 0, &rgb());
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        {
            let weak = Arc::downgrade(&fixture);
            let seen = seen.clone();
            fixture.subscribe_mixed_color(move |_| {
                if let Some(fixture) = weak.upgrade() {
                    let key = fixture.current_state().map(|state| state.key().to_string());
                    seen.lock().push(key);
                }
            });
        }
        let steady = Arc::new(State::new(
            "steady",
            vec![StatePhase::new(vec![255, 0, 0], Duration::ZERO)],
            0,
            0,
        ));
        let flashing = Arc::new(State::new(
            "flashing",
            vec![
                StatePhase::new(vec![0, 255, 0], Duration::from_secs(5)),
                StatePhase::new(vec![0, 0, 255], Duration::from_secs(5)),
            ],
            0,
            0,
        ));

        let done = Arc::new(AtomicUsize::new(0));
        {
            let fixture = fixture.clone();
            let done = done.clone();
            std::thread::spawn(move || {
                fixture.apply_state(Some(steady), true);
                fixture.reapply_current();
                // Phases arrive on the scheduler thread.
                fixture.apply_state(Some(flashing), true);
                done.store(1, Ordering::SeqCst);
            });
        }
        {
            let done = done.clone();
            eventually(move || done.load(Ordering::SeqCst) == 1, "Applying states never returned");
        }

        assert_eq!(vec![0, 255, 0], levels(&fixture));
        let seen = seen.lock();
        assert_eq!(Some("steady".to_string()), seen[0]);
        assert_eq!(Some(&Some("flashing".to_string())), seen.last());
        fixture.apply_state(None, false);
    }

    #[test]
    fn test_mixed_color_under_concurrent_writes() {
        let types = vec![
            Arc::new(ChannelType::new("red", Color::RED)),
            Arc::new(ChannelType::new("blue", Color::BLUE)),
        ];
        let fixture = Fixture::with_types("par", "Par", 0, 0, &types);

        let writers: Vec<_> = (0..2)
            .map(|position| {
                let fixture = fixture.clone();
                std::thread::spawn(move || {
                    let channel = fixture.channel(position).unwrap();
                    for round in 0..20u32 {
                        for level in 0..=255u8 {
                            let level = if (round + position as u32) % 2 == 0 {
                                level
                            } else {
                                255 - level
                            };
                            channel.set_level(level);
                        }
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let red = fixture.channel(0).unwrap().level();
        let blue = fixture.channel(1).unwrap().level();
        assert_color_near(
            types[0].contribution(red) + types[1].contribution(blue),
            fixture.mixed_color(),
        );
    }
}
