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
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, span, trace, Level};

use super::StatePhase;
use crate::lighting::ChannelType;
use crate::notify::{Notifier, SubscriptionId};

/// Emitted every time a state's scheduler fires a phase.
#[derive(Debug, Clone)]
pub struct PhaseEvent {
    /// The key of the state.
    pub state: String,
    /// The index of the emitted phase.
    pub phase: usize,
    /// The number of phases emitted since the last reset, this one included.
    pub step: u32,
    /// The levels of the emitted phase.
    pub levels: Vec<u8>,
}

/// Messages processed by a state's scheduler thread.
enum Command {
    /// Restart from the first phase, or cancel any pending tick. The sender is
    /// signalled once the command has been handled.
    Reset {
        enable: bool,
        done: Option<Sender<()>>,
    },
    /// Exit the scheduler.
    Shutdown,
}

/// Where the scheduler is within the phase list. Owned by the scheduler thread.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Cursor {
    /// The phase to emit on the next tick.
    phase: usize,
    /// The number of phases emitted since the last reset.
    step: u32,
}

/// Data shared between a state and its scheduler thread.
struct Shared {
    key: String,
    phases: RwLock<Vec<StatePhase>>,
    cycle_step_count: i32,
    loop_back_step: i32,
    running: AtomicBool,
    phase_advanced: Notifier<PhaseEvent>,
}

/// Handle to a running scheduler thread.
struct Worker {
    mailbox: Sender<Command>,
    thread: ThreadId,
    handle: JoinHandle<()>,
}

/// A named lighting state made of one or more timed phases.
///
/// A state with several phases, at least one of them timed, is a flashing
/// state: [`State::reset_flash`] starts a scheduler that emits a
/// [`PhaseEvent`] for each phase in turn. After the last phase the scheduler
/// resumes at the loop back step. It stops after `cycle_step_count` phases
/// (never, if that is 0 or less) or after emitting a phase with a zero
/// duration, leaving that phase's levels in effect.
pub struct State {
    shared: Arc<Shared>,
    worker: Mutex<Option<Worker>>,
}

impl State {
    /// Creates a new state. An empty phase list becomes a single untimed phase.
    pub fn new(
        key: &str,
        phases: Vec<StatePhase>,
        cycle_step_count: i32,
        loop_back_step: i32,
    ) -> State {
        let phases = if phases.is_empty() {
            vec![StatePhase::new(Vec::new(), Duration::ZERO)]
        } else {
            phases
        };

        State {
            shared: Arc::new(Shared {
                key: key.to_string(),
                phases: RwLock::new(phases),
                cycle_step_count,
                loop_back_step,
                running: AtomicBool::new(false),
                phase_advanced: Notifier::new(),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Gets the key.
    pub fn key(&self) -> &str {
        &self.shared.key
    }

    /// Gets the number of phases emitted before the scheduler stops. Zero or
    /// less means unlimited.
    pub fn cycle_step_count(&self) -> i32 {
        self.shared.cycle_step_count
    }

    /// Gets the phase the scheduler resumes at after the last phase.
    pub fn loop_back_step(&self) -> i32 {
        self.shared.loop_back_step
    }

    /// Gets the number of phases.
    pub fn phase_count(&self) -> usize {
        self.shared.phases.read().len()
    }

    /// Gets a copy of the phase at the given index.
    pub fn phase(&self, index: usize) -> Option<StatePhase> {
        self.shared.phases.read().get(index).cloned()
    }

    /// Gets a copy of all phases.
    pub fn phases(&self) -> Vec<StatePhase> {
        self.shared.phases.read().clone()
    }

    /// Changes the duration of a phase. Returns false if there is no such phase.
    pub fn set_phase_duration(&self, index: usize, duration: Duration) -> bool {
        match self.shared.phases.write().get_mut(index) {
            Some(phase) => {
                phase.set_duration(duration);
                true
            }
            None => false,
        }
    }

    /// Returns true if this state cycles: more than one phase, and at least one
    /// of them timed.
    pub fn is_flashing(&self) -> bool {
        let phases = self.shared.phases.read();
        phases.len() > 1 && phases.iter().any(|phase| !phase.duration().is_zero())
    }

    /// Returns true while a tick is scheduled.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Subscribes to phase advances. Callbacks run on the scheduler thread.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&PhaseEvent) + Send + Sync + 'static,
    {
        self.shared.phase_advanced.subscribe(callback)
    }

    /// Removes a phase subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.phase_advanced.unsubscribe(id)
    }

    /// The number of phase subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.shared.phase_advanced.len()
    }

    /// With `enable`, restarts from the first phase: the first phase is emitted
    /// before this returns, and the next one is scheduled after its duration.
    /// Without, cancels any pending tick; this is always safe to call.
    ///
    /// When called from a phase callback the reset is queued instead, and takes
    /// effect once the callback returns.
    pub fn reset_flash(&self, enable: bool) {
        let (mailbox, thread) = {
            let mut worker = self.worker.lock();
            if worker.is_none() {
                if !enable {
                    return;
                }
                match self.spawn_worker() {
                    Ok(spawned) => *worker = Some(spawned),
                    Err(e) => {
                        error!(state = self.key(), err = %e, "Unable to start state scheduler");
                        return;
                    }
                }
            }
            match worker.as_ref() {
                Some(worker) => (worker.mailbox.clone(), worker.thread),
                None => return,
            }
        };

        let on_scheduler = thread::current().id() == thread;
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let command = Command::Reset {
            enable,
            done: (!on_scheduler).then_some(done_tx),
        };
        if mailbox.send(command).is_err() {
            error!(state = self.key(), "State scheduler has exited");
            return;
        }
        if !on_scheduler {
            let _ = done_rx.recv();
        }
    }

    /// Stops cycling. Equivalent to `reset_flash(false)`.
    pub fn stop(&self) {
        self.reset_flash(false);
    }

    /// Pads or truncates every phase to one level per channel type. Returns the
    /// number of phases that had to change.
    pub(super) fn reconcile_levels(&self, channel_types: &[Arc<ChannelType>]) -> usize {
        self.shared
            .phases
            .write()
            .iter_mut()
            .map(|phase| phase.reconcile(channel_types))
            .filter(|changed| *changed)
            .count()
    }

    /// Correlates every phase level with the channel type at its position.
    pub(super) fn assign_channel_types(&self, channel_types: &[Arc<ChannelType>]) {
        for phase in self.shared.phases.write().iter_mut() {
            phase.assign_channel_types(channel_types);
        }
    }

    fn spawn_worker(&self) -> std::io::Result<Worker> {
        let (mailbox, receiver) = crossbeam_channel::unbounded();
        let shared = self.shared.clone();
        let handle = thread::Builder::new()
            .name(format!("state-{}", self.key()))
            .spawn(move || Shared::run(shared, receiver))?;
        Ok(Worker {
            mailbox,
            thread: handle.thread().id(),
            handle,
        })
    }
}

impl Drop for State {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.get_mut().take() {
            let _ = worker.mailbox.send(Command::Shutdown);
            // A state released from one of its own callbacks can't wait for itself.
            if thread::current().id() != worker.thread && worker.handle.join().is_err() {
                error!(state = self.key(), "Error joining state scheduler");
            }
        }
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("key", &self.shared.key)
            .field("phases", &self.shared.phases.read().len())
            .field("cycle_step_count", &self.shared.cycle_step_count)
            .field("loop_back_step", &self.shared.loop_back_step)
            .field("running", &self.is_running())
            .finish()
    }
}

impl Shared {
    /// The scheduler loop. Waits for commands, firing a tick whenever the
    /// scheduled deadline passes first.
    fn run(shared: Arc<Shared>, mailbox: Receiver<Command>) {
        let span = span!(Level::DEBUG, "state scheduler", state = shared.key);
        let _enter = span.enter();

        let mut cursor = Cursor::default();
        let mut deadline: Option<Instant> = None;

        loop {
            let command = match deadline {
                Some(at) => match mailbox.recv_deadline(at) {
                    Ok(command) => Some(command),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match mailbox.recv() {
                    Ok(command) => Some(command),
                    Err(_) => break,
                },
            };

            let mut done = None;
            match command {
                None => {
                    // Scheduled from the previous deadline so the cycle doesn't drift.
                    deadline = match (deadline, shared.advance(&mut cursor)) {
                        (Some(at), Some(delay)) => Some(at + delay),
                        _ => None,
                    };
                }
                Some(Command::Reset { enable, done: ack }) => {
                    done = ack;
                    if enable {
                        debug!("Restarting phase cycle");
                        cursor = Cursor::default();
                        let now = Instant::now();
                        deadline = shared.advance(&mut cursor).map(|delay| now + delay);
                    } else {
                        debug!("Cancelling phase cycle");
                        deadline = None;
                    }
                }
                Some(Command::Shutdown) => break,
            }

            shared.running.store(deadline.is_some(), Ordering::SeqCst);
            if let Some(done) = done {
                let _ = done.send(());
            }
        }

        shared.running.store(false, Ordering::SeqCst);
    }

    /// Emits the phase under the cursor and moves the cursor on. Returns the
    /// delay until the next tick, or None if cycling is over.
    fn advance(&self, cursor: &mut Cursor) -> Option<Duration> {
        let (event, delay) = {
            let phases = self.phases.read();
            let (phase, delay) =
                step(&phases, self.cycle_step_count, self.loop_back_step, cursor);
            (
                PhaseEvent {
                    state: self.key.clone(),
                    phase,
                    step: cursor.step,
                    levels: phases[phase].levels(),
                },
                delay,
            )
        };

        trace!(phase = event.phase, step = event.step, "Phase advanced");
        self.phase_advanced.notify(&event);
        delay
    }
}

/// One scheduler tick over a non-empty phase list: counts the step, picks the
/// phase to emit, and moves the cursor to the following phase (or the clamped
/// loop back step after the last one). Returns the emitted phase and, if
/// cycling continues, the emitted phase's duration as the delay to the next
/// tick.
fn step(
    phases: &[StatePhase],
    cycle_step_count: i32,
    loop_back_step: i32,
    cursor: &mut Cursor,
) -> (usize, Option<Duration>) {
    let last = phases.len().saturating_sub(1);
    let current = cursor.phase.min(last);

    cursor.step = cursor.step.saturating_add(1);
    cursor.phase = if current < last {
        current + 1
    } else {
        usize::try_from(loop_back_step.max(0))
            .unwrap_or(0)
            .min(last)
    };

    let duration = phases[current].duration();
    let unlimited = cycle_step_count <= 0;
    let steps_left = unlimited || cursor.step < cycle_step_count.unsigned_abs();
    let delay = (steps_left && !duration.is_zero()).then_some(duration);
    (current, delay)
}
