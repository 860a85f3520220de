//! Timer scheduling for polling.
//!
//! `Scheduler` abstracts the host's one-shot timers. `PollScheduler` keeps at
//! most one pending poll tick per query, and `ManualScheduler` is a virtual
//! clock for hosts without timers and for tests.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use core::cell::RefCell;

/// Handle of a scheduled task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

/// A one-shot timer facility.
pub trait Scheduler {
    /// Runs `task` once after `delay_ms` milliseconds.
    fn schedule(&self, delay_ms: u64, task: Box<dyn FnOnce()>) -> TimerHandle;

    /// Cancels a pending task. Returns true if it had not yet run.
    fn cancel(&self, handle: TimerHandle) -> bool;
}

/// Poll timer of one observable query.
///
/// The tick is one-shot: whoever handles it calls `fired` and re-arms once
/// the fetch it started has settled, so ticks never overlap a fetch.
pub struct PollScheduler {
    scheduler: Rc<dyn Scheduler>,
    /// Poll interval in milliseconds; 0 disables polling
    interval: u64,
    timer: Option<TimerHandle>,
}

impl PollScheduler {
    /// Creates a disarmed poll timer.
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            interval: 0,
            timer: None,
        }
    }

    /// Sets the interval without touching a pending tick.
    pub fn set_interval(&mut self, interval: u64) {
        self.interval = interval;
    }

    /// Schedules the next tick after the current interval, replacing any
    /// pending one. Returns false if polling is disabled.
    pub fn arm(&mut self, tick: Box<dyn FnOnce()>) -> bool {
        self.disarm();
        if self.interval == 0 {
            return false;
        }
        log::trace!("poll tick armed for {}ms", self.interval);
        self.timer = Some(self.scheduler.schedule(self.interval, tick));
        true
    }

    /// Cancels the pending tick, if any.
    pub fn disarm(&mut self) -> bool {
        match self.timer.take() {
            Some(handle) => self.scheduler.cancel(handle),
            None => false,
        }
    }

    /// Marks the pending tick as fired.
    #[inline]
    pub fn fired(&mut self) {
        self.timer = None;
    }

    /// Returns the interval in milliseconds.
    #[inline]
    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Returns true if polling is enabled.
    #[inline]
    pub fn is_polling(&self) -> bool {
        self.interval > 0
    }

    /// Returns true if a tick is pending.
    #[inline]
    pub fn is_armed(&self) -> bool {
        self.timer.is_some()
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.disarm();
    }
}

struct ManualState {
    now: u64,
    next_id: u64,
    /// Handle -> (due time, task)
    timers: BTreeMap<u64, (u64, Box<dyn FnOnce()>)>,
}

/// A scheduler driven by an explicit virtual clock.
///
/// Tasks run only inside `advance`, in due order, with ties broken by
/// scheduling order.
pub struct ManualScheduler {
    state: RefCell<ManualState>,
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualScheduler {
    /// Creates a scheduler at time 0.
    pub fn new() -> Self {
        Self {
            state: RefCell::new(ManualState {
                now: 0,
                next_id: 1,
                timers: BTreeMap::new(),
            }),
        }
    }

    /// Returns the virtual time in milliseconds.
    pub fn now(&self) -> u64 {
        self.state.borrow().now
    }

    /// Returns the number of pending tasks.
    pub fn pending(&self) -> usize {
        self.state.borrow().timers.len()
    }

    /// Moves the clock forward, running every task that falls due.
    ///
    /// Tasks scheduled while advancing run too if they fall due before the
    /// target time. Returns the number of tasks run.
    pub fn advance(&self, ms: u64) -> usize {
        let target = self.state.borrow().now.saturating_add(ms);
        let mut ran = 0;
        loop {
            let task = {
                let mut state = self.state.borrow_mut();
                let next = state
                    .timers
                    .iter()
                    .filter(|(_, (due, _))| *due <= target)
                    .min_by_key(|(id, (due, _))| (*due, **id))
                    .map(|(id, (due, _))| (*id, *due));
                match next {
                    Some((id, due)) => {
                        state.now = due;
                        state.timers.remove(&id).map(|(_, task)| task)
                    }
                    None => None,
                }
            };
            match task {
                // Run without holding the borrow; the task may schedule more.
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => break,
            }
        }
        self.state.borrow_mut().now = target;
        ran
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay_ms: u64, task: Box<dyn FnOnce()>) -> TimerHandle {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        let due = state.now.saturating_add(delay_ms);
        state.timers.insert(id, (due, task));
        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) -> bool {
        self.state.borrow_mut().timers.remove(&handle.0).is_some()
    }
}
