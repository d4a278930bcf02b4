/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Cooperative deadline scheduler.
//!
//! [`Scheduler`] owns the two run queues and the coarse clock, and drives a
//! single-threaded run loop.  Work is expressed as [`Activity`] values that
//! are invoked once their deadline has passed; anything periodic re-arms
//! itself from inside `activate`.
//!
//! # Dispatch order
//! Among everything due at the start of a [`run_once`](Scheduler::run_once)
//! pass:
//!
//! 1. immediate-queue entries, in submission order;
//! 2. heap entries, in ascending deadline order (ties in unspecified order).
//!
//! When the immediate queue is full, [`schedule_immediate`](Scheduler::schedule_immediate)
//! demotes the new entry into the heap at the current coarse time.  It still
//! runs in the same pass, but it is then ordered among heap entries instead of
//! ahead of them.
//!
//! # Atomic sections
//! Every read or write of the queues and of the coarse clock happens inside
//! [`ClockHal::atomic`].  Sections never nest and never contain a callback,
//! and the longest one is a single heap insert or pop.
//!
//! # Lifetimes instead of "must outlive"
//! The scheduler borrows its activations for `'a`.  An activation can
//! therefore never be freed while it is still queued: the borrow checker
//! enforces what used to be a comment on the API.  Activities must be
//! declared before the scheduler that runs them.
//!
//! # Example
//! ```rust
//! use std::cell::Cell;
//! use jiffy_sched::hal::{sim::SimHal, TimerId};
//! use jiffy_sched::scheduler::{Schedule, Scheduler};
//!
//! let fired = Cell::new(0);
//! let job = |_: &dyn Schedule<'_>| fired.set(fired.get() + 1);
//!
//! let sched: Scheduler<'_, SimHal> =
//!     Scheduler::init(SimHal::new(), 1_000, TimerId::Timer1).unwrap();
//! sched.schedule_after(2_500, &job).unwrap();
//!
//! sched.hal().advance(3_000);
//! assert_eq!(sched.run_once(), 1);
//! assert_eq!(fired.get(), 1);
//! ```

pub mod clock;
pub mod error;
pub mod stats;

pub use error::{ScheduleError, SchedulerError};
pub use stats::SchedulerStats;

use std::cell::RefCell;
use std::sync::Arc;

use tracing::{debug, error, info, trace, warn};

use crate::config::{SchedulerConfig, DEFAULT_INITIAL_CLOCK_US};
use crate::hal::{ClockHal, TimerId};
use crate::heap::DeadlineHeap;
use crate::now_queue::ImmediateQueue;
use crate::slots::{Handle, SlotArena};
use crate::time::{later_than, Time};
use clock::{interpolate, SubtickSample, TickClock};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Default number of activation slots (and deadline-heap entries).
pub const DEFAULT_HEAP_CAPACITY: usize = 32;

/// Default immediate-queue length before entries spill into the heap.
pub const DEFAULT_NOW_QUEUE_CAPACITY: usize = 4;

// ── Activities ────────────────────────────────────────────────────────────────

/// A unit of deferred work.
///
/// `activate` receives the scheduler that dispatched it, so an activity can
/// re-arm itself (`sched.schedule_after(period, self)`) or queue follow-up
/// work.  Plain closures taking `&dyn Schedule` implement this trait.
pub trait Activity<'a> {
    fn activate(&'a self, sched: &dyn Schedule<'a>);
}

impl<'a, F> Activity<'a> for F
where
    F: Fn(&dyn Schedule<'a>),
{
    fn activate(&'a self, sched: &dyn Schedule<'a>) {
        self(sched)
    }
}

/// A borrowed activity, as stored in the run queues.
pub type Activation<'a> = &'a dyn Activity<'a>;

/// The scheduling surface handed to running activities.
pub trait Schedule<'a> {
    /// Runs `act` once `offset_us` has elapsed from the current coarse time.
    fn schedule_after(&self, offset_us: i32, act: Activation<'a>) -> Result<Handle, ScheduleError>;

    /// Runs `act` once the coarse clock reaches `deadline`.
    fn schedule_at(&self, deadline: Time, act: Activation<'a>) -> Result<Handle, ScheduleError>;

    /// Runs `act` at the next dispatch opportunity.
    fn schedule_immediate(&self, act: Activation<'a>) -> Result<Handle, ScheduleError>;

    /// Stops a pending activation from running.  `false` if it already ran
    /// or was already cancelled.
    fn cancel(&self, handle: Handle) -> bool;

    /// `true` until the activation behind `handle` runs or is cancelled.
    fn is_pending(&self, handle: Handle) -> bool;

    /// Current time at tick resolution.
    fn coarse_time(&self) -> Time;

    /// Current time refined with the sub-tick counter.
    fn precise_time(&self) -> Time;
}

// ── Run queues ────────────────────────────────────────────────────────────────

/// Result of one dispatch step.
enum Due<'a> {
    Fire(Activation<'a>, Option<Time>),
    Cancelled,
    Nothing,
}

/// Everything guarded by the atomic section except the clock.
struct Queues<'a, const N: usize, const K: usize> {
    slots: SlotArena<Activation<'a>, N>,
    heap: DeadlineHeap<Handle, N>,
    now: ImmediateQueue<Handle, K>,
    stats: SchedulerStats,
}

impl<'a, const N: usize, const K: usize> Queues<'a, N, K> {
    fn new() -> Self {
        Self {
            slots: SlotArena::new(),
            heap: DeadlineHeap::new(),
            now: ImmediateQueue::new(),
            stats: SchedulerStats::default(),
        }
    }

    fn insert_at(&mut self, deadline: Time, act: Activation<'a>) -> Result<Handle, ScheduleError> {
        let handle = self
            .slots
            .insert(act)
            .map_err(|_| ScheduleError::CapacityExhausted { capacity: N })?;
        self.push_heap(deadline, handle)?;
        Ok(handle)
    }

    /// Returns the handle and whether the entry had to be demoted to the heap.
    fn insert_now(&mut self, now: Time, act: Activation<'a>) -> Result<(Handle, bool), ScheduleError> {
        let handle = self
            .slots
            .insert(act)
            .map_err(|_| ScheduleError::CapacityExhausted { capacity: N })?;
        match self.now.push(handle) {
            Ok(len) => {
                self.stats.record_now_len(len);
                Ok((handle, false))
            }
            Err(handle) => {
                self.push_heap(now, handle)?;
                Ok((handle, true))
            }
        }
    }

    fn push_heap(&mut self, deadline: Time, handle: Handle) -> Result<(), ScheduleError> {
        match self.heap.insert(deadline, handle) {
            Ok(len) => {
                self.stats.record_heap_len(len);
                Ok(())
            }
            Err(full) => {
                self.slots.release(handle);
                Err(ScheduleError::CapacityExhausted {
                    capacity: full.capacity,
                })
            }
        }
    }

    fn next_due(&mut self, now: Time) -> Due<'a> {
        let (handle, deadline) = match self.now.pop() {
            Some(handle) => (handle, None),
            None => match self.heap.peek_min() {
                Some((deadline, _)) if !later_than(deadline, now) => match self.heap.pop_min() {
                    Some(entry) => (entry.item, Some(entry.deadline)),
                    None => return Due::Nothing,
                },
                _ => return Due::Nothing,
            },
        };
        match self.slots.release(handle) {
            Some(act) => Due::Fire(act, deadline),
            None => Due::Cancelled,
        }
    }
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

/// Deadline scheduler over a [`ClockHal`].
///
/// `N` bounds the number of pending activations (heap entries plus
/// immediate-queue entries); `K` is the immediate-queue length.
pub struct Scheduler<
    'a,
    H,
    const N: usize = DEFAULT_HEAP_CAPACITY,
    const K: usize = DEFAULT_NOW_QUEUE_CAPACITY,
> {
    hal: H,
    clock: Arc<TickClock>,
    timer: TimerId,
    interval_us: u32,
    queues: RefCell<Queues<'a, N, K>>,
}

impl<'a, H: ClockHal, const N: usize, const K: usize> Scheduler<'a, H, N, K> {
    /// Starts the periodic tick and returns a scheduler whose coarse clock
    /// begins 20 s before rollover.
    ///
    /// # Errors
    /// * [`SchedulerError::ZeroTickInterval`] – `tick_interval_us == 0`.
    /// * [`SchedulerError::Hal`] – the HAL could not produce the tick.
    pub fn init(hal: H, tick_interval_us: u32, timer: TimerId) -> Result<Self, SchedulerError> {
        Self::with_initial_clock(
            hal,
            tick_interval_us,
            timer,
            Time::from_us(DEFAULT_INITIAL_CLOCK_US),
        )
    }

    /// [`init`](Self::init) with every parameter taken from `config`.
    pub fn from_config(hal: H, config: &SchedulerConfig) -> Result<Self, SchedulerError> {
        Self::with_initial_clock(
            hal,
            config.tick_interval_us,
            config.timer,
            config.initial_clock,
        )
    }

    /// [`init`](Self::init) with an explicit starting value for the coarse
    /// clock.
    pub fn with_initial_clock(
        hal: H,
        tick_interval_us: u32,
        timer: TimerId,
        initial_clock: Time,
    ) -> Result<Self, SchedulerError> {
        if tick_interval_us == 0 {
            return Err(SchedulerError::ZeroTickInterval);
        }

        let clock = Arc::new(TickClock::new(initial_clock));
        let interval_us = hal.start_periodic_tick(tick_interval_us, timer, Arc::clone(&clock))?;

        if interval_us != tick_interval_us {
            info!(
                requested_us = tick_interval_us,
                actual_us = interval_us,
                %timer,
                "tick interval rounded by prescaler"
            );
        }
        info!(
            %timer,
            interval_us,
            initial_clock = %initial_clock,
            heap_capacity = N,
            now_capacity = K,
            "scheduler initialised"
        );

        Ok(Self {
            hal,
            clock,
            timer,
            interval_us,
            queues: RefCell::new(Queues::new()),
        })
    }

    pub fn hal(&self) -> &H {
        &self.hal
    }

    pub fn timer(&self) -> TimerId {
        self.timer
    }

    /// Actual tick period after prescaler rounding.
    pub fn tick_interval_us(&self) -> u32 {
        self.interval_us
    }

    // ── Time ──────────────────────────────────────────────────────────────────

    /// Tick-resolution time.  Cheap.
    pub fn coarse_time(&self) -> Time {
        self.hal.atomic(|| self.clock.now())
    }

    /// Coarse time refined with the timer's sub-tick counter.
    ///
    /// Must not be called from the tick interrupt handler.
    pub fn precise_time(&self) -> Time {
        let (coarse, sample) = self.hal.atomic(|| {
            let pre = self.hal.elapsed_subticks();
            let pending = self.hal.tick_pending();
            let post = self.hal.elapsed_subticks();
            (self.clock.now(), SubtickSample { pre, pending, post })
        });
        interpolate(coarse, self.interval_us, sample)
    }

    // ── Scheduling ────────────────────────────────────────────────────────────

    /// Runs `act` once `offset_us` has elapsed.
    ///
    /// Offsets above `i32::MAX` µs cannot be expressed, which keeps every
    /// deadline within the range where [`later_than`] orders correctly.
    pub fn schedule_after(
        &self,
        offset_us: i32,
        act: Activation<'a>,
    ) -> Result<Handle, ScheduleError> {
        let Ok(offset) = u32::try_from(offset_us) else {
            error!(offset_us, "negative schedule offset");
            return Err(ScheduleError::NegativeOffset { offset_us });
        };

        let result = self.hal.atomic(|| {
            let deadline = self.clock.now().wrapping_add_us(offset);
            let mut q = self.queues.borrow_mut();
            q.stats.record_offset(offset);
            q.insert_at(deadline, act).map(|h| (h, deadline))
        });

        let (handle, deadline) = self.log_outcome(result)?;
        debug!(offset_us, deadline = %deadline, slot = handle.index(), "scheduled");
        Ok(handle)
    }

    /// Runs `act` once the coarse clock reaches `deadline`.  A deadline in
    /// the past runs on the next pass.
    pub fn schedule_at(&self, deadline: Time, act: Activation<'a>) -> Result<Handle, ScheduleError> {
        let result = self.hal.atomic(|| {
            self.queues
                .borrow_mut()
                .insert_at(deadline, act)
                .map(|h| (h, deadline))
        });

        let (handle, _) = self.log_outcome(result)?;
        debug!(deadline = %deadline, slot = handle.index(), "scheduled at");
        Ok(handle)
    }

    /// Runs `act` at the next dispatch opportunity and wakes the run loop.
    pub fn schedule_immediate(&self, act: Activation<'a>) -> Result<Handle, ScheduleError> {
        let result = self.hal.atomic(|| {
            let now = self.clock.now();
            self.queues.borrow_mut().insert_now(now, act)
        });
        self.clock.signal_wake();

        let (handle, demoted) = self.log_outcome(result)?;
        if demoted {
            warn!(
                capacity = K,
                slot = handle.index(),
                "immediate queue full, demoted into deadline heap"
            );
        } else {
            trace!(slot = handle.index(), "scheduled immediate");
        }
        Ok(handle)
    }

    pub fn cancel(&self, handle: Handle) -> bool {
        let cancelled = self
            .hal
            .atomic(|| self.queues.borrow_mut().slots.cancel(handle));
        debug!(slot = handle.index(), cancelled, "cancel");
        cancelled
    }

    pub fn is_pending(&self, handle: Handle) -> bool {
        self.hal.atomic(|| self.queues.borrow().slots.is_live(handle))
    }

    /// Activations currently holding a slot (cancelled ones included until
    /// their queue entry is reached).
    pub fn pending_count(&self) -> usize {
        self.hal.atomic(|| self.queues.borrow().slots.len())
    }

    fn log_outcome<T>(&self, result: Result<T, ScheduleError>) -> Result<T, ScheduleError> {
        if let Err(e) = &result {
            error!(error = %e, "schedule failed");
        }
        result
    }

    // ── Run loop ──────────────────────────────────────────────────────────────

    /// Dispatches everything due at the current coarse time and returns how
    /// many activations ran.
    ///
    /// Work that an activation schedules for "now" is picked up in the same
    /// pass.
    pub fn run_once(&self) -> usize {
        let now = self.coarse_time();
        let mut fired = 0usize;

        loop {
            let due = self.hal.atomic(|| self.queues.borrow_mut().next_due(now));
            match due {
                Due::Fire(act, deadline) => {
                    trace!(now = %now, deadline = ?deadline, "dispatch");
                    act.activate(self);
                    fired += 1;
                }
                Due::Cancelled => trace!("skipping cancelled activation"),
                Due::Nothing => break,
            }
        }

        fired
    }

    /// The main loop.  Never returns.
    pub fn run_forever(&self) -> ! {
        info!("entering run loop");
        loop {
            self.clock.clear_wake();
            self.run_once();
            self.wait_for_wake();
        }
    }

    /// Runs the main loop until the coarse clock reaches `deadline`, then
    /// returns.  Work due exactly at `deadline` still runs.
    pub fn run_until(&self, deadline: Time) {
        loop {
            self.clock.clear_wake();
            self.run_once();
            if !later_than(deadline, self.coarse_time()) {
                return;
            }
            self.wait_for_wake();
        }
    }

    fn wait_for_wake(&self) {
        while !self.clock.is_woken() {
            self.hal.idle();
        }
    }

    /// Blocks for about `us` by counting tick interrupts, without masking
    /// them.  Queued activations do not run meanwhile.
    ///
    /// Must not be called from the tick interrupt handler.
    pub fn delay_us(&self, us: u32) {
        let jiffies = us.saturating_add(1) / self.interval_us;
        self.clock.start_delay(jiffies);
        while self.clock.jiffies_left() > 0 {
            self.hal.idle();
        }
    }

    // ── Statistics ────────────────────────────────────────────────────────────

    pub fn stats(&self) -> SchedulerStats {
        self.hal.atomic(|| self.queues.borrow().stats)
    }

    /// Logs the statistics gathered so far and starts a new window.
    pub fn log_stats(&self) {
        let stats = self
            .hal
            .atomic(|| std::mem::take(&mut self.queues.borrow_mut().stats));
        stats.log();
    }
}

impl<'a, H: ClockHal, const N: usize, const K: usize> Schedule<'a> for Scheduler<'a, H, N, K> {
    fn schedule_after(&self, offset_us: i32, act: Activation<'a>) -> Result<Handle, ScheduleError> {
        Scheduler::schedule_after(self, offset_us, act)
    }

    fn schedule_at(&self, deadline: Time, act: Activation<'a>) -> Result<Handle, ScheduleError> {
        Scheduler::schedule_at(self, deadline, act)
    }

    fn schedule_immediate(&self, act: Activation<'a>) -> Result<Handle, ScheduleError> {
        Scheduler::schedule_immediate(self, act)
    }

    fn cancel(&self, handle: Handle) -> bool {
        Scheduler::cancel(self, handle)
    }

    fn is_pending(&self, handle: Handle) -> bool {
        Scheduler::is_pending(self, handle)
    }

    fn coarse_time(&self) -> Time {
        Scheduler::coarse_time(self)
    }

    fn precise_time(&self) -> Time {
        Scheduler::precise_time(self)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
