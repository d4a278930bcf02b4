/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Interrupt-side clock state and sub-tick interpolation.
//!
//! [`TickClock`] is the only piece of scheduler state the tick interrupt
//! touches.  It is shared with the HAL through an `Arc` and lives for the
//! whole program.  Reads of the coarse clock from the run loop still go
//! through an atomic section so they are ordered against the interrupt; the
//! atomics here only make the sharing sound on hosts where the "interrupt" is
//! another thread.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::hal::SUBTICKS_PER_TICK;
use crate::time::Time;

/// Coarse clock, wake flag and delay countdown, advanced by the tick handler.
#[derive(Debug)]
pub struct TickClock {
    now_us: AtomicU32,
    interval_us: AtomicU32,
    wake: AtomicBool,
    jiffies_left: AtomicU32,
}

impl TickClock {
    pub fn new(initial: Time) -> Self {
        Self {
            now_us: AtomicU32::new(initial.as_us()),
            interval_us: AtomicU32::new(0),
            wake: AtomicBool::new(false),
            jiffies_left: AtomicU32::new(0),
        }
    }

    /// Sets the period every subsequent [`on_tick`](Self::on_tick) adds.
    pub fn arm(&self, interval_us: u32) {
        self.interval_us.store(interval_us, Ordering::Relaxed);
    }

    pub fn interval_us(&self) -> u32 {
        self.interval_us.load(Ordering::Relaxed)
    }

    /// Tick interrupt handler.  Bounded, allocation-free, never blocks.
    pub fn on_tick(&self) {
        let interval = self.interval_us.load(Ordering::Relaxed);
        let now = self.now_us.load(Ordering::Relaxed);
        self.now_us
            .store(now.wrapping_add(interval), Ordering::Relaxed);

        let left = self.jiffies_left.load(Ordering::Relaxed);
        if left > 0 {
            self.jiffies_left.store(left - 1, Ordering::Relaxed);
        }

        self.wake.store(true, Ordering::Release);
    }

    /// Raw coarse clock.  Callers must hold an atomic section.
    pub(crate) fn now(&self) -> Time {
        Time::from_us(self.now_us.load(Ordering::Relaxed))
    }

    pub(crate) fn signal_wake(&self) {
        self.wake.store(true, Ordering::Release);
    }

    pub(crate) fn clear_wake(&self) {
        self.wake.store(false, Ordering::Release);
    }

    pub(crate) fn is_woken(&self) -> bool {
        self.wake.load(Ordering::Acquire)
    }

    pub(crate) fn start_delay(&self, jiffies: u32) {
        self.jiffies_left.store(jiffies, Ordering::Relaxed);
    }

    pub(crate) fn jiffies_left(&self) -> u32 {
        self.jiffies_left.load(Ordering::Relaxed)
    }
}

/// Hardware state captured inside one atomic section by a precise-time read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtickSample {
    /// Sub-tick counter read before checking for a latched rollover.
    pub pre: u16,
    /// Rollover latched but its interrupt not yet serviced.
    pub pending: bool,
    /// Sub-tick counter read after the check.
    pub post: u16,
}

/// Refines the coarse clock `coarse` with a sub-tick sample.
///
/// With a rollover pending the coarse clock is one tick stale and `post` is
/// known to be post-rollover, so both are used.  Otherwise `pre` is known to
/// be pre-rollover.  64-bit intermediates keep the product exact for any
/// tick period.
pub fn interpolate(coarse: Time, interval_us: u32, sample: SubtickSample) -> Time {
    let fraction = |subticks: u16| -> u32 {
        ((u64::from(interval_us) * u64::from(subticks)) / u64::from(SUBTICKS_PER_TICK)) as u32
    };

    if sample.pending {
        coarse
            .wrapping_add_us(interval_us)
            .wrapping_add_us(fraction(sample.post))
    } else {
        coarse.wrapping_add_us(fraction(sample.pre))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
