/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Deterministic simulated timer hardware.
//!
//! Time only moves when the test says so, through [`SimHal::advance`] or
//! through [`ClockHal::idle`] (which sleeps to the next tick boundary, just
//! like a real low-power wait that ends at the next interrupt).  Interrupt
//! masking is modelled faithfully: a rollover that happens inside an atomic
//! section is latched and only serviced when the section ends, which is what
//! makes the precise-time race reproducible.
//!
//! Single-threaded by construction (`Cell` state), like the MCU it imitates.

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use tracing::trace;

use super::prescaler::find_prescaler;
use super::{ClockHal, HalError, TimerId, SUBTICKS_PER_TICK};
use crate::scheduler::clock::TickClock;

/// CPU frequency assumed unless [`SimHal::with_cpu_hz`] says otherwise.
pub const DEFAULT_SIM_CPU_HZ: u32 = 8_000_000;

#[derive(Debug)]
pub struct SimHal {
    cpu_hz: u32,
    tick: RefCell<Option<(TimerId, Arc<TickClock>)>>,
    interval_us: Cell<u32>,
    /// Position inside the current tick period, in µs.
    phase_us: Cell<u32>,
    masked: Cell<bool>,
    pending: Cell<bool>,
    /// Rollover to inject right after the next sub-tick read.
    inject_us: Cell<Option<u32>>,
    ticks_delivered: Cell<u64>,
    idle_calls: Cell<u64>,
}

impl Default for SimHal {
    fn default() -> Self {
        Self::new()
    }
}

impl SimHal {
    pub fn new() -> Self {
        Self::with_cpu_hz(DEFAULT_SIM_CPU_HZ)
    }

    pub fn with_cpu_hz(cpu_hz: u32) -> Self {
        Self {
            cpu_hz,
            tick: RefCell::new(None),
            interval_us: Cell::new(0),
            phase_us: Cell::new(0),
            masked: Cell::new(false),
            pending: Cell::new(false),
            inject_us: Cell::new(None),
            ticks_delivered: Cell::new(0),
            idle_calls: Cell::new(0),
        }
    }

    /// Moves simulated time forward by `us`, raising every tick crossed.
    ///
    /// Ticks raised inside an atomic section are latched; a second rollover
    /// while one is already latched is lost, as on real hardware.
    pub fn advance(&self, mut us: u32) {
        let interval = self.interval_us.get();
        if interval == 0 {
            return;
        }
        loop {
            let remaining = interval - self.phase_us.get();
            if us < remaining {
                self.phase_us.set(self.phase_us.get() + us);
                return;
            }
            us -= remaining;
            self.phase_us.set(0);
            self.raise_tick();
        }
    }

    /// Makes the hardware roll over `us` after the next sub-tick read, i.e.
    /// between the two reads of a precise-time sample.
    pub fn inject_rollover_after_next_read(&self, us: u32) {
        self.inject_us.set(Some(us));
    }

    pub fn ticks_delivered(&self) -> u64 {
        self.ticks_delivered.get()
    }

    pub fn idle_calls(&self) -> u64 {
        self.idle_calls.get()
    }

    pub fn is_masked(&self) -> bool {
        self.masked.get()
    }

    fn raise_tick(&self) {
        if self.masked.get() {
            if self.pending.replace(true) {
                trace!("sim: tick lost while a rollover was already latched");
            }
            return;
        }
        self.deliver_tick();
    }

    fn deliver_tick(&self) {
        if let Some((_, tick)) = self.tick.borrow().as_ref() {
            tick.on_tick();
            self.ticks_delivered.set(self.ticks_delivered.get() + 1);
        }
    }
}

impl ClockHal for SimHal {
    fn start_periodic_tick(
        &self,
        requested_us: u32,
        timer: TimerId,
        tick: Arc<TickClock>,
    ) -> Result<u32, HalError> {
        if let Some((running, _)) = self.tick.borrow().as_ref() {
            return Err(HalError::TickAlreadyStarted { timer: *running });
        }
        let setting = find_prescaler(requested_us, timer, self.cpu_hz)?;
        tick.arm(setting.actual_us);
        self.interval_us.set(setting.actual_us);
        self.phase_us.set(0);
        *self.tick.borrow_mut() = Some((timer, tick));
        Ok(setting.actual_us)
    }

    fn atomic<R>(&self, f: impl FnOnce() -> R) -> R {
        assert!(!self.masked.get(), "atomic sections must not nest");
        self.masked.set(true);
        let result = f();
        self.masked.set(false);
        if self.pending.replace(false) {
            self.deliver_tick();
        }
        result
    }

    fn idle(&self) {
        self.idle_calls.set(self.idle_calls.get() + 1);
        let interval = self.interval_us.get();
        if interval > 0 {
            self.advance(interval - self.phase_us.get());
        }
    }

    fn elapsed_subticks(&self) -> u16 {
        let interval = self.interval_us.get();
        let value = if interval == 0 {
            0
        } else {
            (u64::from(self.phase_us.get()) * u64::from(SUBTICKS_PER_TICK) / u64::from(interval))
                as u16
        };
        if let Some(us) = self.inject_us.take() {
            self.advance(us);
        }
        value
    }

    fn tick_pending(&self) -> bool {
        self.pending.get()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
