/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Boundary between the scheduler and the timer hardware.
//!
//! The scheduler only needs five things from the platform: a periodic tick
//! interrupt, a way to mask it, a low-power wait, and two views of the timer
//! hardware (the sub-tick counter and the "rollover latched" flag).
//! [`ClockHal`] captures exactly that.
//!
//! Two renditions ship with the crate:
//!
//! * [`sim::SimHal`] – deterministic simulated time, used by the tests.
//! * [`host::HostHal`] – wall-clock time on a desktop OS, used by the demo.

pub mod host;
pub mod prescaler;
pub mod sim;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::scheduler::clock::TickClock;

/// Resolution of the sub-tick counter: units per tick period.
pub const SUBTICKS_PER_TICK: u16 = 10_000;

// ── Timer selection ───────────────────────────────────────────────────────────

/// Hardware timer that drives the periodic tick.
///
/// Timers 0 and 2 have 8-bit compare registers, timer 1 has a 16-bit one, so
/// the same requested period may round differently on each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerId {
    Timer0,
    #[default]
    Timer1,
    Timer2,
}

impl TimerId {
    /// Numeric id as used by the hardware register names.
    pub fn index(self) -> u8 {
        match self {
            TimerId::Timer0 => 0,
            TimerId::Timer1 => 1,
            TimerId::Timer2 => 2,
        }
    }
}

impl TryFrom<u8> for TimerId {
    type Error = HalError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(TimerId::Timer0),
            1 => Ok(TimerId::Timer1),
            2 => Ok(TimerId::Timer2),
            other => Err(HalError::UnknownTimer(other)),
        }
    }
}

impl FromStr for TimerId {
    type Err = HalError;

    /// Accepts `timer1`, `TIMER1` or a bare `1`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let digits = lower.strip_prefix("timer").unwrap_or(&lower);
        let id: u8 = digits
            .parse()
            .map_err(|_| HalError::UnparsableTimer(s.to_string()))?;
        TimerId::try_from(id)
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer{}", self.index())
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Failures reported by a [`ClockHal`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HalError {
    #[error("unknown timer id {0} (valid: 0, 1, 2)")]
    UnknownTimer(u8),

    #[error("cannot parse timer id '{0}' (expected timer0, timer1 or timer2)")]
    UnparsableTimer(String),

    /// No clock-select setting lets the timer's compare register express the
    /// requested period.
    #[error("{timer} cannot produce a {requested_us}µs tick at {cpu_hz}Hz")]
    IntervalOutOfRange {
        requested_us: u32,
        timer: TimerId,
        cpu_hz: u32,
    },

    /// The sub-tick arithmetic needs a CPU clock that divides 120 MHz into
    /// a whole number of units.
    #[error("unsupported CPU frequency {cpu_hz}Hz")]
    UnsupportedCpuFrequency { cpu_hz: u32 },

    #[error("periodic tick already running on {timer}")]
    TickAlreadyStarted { timer: TimerId },

    #[error("tick source could not be started: {0}")]
    TickSourceUnavailable(String),
}

// ── HAL trait ─────────────────────────────────────────────────────────────────

/// Platform services consumed by [`Scheduler`](crate::scheduler::Scheduler).
pub trait ClockHal {
    /// Arms a periodic interrupt of roughly `requested_us` on `timer`.
    ///
    /// Implementations must call [`TickClock::arm`] with the actual period
    /// before the first interrupt can fire, and call [`TickClock::on_tick`]
    /// from every interrupt afterwards.  The returned period is the actual one
    /// after prescaler rounding and is authoritative for all time math.
    fn start_periodic_tick(
        &self,
        requested_us: u32,
        timer: TimerId,
        tick: Arc<TickClock>,
    ) -> Result<u32, HalError>;

    /// Runs `f` with the tick interrupt masked.
    ///
    /// Atomic sections do not nest: `f` must not call `atomic` again.  A tick
    /// that comes due while masked is latched and delivered on exit.
    fn atomic<R>(&self, f: impl FnOnce() -> R) -> R;

    /// Low-power wait until the next interrupt (or a short timeout).
    fn idle(&self);

    /// Progress through the current tick period, in
    /// `0..`[`SUBTICKS_PER_TICK`] units.
    fn elapsed_subticks(&self) -> u16;

    /// `true` when the counter has rolled over but the tick interrupt has not
    /// been serviced yet.  Only meaningful inside [`atomic`](Self::atomic).
    fn tick_pending(&self) -> bool;
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_id_parses_common_spellings() {
        assert_eq!("timer0".parse::<TimerId>(), Ok(TimerId::Timer0));
        assert_eq!("TIMER2".parse::<TimerId>(), Ok(TimerId::Timer2));
        assert_eq!(" 1 ".parse::<TimerId>(), Ok(TimerId::Timer1));
    }

    #[test]
    fn unknown_timer_number_is_rejected() {
        assert_eq!("timer7".parse::<TimerId>(), Err(HalError::UnknownTimer(7)));
        assert_eq!(TimerId::try_from(3), Err(HalError::UnknownTimer(3)));
    }

    #[test]
    fn garbage_timer_name_is_rejected() {
        assert!(matches!(
            "pwm".parse::<TimerId>(),
            Err(HalError::UnparsableTimer(_))
        ));
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for t in [TimerId::Timer0, TimerId::Timer1, TimerId::Timer2] {
            assert_eq!(t.to_string().parse::<TimerId>(), Ok(t));
        }
    }
}
