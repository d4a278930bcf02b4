/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Wall-clock HAL for running the scheduler on a desktop OS.
//!
//! A background "ticker" thread stands in for the timer interrupt.  Masking
//! the interrupt is a mutex: the ticker takes the same lock before calling
//! [`TickClock::on_tick`], so a tick that comes due while the run loop is
//! inside an atomic section simply waits, exactly like a latched interrupt.
//! The sub-tick counter is derived from the time since the last serviced
//! tick.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::prescaler::find_prescaler;
use super::{ClockHal, HalError, TimerId, SUBTICKS_PER_TICK};
use crate::scheduler::clock::TickClock;

/// Shared between the run loop and the ticker thread.
#[derive(Debug)]
struct Shared {
    epoch: Instant,
    interval: Mutex<Duration>,
    /// Held for the duration of every atomic section and every tick.
    section: Mutex<()>,
    /// Nanoseconds since `epoch` at which the last tick was serviced.
    last_tick_ns: AtomicU64,
    /// Incremented per tick; `idle` waits for it to change.
    tick_seq: Mutex<u64>,
    tick_cv: Condvar,
    stop: AtomicBool,
}

#[derive(Debug)]
pub struct HostHal {
    cpu_hz: u32,
    shared: Arc<Shared>,
    ticker: Mutex<Option<(TimerId, JoinHandle<()>)>>,
}

impl HostHal {
    pub fn new(cpu_hz: u32) -> Self {
        Self {
            cpu_hz,
            shared: Arc::new(Shared {
                epoch: Instant::now(),
                interval: Mutex::new(Duration::ZERO),
                section: Mutex::new(()),
                last_tick_ns: AtomicU64::new(0),
                tick_seq: Mutex::new(0),
                tick_cv: Condvar::new(),
                stop: AtomicBool::new(false),
            }),
            ticker: Mutex::new(None),
        }
    }

    fn interval(&self) -> Duration {
        *self
            .shared
            .interval
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn since_last_tick(&self) -> Duration {
        let last = Duration::from_nanos(self.shared.last_tick_ns.load(Ordering::Acquire));
        self.shared.epoch.elapsed().saturating_sub(last)
    }
}

/// Sub-tick register value `since` after the last serviced tick.
///
/// Like a latched compare interrupt, at most one rollover is visible: past
/// one period the counter reads as post-rollover and saturates just below a
/// full period instead of wrapping, so a late ticker thread can never make
/// precise time run backwards.
fn subticks_since_tick(since: Duration, interval: Duration) -> u16 {
    let interval = interval.as_nanos();
    if interval == 0 {
        return 0;
    }
    let since = since.as_nanos();
    let into_period = if since < interval {
        since
    } else {
        (since - interval).min(interval - 1)
    };
    (into_period * u128::from(SUBTICKS_PER_TICK) / interval) as u16
}

fn ticker_loop(shared: Arc<Shared>, tick: Arc<TickClock>, interval: Duration) {
    let mut next = Instant::now() + interval;
    while !shared.stop.load(Ordering::Acquire) {
        let now = Instant::now();
        if next > now {
            thread::sleep(next - now);
        }
        {
            let _masked = shared
                .section
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            tick.on_tick();
            let serviced = next.saturating_duration_since(shared.epoch);
            shared
                .last_tick_ns
                .store(serviced.as_nanos() as u64, Ordering::Release);
        }
        {
            let mut seq = shared
                .tick_seq
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            *seq = seq.wrapping_add(1);
        }
        shared.tick_cv.notify_all();
        next += interval;
    }
    debug!("host ticker stopped");
}

impl ClockHal for HostHal {
    fn start_periodic_tick(
        &self,
        requested_us: u32,
        timer: TimerId,
        tick: Arc<TickClock>,
    ) -> Result<u32, HalError> {
        let mut ticker = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((running, _)) = ticker.as_ref() {
            return Err(HalError::TickAlreadyStarted { timer: *running });
        }

        let setting = find_prescaler(requested_us, timer, self.cpu_hz)?;
        let interval = Duration::from_micros(u64::from(setting.actual_us));
        tick.arm(setting.actual_us);
        *self
            .shared
            .interval
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = interval;
        self.shared
            .last_tick_ns
            .store(self.shared.epoch.elapsed().as_nanos() as u64, Ordering::Release);

        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name(format!("tick-{timer}"))
            .spawn(move || ticker_loop(shared, tick, interval))
            .map_err(|e| HalError::TickSourceUnavailable(e.to_string()))?;

        info!(
            %timer,
            requested_us,
            actual_us = setting.actual_us,
            "host ticker started"
        );
        *ticker = Some((timer, handle));
        Ok(setting.actual_us)
    }

    fn atomic<R>(&self, f: impl FnOnce() -> R) -> R {
        let _masked = self
            .shared
            .section
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f()
    }

    fn idle(&self) {
        let interval = self.interval();
        let seq = self
            .shared
            .tick_seq
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let seen = *seq;
        let wait = if interval.is_zero() {
            Duration::from_millis(1)
        } else {
            interval
        };
        let _ = self
            .shared
            .tick_cv
            .wait_timeout_while(seq, wait, |s| *s == seen)
            .unwrap_or_else(PoisonError::into_inner);
    }

    fn elapsed_subticks(&self) -> u16 {
        subticks_since_tick(self.since_last_tick(), self.interval())
    }

    fn tick_pending(&self) -> bool {
        let interval = self.interval();
        !interval.is_zero() && self.since_last_tick() >= interval
    }
}

impl Drop for HostHal {
    fn drop(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        let ticker = self
            .ticker
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some((_, handle)) = ticker {
            let _ = handle.join();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::clock::{interpolate, SubtickSample};
    use crate::time::Time;

    #[test]
    fn ticker_advances_coarse_clock() {
        let hal = HostHal::new(8_000_000);
        let clock = Arc::new(TickClock::new(Time::ZERO));
        let actual = hal
            .start_periodic_tick(1_000, TimerId::Timer1, clock.clone())
            .unwrap();
        assert_eq!(actual, 1_000);

        for _ in 0..1_000 {
            if hal.atomic(|| clock.now()) != Time::ZERO {
                break;
            }
            hal.idle();
        }
        let now = hal.atomic(|| clock.now());
        assert!(now.as_us() >= 1_000, "clock did not advance: {now}");
        assert_eq!(now.as_us() % 1_000, 0);
    }

    #[test]
    fn subticks_saturate_once_a_tick_is_overdue() {
        let interval = Duration::from_micros(1_000);
        assert_eq!(subticks_since_tick(Duration::from_micros(250), interval), 2_500);
        assert_eq!(subticks_since_tick(Duration::from_micros(1_100), interval), 1_000);
        assert_eq!(
            subticks_since_tick(Duration::from_micros(5_000), interval),
            SUBTICKS_PER_TICK - 1
        );
        assert_eq!(subticks_since_tick(Duration::from_micros(5), Duration::ZERO), 0);
    }

    #[test]
    fn interpolated_time_never_decreases_while_ticker_is_late() {
        let interval = Duration::from_micros(1_000);
        let coarse = Time::ZERO;
        let mut prev = coarse;
        for us in (0..3_500u64).step_by(7) {
            let since = Duration::from_micros(us);
            let sub = subticks_since_tick(since, interval);
            let sample = SubtickSample {
                pre: sub,
                pending: since >= interval,
                post: sub,
            };
            let now = interpolate(coarse, 1_000, sample);
            assert!(!prev.later_than(now), "{prev} -> {now} at {us}µs");
            prev = now;
        }
    }

    #[test]
    fn precise_samples_stay_monotonic_with_ticker_held_off() {
        let hal = HostHal::new(8_000_000);
        let clock = Arc::new(TickClock::new(Time::ZERO));
        hal.start_periodic_tick(1_000, TimerId::Timer1, clock.clone())
            .unwrap();

        let sample = || {
            let pre = hal.elapsed_subticks();
            let pending = hal.tick_pending();
            let post = hal.elapsed_subticks();
            interpolate(clock.now(), 1_000, SubtickSample { pre, pending, post })
        };

        // Holding the section keeps the ticker thread from servicing ticks.
        let (first, second) = hal.atomic(|| {
            thread::sleep(Duration::from_micros(1_900));
            let first = sample();
            thread::sleep(Duration::from_micros(300));
            (first, sample())
        });
        assert!(!first.later_than(second), "{first} -> {second}");
    }

    #[test]
    fn subticks_stay_in_range() {
        let hal = HostHal::new(8_000_000);
        let clock = Arc::new(TickClock::new(Time::ZERO));
        hal.start_periodic_tick(2_000, TimerId::Timer1, clock).unwrap();
        for _ in 0..50 {
            assert!(hal.elapsed_subticks() < SUBTICKS_PER_TICK);
        }
    }

    #[test]
    fn rejects_second_start() {
        let hal = HostHal::new(8_000_000);
        let clock = Arc::new(TickClock::new(Time::ZERO));
        hal.start_periodic_tick(1_000, TimerId::Timer1, clock.clone())
            .unwrap();
        assert_eq!(
            hal.start_periodic_tick(1_000, TimerId::Timer2, clock),
            Err(HalError::TickAlreadyStarted {
                timer: TimerId::Timer1
            })
        );
    }
}
