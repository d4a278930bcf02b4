/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Clock-select / compare-value search for the periodic tick timer.
//!
//! The timer runs in clear-on-compare mode: the CPU clock is divided by a
//! prescaler (chosen via a 3-bit clock-select field) and the interrupt fires
//! every `compare` prescaled ticks.  Because both values are integers, most
//! requested periods can only be approximated; the period actually produced
//! is returned so the scheduler can do its time math against reality.
//!
//! All arithmetic happens in "hs" units, 120 hs = 1 µs.  120 is the LCM of
//! the supported crystal frequencies in MHz (1, 8, 12, 20), so one CPU cycle
//! is always a whole number of hs.

use super::{HalError, TimerId};

/// hs units per microsecond.
pub const HS_PER_US: u64 = 120;

/// Static description of one hardware timer.
#[derive(Debug)]
pub struct TimerDef {
    /// log2 of the prescaler divisor for each clock-select value; `None`
    /// marks selects that are reserved or count external pins.
    pub prescaler_shifts: [Option<u8>; 8],
    /// Width of the compare register in bits.
    pub compare_bits: u8,
}

const TIMER0: TimerDef = TimerDef {
    prescaler_shifts: [None, Some(0), Some(3), Some(6), Some(8), Some(10), None, None],
    compare_bits: 8,
};

const TIMER1: TimerDef = TimerDef {
    prescaler_shifts: [None, Some(0), Some(3), Some(6), Some(8), Some(10), None, None],
    compare_bits: 16,
};

const TIMER2: TimerDef = TimerDef {
    prescaler_shifts: [None, Some(0), Some(3), Some(5), Some(6), Some(7), Some(8), Some(10)],
    compare_bits: 8,
};

pub fn timer_def(timer: TimerId) -> &'static TimerDef {
    match timer {
        TimerId::Timer0 => &TIMER0,
        TimerId::Timer1 => &TIMER1,
        TimerId::Timer2 => &TIMER2,
    }
}

/// Register values for one tick period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrescalerSetting {
    /// Period the hardware will really produce, in µs.
    pub actual_us: u32,
    /// Clock-select field value (1..=7).
    pub clock_select: u8,
    /// Compare register value.
    pub compare: u16,
}

/// Picks the smallest prescaler whose compare value fits the register.
///
/// Smaller prescalers give finer rounding, so the first fit is the best one.
///
/// # Errors
/// * [`HalError::UnsupportedCpuFrequency`] – `cpu_hz` is zero or does not
///   divide 120 MHz, so a CPU cycle is not a whole number of hs.
/// * [`HalError::IntervalOutOfRange`] – even the largest prescaler overflows
///   the compare register.
pub fn find_prescaler(
    requested_us: u32,
    timer: TimerId,
    cpu_hz: u32,
) -> Result<PrescalerSetting, HalError> {
    let hs_per_sec = HS_PER_US * 1_000_000;
    if cpu_hz == 0 || hs_per_sec % u64::from(cpu_hz) != 0 {
        return Err(HalError::UnsupportedCpuFrequency { cpu_hz });
    }
    let hs_per_cpu_tick = hs_per_sec / u64::from(cpu_hz);

    let def = timer_def(timer);
    let max_compare = (1u64 << def.compare_bits) - 1;

    for (cs, shift) in def.prescaler_shifts.iter().enumerate() {
        let Some(shift) = *shift else { continue };
        let hs_per_prescaled_tick = hs_per_cpu_tick << shift;
        let ticks_per_period = (u64::from(requested_us) * HS_PER_US) / hs_per_prescaled_tick + 1;
        if ticks_per_period > max_compare {
            continue;
        }
        let actual_us = (ticks_per_period * hs_per_prescaled_tick) / HS_PER_US;
        return Ok(PrescalerSetting {
            actual_us: actual_us as u32,
            clock_select: cs as u8,
            compare: ticks_per_period as u16,
        });
    }

    Err(HalError::IntervalOutOfRange {
        requested_us,
        timer,
        cpu_hz,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
