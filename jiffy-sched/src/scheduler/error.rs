/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the scheduler.
//!
//! Two enums model the two failure layers:
//!
//! * [`ScheduleError`]: a single `schedule_*` call could not register its
//!   activation.
//! * [`SchedulerError`]: the scheduler could not be brought up at all.
//!
//! None of these are recoverable inside the scheduler.  They are returned as
//! values and the application decides whether to halt.
//!
//! | Variant | Kind |
//! |---|---|
//! | `ScheduleError::CapacityExhausted` | fatal / capacity |
//! | `ScheduleError::NegativeOffset` | fatal / invalid argument |
//! | `SchedulerError::Hal(UnknownTimer \| IntervalOutOfRange \| ..)` | fatal / invalid argument |
//! | `SchedulerError::ZeroTickInterval` | fatal / invalid argument |

use thiserror::Error;

use crate::hal::HalError;

/// Why a `schedule_*` call was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// Every activation slot is in use.  Nothing was queued.
    #[error("scheduler is full: all {capacity} activation slots are pending")]
    CapacityExhausted { capacity: usize },

    /// `schedule_after` was given a negative relative offset.
    #[error("negative schedule offset {offset_us}µs")]
    NegativeOffset { offset_us: i32 },
}

/// Why the scheduler could not be initialised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("tick interval must be non-zero")]
    ZeroTickInterval,

    #[error("timer hardware rejected the tick configuration: {0}")]
    Hal(#[from] HalError),
}
