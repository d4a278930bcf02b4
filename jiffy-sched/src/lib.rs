/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! jiffy-sched – cooperative deadline scheduler for tick-driven clocks
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── time          – wrapping 32-bit µs time and its ordering
//! ├── heap          – fixed-capacity min-heap keyed by deadline
//! ├── now_queue     – fixed-capacity FIFO for "run next" work
//! ├── slots         – generation-checked activation slots (cancel handles)
//! ├── hal/          – timer hardware abstraction
//! │   ├── prescaler – prescaler / compare-value search
//! │   ├── sim       – deterministic simulated timer (tests)
//! │   └── host      – wall-clock ticker thread (demo binary)
//! ├── scheduler/    – run queues, run loop, coarse & precise time
//! │   ├── clock     – tick-interrupt state and sub-tick interpolation
//! │   ├── error     – structured error types
//! │   └── stats     – occupancy statistics
//! └── config/       – YAML scheduler configuration
//! ```

pub mod config;
pub mod hal;
pub mod heap;
pub mod now_queue;
pub mod scheduler;
pub mod slots;
pub mod time;

pub use config::{ConfigManager, SchedulerConfig};
pub use hal::{ClockHal, HalError, TimerId};
pub use scheduler::{Activation, Activity, Schedule, ScheduleError, Scheduler, SchedulerError};
pub use slots::Handle;
pub use time::{later_than, time_ms, time_sec, Time};
