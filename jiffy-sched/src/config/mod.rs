/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Scheduler configuration loading.
//!
//! The expected YAML structure is:
//! ```yaml
//! scheduler:
//!   tick_interval_us: 1000
//!   timer: timer1
//!   cpu_hz: 8000000
//!   initial_clock_us: 4274967295
//! ```
//!
//! Every field is optional; a missing field (or a missing `scheduler`
//! section) falls back to the defaults in [`SchedulerConfig::default`].

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::hal::TimerId;
use crate::time::{time_sec, Time};

/// Tick period used when nothing else is configured (1 ms).
pub const DEFAULT_TICK_INTERVAL_US: u32 = 1_000;

/// CPU clock assumed for prescaler selection when nothing else is configured.
pub const DEFAULT_CPU_HZ: u32 = 8_000_000;

/// The coarse clock starts 20 s before rollover so wraparound bugs show up
/// within the first minute of any test run.
pub const DEFAULT_INITIAL_CLOCK_US: u32 = u32::MAX - time_sec(20);

// ── Private YAML deserialization types ────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    scheduler: Option<SchedulerEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchedulerEntry {
    tick_interval_us: Option<u32>,
    timer: Option<TimerId>,
    cpu_hz: Option<u32>,
    initial_clock_us: Option<u32>,
}

// ── Public data structures ────────────────────────────────────────────────────

/// Everything needed to bring up a [`Scheduler`](crate::scheduler::Scheduler)
/// and its HAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Requested tick period; the HAL may round it.
    pub tick_interval_us: u32,
    /// Hardware timer that drives the tick.
    pub timer: TimerId,
    /// CPU clock, used by the HAL's prescaler search.
    pub cpu_hz: u32,
    /// Coarse clock value at start-up.
    pub initial_clock: Time,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_us: DEFAULT_TICK_INTERVAL_US,
            timer: TimerId::default(),
            cpu_hz: DEFAULT_CPU_HZ,
            initial_clock: Time::from_us(DEFAULT_INITIAL_CLOCK_US),
        }
    }
}

// ── ConfigManager ─────────────────────────────────────────────────────────────

/// Loads and holds the scheduler configuration.
#[derive(Debug, Default)]
pub struct ConfigManager {
    config: SchedulerConfig,

    /// Set to `true` after a successful [`load_from_file`](Self::load_from_file).
    loaded: bool,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `path` and replaces the current configuration.
    ///
    /// Fields absent from the file take their defaults, not their previous
    /// values.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or if the YAML is
    /// structurally invalid (including unknown keys under `scheduler`).
    pub fn load_from_file(&mut self, path: &Path) -> Result<()> {
        info!("Loading scheduler configuration from: {}", path.display());

        self.config = SchedulerConfig::default();
        self.loaded = false;

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        let file: ConfigFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;

        let entry = file.scheduler.unwrap_or_else(|| {
            warn!("No scheduler section in configuration file, using defaults");
            SchedulerEntry::default()
        });

        let defaults = SchedulerConfig::default();
        self.config = SchedulerConfig {
            tick_interval_us: entry.tick_interval_us.unwrap_or(defaults.tick_interval_us),
            timer: entry.timer.unwrap_or(defaults.timer),
            cpu_hz: entry.cpu_hz.unwrap_or(defaults.cpu_hz),
            initial_clock: entry
                .initial_clock_us
                .map(Time::from_us)
                .unwrap_or(defaults.initial_clock),
        };
        self.loaded = true;

        debug!(config = ?self.config, "scheduler configuration loaded");
        Ok(())
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Mutable access, used to apply command-line overrides.
    pub fn config_mut(&mut self) -> &mut SchedulerConfig {
        &mut self.config
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
