/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::cell::Cell;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::{error, info, warn};

use jiffy_sched::hal::host::HostHal;
use jiffy_sched::scheduler::{Activity, Schedule, Scheduler};
use jiffy_sched::time::{MAX_OFFSET_US, US_PER_MS};
use jiffy_sched::{ConfigManager, TimerId};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Runs a heartbeat activity on the host clock for a fixed duration.
///
/// Example:
///   jiffy-demo --tick-us 1000 --timer timer0 --period-ms 250 --duration-ms 2000
#[derive(Debug, Parser)]
#[command(
    name = "jiffy-demo",
    about = "jiffy-sched host demo – heartbeat on a simulated timer interrupt",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML scheduler configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Tick period in µs (overrides the configuration file).
    #[arg(short = 't', long = "tick-us")]
    tick_us: Option<u32>,

    /// Timer driving the tick: timer0, timer1 or timer2.
    #[arg(long = "timer")]
    timer: Option<TimerId>,

    /// Heartbeat period in milliseconds.
    #[arg(short = 'p', long = "period-ms", default_value_t = 100)]
    period_ms: u32,

    /// How long to run before printing statistics and exiting.
    #[arg(short = 'd', long = "duration-ms", default_value_t = 1_000)]
    duration_ms: u32,
}

// ── Heartbeat activity ────────────────────────────────────────────────────────

struct Heartbeat {
    period_us: i32,
    beats: Cell<u32>,
}

impl<'a> Activity<'a> for Heartbeat {
    fn activate(&'a self, sched: &dyn Schedule<'a>) {
        let beat = self.beats.get() + 1;
        self.beats.set(beat);
        info!(
            beat,
            coarse = %sched.coarse_time(),
            precise = %sched.precise_time(),
            "heartbeat"
        );
        if let Err(e) = sched.schedule_after(self.period_us, self) {
            error!("Failed to re-arm heartbeat: {}", e);
            process::exit(1);
        }
    }
}

/// Milliseconds to a schedulable µs offset, if it fits.
fn ms_to_offset(ms: u32) -> Option<i32> {
    i32::try_from(u64::from(ms) * u64::from(US_PER_MS)).ok()
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=trace).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("jiffy-demo starting up...");

    let cli = Cli::parse();

    info!(
        config      = ?cli.config,
        tick_us     = ?cli.tick_us,
        timer       = ?cli.timer,
        period_ms   = cli.period_ms,
        duration_ms = cli.duration_ms,
        "Arguments"
    );

    // ── Load scheduler configuration ──────────────────────────────────────────
    let mut config_manager = ConfigManager::new();

    match &cli.config {
        Some(path) => {
            if let Err(e) = config_manager.load_from_file(path) {
                error!("Failed to load scheduler configuration: {:#}", e);
                process::exit(1);
            }
        }
        None => {
            warn!("No configuration file provided, using default scheduler settings");
        }
    }

    let config = config_manager.config_mut();
    if let Some(tick_us) = cli.tick_us {
        config.tick_interval_us = tick_us;
    }
    if let Some(timer) = cli.timer {
        config.timer = timer;
    }
    let config = *config;

    let (Some(period_us), Some(duration_us)) =
        (ms_to_offset(cli.period_ms), ms_to_offset(cli.duration_ms))
    else {
        error!(
            "Period and duration must each be below {} ms",
            MAX_OFFSET_US / US_PER_MS
        );
        process::exit(1);
    };

    // ── Bring up the scheduler ────────────────────────────────────────────────
    let heartbeat = Heartbeat {
        period_us,
        beats: Cell::new(0),
    };

    let sched: Scheduler<'_, HostHal> =
        match Scheduler::from_config(HostHal::new(config.cpu_hz), &config) {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to initialise scheduler: {}", e);
                process::exit(1);
            }
        };

    if let Err(e) = sched.schedule_immediate(&heartbeat) {
        error!("Failed to schedule heartbeat: {}", e);
        process::exit(1);
    }

    let stop_at = sched.coarse_time().wrapping_add_us(duration_us.unsigned_abs());
    sched.run_until(stop_at);

    info!(beats = heartbeat.beats.get(), "run finished");
    sched.log_stats();
}
