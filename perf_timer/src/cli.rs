//! Command-line configuration shared by the `clock_gettime` and `rdtscp`
//! programs.

use std::hint::black_box;

use clap::{Args, Parser};
use tracing_subscriber::EnvFilter;

use crate::{
    cycles::{CpuFrequency, DEFAULT_CPU_MHZ, measure_cpu_freq},
    error::Result,
    timespec::ClockId,
};

#[derive(Args, Debug, Clone, PartialEq)]
pub struct CommonArgs {
    /// Iterations of a black-boxed busy loop to run inside the timed region
    #[arg(long, default_value_t = 0)]
    pub spin: u64,

    /// Print a JSON object instead of the plain text line
    #[arg(long)]
    pub json: bool,
}

/// Time a region with two `clock_gettime` reads.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "clock_gettime", version)]
pub struct ClockArgs {
    #[arg(short, long, value_enum, default_value_t = ClockId::Realtime)]
    pub clock: ClockId,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Time a region in CPU cycles and convert the count to nanoseconds.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "rdtscp", version)]
pub struct CycleArgs {
    /// Counter frequency used to convert cycles to nanoseconds
    #[arg(long, env = "PERF_TIMER_CPU_MHZ", default_value_t = DEFAULT_CPU_MHZ)]
    pub cpu_mhz: f64,

    /// Measure the counter frequency instead of trusting --cpu-mhz
    #[arg(long)]
    pub calibrate: bool,

    #[arg(long, default_value_t = 1000, requires = "calibrate")]
    pub calibration_ms: u64,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl CycleArgs {
    pub fn frequency(&self) -> Result<CpuFrequency> {
        if self.calibrate {
            measure_cpu_freq(std::time::Duration::from_millis(self.calibration_ms))
        } else {
            CpuFrequency::from_mhz(self.cpu_mhz)
        }
    }
}

/// Stand-in workload for the timed region.
#[inline(never)]
pub fn spin(iterations: u64) -> u64 {
    let mut acc = 0u64;
    for i in 0..iterations {
        acc = black_box(acc.wrapping_add(i));
    }
    acc
}

/// Logs go to stderr so stdout only carries the measurement.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
