pub mod cli;
pub mod cycles;
pub mod error;
pub mod report;
pub mod timespec;

pub use cycles::{CpuFrequency, Cycles, cpu_timer, measure_cpu_freq, time, time_with};
pub use error::{Result, TimerError};
pub use timespec::{ClockId, Duration, Timestamp, checked_diff, diff, measure_clock};

/// Reporting hook for the `timer-macros` crate, so callers of those macros do
/// not need their own `tracing` dependency.
#[inline(never)]
pub fn report_cycles(label: &str, cycles: Cycles) {
    let count = cycles.count();
    tracing::trace!(label, cycles = count, "`{label}` took {count} cycles");
}
