#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::{_mm_lfence, _rdtsc};

use serde::Serialize;

use crate::{
    error::{Result, TimerError},
    timespec::{ClockId, Timestamp, diff},
};

/// The frequency the measurement host ran at when this tool was first written.
pub const DEFAULT_CPU_MHZ: f64 = 2099.996;

/// Reads the time-stamp counter. The surrounding `lfence`s stop earlier loads
/// and later instructions from leaking across the read.
#[cfg(target_arch = "x86_64")]
#[inline(always)]
pub fn cpu_timer() -> u64 {
    let tsc;
    unsafe {
        _mm_lfence();
        tsc = _rdtsc();
        _mm_lfence();
    }
    tsc
}

/// Reads the virtual counter after an `isb`, so it is not sampled early.
#[cfg(target_arch = "aarch64")]
#[inline(always)]
pub fn cpu_timer() -> u64 {
    let t: u64;
    unsafe {
        std::arch::asm!("isb", "mrs {}, cntvct_el0", out(reg) t, options(nostack));
    }
    t
}

/// No cycle counter we know how to read here, so this counts monotonic
/// nanoseconds instead.
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
#[inline(always)]
pub fn cpu_timer() -> u64 {
    use std::{sync::OnceLock, time::Instant};

    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_nanos() as u64
}

/// Elapsed ticks of the cycle counter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Cycles(u64);

impl Cycles {
    pub const fn new(count: u64) -> Self {
        Self(count)
    }

    pub const fn count(&self) -> u64 {
        self.0
    }
}

/// Counts the cycles spent running `unit_of_work`.
#[inline(always)]
pub fn time<F: FnOnce()>(unit_of_work: F) -> Cycles {
    let ((), cycles) = time_with(unit_of_work);
    cycles
}

/// Like [`time`], but hands back whatever `f` returned too.
#[inline(always)]
pub fn time_with<R, F: FnOnce() -> R>(f: F) -> (R, Cycles) {
    let start = cpu_timer();
    let result = f();
    let end = cpu_timer();
    (result, Cycles(end.wrapping_sub(start)))
}

/// Rate of the cycle counter, in cycles per nanosecond.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CpuFrequency {
    cycles_per_ns: f64,
}

impl CpuFrequency {
    pub fn new(cycles_per_ns: f64) -> Result<Self> {
        if !cycles_per_ns.is_finite() || cycles_per_ns <= 0.0 {
            return Err(TimerError::InvalidFrequency(cycles_per_ns));
        }
        Ok(Self { cycles_per_ns })
    }

    pub fn from_mhz(mhz: f64) -> Result<Self> {
        Self::new(mhz / 1e3)
    }

    pub const fn cycles_per_ns(&self) -> f64 {
        self.cycles_per_ns
    }

    pub fn mhz(&self) -> f64 {
        self.cycles_per_ns * 1e3
    }

    /// Approximate wall time for `cycles` at this rate.
    pub fn to_nanos(&self, cycles: Cycles) -> f64 {
        cycles.count() as f64 / self.cycles_per_ns
    }
}

/// Measures the cycle counter against `CLOCK_MONOTONIC_RAW`, busy-waiting for
/// at least `window`.
pub fn measure_cpu_freq(window: std::time::Duration) -> Result<CpuFrequency> {
    if window.is_zero() {
        return Err(TimerError::EmptyCalibrationWindow);
    }
    let window_ns = i128::try_from(window.as_nanos()).unwrap_or(i128::MAX);

    let os_start = Timestamp::now(ClockId::MonotonicRaw)?;
    let cpu_start = cpu_timer();

    let os_elapsed_ns = loop {
        let elapsed = diff(os_start, Timestamp::now(ClockId::MonotonicRaw)?).as_nanos();
        if elapsed >= window_ns {
            break elapsed;
        }
    };

    let cpu_end = cpu_timer();
    let cpu_elapsed = cpu_end.wrapping_sub(cpu_start);

    let freq = CpuFrequency::new(cpu_elapsed as f64 / os_elapsed_ns as f64)?;
    tracing::debug!(
        mhz = freq.mhz(),
        cycles = cpu_elapsed,
        elapsed_ns = os_elapsed_ns as u64,
        "measured CPU frequency"
    );
    Ok(freq)
}

#[cfg(test)]
mod tests {
    use std::{hint::black_box, time::Duration};

    use rstest::rstest;

    use super::*;

    #[test]
    fn time_counts_nonzero_work() {
        let cycles = time(|| {
            let mut acc = 0u64;
            for i in 0..10_000u64 {
                acc = black_box(acc.wrapping_add(i));
            }
            black_box(acc);
        });
        assert!(cycles.count() > 0);
    }

    #[test]
    fn time_with_returns_the_result() {
        let (sum, _cycles) = time_with(|| (1..=10u32).sum::<u32>());
        assert_eq!(sum, 55);
    }

    #[test]
    fn counter_does_not_go_backwards_between_reads() {
        let a = cpu_timer();
        let b = cpu_timer();
        assert!(b >= a);
    }

    #[test]
    fn default_frequency_converts_like_the_hardcoded_divisor() {
        let freq = CpuFrequency::from_mhz(DEFAULT_CPU_MHZ).unwrap();
        assert!((freq.cycles_per_ns() - 2.099996).abs() < 1e-12);
        let ns = freq.to_nanos(Cycles::new(2_099_996));
        assert!((ns - 1_000_000.0).abs() < 1e-6);
    }

    #[test]
    fn mhz_round_trips_through_cycles_per_ns() {
        let freq = CpuFrequency::new(3.0).unwrap();
        assert!((freq.mhz() - 3000.0).abs() < 1e-9);
    }

    #[rstest]
    #[case(0.0)]
    #[case(-1.5)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn invalid_frequencies_are_rejected(#[case] cycles_per_ns: f64) {
        assert!(matches!(
            CpuFrequency::new(cycles_per_ns),
            Err(TimerError::InvalidFrequency(_))
        ));
    }

    #[test]
    fn zero_cycles_take_zero_time() {
        let freq = CpuFrequency::new(1.0).unwrap();
        assert_eq!(freq.to_nanos(Cycles::default()), 0.0);
    }

    #[test]
    fn calibration_rejects_an_empty_window() {
        assert!(matches!(
            measure_cpu_freq(Duration::ZERO),
            Err(TimerError::EmptyCalibrationWindow)
        ));
    }

    #[test]
    fn calibration_measures_a_positive_rate() {
        let freq = measure_cpu_freq(Duration::from_millis(10)).unwrap();
        assert!(freq.cycles_per_ns() > 0.0);
    }
}
