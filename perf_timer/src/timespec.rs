//! `clock_gettime` timestamps and the elapsed time between two of them.

use std::{fmt, io, ops::Sub};

use clap::ValueEnum;
use libc::{
    CLOCK_MONOTONIC, CLOCK_MONOTONIC_RAW, CLOCK_REALTIME, clock_gettime, clockid_t, timespec,
};
use serde::Serialize;

use crate::error::{Result, TimerError};

pub const ONE_SEC_NS: u32 = 1_000_000_000;

/// The POSIX clocks a [`Timestamp`] can be read from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ClockId {
    /// Wall-clock time, subject to NTP steps.
    #[default]
    Realtime,
    /// Monotonic time, slewed by NTP but never stepped.
    Monotonic,
    /// Raw hardware-based monotonic time with no NTP adjustment.
    MonotonicRaw,
}

impl ClockId {
    fn as_raw(self) -> clockid_t {
        match self {
            Self::Realtime => CLOCK_REALTIME,
            Self::Monotonic => CLOCK_MONOTONIC,
            Self::MonotonicRaw => CLOCK_MONOTONIC_RAW,
        }
    }
}

impl fmt::Display for ClockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Realtime => "CLOCK_REALTIME",
            Self::Monotonic => "CLOCK_MONOTONIC",
            Self::MonotonicRaw => "CLOCK_MONOTONIC_RAW",
        };
        f.write_str(name)
    }
}

/// A point in time as whole seconds plus sub-second nanoseconds.
///
/// Field order matters: the derived ordering compares seconds first, which is
/// chronological as long as `nanos` stays below one second.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Timestamp {
    secs: i64,
    nanos: u32,
}

impl Timestamp {
    pub const ZERO: Self = Self { secs: 0, nanos: 0 };

    pub fn new(secs: i64, nanos: u32) -> Result<Self> {
        if nanos >= ONE_SEC_NS {
            return Err(TimerError::NanosOutOfRange(nanos as u64));
        }
        Ok(Self { secs, nanos })
    }

    /// Reads `clock` through `clock_gettime`.
    pub fn now(clock: ClockId) -> Result<Self> {
        let mut ts: timespec = unsafe { std::mem::zeroed() };
        // SAFETY: `ts` is a valid, writable timespec for the duration of the call.
        if unsafe { clock_gettime(clock.as_raw(), &mut ts) } != 0 {
            let source = io::Error::last_os_error();
            tracing::warn!(%clock, error = %source, "clock read failed");
            return Err(TimerError::ClockRead { clock, source });
        }

        // The kernel only hands out normalized timespecs.
        Ok(Self {
            secs: ts.tv_sec as i64,
            nanos: ts.tv_nsec as u32,
        })
    }

    pub const fn secs(&self) -> i64 {
        self.secs
    }

    pub const fn subsec_nanos(&self) -> u32 {
        self.nanos
    }

    pub const fn total_nanos(&self) -> i128 {
        self.secs as i128 * ONE_SEC_NS as i128 + self.nanos as i128
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}s", self.secs, self.nanos)
    }
}

impl Sub for Timestamp {
    type Output = Duration;

    fn sub(self, start: Self) -> Duration {
        diff(start, self)
    }
}

/// Elapsed time between two [`Timestamp`]s, with `nanos` always in `[0, 1s)`.
///
/// `secs` goes negative when the end of the measured span precedes its start.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Duration {
    secs: i64,
    nanos: u32,
}

impl Duration {
    pub const ZERO: Self = Self { secs: 0, nanos: 0 };

    pub const fn secs(&self) -> i64 {
        self.secs
    }

    pub const fn subsec_nanos(&self) -> u32 {
        self.nanos
    }

    /// `secs * 1e9 + nanos`, widened so no second count can overflow it.
    pub const fn as_nanos(&self) -> i128 {
        self.secs as i128 * ONE_SEC_NS as i128 + self.nanos as i128
    }

    pub const fn is_negative(&self) -> bool {
        self.secs < 0
    }

    pub fn to_std(self) -> Option<std::time::Duration> {
        let secs = u64::try_from(self.secs).ok()?;
        Some(std::time::Duration::new(secs, self.nanos))
    }
}

/// Computes `end - start`, borrowing a whole second when the nanosecond
/// subtraction would go negative.
///
/// Never fails. A reversed pair produces a negative `secs` with `nanos` still
/// normalized, and a second delta outside `i64` wraps around; use
/// [`checked_diff`] to reject either case instead.
pub const fn diff(start: Timestamp, end: Timestamp) -> Duration {
    let delta = end.nanos as i64 - start.nanos as i64;
    let secs = end.secs.wrapping_sub(start.secs);
    if delta < 0 {
        Duration {
            secs: secs.wrapping_sub(1),
            nanos: (ONE_SEC_NS as i64 + delta) as u32,
        }
    } else {
        Duration {
            secs,
            nanos: delta as u32,
        }
    }
}

/// Like [`diff`], but fails with [`TimerError::InvalidOrdering`] when `end`
/// precedes `start` and with [`TimerError::DurationOverflow`] when the elapsed
/// seconds do not fit in an `i64`.
pub fn checked_diff(start: Timestamp, end: Timestamp) -> Result<Duration> {
    if end < start {
        return Err(TimerError::InvalidOrdering { start, end });
    }

    let delta = end.nanos as i64 - start.nanos as i64;
    let borrow = i64::from(delta < 0);
    let secs = end
        .secs
        .checked_sub(start.secs)
        .and_then(|secs| secs.checked_sub(borrow))
        .ok_or(TimerError::DurationOverflow { start, end })?;

    Ok(Duration {
        secs,
        nanos: (delta + borrow * ONE_SEC_NS as i64) as u32,
    })
}

/// Reads `clock` before and after running `unit_of_work`.
pub fn measure_clock<F: FnOnce()>(clock: ClockId, unit_of_work: F) -> Result<Duration> {
    let start = Timestamp::now(clock)?;
    unit_of_work();
    let end = Timestamp::now(clock)?;
    Ok(diff(start, end))
}
