use std::io;

use thiserror::Error;

use crate::timespec::{ClockId, Timestamp};

pub type Result<T, E = TimerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum TimerError {
    #[error("clock_gettime({clock}) failed")]
    ClockRead {
        clock: ClockId,
        #[source]
        source: io::Error,
    },

    #[error("end timestamp {end} precedes start timestamp {start}")]
    InvalidOrdering { start: Timestamp, end: Timestamp },

    #[error("elapsed seconds from {start} to {end} do not fit in an i64")]
    DurationOverflow { start: Timestamp, end: Timestamp },

    #[error("sub-second nanoseconds must be below 1_000_000_000, got {0}")]
    NanosOutOfRange(u64),

    #[error("CPU frequency must be a finite positive number of cycles per ns, got {0}")]
    InvalidFrequency(f64),

    #[error("calibration window must be longer than zero")]
    EmptyCalibrationWindow,
}
