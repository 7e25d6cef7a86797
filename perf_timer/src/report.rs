use std::fmt;

use serde::Serialize;

use crate::{
    cycles::{CpuFrequency, Cycles},
    timespec::{ClockId, Duration},
};

/// Renders `report` either as its one-line text form or as a JSON object.
pub fn render<R: fmt::Display + Serialize>(report: &R, json: bool) -> serde_json::Result<String> {
    if json {
        serde_json::to_string(report)
    } else {
        Ok(report.to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ClockReport {
    pub clock: ClockId,
    pub secs: i64,
    pub nanos: u32,
    pub elapsed_ns: i128,
}

impl ClockReport {
    pub fn new(clock: ClockId, elapsed: Duration) -> Self {
        Self {
            clock,
            secs: elapsed.secs(),
            nanos: elapsed.subsec_nanos(),
            elapsed_ns: elapsed.as_nanos(),
        }
    }
}

impl fmt::Display for ClockReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (ns)", self.elapsed_ns)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CycleReport {
    pub cycles: Cycles,
    pub cpu_mhz: f64,
    pub elapsed_ns: f64,
}

impl CycleReport {
    pub fn new(cycles: Cycles, freq: CpuFrequency) -> Self {
        Self {
            cycles,
            cpu_mhz: freq.mhz(),
            elapsed_ns: freq.to_nanos(cycles),
        }
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "It took {} cycles, {:.3} (ns)",
            self.cycles.count(),
            self.elapsed_ns
        )
    }
}
