use std::fmt::Display;

use chrono::{DateTime, Local};

use super::{current::Current, voltage::Voltage};

/// Column names of a sample, in order.
pub const SAMPLE_COLUMNS: [&str; 4] = ["Time", "Duration", "Voltage", "Current"];

/// One acquisition event. Written out and then dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Wall clock instant the sample was captured.
    pub timestamp: DateTime<Local>,

    /// Seconds since the first sample of the run.
    pub elapsed_secs: f64,

    pub voltage: Voltage,
    pub current: Current,
}

impl Sample {
    /// Build a sample captured at `timestamp` in a run started at `start`.
    pub fn new(
        start: DateTime<Local>,
        timestamp: DateTime<Local>,
        voltage: Voltage,
        current: Current,
    ) -> Self {
        let elapsed_secs = (timestamp - start).num_microseconds().unwrap_or(i64::MAX) as f64 / 1e6;
        Self {
            timestamp,
            elapsed_secs,
            voltage,
            current,
        }
    }

    /// The formatted fields in `SAMPLE_COLUMNS` order.
    pub fn fields(&self) -> [String; 4] {
        [
            self.timestamp.format("%H:%M:%S").to_string(),
            format!("{:.2}", self.elapsed_secs),
            self.voltage.to_string(),
            self.current.to_string(),
        ]
    }
}

impl Display for Sample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.fields().join(", "))
    }
}
