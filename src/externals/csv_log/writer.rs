use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use crate::models::sample::{Sample, SAMPLE_COLUMNS};

/// Name of the log file for a run started at `start`.
pub fn log_file_name(start: DateTime<Local>) -> String {
    start
        .format("Voltage Log -- %Y-%m-%d %H.%M.%S.csv")
        .to_string()
}

/// CSV log of one run. The header row is written on creation and every
/// row is flushed as it is written, so the file is readable at any point.
/// Dropping the log flushes it as well.
pub struct CsvLog {
    path: PathBuf,
    writer: BufWriter<File>,
    rows: usize,
}

impl CsvLog {
    /// Create the log for a run started at `start` in `directory` and
    /// write the header row.
    pub fn create(directory: &Path, start: DateTime<Local>) -> io::Result<Self> {
        let path = directory.join(log_file_name(start));
        let file = File::create(&path)?;
        let mut log = Self {
            path,
            writer: BufWriter::new(file),
            rows: 0,
        };

        log.write_row(&SAMPLE_COLUMNS)?;
        info!("Created log file '{}'.", log.path.display());
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Data rows written so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Append one sample as a row.
    pub fn write_sample(&mut self, sample: &Sample) -> io::Result<()> {
        self.write_row(&sample.fields())?;
        self.rows += 1;
        debug!("Wrote row {} to log.", self.rows);
        Ok(())
    }

    /// Flush and close the log, returning its path.
    pub fn close(mut self) -> io::Result<PathBuf> {
        self.writer.flush()?;
        info!(
            "Closed log file '{}' with {} rows.",
            self.path.display(),
            self.rows
        );
        Ok(self.path.clone())
    }

    fn write_row<S: AsRef<str>>(&mut self, fields: &[S]) -> io::Result<()> {
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                self.writer.write_all(b",")?;
            }
            self.writer.write_all(field.as_ref().as_bytes())?;
        }
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

impl Drop for CsvLog {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            warn!(
                "Failed to flush log file '{}'. Error: {}",
                self.path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use crate::models::{current::Current, voltage::Voltage};

    use super::*;

    fn start() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 3, 7, 14, 5, 9)
            .single()
            .expect("Failed to build start time.")
    }

    fn sample(offset_ms: i64, voltage: f64, current: f64) -> Sample {
        Sample::new(
            start(),
            start() + Duration::milliseconds(offset_ms),
            Voltage::from(voltage),
            Current { value: current },
        )
    }

    #[test]
    fn test_log_file_name() {
        assert_eq!(
            log_file_name(start()),
            "Voltage Log -- 2024-03-07 14.05.09.csv"
        );
    }

    #[test]
    fn test_header_only() {
        let dir = TempDir::new().unwrap();
        let log = CsvLog::create(dir.path(), start()).unwrap();
        let path = log.close().unwrap();

        assert_eq!(
            path,
            dir.path().join("Voltage Log -- 2024-03-07 14.05.09.csv")
        );
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "Time,Duration,Voltage,Current\n"
        );
    }

    #[test]
    fn test_rows_follow_header() {
        let dir = TempDir::new().unwrap();
        let mut log = CsvLog::create(dir.path(), start()).unwrap();
        log.write_sample(&sample(0, 3.3, 0.0)).unwrap();
        log.write_sample(&sample(1_003, 12.0456, 1.0)).unwrap();
        assert_eq!(log.rows(), 2);
        let path = log.close().unwrap();

        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "Time,Duration,Voltage,Current\n\
             14:05:09,0.00,3.300,0.000\n\
             14:05:10,1.00,12.046,1.000\n"
        );
    }

    #[test]
    fn test_readable_before_close() {
        let dir = TempDir::new().unwrap();
        let mut log = CsvLog::create(dir.path(), start()).unwrap();
        log.write_sample(&sample(0, 3.3, 0.5)).unwrap();

        let contents = fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec!["Time,Duration,Voltage,Current", "14:05:09,0.00,3.300,0.500"]);
    }

    #[test]
    fn test_create_in_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");
        assert!(CsvLog::create(&missing, start()).is_err());
    }
}
