//! Event sinks
//!
//! The engine reports through an `EventSink` and never waits on the result.
//! Sinks own their failures: a sink that cannot persist an event logs it and
//! moves on, the engine neither retries nor resends.

use crate::error::MonitorError;
use crate::types::{AlertRaised, EmergencyCleared, EngineEvent, WindowEvaluated};
use chrono::DateTime;
use log::warn;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Header row of the persisted window log
pub const CSV_HEADER: &str = "Timestamp,WindowIndex,MeanSVM,MeanDeltaSVM,StdDeltaSVM,Status";

/// Receiver of engine notifications. All callbacks default to no-ops.
pub trait EventSink {
    fn window_evaluated(&mut self, _event: &WindowEvaluated) {}

    fn alert_raised(&mut self, _event: &AlertRaised) {}

    fn emergency_cleared(&mut self, _event: &EmergencyCleared) {}
}

/// In-memory sink collecting events in emission order
#[derive(Debug, Default, Clone)]
pub struct EventCollector {
    events: Vec<EngineEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[EngineEvent] {
        &self.events
    }

    /// Drain collected events
    pub fn take(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn windows(&self) -> impl Iterator<Item = &WindowEvaluated> {
        self.events.iter().filter_map(|e| match e {
            EngineEvent::WindowEvaluated(w) => Some(w),
            _ => None,
        })
    }

    pub fn alerts(&self) -> impl Iterator<Item = &AlertRaised> {
        self.events.iter().filter_map(|e| match e {
            EngineEvent::AlertRaised(a) => Some(a),
            _ => None,
        })
    }
}

impl EventSink for EventCollector {
    fn window_evaluated(&mut self, event: &WindowEvaluated) {
        self.events.push(EngineEvent::WindowEvaluated(event.clone()));
    }

    fn alert_raised(&mut self, event: &AlertRaised) {
        self.events.push(EngineEvent::AlertRaised(event.clone()));
    }

    fn emergency_cleared(&mut self, event: &EmergencyCleared) {
        self.events.push(EngineEvent::EmergencyCleared(event.clone()));
    }
}

/// Append-only CSV log with one row per evaluated window.
///
/// The header is written once, before the first row, unless the underlying
/// file already held data.
///
/// The `Timestamp` column renders sample timestamps as UTC, so they must be
/// milliseconds since the Unix epoch. Streams stamped by a boot-relative
/// sensor clock need `with_clock_offset` to map them onto wall-clock time.
pub struct CsvRecorder<W: Write> {
    writer: W,
    clock_offset_ms: i64,
    header_written: bool,
    rows_written: u64,
    failures: u64,
}

impl<W: Write> CsvRecorder<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            clock_offset_ms: 0,
            header_written: false,
            rows_written: 0,
            failures: 0,
        }
    }

    /// Add `offset_ms` to every sample timestamp before rendering it.
    ///
    /// For a boot-relative clock this is the wall-clock epoch time at which
    /// the sensor clock read zero.
    pub fn with_clock_offset(mut self, offset_ms: i64) -> Self {
        self.clock_offset_ms = offset_ms;
        self
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Number of rows that could not be written
    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_row(&mut self, event: &WindowEvaluated) -> io::Result<()> {
        if !self.header_written {
            writeln!(self.writer, "{CSV_HEADER}")?;
            self.header_written = true;
        }
        let wall_ms = event.timestamp_ms.saturating_add(self.clock_offset_ms);
        writeln!(self.writer, "{}", format_row(event, wall_ms))?;
        self.writer.flush()
    }
}

impl CsvRecorder<File> {
    /// Open `path` for appending, writing the header only if the file is new or empty
    pub fn append_to(path: &Path) -> Result<Self, MonitorError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let has_data = file.metadata()?.len() > 0;

        let mut recorder = Self::new(file);
        recorder.header_written = has_data;
        Ok(recorder)
    }
}

impl<W: Write> EventSink for CsvRecorder<W> {
    fn window_evaluated(&mut self, event: &WindowEvaluated) {
        match self.write_row(event) {
            Ok(()) => self.rows_written += 1,
            Err(e) => {
                self.failures += 1;
                warn!("failed to record window #{}: {e}", event.index);
            }
        }
    }
}

/// Render one data row (two-decimal fixed precision)
fn format_row(event: &WindowEvaluated, wall_ms: i64) -> String {
    format!(
        "{},{},{:.2},{:.2},{:.2},{}",
        format_timestamp(wall_ms),
        event.index,
        event.mean_svm,
        event.mean_delta,
        event.std_delta,
        event.status
    )
}

fn format_timestamp(timestamp_ms: i64) -> String {
    match DateTime::from_timestamp_millis(timestamp_ms) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        None => timestamp_ms.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Status;
    use pretty_assertions::assert_eq;

    fn window(index: u64, status: Status) -> WindowEvaluated {
        WindowEvaluated {
            index,
            timestamp_ms: 1_705_327_200_000 + (index as i64) * 7_000,
            mean_svm: 9.8066,
            mean_delta: 0.004,
            std_delta: 0.0123,
            delta_q1: 0.0,
            delta_q3: 0.01,
            status,
            escalation: None,
            signal: None,
        }
    }

    #[test]
    fn test_header_written_once_before_rows() {
        let mut recorder = CsvRecorder::new(Vec::new());
        recorder.window_evaluated(&window(1, Status::Safe));
        recorder.window_evaluated(&window(2, Status::Caution));
        assert_eq!(recorder.rows_written(), 2);

        let out = String::from_utf8(recorder.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                CSV_HEADER,
                "2024-01-15 14:00:07.000,1,9.81,0.00,0.01,safe",
                "2024-01-15 14:00:14.000,2,9.81,0.00,0.01,caution",
            ]
        );
    }

    #[test]
    fn test_no_header_without_rows() {
        let mut recorder = CsvRecorder::new(Vec::new());
        recorder.alert_raised(&AlertRaised {
            index: 1,
            timestamp_ms: 0,
            mean_svm: 15.0,
        });
        assert!(recorder.into_inner().is_empty());
    }

    #[test]
    fn test_append_to_existing_file_skips_header() {
        let path = std::env::temp_dir().join(format!(
            "imu_risk_log_{}.csv",
            uuid::Uuid::new_v4()
        ));

        {
            let mut recorder = CsvRecorder::append_to(&path).unwrap();
            recorder.window_evaluated(&window(1, Status::Safe));
        }
        {
            let mut recorder = CsvRecorder::append_to(&path).unwrap();
            recorder.window_evaluated(&window(2, Status::Danger));
        }

        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(content.matches(CSV_HEADER).count(), 1);
        assert_eq!(content.lines().count(), 3);
        assert!(content.lines().last().unwrap().ends_with(",2,9.81,0.00,0.01,danger"));
    }

    #[test]
    fn test_clock_offset_maps_boot_time_to_wall_clock() {
        let mut event = window(1, Status::Safe);
        event.timestamp_ms = 7_000;

        let mut recorder = CsvRecorder::new(Vec::new()).with_clock_offset(1_705_327_200_000);
        recorder.window_evaluated(&event);

        let out = String::from_utf8(recorder.into_inner()).unwrap();
        assert_eq!(
            out.lines().nth(1),
            Some("2024-01-15 14:00:07.000,1,9.81,0.00,0.01,safe")
        );
    }

    #[test]
    fn test_append_to_directory_is_io_error() {
        let result = CsvRecorder::append_to(&std::env::temp_dir());
        assert!(matches!(result, Err(MonitorError::Io(_))));
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_counted_not_propagated() {
        let mut recorder = CsvRecorder::new(FailingWriter);
        recorder.window_evaluated(&window(1, Status::Safe));
        recorder.window_evaluated(&window(2, Status::Safe));

        assert_eq!(recorder.failures(), 2);
        assert_eq!(recorder.rows_written(), 0);
    }

    #[test]
    fn test_collector_preserves_order() {
        let mut collector = EventCollector::new();
        collector.window_evaluated(&window(1, Status::Danger));
        collector.alert_raised(&AlertRaised {
            index: 1,
            timestamp_ms: 0,
            mean_svm: 14.0,
        });

        assert_eq!(collector.windows().count(), 1);
        assert_eq!(collector.alerts().count(), 1);
        let events = collector.take();
        assert!(matches!(events[0], EngineEvent::WindowEvaluated(_)));
        assert!(matches!(events[1], EngineEvent::AlertRaised(_)));
        assert!(collector.events().is_empty());
    }
}
