//! Core types for the IMU risk engine
//!
//! This module defines the data structures that flow through each stage of the
//! engine: raw samples, scalar observations, window statistics, classification
//! status, escalation state, and the events emitted to collaborators.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// One 3-axis accelerometer reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Monotonic timestamp (milliseconds)
    pub timestamp_ms: i64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Sample {
    pub fn new(timestamp_ms: i64, x: f64, y: f64, z: f64) -> Self {
        Self {
            timestamp_ms,
            x,
            y,
            z,
        }
    }
}

/// Scalar magnitude and its change from the previous sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalarObservation {
    /// Signal vector magnitude (m/s²)
    pub svm: f64,
    /// Absolute change from the previous SVM (0 for the first sample)
    pub delta: f64,
}

/// Aggregate statistics over one window's contents
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowStatistics {
    pub mean: f64,
    /// Population standard deviation (divides by n)
    pub std_dev: f64,
    /// `sorted[n / 4]`
    pub q1: f64,
    /// `sorted[3n / 4]`
    pub q3: f64,
}

/// Motion risk status, ordered by severity.
///
/// The three-tier policy yields `Safe`, `Caution` and `Danger`; the four-tier
/// policy yields `Safe`, `Attention`, `Warning` and `Danger`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Safe,
    Attention,
    Caution,
    Warning,
    Danger,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Safe => "safe",
            Status::Attention => "attention",
            Status::Caution => "caution",
            Status::Warning => "warning",
            Status::Danger => "danger",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Escalation state machine level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationLevel {
    #[default]
    Normal,
    Warning,
    Emergency,
}

/// Signal a host should render after a window evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSignal {
    Safe,
    Caution,
    /// First isolated danger window
    StrongMovement,
    Emergency,
}

/// Mutable hysteresis state, owned by the escalation state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EscalationState {
    pub consecutive_danger_count: u32,
    pub emergency_active: bool,
    /// Deadline of the single pending cooldown (milliseconds)
    pub emergency_expiry_ms: Option<i64>,
}

/// Emitted once per evaluated window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowEvaluated {
    pub index: u64,
    /// Timestamp of the sample that completed the window
    pub timestamp_ms: i64,
    pub mean_svm: f64,
    pub mean_delta: f64,
    pub std_delta: f64,
    pub delta_q1: f64,
    pub delta_q3: f64,
    pub status: Status,
    /// Present only under the four-tier policy
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub escalation: Option<EscalationLevel>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub signal: Option<AlertSignal>,
}

/// Emitted when a window transitions into danger/emergency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRaised {
    pub index: u64,
    pub timestamp_ms: i64,
    pub mean_svm: f64,
}

/// Emitted when the emergency cooldown expires
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyCleared {
    /// Index of the last evaluated window
    pub index: u64,
    pub timestamp_ms: i64,
}

/// Any event the engine emits, as a single serializable stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    WindowEvaluated(WindowEvaluated),
    AlertRaised(AlertRaised),
    EmergencyCleared(EmergencyCleared),
}

/// Counters describing one monitoring session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub samples_accepted: u64,
    /// Samples discarded by rate gating
    pub samples_dropped: u64,
    pub windows_evaluated: u64,
    pub alerts_raised: u64,
    pub status_counts: BTreeMap<Status, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_severity_order() {
        assert!(Status::Safe < Status::Attention);
        assert!(Status::Caution < Status::Danger);
        assert!(Status::Warning < Status::Danger);
        assert_eq!(
            [Status::Warning, Status::Safe, Status::Danger].iter().max(),
            Some(&Status::Danger)
        );
    }

    #[test]
    fn test_event_serialization_tag() {
        let event = EngineEvent::AlertRaised(AlertRaised {
            index: 3,
            timestamp_ms: 14_000,
            mean_svm: 15.25,
        });

        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "alert_raised");
        assert_eq!(json["index"], 3);
        assert_eq!(json["mean_svm"], 15.25);
    }

    #[test]
    fn test_window_evaluated_omits_escalation_for_three_tier() {
        let event = WindowEvaluated {
            index: 1,
            timestamp_ms: 0,
            mean_svm: 9.8,
            mean_delta: 0.0,
            std_delta: 0.0,
            delta_q1: 0.0,
            delta_q3: 0.0,
            status: Status::Safe,
            escalation: None,
            signal: None,
        };

        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["status"], "safe");
        assert!(json.get("escalation").is_none());
        assert!(json.get("signal").is_none());
    }
}
