//! IMU Risk - streaming motion-intensity classification for wearables
//!
//! The engine consumes a continuous stream of 3-axis accelerometer samples and
//! classifies motion intensity per sliding window: magnitude extraction →
//! sliding windows → window statistics → threshold classification →
//! debounced escalation. Results are pushed to an `EventSink`.
//!
//! ## Policies
//!
//! - **Three-tier**: Safe / Caution / Danger over mean SVM and the delta window
//! - **Four-tier**: Safe / Attention / Warning / Danger over the delta window,
//!   paired with an escalation state machine that separates a single spike from
//!   sustained danger

pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod escalation;
pub mod magnitude;
pub mod sink;
pub mod statistics;
pub mod types;
pub mod window;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::{ClassificationPolicy, EngineConfig};
pub use engine::{evaluate_samples, MotionEngine};
pub use error::MonitorError;
pub use sink::{CsvRecorder, EventCollector, EventSink};
pub use types::{
    AlertRaised, AlertSignal, EmergencyCleared, EngineEvent, EscalationLevel, Sample,
    SessionSummary, Status, WindowEvaluated,
};

/// Library version embedded in CLI reports
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "imu-risk";
