//! Monitoring engine
//!
//! This module provides the public API for the IMU risk engine. It drives the
//! per-sample pipeline:
//!
//! 1. Rate gating - drop oversampled readings (optional)
//! 2. MagnitudeExtractor - SVM and delta
//! 3. SlidingWindow - SVM and delta windows
//! 4. StatisticsEngine + Classifier - once the windows are full and a step has elapsed
//! 5. EscalationStateMachine - four-tier policy only
//! 6. EventSink - window, alert and cooldown notifications
//!
//! The engine is single-writer: one caller feeds samples in arrival order and
//! every state change, including cooldown expiry, happens on that caller's path.

use crate::classifier::{Classifier, ClassifierInput};
use crate::config::EngineConfig;
use crate::error::MonitorError;
use crate::escalation::{EscalationStateMachine, Transition};
use crate::magnitude::MagnitudeExtractor;
use crate::sink::{EventCollector, EventSink};
use crate::statistics::StatisticsEngine;
use crate::types::{
    AlertRaised, EmergencyCleared, EngineEvent, EscalationLevel, EscalationState, Sample,
    SessionSummary, Status, WindowEvaluated,
};
use crate::window::SlidingWindow;
use log::{debug, info, trace, warn};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Run a complete session over a batch of samples and return every event.
///
/// # Example
/// ```ignore
/// let events = evaluate_samples(EngineConfig::default(), &samples)?;
/// ```
pub fn evaluate_samples(
    config: EngineConfig,
    samples: &[Sample],
) -> Result<Vec<EngineEvent>, MonitorError> {
    let mut engine = MotionEngine::new(config)?;
    let mut collector = EventCollector::new();

    for sample in samples {
        engine.feed(*sample, &mut collector)?;
    }
    engine.stop();

    Ok(collector.take())
}

/// Stateful single-session engine.
///
/// A freshly constructed engine has an active session; `stop` seals it and
/// `start` begins a new one with all state reset.
pub struct MotionEngine {
    config: EngineConfig,
    extractor: MagnitudeExtractor,
    svm_window: SlidingWindow,
    delta_window: SlidingWindow,
    classifier: Classifier,
    escalation: Option<EscalationStateMachine>,
    step_counter: usize,
    window_index: u64,
    last_accepted_ms: Option<i64>,
    last_status: Option<Status>,
    active: bool,
    session_id: Uuid,
    samples_accepted: u64,
    samples_dropped: u64,
    alerts_raised: u64,
    status_counts: BTreeMap<Status, u64>,
}

impl MotionEngine {
    /// Create an engine and start its first session
    pub fn new(config: EngineConfig) -> Result<Self, MonitorError> {
        config.validate()?;

        let escalation = config
            .policy
            .uses_escalation()
            .then(|| EscalationStateMachine::new(config.cooldown_ms, config.emergency_after));

        let mut engine = Self {
            extractor: MagnitudeExtractor::new(),
            svm_window: SlidingWindow::new(config.window_size),
            delta_window: SlidingWindow::new(config.window_size),
            classifier: Classifier::new(config.policy),
            escalation,
            step_counter: 0,
            window_index: 0,
            last_accepted_ms: None,
            last_status: None,
            active: false,
            session_id: Uuid::nil(),
            samples_accepted: 0,
            samples_dropped: 0,
            alerts_raised: 0,
            status_counts: BTreeMap::new(),
            config,
        };
        engine.start();
        Ok(engine)
    }

    /// Begin a new session, resetting all state
    pub fn start(&mut self) {
        self.reset_pipeline();
        self.window_index = 0;
        self.last_status = None;
        self.samples_accepted = 0;
        self.samples_dropped = 0;
        self.alerts_raised = 0;
        self.status_counts.clear();
        self.session_id = Uuid::new_v4();
        self.active = true;

        info!(
            "session {} started ({} policy, window {}, step {})",
            self.session_id,
            self.config.policy.name(),
            self.config.window_size,
            self.config.step_size
        );
    }

    /// Seal the session. Partially filled windows are discarded and any pending
    /// cooldown is cancelled; no further events are emitted until `start`.
    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.reset_pipeline();
        self.active = false;

        info!(
            "session {} stopped after {} windows",
            self.session_id, self.window_index
        );
    }

    fn reset_pipeline(&mut self) {
        self.extractor.reset();
        self.svm_window.clear();
        self.delta_window.clear();
        self.step_counter = 0;
        self.last_accepted_ms = None;
        if let Some(machine) = self.escalation.as_mut() {
            machine.reset();
        }
    }

    /// Process one sample. Must be called in arrival order from a single caller.
    pub fn feed(&mut self, sample: Sample, sink: &mut dyn EventSink) -> Result<(), MonitorError> {
        if !self.active {
            warn!(
                "dropped sample at {} ms: session {} is stopped",
                sample.timestamp_ms, self.session_id
            );
            return Err(MonitorError::SessionInactive);
        }

        self.poll_cooldown(sample.timestamp_ms, sink);

        if self.is_rate_limited(sample.timestamp_ms) {
            self.samples_dropped += 1;
            trace!("dropped sample at {} ms (rate gate)", sample.timestamp_ms);
            return Ok(());
        }
        self.last_accepted_ms = Some(sample.timestamp_ms);
        self.samples_accepted += 1;

        let observation = self.extractor.observe(&sample);
        self.svm_window.push(observation.svm);
        self.delta_window.push(observation.delta);
        self.step_counter += 1;

        if self.svm_window.is_full()
            && self.delta_window.is_full()
            && self.step_counter >= self.config.step_size
        {
            self.evaluate_window(sample.timestamp_ms, sink)?;
        }

        Ok(())
    }

    /// Advance time without a sample, letting a pending cooldown expire
    pub fn tick(&mut self, now_ms: i64, sink: &mut dyn EventSink) -> Result<(), MonitorError> {
        if !self.active {
            return Err(MonitorError::SessionInactive);
        }
        self.poll_cooldown(now_ms, sink);
        Ok(())
    }

    fn is_rate_limited(&self, timestamp_ms: i64) -> bool {
        match (self.config.min_sample_interval_ms, self.last_accepted_ms) {
            (Some(min_interval), Some(last)) => timestamp_ms.saturating_sub(last) < min_interval,
            _ => false,
        }
    }

    fn poll_cooldown(&mut self, now_ms: i64, sink: &mut dyn EventSink) {
        let cleared = self
            .escalation
            .as_mut()
            .map(|machine| machine.poll_expiry(now_ms))
            .unwrap_or(false);

        if cleared {
            sink.emergency_cleared(&EmergencyCleared {
                index: self.window_index,
                timestamp_ms: now_ms,
            });
        }
    }

    fn evaluate_window(
        &mut self,
        timestamp_ms: i64,
        sink: &mut dyn EventSink,
    ) -> Result<(), MonitorError> {
        let svm_stats = StatisticsEngine::compute(&self.svm_window)?;
        let delta_stats = StatisticsEngine::compute(&self.delta_window)?;

        let classification = self.classifier.classify(ClassifierInput {
            mean_svm: svm_stats.mean,
            mean_delta: delta_stats.mean,
            std_delta: delta_stats.std_dev,
        });

        let transition: Option<Transition> = self.escalation.as_mut().map(|machine| {
            machine.advance(
                classification.is_danger,
                classification.is_warning,
                classification.is_attention,
                timestamp_ms,
            )
        });

        self.window_index += 1;
        self.step_counter = 0;

        let status = classification.status;
        let event = WindowEvaluated {
            index: self.window_index,
            timestamp_ms,
            mean_svm: svm_stats.mean,
            mean_delta: delta_stats.mean,
            std_delta: delta_stats.std_dev,
            delta_q1: delta_stats.q1,
            delta_q3: delta_stats.q3,
            status,
            escalation: transition.map(|t| t.level),
            signal: transition.map(|t| t.signal),
        };

        debug!(
            "window #{}: mean_svm={:.2} mean_delta={:.2} std_delta={:.2} status={}",
            event.index, event.mean_svm, event.mean_delta, event.std_delta, status
        );

        *self.status_counts.entry(status).or_insert(0) += 1;
        sink.window_evaluated(&event);

        let raise_alert = match transition {
            Some(t) => t.entered_emergency,
            None => status == Status::Danger && self.last_status != Some(Status::Danger),
        };
        if raise_alert {
            self.alerts_raised += 1;
            info!(
                "alert raised at window #{} (mean_svm={:.2})",
                event.index, event.mean_svm
            );
            sink.alert_raised(&AlertRaised {
                index: event.index,
                timestamp_ms,
                mean_svm: event.mean_svm,
            });
        }

        self.last_status = Some(status);
        Ok(())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Number of windows evaluated in the current session
    pub fn window_index(&self) -> u64 {
        self.window_index
    }

    /// Current escalation level (four-tier policy only)
    pub fn escalation_level(&self) -> Option<EscalationLevel> {
        self.escalation.as_ref().map(|m| m.level())
    }

    pub fn escalation_state(&self) -> Option<&EscalationState> {
        self.escalation.as_ref().map(|m| m.state())
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id,
            samples_accepted: self.samples_accepted,
            samples_dropped: self.samples_dropped,
            windows_evaluated: self.window_index,
            alerts_raised: self.alerts_raised,
            status_counts: self.status_counts.clone(),
        }
    }
}
