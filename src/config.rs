//! Engine configuration
//!
//! Window geometry, rate gating, cooldown, and the two selectable threshold
//! policies. Defaults reproduce a 25 Hz stream evaluated over 14-second windows
//! with 50% overlap.

use crate::error::MonitorError;
use serde::{Deserialize, Serialize};

/// Default number of samples per window
pub const DEFAULT_WINDOW_SIZE: usize = 350;

/// Default number of new samples between evaluations
pub const DEFAULT_STEP_SIZE: usize = 175;

/// Minimum inter-sample interval used when rate gating is enabled (25 Hz)
pub const DEFAULT_MIN_SAMPLE_INTERVAL_MS: i64 = 40;

/// Default emergency hold time
pub const DEFAULT_COOLDOWN_MS: i64 = 5_000;

/// Consecutive danger windows required to enter emergency
pub const DEFAULT_EMERGENCY_AFTER: u32 = 2;

/// Three-tier thresholds over mean SVM and the delta window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThreeTierThresholds {
    pub mean_delta: f64,
    pub std_delta: f64,
    pub mean_svm: f64,
}

impl Default for ThreeTierThresholds {
    fn default() -> Self {
        Self {
            mean_delta: 2.0,
            std_delta: 2.5,
            mean_svm: 13.0,
        }
    }
}

/// Four-tier thresholds over the delta window (strict comparisons)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FourTierThresholds {
    pub danger_mean_delta: f64,
    pub danger_std_delta: f64,
    pub warning_mean_delta: f64,
    pub warning_std_delta: f64,
    pub attention_mean_delta: f64,
}

impl Default for FourTierThresholds {
    fn default() -> Self {
        Self {
            danger_mean_delta: 3.6,
            danger_std_delta: 3.3,
            warning_mean_delta: 3.3,
            warning_std_delta: 2.8,
            attention_mean_delta: 1.5,
        }
    }
}

/// Selectable classification rule set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassificationPolicy {
    /// Safe / Caution / Danger, alerting on every transition into Danger
    ThreeTier(ThreeTierThresholds),
    /// Safe / Attention / Warning / Danger, driving the escalation state machine
    FourTier(FourTierThresholds),
}

impl Default for ClassificationPolicy {
    fn default() -> Self {
        ClassificationPolicy::FourTier(FourTierThresholds::default())
    }
}

impl ClassificationPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            ClassificationPolicy::ThreeTier(_) => "three_tier",
            ClassificationPolicy::FourTier(_) => "four_tier",
        }
    }

    /// Whether this policy is paired with the escalation state machine
    pub fn uses_escalation(&self) -> bool {
        matches!(self, ClassificationPolicy::FourTier(_))
    }
}

/// Full engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub window_size: usize,
    pub step_size: usize,
    /// Drop samples closer than this to the previous accepted sample
    #[serde(default)]
    pub min_sample_interval_ms: Option<i64>,
    pub cooldown_ms: i64,
    pub emergency_after: u32,
    pub policy: ClassificationPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            step_size: DEFAULT_STEP_SIZE,
            min_sample_interval_ms: None,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            emergency_after: DEFAULT_EMERGENCY_AFTER,
            policy: ClassificationPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Default geometry with the three-tier policy
    pub fn three_tier() -> Self {
        Self {
            policy: ClassificationPolicy::ThreeTier(ThreeTierThresholds::default()),
            ..Self::default()
        }
    }

    /// Default geometry with the four-tier policy
    pub fn four_tier() -> Self {
        Self::default()
    }

    /// Enable rate gating at the given minimum interval
    pub fn with_min_sample_interval(mut self, interval_ms: i64) -> Self {
        self.min_sample_interval_ms = Some(interval_ms);
        self
    }

    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.window_size == 0 {
            return Err(MonitorError::InvalidConfig(
                "window_size must be positive".to_string(),
            ));
        }
        if self.step_size == 0 || self.step_size > self.window_size {
            return Err(MonitorError::InvalidConfig(format!(
                "step_size must be in 1..={}, got {}",
                self.window_size, self.step_size
            )));
        }
        if self.cooldown_ms <= 0 {
            return Err(MonitorError::InvalidConfig(
                "cooldown_ms must be positive".to_string(),
            ));
        }
        if self.emergency_after == 0 {
            return Err(MonitorError::InvalidConfig(
                "emergency_after must be at least 1".to_string(),
            ));
        }
        if let Some(interval) = self.min_sample_interval_ms {
            if interval < 0 {
                return Err(MonitorError::InvalidConfig(
                    "min_sample_interval_ms must not be negative".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Load and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, MonitorError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_stream_geometry() {
        let config = EngineConfig::default();
        assert_eq!(config.window_size, 350);
        assert_eq!(config.step_size, 175);
        assert_eq!(config.cooldown_ms, 5_000);
        assert_eq!(config.emergency_after, 2);
        assert!(config.min_sample_interval_ms.is_none());
        assert!(config.policy.uses_escalation());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_three_tier_preset() {
        let config = EngineConfig::three_tier();
        assert_eq!(config.policy.name(), "three_tier");
        assert!(!config.policy.uses_escalation());
    }

    #[test]
    fn test_rejects_bad_geometry() {
        let mut config = EngineConfig::default();
        config.step_size = 400;
        assert!(matches!(
            config.validate(),
            Err(MonitorError::InvalidConfig(_))
        ));

        config.step_size = 0;
        assert!(config.validate().is_err());

        let config = EngineConfig {
            window_size: 0,
            step_size: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let config = EngineConfig::three_tier().with_min_sample_interval(40);
        let json = config.to_json().unwrap();
        assert!(json.contains("\"kind\": \"three_tier\""));

        let loaded = EngineConfig::from_json(&json).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_from_json_validates() {
        let json = r#"{
            "window_size": 10,
            "step_size": 20,
            "cooldown_ms": 5000,
            "emergency_after": 2,
            "policy": { "kind": "four_tier", "danger_mean_delta": 3.6,
                        "danger_std_delta": 3.3, "warning_mean_delta": 3.3,
                        "warning_std_delta": 2.8, "attention_mean_delta": 1.5 }
        }"#;
        assert!(EngineConfig::from_json(json).is_err());
    }
}
