//! Status classification
//!
//! Maps window statistics to a discrete status under one of two rule sets:
//! - Three-tier: all of (mean delta, delta spread, mean SVM) high is Danger,
//!   any one of them is Caution.
//! - Four-tier: delta-window only, evaluated Danger → Warning → Attention with
//!   the first match winning.
//!
//! Inputs containing NaN classify as Safe under both rule sets.

use crate::config::{ClassificationPolicy, FourTierThresholds, ThreeTierThresholds};
use crate::types::Status;
use serde::{Deserialize, Serialize};

/// Aggregates a classification is computed from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierInput {
    pub mean_svm: f64,
    pub mean_delta: f64,
    pub std_delta: f64,
}

impl ClassifierInput {
    fn has_nan(&self) -> bool {
        self.mean_svm.is_nan() || self.mean_delta.is_nan() || self.std_delta.is_nan()
    }
}

/// Result of classifying one window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub status: Status,
    pub is_danger: bool,
    pub is_warning: bool,
    pub is_attention: bool,
    pub input: ClassifierInput,
}

/// Pure classifier over a configured policy
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    policy: ClassificationPolicy,
}

impl Classifier {
    pub fn new(policy: ClassificationPolicy) -> Self {
        Self { policy }
    }

    pub fn classify(&self, input: ClassifierInput) -> Classification {
        if input.has_nan() {
            return Classification {
                status: Status::Safe,
                is_danger: false,
                is_warning: false,
                is_attention: false,
                input,
            };
        }

        match &self.policy {
            ClassificationPolicy::ThreeTier(thresholds) => classify_three_tier(thresholds, input),
            ClassificationPolicy::FourTier(thresholds) => classify_four_tier(thresholds, input),
        }
    }
}

fn classify_three_tier(t: &ThreeTierThresholds, input: ClassifierInput) -> Classification {
    let conditions = [
        input.mean_delta >= t.mean_delta,
        input.std_delta >= t.std_delta,
        input.mean_svm >= t.mean_svm,
    ];
    let met = conditions.iter().filter(|c| **c).count();

    let status = match met {
        3 => Status::Danger,
        0 => Status::Safe,
        _ => Status::Caution,
    };

    Classification {
        status,
        is_danger: status == Status::Danger,
        is_warning: false,
        is_attention: status == Status::Caution,
        input,
    }
}

fn classify_four_tier(t: &FourTierThresholds, input: ClassifierInput) -> Classification {
    let is_danger =
        input.mean_delta > t.danger_mean_delta && input.std_delta > t.danger_std_delta;
    let is_warning =
        input.mean_delta > t.warning_mean_delta && input.std_delta > t.warning_std_delta;
    let is_attention = input.mean_delta > t.attention_mean_delta;

    let status = if is_danger {
        Status::Danger
    } else if is_warning {
        Status::Warning
    } else if is_attention {
        Status::Attention
    } else {
        Status::Safe
    };

    Classification {
        status,
        is_danger,
        is_warning,
        is_attention,
        input,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(mean_svm: f64, mean_delta: f64, std_delta: f64) -> ClassifierInput {
        ClassifierInput {
            mean_svm,
            mean_delta,
            std_delta,
        }
    }

    fn three_tier() -> Classifier {
        Classifier::new(ClassificationPolicy::ThreeTier(ThreeTierThresholds::default()))
    }

    fn four_tier() -> Classifier {
        Classifier::new(ClassificationPolicy::FourTier(FourTierThresholds::default()))
    }

    #[test]
    fn test_three_tier_danger_requires_all_conditions() {
        let c = three_tier();
        assert_eq!(c.classify(input(13.0, 2.0, 2.5)).status, Status::Danger);
        assert_eq!(c.classify(input(12.9, 2.0, 2.5)).status, Status::Caution);
    }

    #[test]
    fn test_three_tier_any_condition_is_caution() {
        let c = three_tier();
        assert_eq!(c.classify(input(13.5, 0.1, 0.1)).status, Status::Caution);
        assert_eq!(c.classify(input(9.8, 2.1, 0.1)).status, Status::Caution);
        assert_eq!(c.classify(input(9.8, 0.1, 2.6)).status, Status::Caution);
    }

    #[test]
    fn test_three_tier_safe() {
        let result = three_tier().classify(input(9.8, 0.0, 0.0));
        assert_eq!(result.status, Status::Safe);
        assert!(!result.is_danger);
    }

    #[test]
    fn test_four_tier_priority_order() {
        let c = four_tier();
        assert_eq!(c.classify(input(9.8, 3.7, 3.4)).status, Status::Danger);
        assert_eq!(c.classify(input(9.8, 3.4, 2.9)).status, Status::Warning);
        assert_eq!(c.classify(input(9.8, 3.7, 3.0)).status, Status::Warning);
        assert_eq!(c.classify(input(9.8, 1.6, 0.0)).status, Status::Attention);
        assert_eq!(c.classify(input(9.8, 1.5, 0.0)).status, Status::Safe);
    }

    #[test]
    fn test_four_tier_thresholds_are_strict() {
        let result = four_tier().classify(input(9.8, 3.6, 3.3));
        assert!(!result.is_danger);
        assert!(result.is_warning);
        assert_eq!(result.status, Status::Warning);
    }

    #[test]
    fn test_four_tier_ignores_svm() {
        assert_eq!(
            four_tier().classify(input(30.0, 0.0, 0.0)).status,
            Status::Safe
        );
    }

    #[test]
    fn test_nan_resolves_to_safe() {
        let nan = input(f64::NAN, 5.0, 5.0);
        assert_eq!(three_tier().classify(nan).status, Status::Safe);

        let result = four_tier().classify(input(9.8, f64::NAN, 5.0));
        assert_eq!(result.status, Status::Safe);
        assert!(!result.is_danger);
    }
}
