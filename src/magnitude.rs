//! Magnitude extraction
//!
//! Converts 3-axis samples to a signal vector magnitude (SVM) and the absolute
//! change from the previous magnitude in the same session.

use crate::types::{Sample, ScalarObservation};

/// Stateful SVM/delta extractor
#[derive(Debug, Clone, Default)]
pub struct MagnitudeExtractor {
    previous_svm: Option<f64>,
}

impl MagnitudeExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the observation for one sample. NaN and infinite components
    /// propagate unchanged.
    pub fn observe(&mut self, sample: &Sample) -> ScalarObservation {
        let svm = (sample.x * sample.x + sample.y * sample.y + sample.z * sample.z).sqrt();
        let delta = self
            .previous_svm
            .map(|previous| (svm - previous).abs())
            .unwrap_or(0.0);
        self.previous_svm = Some(svm);

        ScalarObservation { svm, delta }
    }

    /// Forget the previous magnitude (new session)
    pub fn reset(&mut self) {
        self.previous_svm = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_observation_has_zero_delta() {
        let mut extractor = MagnitudeExtractor::new();
        let obs = extractor.observe(&Sample::new(0, 3.0, 4.0, 0.0));

        assert!((obs.svm - 5.0).abs() < 1e-12);
        assert_eq!(obs.delta, 0.0);
    }

    #[test]
    fn test_delta_is_absolute_change() {
        let mut extractor = MagnitudeExtractor::new();
        extractor.observe(&Sample::new(0, 0.0, 0.0, 10.0));
        let obs = extractor.observe(&Sample::new(40, 0.0, 0.0, 7.0));

        assert!((obs.svm - 7.0).abs() < 1e-12);
        assert!((obs.delta - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_reset_starts_new_session() {
        let mut extractor = MagnitudeExtractor::new();
        extractor.observe(&Sample::new(0, 0.0, 0.0, 20.0));
        extractor.reset();
        let obs = extractor.observe(&Sample::new(40, 0.0, 0.0, 9.8));

        assert_eq!(obs.delta, 0.0);
    }

    #[test]
    fn test_nan_propagates() {
        let mut extractor = MagnitudeExtractor::new();
        let obs = extractor.observe(&Sample::new(0, f64::NAN, 0.0, 9.8));
        assert!(obs.svm.is_nan());
    }
}
