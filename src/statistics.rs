//! Window statistics
//!
//! Mean, population standard deviation, and truncating-index quartiles over a
//! window's current contents. Values are recomputed from scratch on every call.

use crate::error::MonitorError;
use crate::types::WindowStatistics;
use crate::window::SlidingWindow;

/// Statistics engine for sliding windows
pub struct StatisticsEngine;

impl StatisticsEngine {
    /// Compute statistics over the window. An empty window is an invalid state.
    pub fn compute(window: &SlidingWindow) -> Result<WindowStatistics, MonitorError> {
        let values: Vec<f64> = window.snapshot().collect();
        Self::compute_values(&values)
    }

    /// Compute statistics over an arbitrary non-empty slice
    pub fn compute_values(values: &[f64]) -> Result<WindowStatistics, MonitorError> {
        if values.is_empty() {
            return Err(MonitorError::EmptyWindow);
        }

        let mean = mean(values);
        let std_dev = population_std_dev(values, mean);
        let (q1, q3) = quartiles(values);

        Ok(WindowStatistics {
            mean,
            std_dev,
            q1,
            q3,
        })
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Divides by n, not n - 1
fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Lower-bound index truncation: `sorted[n / 4]` and `sorted[3n / 4]`
fn quartiles(values: &[f64]) -> (f64, f64) {
    let mut sorted = values.to_vec();
    // NaN sorts last under total ordering
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    (sorted[n / 4], sorted[(3 * n) / 4])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window_of(values: &[f64]) -> SlidingWindow {
        let mut window = SlidingWindow::new(values.len());
        for v in values {
            window.push(*v);
        }
        window
    }

    #[test]
    fn test_known_values() {
        let stats = StatisticsEngine::compute(&window_of(&[1.0, 2.0, 3.0, 4.0])).unwrap();

        assert!((stats.mean - 2.5).abs() < 1e-12);
        assert!((stats.std_dev - 1.25_f64.sqrt()).abs() < 1e-12);
        assert_eq!(stats.q1, 2.0);
        assert_eq!(stats.q3, 4.0);
    }

    #[test]
    fn test_quartiles_ignore_arrival_order() {
        let stats = StatisticsEngine::compute(&window_of(&[4.0, 1.0, 3.0, 2.0])).unwrap();
        assert_eq!(stats.q1, 2.0);
        assert_eq!(stats.q3, 4.0);
    }

    #[test]
    fn test_single_value() {
        let stats = StatisticsEngine::compute_values(&[7.5]).unwrap();
        assert_eq!(stats.mean, 7.5);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.q1, 7.5);
        assert_eq!(stats.q3, 7.5);
    }

    #[test]
    fn test_constant_window_has_zero_spread() {
        let stats = StatisticsEngine::compute_values(&[9.8; 350]).unwrap();
        assert!((stats.mean - 9.8).abs() < 1e-9);
        assert!(stats.std_dev < 1e-9);
    }

    #[test]
    fn test_empty_window_is_invalid_state() {
        let window = SlidingWindow::new(4);
        assert!(matches!(
            StatisticsEngine::compute(&window),
            Err(MonitorError::EmptyWindow)
        ));
    }

    #[test]
    fn test_nan_propagates_to_mean() {
        let stats = StatisticsEngine::compute_values(&[1.0, f64::NAN, 3.0]).unwrap();
        assert!(stats.mean.is_nan());
        assert!(stats.std_dev.is_nan());
    }
}
