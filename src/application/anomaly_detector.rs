// Anomaly detector - z-score outliers in a numeric series
use serde::Serialize;

pub const DEFAULT_THRESHOLD: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub index: usize,
    pub value: f64,
    pub z_score: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct AnomalyDetector {
    threshold: f64,
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl AnomalyDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn detect(&self, series: &[f64]) -> Vec<Anomaly> {
        detect(series, self.threshold)
    }
}

/// Points whose z-score against the population mean and standard deviation
/// reaches `threshold`, in index order. A constant or empty series has no
/// anomalies.
pub fn detect(series: &[f64], threshold: f64) -> Vec<Anomaly> {
    if series.is_empty() {
        return Vec::new();
    }

    let n = series.len() as f64;
    let mean = series.iter().sum::<f64>() / n;
    let variance = series.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();
    // Rounding noise on a constant series must not produce z-scores.
    if std_dev.is_nan() || std_dev <= f64::EPSILON * mean.abs().max(1.0) {
        return Vec::new();
    }

    series
        .iter()
        .enumerate()
        .filter_map(|(index, &value)| {
            let z_score = (value - mean).abs() / std_dev;
            (z_score >= threshold).then_some(Anomaly {
                index,
                value,
                z_score,
            })
        })
        .collect()
}
