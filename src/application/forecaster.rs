// Trend forecaster - projects the last observed delta forward
use crate::domain::error::ForecastError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};

const JITTER_LOW: f64 = 0.8;
const JITTER_HIGH: f64 = 1.2;

/// Ten years of monthly projections.
pub const MAX_PERIODS: usize = 120;

/// Source of the multiplicative noise applied to each projected step.
pub trait Jitter: Send + Sync {
    /// A factor in `[low, high]`
    fn factor(&self, low: f64, high: f64) -> f64;
}

pub struct RandomJitter {
    rng: Mutex<StdRng>,
}

impl RandomJitter {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng: Mutex::new(rng) }
    }
}

impl Jitter for RandomJitter {
    fn factor(&self, low: f64, high: f64) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.gen_range(low..=high)
    }
}

/// Always returns the same factor, clamped into the requested interval.
pub struct FixedJitter(pub f64);

impl Jitter for FixedJitter {
    fn factor(&self, low: f64, high: f64) -> f64 {
        self.0.clamp(low, high)
    }
}

pub struct TrendForecaster {
    jitter: Box<dyn Jitter>,
}

impl TrendForecaster {
    pub fn new(jitter: Box<dyn Jitter>) -> Self {
        Self { jitter }
    }

    /// `periods` predictions following the end of `series`, at most
    /// `MAX_PERIODS`. Every value is floored at zero since revenue cannot be
    /// negative.
    pub fn forecast(&self, series: &[f64], periods: usize) -> Result<Vec<f64>, ForecastError> {
        if periods > MAX_PERIODS {
            return Err(ForecastError::TooManyPeriods {
                requested: periods,
                max: MAX_PERIODS,
            });
        }
        let [.., previous, last] = series else {
            return Err(ForecastError::InsufficientData { len: series.len() });
        };
        let trend = last - previous;

        Ok((1..=periods)
            .map(|i| {
                let jitter = self.jitter.factor(JITTER_LOW, JITTER_HIGH);
                (last + trend * i as f64 * jitter).max(0.0)
            })
            .collect())
    }
}

impl Default for TrendForecaster {
    fn default() -> Self {
        Self::new(Box::new(RandomJitter::new(None)))
    }
}
