// Revenue estimation seam
use crate::domain::analytics::{DateRange, Entity, MONTHS};
use chrono::Datelike;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use std::sync::{Mutex, PoisonError};

/// Calendar month bucket, `month` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthBucket {
    pub year: i32,
    pub month: u32,
}

impl MonthBucket {
    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

/// The twelve calendar months ending with the month containing `range.end()`,
/// oldest first.
pub fn month_buckets(range: &DateRange) -> [MonthBucket; MONTHS] {
    let end = range.end();
    let last = end.year() * 12 + end.month0() as i32;
    std::array::from_fn(|i| {
        let index = last - (MONTHS - 1 - i) as i32;
        MonthBucket {
            year: index.div_euclid(12),
            month: index.rem_euclid(12) as u32 + 1,
        }
    })
}

pub struct RevenueInput<'a> {
    pub products: &'a [Entity],
    pub buckets: &'a [MonthBucket; MONTHS],
    pub sales_fraction: f64,
}

/// Produces the monthly revenue series for a snapshot.
///
/// Implementations return one non-negative value per bucket in `input.buckets`,
/// in the same order. The aggregator derives totals and growth from this
/// series and nothing else, so a real transactional query can replace the
/// synthetic estimator without touching callers.
pub trait RevenueEstimator: Send + Sync {
    fn monthly_revenue(&self, input: &RevenueInput<'_>) -> [f64; MONTHS];
}

/// Stand-in used while no transactional history exists: a linear growth
/// baseline scaled by a seasonal sine factor and mild noise. Seed it for
/// reproducible output.
pub struct SyntheticRevenueEstimator {
    rng: Mutex<StdRng>,
    monthly_growth: f64,
    seasonal_amplitude: f64,
    noise: f64,
}

impl SyntheticRevenueEstimator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
            monthly_growth: 0.03,
            seasonal_amplitude: 0.2,
            noise: 0.1,
        }
    }
}

impl RevenueEstimator for SyntheticRevenueEstimator {
    fn monthly_revenue(&self, input: &RevenueInput<'_>) -> [f64; MONTHS] {
        let catalog_value: f64 = input
            .products
            .iter()
            .map(|p| p.price.max(0.0) * (p.stock as f64 * input.sales_fraction).floor())
            .sum();
        let baseline = catalog_value / MONTHS as f64;

        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        std::array::from_fn(|i| {
            let bucket = input.buckets[i];
            let growth = 1.0 + self.monthly_growth * i as f64;
            let seasonal = 1.0 + self.seasonal_amplitude * (2.0 * PI * bucket.month as f64 / 12.0).sin();
            let noise = rng.gen_range((1.0 - self.noise)..=(1.0 + self.noise));
            (baseline * growth * seasonal * noise).max(0.0)
        })
    }
}

/// Replays a precomputed series, e.g. from an external reporting job.
pub struct FixedRevenueEstimator {
    series: [f64; MONTHS],
}

impl FixedRevenueEstimator {
    pub fn new(series: [f64; MONTHS]) -> Self {
        Self { series }
    }
}

impl RevenueEstimator for FixedRevenueEstimator {
    fn monthly_revenue(&self, _input: &RevenueInput<'_>) -> [f64; MONTHS] {
        self.series
    }
}
