// Analytics aggregator - turns metric source snapshots into an AnalyticsSnapshot
use crate::application::metric_source::MetricSource;
use crate::application::revenue_estimator::{RevenueEstimator, RevenueInput, month_buckets};
use crate::domain::analytics::{
    ActivityEntry, AnalyticsSnapshot, DateRange, Entity, EntityKind, MONTHS, Share, TopEntity,
    TrafficStats,
};
use anyhow::Context;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

const RECENT_ACTIVITY_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregatorOptions {
    pub top_n: usize,
    pub min_stock_threshold: u64,
    pub sales_fraction: f64,
}

impl Default for AggregatorOptions {
    fn default() -> Self {
        Self {
            top_n: 4,
            min_stock_threshold: 10,
            sales_fraction: 0.3,
        }
    }
}

#[derive(Clone)]
pub struct AnalyticsAggregator {
    source: Arc<dyn MetricSource>,
    estimator: Arc<dyn RevenueEstimator>,
    options: AggregatorOptions,
}

impl AnalyticsAggregator {
    pub fn new(
        source: Arc<dyn MetricSource>,
        estimator: Arc<dyn RevenueEstimator>,
        options: AggregatorOptions,
    ) -> Self {
        Self {
            source,
            estimator,
            options,
        }
    }

    /// Fetch everything and aggregate, surfacing fetch failures.
    pub async fn try_compute(&self, range: &DateRange) -> anyhow::Result<AnalyticsSnapshot> {
        let (products, services, traffic) = futures::try_join!(
            async {
                self.source
                    .list_entities(EntityKind::Product)
                    .await
                    .context("Failed to list products")
            },
            async {
                self.source
                    .list_entities(EntityKind::Service)
                    .await
                    .context("Failed to list services")
            },
            async {
                self.source
                    .traffic_stats(range)
                    .await
                    .context("Failed to fetch traffic stats")
            },
        )?;

        tracing::debug!(
            "Aggregating {} products, {} services for {}..{}",
            products.len(),
            services.len(),
            range.start(),
            range.end()
        );
        Ok(self.summarize(range, &products, &services, traffic))
    }

    /// Like `try_compute`, but a fetch failure yields an all-zero snapshot.
    pub async fn compute(&self, range: &DateRange) -> AnalyticsSnapshot {
        match self.try_compute(range).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Aggregation failed, returning empty snapshot: {:#}", e);
                AnalyticsSnapshot::empty()
            }
        }
    }

    pub fn summarize(
        &self,
        range: &DateRange,
        products: &[Entity],
        services: &[Entity],
        traffic: TrafficStats,
    ) -> AnalyticsSnapshot {
        let buckets = month_buckets(range);
        let monthly_revenue = self.estimator.monthly_revenue(&RevenueInput {
            products,
            buckets: &buckets,
            sales_fraction: self.options.sales_fraction,
        });
        let total_revenue: f64 = monthly_revenue.iter().sum();

        AnalyticsSnapshot {
            total_revenue,
            monthly_revenue,
            month_labels: buckets.iter().map(|b| b.label()).collect(),
            revenue_growth: revenue_growth(&monthly_revenue),
            average_order_value: ratio(total_revenue, traffic.orders as f64),
            conversion_rate: ratio(traffic.orders as f64, traffic.visits as f64) * 100.0,
            top_entities: top_entities(products, self.options.top_n, self.options.sales_fraction),
            inventory_health: inventory_health(products, self.options.min_stock_threshold),
            service_utilization: service_utilization(services),
            category_distribution: distribution(products.iter().chain(services), |e| &e.category, "Uncategorized"),
            status_distribution: distribution(products.iter().chain(services), |e| &e.status, "unknown"),
            recent_activity: recent_activity(range, products, services),
            product_count: products.len(),
            service_count: services.len(),
            generated_at: Some(Utc::now()),
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 { 0.0 } else { numerator / denominator }
}

/// Month-over-month change of the last two buckets, in percent. An empty
/// bucket on either side means no data for that month, so growth is zero.
pub fn revenue_growth(monthly: &[f64; MONTHS]) -> f64 {
    let previous = monthly[MONTHS - 2];
    let current = monthly[MONTHS - 1];
    if previous == 0.0 || current == 0.0 {
        return 0.0;
    }
    let growth = (current - previous) / previous * 100.0;
    if growth.is_finite() { growth } else { 0.0 }
}

/// Rank by `price * stock` descending and keep the first `n`. Sales are
/// estimated as a fixed fraction of stock.
pub fn top_entities(products: &[Entity], n: usize, sales_fraction: f64) -> Vec<TopEntity> {
    let mut ranked: Vec<&Entity> = products.iter().collect();
    ranked.sort_by(|a, b| {
        b.inventory_value()
            .total_cmp(&a.inventory_value())
            .then_with(|| a.id.cmp(&b.id))
    });

    ranked
        .into_iter()
        .take(n)
        .map(|e| {
            let sales_count = (e.stock as f64 * sales_fraction).floor() as u64;
            TopEntity {
                id: e.id.clone(),
                name: e.name.clone(),
                sales_count,
                revenue: e.price * sales_count as f64,
            }
        })
        .collect()
}

/// Percentage of products stocked above `threshold`, rounded.
pub fn inventory_health(products: &[Entity], threshold: u64) -> f64 {
    let healthy = products.iter().filter(|p| p.stock > threshold).count();
    (ratio(healthy as f64, products.len() as f64) * 100.0).round()
}

/// Percentage of services currently active, rounded.
pub fn service_utilization(services: &[Entity]) -> f64 {
    let active = services
        .iter()
        .filter(|s| s.status.eq_ignore_ascii_case("active"))
        .count();
    (ratio(active as f64, services.len() as f64) * 100.0).round()
}

fn distribution<'a, I, F>(entities: I, key: F, fallback: &str) -> Vec<Share>
where
    I: Iterator<Item = &'a Entity>,
    F: Fn(&Entity) -> &String,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for entity in entities {
        let label = key(entity).trim();
        let label = if label.is_empty() { fallback } else { label };
        *counts.entry(label.to_string()).or_default() += 1;
    }

    let mut shares: Vec<Share> = counts
        .into_iter()
        .map(|(label, count)| Share { label, count })
        .collect();
    shares.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    shares
}

fn recent_activity(range: &DateRange, products: &[Entity], services: &[Entity]) -> Vec<ActivityEntry> {
    let tagged = products
        .iter()
        .map(|e| (EntityKind::Product, e))
        .chain(services.iter().map(|e| (EntityKind::Service, e)));

    let mut entries: Vec<ActivityEntry> = tagged
        .filter_map(|(kind, e)| {
            let at = e.updated_at.filter(|at| range.contains(*at))?;
            Some(ActivityEntry {
                entity_id: e.id.clone(),
                name: e.name.clone(),
                kind,
                status: e.status.clone(),
                at,
            })
        })
        .collect();
    entries.sort_by(|a, b| b.at.cmp(&a.at).then_with(|| a.entity_id.cmp(&b.entity_id)));
    entries.truncate(RECENT_ACTIVITY_LIMIT);
    entries
}
