// In-process metric source for demos, local runs and tests
use crate::application::metric_source::MetricSource;
use crate::domain::analytics::{DateRange, Entity, EntityKind, TrafficStats};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct StaticMetricSource {
    products: Vec<Entity>,
    services: Vec<Entity>,
    traffic: TrafficStats,
    failing: AtomicBool,
    fetches: AtomicUsize,
}

impl StaticMetricSource {
    pub fn new(products: Vec<Entity>, services: Vec<Entity>, traffic: TrafficStats) -> Self {
        Self {
            products,
            services,
            traffic,
            failing: AtomicBool::new(false),
            fetches: AtomicUsize::new(0),
        }
    }

    /// A small furniture storefront with recently touched entries.
    pub fn demo() -> Self {
        let now = Utc::now();
        let products = vec![
            Entity::new("p-100", "Oak Dining Chair", "furniture", 129.0, 64, "active")
                .with_updated_at(now - Duration::hours(3)),
            Entity::new("p-101", "Walnut Desk", "furniture", 489.0, 12, "active")
                .with_updated_at(now - Duration::days(1)),
            Entity::new("p-102", "Linen Floor Lamp", "lighting", 89.0, 7, "active")
                .with_updated_at(now - Duration::days(2)),
            Entity::new("p-103", "Wool Rug 2x3", "textiles", 259.0, 18, "active")
                .with_updated_at(now - Duration::days(6)),
            Entity::new("p-104", "Pendant Light", "lighting", 149.0, 0, "draft")
                .with_updated_at(now - Duration::days(9)),
            Entity::new("p-105", "Bookshelf", "furniture", 219.0, 25, "active"),
            Entity::new("p-106", "Throw Pillow", "textiles", 29.0, 140, "archived")
                .with_updated_at(now - Duration::days(40)),
        ];
        let services = vec![
            Entity::new("s-200", "Assembly", "support", 60.0, 20, "active")
                .with_updated_at(now - Duration::hours(8)),
            Entity::new("s-201", "Interior Consultation", "design", 150.0, 6, "active")
                .with_updated_at(now - Duration::days(4)),
            Entity::new("s-202", "White Glove Delivery", "logistics", 95.0, 10, "paused"),
        ];

        Self::new(products, services, TrafficStats { visits: 18_400, orders: 412 })
    }

    /// Make every subsequent call fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of product listings requested so far, failed ones included.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("metric source unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl MetricSource for StaticMetricSource {
    async fn list_entities(&self, kind: EntityKind) -> Result<Vec<Entity>> {
        if kind == EntityKind::Product {
            self.fetches.fetch_add(1, Ordering::SeqCst);
        }
        self.check_available()?;

        Ok(match kind {
            EntityKind::Product => self.products.clone(),
            EntityKind::Service => self.services.clone(),
        })
    }

    async fn traffic_stats(&self, _range: &DateRange) -> Result<TrafficStats> {
        self.check_available()?;
        Ok(self.traffic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failing_source_still_counts_fetches() {
        let source = StaticMetricSource::demo();

        assert!(!source.list_entities(EntityKind::Product).await.unwrap().is_empty());
        source.set_failing(true);
        assert!(source.list_entities(EntityKind::Product).await.is_err());
        assert!(source.traffic_stats(&DateRange::default()).await.is_err());
        source.set_failing(false);
        assert_eq!(source.list_entities(EntityKind::Service).await.unwrap().len(), 3);

        assert_eq!(source.fetch_count(), 2);
    }
}
