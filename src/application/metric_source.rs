// Metric source trait for catalog and traffic data access
use crate::domain::analytics::{DateRange, Entity, EntityKind, TrafficStats};
use async_trait::async_trait;

/// Read-only access to the storefront's data store. Reads are idempotent and
/// unpaginated; the catalog is bounded.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// List every catalog entity of the given kind
    async fn list_entities(&self, kind: EntityKind) -> anyhow::Result<Vec<Entity>>;

    /// Visits and orders recorded within the range
    async fn traffic_stats(&self, range: &DateRange) -> anyhow::Result<TrafficStats>;
}
