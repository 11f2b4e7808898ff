// Analytics domain models
use super::error::DateRangeError;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Number of monthly revenue buckets in a snapshot.
pub const MONTHS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Product,
    Service,
}

impl EntityKind {
    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::Product => "products",
            EntityKind::Service => "services",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Product => "product",
            EntityKind::Service => "service",
        }
    }
}

/// A catalog entry as supplied by the metric source. For services `stock`
/// holds the number of bookable slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub stock: u64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity {
    pub fn new(id: &str, name: &str, category: &str, price: f64, stock: u64, status: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            price,
            stock,
            status: status.to_string(),
            updated_at: None,
        }
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    /// Proxy for revenue potential when no sales history exists.
    pub fn inventory_value(&self) -> f64 {
        self.price * self.stock as f64
    }
}

/// Storefront traffic figures used for conversion metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficStats {
    pub visits: u64,
    pub orders: u64,
}

/// Inclusive calendar range applied before aggregation. Only constructible
/// through `new`, which enforces `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub const DEFAULT_TRAILING_DAYS: i64 = 30;

    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if start > end {
            return Err(DateRangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn trailing_days(end: NaiveDate, days: i64) -> Self {
        let start = end - Duration::days(days.max(0));
        Self { start, end }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        day >= self.start && day <= self.end
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::trailing_days(Utc::now().date_naive(), Self::DEFAULT_TRAILING_DAYS)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopEntity {
    pub id: String,
    pub name: String,
    pub sales_count: u64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Share {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub entity_id: String,
    pub name: String,
    pub kind: EntityKind,
    pub status: String,
    pub at: DateTime<Utc>,
}

/// Result of one aggregation pass. Recomputed wholesale on every refresh and
/// never patched; widgets receive it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub total_revenue: f64,
    pub monthly_revenue: [f64; MONTHS],
    pub month_labels: Vec<String>,
    pub revenue_growth: f64,
    pub average_order_value: f64,
    pub conversion_rate: f64,
    pub top_entities: Vec<TopEntity>,
    pub inventory_health: f64,
    pub service_utilization: f64,
    pub category_distribution: Vec<Share>,
    pub status_distribution: Vec<Share>,
    pub recent_activity: Vec<ActivityEntry>,
    pub product_count: usize,
    pub service_count: usize,
    pub generated_at: Option<DateTime<Utc>>,
}

impl AnalyticsSnapshot {
    pub fn empty() -> Self {
        Self {
            total_revenue: 0.0,
            monthly_revenue: [0.0; MONTHS],
            month_labels: Vec::new(),
            revenue_growth: 0.0,
            average_order_value: 0.0,
            conversion_rate: 0.0,
            top_entities: Vec::new(),
            inventory_health: 0.0,
            service_utilization: 0.0,
            category_distribution: Vec::new(),
            status_distribution: Vec::new(),
            recent_activity: Vec::new(),
            product_count: 0,
            service_count: 0,
            generated_at: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.product_count == 0 && self.service_count == 0 && self.total_revenue == 0.0
    }
}

impl Default for AnalyticsSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}
