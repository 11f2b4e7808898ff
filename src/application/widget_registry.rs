// Widget registry - catalog of widget kinds and their render builders
use crate::domain::analytics::{AnalyticsSnapshot, DateRange, MONTHS, Share};
use crate::domain::render::{
    ChartData, ChartKind, RenderModel, SeriesData, SeriesPoint, TableData, TileData,
};
use crate::domain::widget::{Widget, WidgetKind, WidgetSize};

/// Pure function from a frozen snapshot to a render model.
pub type RenderFn = fn(&AnalyticsSnapshot, &DateRange) -> RenderModel;

#[derive(Clone, Copy)]
pub struct WidgetSpec {
    pub kind: WidgetKind,
    pub default_title: &'static str,
    pub default_size: WidgetSize,
    pub in_default_layout: bool,
    pub render: RenderFn,
}

impl std::fmt::Debug for WidgetSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetSpec")
            .field("kind", &self.kind)
            .field("default_title", &self.default_title)
            .field("default_size", &self.default_size)
            .field("in_default_layout", &self.in_default_layout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct WidgetRegistry {
    specs: Vec<WidgetSpec>,
}

impl Default for WidgetRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl WidgetRegistry {
    pub fn standard() -> Self {
        let specs = WidgetKind::ALL.iter().map(|kind| spec_for(*kind)).collect();
        Self { specs }
    }

    pub fn spec(&self, kind: WidgetKind) -> WidgetSpec {
        self.specs
            .iter()
            .find(|s| s.kind == kind)
            .copied()
            .unwrap_or_else(|| spec_for(kind))
    }

    /// The arrangement the reserved default view resets to. Ids are `w1..wN`
    /// in render order.
    pub fn default_widgets(&self) -> Vec<Widget> {
        self.specs
            .iter()
            .filter(|s| s.in_default_layout)
            .enumerate()
            .map(|(i, s)| {
                let rank = i as i64 + 1;
                Widget::new(
                    format!("w{}", rank),
                    s.kind,
                    s.default_title.to_string(),
                    s.default_size,
                    rank,
                )
            })
            .collect()
    }

    pub fn render(&self, kind: WidgetKind, snapshot: &AnalyticsSnapshot, range: &DateRange) -> RenderModel {
        (self.spec(kind).render)(snapshot, range)
    }
}

fn spec_for(kind: WidgetKind) -> WidgetSpec {
    let (default_title, default_size, in_default_layout, render): (_, _, _, RenderFn) = match kind {
        WidgetKind::StatSummary => ("Overview", WidgetSize::Full, true, render_stat_summary),
        WidgetKind::RevenueTrend => ("Revenue Trend", WidgetSize::Large, true, render_revenue_trend),
        WidgetKind::PerformanceIndicators => (
            "Performance Indicators",
            WidgetSize::Small,
            true,
            render_performance_indicators,
        ),
        WidgetKind::TopEntities => ("Top Products", WidgetSize::Medium, true, render_top_entities),
        WidgetKind::RecentActivity => ("Recent Activity", WidgetSize::Medium, true, render_recent_activity),
        WidgetKind::CategoryDistribution => (
            "Categories",
            WidgetSize::Small,
            true,
            render_category_distribution,
        ),
        WidgetKind::StatusDistribution => (
            "Status Breakdown",
            WidgetSize::Small,
            false,
            render_status_distribution,
        ),
        WidgetKind::GenericTimeSeries => (
            "Time Series",
            WidgetSize::Large,
            false,
            render_generic_time_series,
        ),
    };

    WidgetSpec {
        kind,
        default_title,
        default_size,
        in_default_layout,
        render,
    }
}

fn month_points(snapshot: &AnalyticsSnapshot, values: &[f64]) -> Vec<SeriesPoint> {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let label = snapshot
                .month_labels
                .get(i)
                .cloned()
                .unwrap_or_else(|| format!("M{}", i + 1));
            SeriesPoint::new(label, *value)
        })
        .collect()
}

fn render_stat_summary(snapshot: &AnalyticsSnapshot, _range: &DateRange) -> RenderModel {
    if snapshot.is_empty() {
        return RenderModel::empty("Overview", "No catalog data yet");
    }

    RenderModel::Tiles {
        tiles: vec![
            TileData::new("total_revenue", "Total Revenue", "USD", snapshot.total_revenue, 2),
            TileData::new("revenue_growth", "Growth", "%", snapshot.revenue_growth, 1),
            TileData::new("products", "Products", "", snapshot.product_count as f64, 0),
            TileData::new("services", "Services", "", snapshot.service_count as f64, 0),
        ],
    }
}

fn render_revenue_trend(snapshot: &AnalyticsSnapshot, _range: &DateRange) -> RenderModel {
    if snapshot.monthly_revenue.iter().all(|v| *v == 0.0) {
        return RenderModel::empty("Revenue Trend", "No revenue recorded");
    }

    RenderModel::Chart(ChartData {
        title: "Revenue Trend".to_string(),
        unit: Some("USD".to_string()),
        kind: ChartKind::Line,
        y_min: Some(0.0),
        fraction_digits: Some(0),
        series: vec![SeriesData::new(
            "monthly_revenue",
            "Monthly Revenue",
            Some("#4f46e5"),
            month_points(snapshot, &snapshot.monthly_revenue),
        )],
    })
}

fn render_performance_indicators(snapshot: &AnalyticsSnapshot, _range: &DateRange) -> RenderModel {
    let values = [
        snapshot.average_order_value,
        snapshot.conversion_rate,
        snapshot.inventory_health,
        snapshot.service_utilization,
    ];
    if values.iter().all(|v| *v == 0.0) {
        return RenderModel::empty("Performance Indicators", "No indicators available");
    }

    RenderModel::Tiles {
        tiles: vec![
            TileData::new("average_order_value", "Avg. Order Value", "USD", values[0], 2),
            TileData::new("conversion_rate", "Conversion", "%", values[1], 1),
            TileData::new("inventory_health", "Inventory Health", "%", values[2], 0),
            TileData::new("service_utilization", "Service Utilization", "%", values[3], 0),
        ],
    }
}

fn render_top_entities(snapshot: &AnalyticsSnapshot, _range: &DateRange) -> RenderModel {
    if snapshot.top_entities.is_empty() {
        return RenderModel::empty("Top Products", "No products to rank");
    }

    RenderModel::Table(TableData {
        title: "Top Products".to_string(),
        columns: vec!["Name".to_string(), "Sales".to_string(), "Revenue".to_string()],
        rows: snapshot
            .top_entities
            .iter()
            .map(|e| vec![e.name.clone(), e.sales_count.to_string(), format!("{:.2}", e.revenue)])
            .collect(),
    })
}

fn render_recent_activity(snapshot: &AnalyticsSnapshot, range: &DateRange) -> RenderModel {
    if snapshot.recent_activity.is_empty() {
        return RenderModel::empty(
            "Recent Activity",
            &format!("No activity between {} and {}", range.start(), range.end()),
        );
    }

    RenderModel::Table(TableData {
        title: "Recent Activity".to_string(),
        columns: vec![
            "Name".to_string(),
            "Kind".to_string(),
            "Status".to_string(),
            "When".to_string(),
        ],
        rows: snapshot
            .recent_activity
            .iter()
            .map(|a| {
                vec![
                    a.name.clone(),
                    a.kind.label().to_string(),
                    a.status.clone(),
                    a.at.format("%Y-%m-%d %H:%M").to_string(),
                ]
            })
            .collect(),
    })
}

fn share_chart(title: &str, kind: ChartKind, shares: &[Share]) -> RenderModel {
    if shares.is_empty() {
        return RenderModel::empty(title, "Nothing to break down");
    }

    let points = shares
        .iter()
        .map(|s| SeriesPoint::new(s.label.clone(), s.count as f64))
        .collect();

    RenderModel::Chart(ChartData {
        title: title.to_string(),
        unit: None,
        kind,
        y_min: None,
        fraction_digits: Some(0),
        series: vec![SeriesData::new("count", "Count", None, points)],
    })
}

fn render_category_distribution(snapshot: &AnalyticsSnapshot, _range: &DateRange) -> RenderModel {
    share_chart("Categories", ChartKind::Donut, &snapshot.category_distribution)
}

fn render_status_distribution(snapshot: &AnalyticsSnapshot, _range: &DateRange) -> RenderModel {
    share_chart("Status Breakdown", ChartKind::Bar, &snapshot.status_distribution)
}

fn render_generic_time_series(snapshot: &AnalyticsSnapshot, range: &DateRange) -> RenderModel {
    let title = format!("Revenue up to {}", range.end());
    if snapshot.monthly_revenue.iter().all(|v| *v == 0.0) {
        return RenderModel::empty(&title, "No data points");
    }

    let mut cumulative = [0.0; MONTHS];
    let mut running = 0.0;
    for (i, value) in snapshot.monthly_revenue.iter().enumerate() {
        running += value;
        cumulative[i] = running;
    }

    RenderModel::Chart(ChartData {
        title,
        unit: Some("USD".to_string()),
        kind: ChartKind::Line,
        y_min: Some(0.0),
        fraction_digits: Some(0),
        series: vec![
            SeriesData::new(
                "monthly",
                "Monthly",
                None,
                month_points(snapshot, &snapshot.monthly_revenue),
            ),
            SeriesData::new("cumulative", "Cumulative", None, month_points(snapshot, &cumulative)),
        ],
    })
}
