// Widget domain model
use super::error::LayoutError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of panels the dashboard knows how to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetKind {
    StatSummary,
    RevenueTrend,
    PerformanceIndicators,
    TopEntities,
    RecentActivity,
    CategoryDistribution,
    StatusDistribution,
    GenericTimeSeries,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 8] = [
        WidgetKind::StatSummary,
        WidgetKind::RevenueTrend,
        WidgetKind::PerformanceIndicators,
        WidgetKind::TopEntities,
        WidgetKind::RecentActivity,
        WidgetKind::CategoryDistribution,
        WidgetKind::StatusDistribution,
        WidgetKind::GenericTimeSeries,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetKind::StatSummary => "stat-summary",
            WidgetKind::RevenueTrend => "revenue-trend",
            WidgetKind::PerformanceIndicators => "performance-indicators",
            WidgetKind::TopEntities => "top-entities",
            WidgetKind::RecentActivity => "recent-activity",
            WidgetKind::CategoryDistribution => "category-distribution",
            WidgetKind::StatusDistribution => "status-distribution",
            WidgetKind::GenericTimeSeries => "generic-time-series",
        }
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WidgetKind {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WidgetKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| LayoutError::InvalidKind(s.to_string()))
    }
}

/// Layout hint, not pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetSize {
    Small,
    Medium,
    Large,
    Full,
}

impl WidgetSize {
    /// Column span on a four-column grid.
    pub fn columns(&self) -> u8 {
        match self {
            WidgetSize::Small => 1,
            WidgetSize::Medium => 2,
            WidgetSize::Large => 3,
            WidgetSize::Full => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub id: String,
    pub kind: WidgetKind,
    pub title: String,
    pub size: WidgetSize,
    pub position: i64,
    pub visible: bool,
    pub expanded: bool,
}

/// Resolved grid footprint of a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub columns: u8,
    pub rows: u8,
}

impl Widget {
    pub fn new(id: String, kind: WidgetKind, title: String, size: WidgetSize, position: i64) -> Self {
        Self {
            id,
            kind,
            title,
            size,
            position,
            visible: true,
            expanded: false,
        }
    }

    /// Expansion overrides `size`: full width and double height.
    pub fn effective_span(&self) -> Span {
        if self.expanded {
            Span {
                columns: WidgetSize::Full.columns(),
                rows: 2,
            }
        } else {
            Span {
                columns: self.size.columns(),
                rows: 1,
            }
        }
    }
}
