// Domain error taxonomy
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("invalid widget kind: {0}")]
    InvalidKind(String),
    #[error("unknown widget: {0}")]
    UnknownWidget(String),
}

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("view name must not be empty")]
    EmptyName,
    #[error("the default view cannot be deleted")]
    ProtectedView,
    #[error("unknown view: {0}")]
    UnknownView(String),
    #[error("view storage failure: {0}")]
    Storage(#[from] anyhow::Error),
    #[error("stored view {id} is corrupt: {source}")]
    Corrupt {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForecastError {
    #[error("forecast needs at least 2 points, got {len}")]
    InsufficientData { len: usize },
    #[error("cannot forecast {requested} periods, at most {max} allowed")]
    TooManyPeriods { requested: usize, max: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateRangeError {
    #[error("date range start {start} is after end {end}")]
    Inverted { start: NaiveDate, end: NaiveDate },
}
