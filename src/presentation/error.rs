// Error -> HTTP response mapping
use crate::domain::error::{DateRangeError, ForecastError, LayoutError, ViewError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub enum AppError {
    Layout(LayoutError),
    View(ViewError),
    Forecast(ForecastError),
    DateRange(DateRangeError),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Layout(LayoutError::InvalidKind(_)) => (StatusCode::BAD_REQUEST, "INVALID_KIND"),
            AppError::Layout(LayoutError::UnknownWidget(_)) => (StatusCode::NOT_FOUND, "UNKNOWN_WIDGET"),
            AppError::View(ViewError::EmptyName) => (StatusCode::BAD_REQUEST, "EMPTY_NAME"),
            AppError::View(ViewError::UnknownView(_)) => (StatusCode::NOT_FOUND, "UNKNOWN_VIEW"),
            AppError::View(ViewError::ProtectedView) => (StatusCode::CONFLICT, "PROTECTED_VIEW"),
            AppError::View(ViewError::Storage(_) | ViewError::Corrupt { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
            }
            AppError::Forecast(ForecastError::InsufficientData { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_DATA")
            }
            AppError::Forecast(ForecastError::TooManyPeriods { .. }) => (StatusCode::BAD_REQUEST, "INVALID_PERIODS"),
            AppError::DateRange(DateRangeError::Inverted { .. }) => (StatusCode::BAD_REQUEST, "INVALID_DATE_RANGE"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match &self {
            AppError::Layout(e) => e.to_string(),
            AppError::View(e) => e.to_string(),
            AppError::Forecast(e) => e.to_string(),
            AppError::DateRange(e) => e.to_string(),
        };
        if status.is_server_error() {
            tracing::error!("{}", message);
        }

        (status, Json(ApiError { code, message })).into_response()
    }
}

impl From<LayoutError> for AppError {
    fn from(err: LayoutError) -> Self {
        AppError::Layout(err)
    }
}

impl From<ViewError> for AppError {
    fn from(err: ViewError) -> Self {
        AppError::View(err)
    }
}

impl From<ForecastError> for AppError {
    fn from(err: ForecastError) -> Self {
        AppError::Forecast(err)
    }
}

impl From<DateRangeError> for AppError {
    fn from(err: DateRangeError) -> Self {
        AppError::DateRange(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::from(LayoutError::InvalidKind("x".into())), StatusCode::BAD_REQUEST),
            (AppError::from(LayoutError::UnknownWidget("w9".into())), StatusCode::NOT_FOUND),
            (AppError::from(ViewError::ProtectedView), StatusCode::CONFLICT),
            (AppError::from(ViewError::Storage(anyhow::anyhow!("disk full"))), StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::from(ForecastError::InsufficientData { len: 1 }), StatusCode::UNPROCESSABLE_ENTITY),
            (
                AppError::from(ForecastError::TooManyPeriods { requested: 500, max: 120 }),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
