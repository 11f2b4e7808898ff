// Route table
use crate::presentation::app_state::AppState;
use crate::presentation::handlers;
use axum::{
    Router,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(handlers::health_check))
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/dashboard/events", get(handlers::dashboard_events))
        .route("/dashboard/refresh", post(handlers::refresh_dashboard))
        .route("/dashboard/retry", post(handlers::retry_dashboard))
        .route("/dashboard/auto-refresh", put(handlers::set_auto_refresh))
        .route("/dashboard/date-range", put(handlers::set_date_range))
        .route("/widgets", get(handlers::list_widgets).post(handlers::add_widget))
        .route("/widgets/:id", delete(handlers::remove_widget))
        .route("/widgets/:id/visible", put(handlers::set_widget_visible))
        .route("/widgets/:id/expand", post(handlers::toggle_widget_expanded))
        .route("/widgets/:id/move", post(handlers::move_widget))
        .route("/widgets/:id/title", put(handlers::rename_widget))
        .route("/widgets/:id/size", put(handlers::resize_widget))
        .route("/views", get(handlers::list_views).post(handlers::save_view))
        .route("/views/:id", delete(handlers::delete_view))
        .route("/views/:id/activate", post(handlers::activate_view))
        .route("/analytics/forecast", get(handlers::get_forecast))
        .route("/analytics/anomalies", get(handlers::get_anomalies))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
