// HTTP request handlers
use crate::application::anomaly_detector::{Anomaly, AnomalyDetector};
use crate::application::controller::{DashboardState, RefreshOutcome};
use crate::application::dashboard_page;
use crate::application::layout_engine::LayoutEngine;
use crate::application::view_store::SwitchOutcome;
use crate::domain::analytics::DateRange;
use crate::domain::dashboard::Dashboard;
use crate::domain::error::LayoutError;
use crate::domain::view::{View, ViewSummary};
use crate::domain::widget::{MoveDirection, Widget, WidgetKind, WidgetSize};
use crate::presentation::app_state::AppState;
use crate::presentation::error::AppError;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use chrono::NaiveDate;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

type Shared = State<Arc<AppState>>;

#[derive(Serialize)]
pub struct RefreshResponse {
    pub outcome: RefreshOutcome,
    pub state: DashboardState,
}

#[derive(Deserialize)]
pub struct AutoRefreshRequest {
    pub enabled: bool,
}

#[derive(Deserialize)]
pub struct DateRangeRequest {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Deserialize)]
pub struct AddWidgetRequest {
    pub kind: String,
    #[serde(default)]
    pub duplicate: bool,
    pub title: Option<String>,
}

#[derive(Deserialize)]
pub struct VisibleRequest {
    pub visible: bool,
}

#[derive(Deserialize)]
pub struct MoveRequest {
    pub direction: MoveDirection,
}

#[derive(Serialize)]
pub struct MoveResponse {
    pub moved: bool,
    pub widget: Widget,
}

#[derive(Deserialize)]
pub struct TitleRequest {
    pub title: String,
}

#[derive(Deserialize)]
pub struct SizeRequest {
    pub size: WidgetSize,
}

#[derive(Deserialize)]
pub struct SaveViewRequest {
    pub name: String,
}

#[derive(Serialize)]
pub struct ActivateResponse {
    pub outcome: SwitchOutcome,
    pub active_view_id: String,
}

#[derive(Deserialize)]
pub struct ForecastQuery {
    pub periods: Option<usize>,
}

#[derive(Serialize)]
pub struct ForecastResponse {
    pub periods: usize,
    pub forecast: Vec<f64>,
}

#[derive(Deserialize)]
pub struct AnomalyQuery {
    pub threshold: Option<f64>,
}

#[derive(Serialize)]
pub struct AnomalyResponse {
    pub threshold: f64,
    pub anomalies: Vec<Anomaly>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Current state plus one rendered panel per visible widget
pub async fn get_dashboard(State(state): Shared) -> Json<Dashboard<DashboardState>> {
    Json(dashboard_page::current(&state.controller).await)
}

/// Push every state change to the client as a `state` event
pub async fn dashboard_events(
    State(state): Shared,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.controller.subscribe();
    let stream = async_stream::stream! {
        loop {
            let current = rx.borrow_and_update().clone();
            let data = serde_json::to_string(&current).unwrap_or_default();
            yield Ok(Event::default().event("state").data(data));

            if rx.changed().await.is_err() {
                break;
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

pub async fn refresh_dashboard(State(state): Shared) -> Json<RefreshResponse> {
    let outcome = state.controller.refresh().await;
    Json(RefreshResponse {
        outcome,
        state: state.controller.state(),
    })
}

pub async fn retry_dashboard(State(state): Shared) -> Json<RefreshResponse> {
    let outcome = state.controller.retry().await;
    Json(RefreshResponse {
        outcome,
        state: state.controller.state(),
    })
}

pub async fn set_auto_refresh(
    State(state): Shared,
    Json(body): Json<AutoRefreshRequest>,
) -> Json<DashboardState> {
    state.controller.set_auto_refresh(body.enabled);
    Json(state.controller.state())
}

pub async fn set_date_range(
    State(state): Shared,
    Json(body): Json<DateRangeRequest>,
) -> Result<Json<RefreshResponse>, AppError> {
    let range = DateRange::new(body.start, body.end)?;
    let outcome = state.controller.set_date_range(range).await;
    Ok(Json(RefreshResponse {
        outcome,
        state: state.controller.state(),
    }))
}

/// Every widget in the layout, hidden ones included
pub async fn list_widgets(State(state): Shared) -> Json<Vec<Widget>> {
    Json(state.controller.read_workspace(|w| w.layout.snapshot()).await)
}

pub async fn add_widget(
    State(state): Shared,
    Json(body): Json<AddWidgetRequest>,
) -> Result<(StatusCode, Json<Widget>), AppError> {
    let kind: WidgetKind = body.kind.parse()?;
    let widget = state
        .controller
        .edit_workspace(|w| {
            let id = if body.duplicate {
                w.layout.add_duplicate(kind, body.title)
            } else {
                let id = w.layout.add(kind);
                if let Some(title) = body.title {
                    w.layout.rename(&id, &title)?;
                }
                id
            };
            find_widget(&w.layout, &id)
        })
        .await?;

    Ok((StatusCode::CREATED, Json(widget)))
}

pub async fn remove_widget(
    State(state): Shared,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.controller.edit_workspace(|w| w.layout.remove(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_widget_visible(
    State(state): Shared,
    Path(id): Path<String>,
    Json(body): Json<VisibleRequest>,
) -> Result<Json<Widget>, AppError> {
    let widget = state
        .controller
        .edit_workspace(|w| {
            w.layout.set_visible(&id, body.visible)?;
            find_widget(&w.layout, &id)
        })
        .await?;
    Ok(Json(widget))
}

pub async fn toggle_widget_expanded(
    State(state): Shared,
    Path(id): Path<String>,
) -> Result<Json<Widget>, AppError> {
    let widget = state
        .controller
        .edit_workspace(|w| {
            w.layout.toggle_expanded(&id)?;
            find_widget(&w.layout, &id)
        })
        .await?;
    Ok(Json(widget))
}

pub async fn move_widget(
    State(state): Shared,
    Path(id): Path<String>,
    Json(body): Json<MoveRequest>,
) -> Result<Json<MoveResponse>, AppError> {
    let response = state
        .controller
        .edit_workspace(|w| {
            let moved = w.layout.move_widget(&id, body.direction)?;
            Ok::<_, LayoutError>(MoveResponse {
                moved,
                widget: find_widget(&w.layout, &id)?,
            })
        })
        .await?;
    Ok(Json(response))
}

pub async fn rename_widget(
    State(state): Shared,
    Path(id): Path<String>,
    Json(body): Json<TitleRequest>,
) -> Result<Json<Widget>, AppError> {
    let widget = state
        .controller
        .edit_workspace(|w| {
            w.layout.rename(&id, &body.title)?;
            find_widget(&w.layout, &id)
        })
        .await?;
    Ok(Json(widget))
}

pub async fn resize_widget(
    State(state): Shared,
    Path(id): Path<String>,
    Json(body): Json<SizeRequest>,
) -> Result<Json<Widget>, AppError> {
    let widget = state
        .controller
        .edit_workspace(|w| {
            w.layout.resize(&id, body.size)?;
            find_widget(&w.layout, &id)
        })
        .await?;
    Ok(Json(widget))
}

pub async fn list_views(State(state): Shared) -> Result<Json<Vec<ViewSummary>>, AppError> {
    let views = state
        .controller
        .read_workspace(|w| w.views.list(&w.layout))
        .await?;
    Ok(Json(views))
}

pub async fn save_view(
    State(state): Shared,
    Json(body): Json<SaveViewRequest>,
) -> Result<(StatusCode, Json<View>), AppError> {
    let view = state
        .controller
        .edit_workspace(|w| w.views.save(&body.name, &w.layout))
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn activate_view(
    State(state): Shared,
    Path(id): Path<String>,
) -> Result<Json<ActivateResponse>, AppError> {
    let response = state
        .controller
        .edit_workspace(|w| {
            let outcome = w.views.switch(&id, &mut w.layout)?;
            Ok::<_, AppError>(ActivateResponse {
                outcome,
                active_view_id: w.views.active_view_id().to_string(),
            })
        })
        .await?;
    Ok(Json(response))
}

pub async fn delete_view(
    State(state): Shared,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .controller
        .edit_workspace(|w| w.views.delete(&id, &mut w.layout))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_forecast(
    State(state): Shared,
    Query(query): Query<ForecastQuery>,
) -> Result<Json<ForecastResponse>, AppError> {
    let periods = query.periods.unwrap_or(state.forecast_periods);
    let forecast = state.controller.forecast(periods)?;
    Ok(Json(ForecastResponse { periods, forecast }))
}

pub async fn get_anomalies(
    State(state): Shared,
    Query(query): Query<AnomalyQuery>,
) -> Json<AnomalyResponse> {
    let detector = query
        .threshold
        .map(AnomalyDetector::new)
        .unwrap_or(state.anomaly_detector);
    Json(AnomalyResponse {
        threshold: detector.threshold(),
        anomalies: state.controller.anomalies(&detector),
    })
}

fn find_widget(layout: &LayoutEngine, id: &str) -> Result<Widget, LayoutError> {
    layout
        .widget(id)
        .cloned()
        .ok_or_else(|| LayoutError::UnknownWidget(id.to_string()))
}
