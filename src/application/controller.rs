// Dashboard controller - refresh state machine, auto-refresh timer and layout mediation
use crate::application::aggregator::AnalyticsAggregator;
use crate::application::anomaly_detector::{Anomaly, AnomalyDetector};
use crate::application::forecaster::TrendForecaster;
use crate::application::layout_engine::LayoutEngine;
use crate::application::view_store::ViewStore;
use crate::domain::analytics::{AnalyticsSnapshot, DateRange};
use crate::domain::error::ForecastError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

pub const DEFAULT_AUTO_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardStatus {
    Idle,
    Loading,
    Ready,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RefreshTrigger {
    Mount,
    Manual,
    AutoRefresh,
    DateRangeChange,
    Retry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RefreshOutcome {
    Ready,
    Failed,
    /// Another refresh was running; this request was dropped.
    InFlight,
    /// The current status does not accept this trigger.
    Rejected,
    /// The controller was torn down while fetching; the result was discarded.
    Stale,
    TornDown,
}

/// Whether a refresh may start from `status`. Leaving `Error` takes an
/// explicit retry, and retry means nothing anywhere else.
fn accepts(status: DashboardStatus, trigger: RefreshTrigger) -> bool {
    match trigger {
        RefreshTrigger::Retry => status == DashboardStatus::Error,
        _ => status != DashboardStatus::Error,
    }
}

/// What observers see after every change.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardState {
    pub status: DashboardStatus,
    pub snapshot: Arc<AnalyticsSnapshot>,
    pub last_error: Option<String>,
    pub date_range: DateRange,
    pub generation: u64,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub auto_refresh: bool,
    pub active_view_id: String,
    pub layout_revision: u64,
}

/// The single-editor layout state: current arrangement plus saved views.
pub struct Workspace {
    pub layout: LayoutEngine,
    pub views: ViewStore,
}

#[derive(Clone)]
pub struct DashboardController {
    inner: Arc<Inner>,
}

struct Inner {
    aggregator: AnalyticsAggregator,
    forecaster: TrendForecaster,
    state: watch::Sender<DashboardState>,
    in_flight: AtomicBool,
    generation: AtomicU64,
    torn_down: AtomicBool,
    auto_refresh_interval: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
    workspace: tokio::sync::Mutex<Workspace>,
}

/// Releases the in-flight flag even when the refresh future is dropped
/// mid-fetch, restoring the status it started from.
struct InFlightGuard<'a> {
    inner: &'a Inner,
    previous: DashboardStatus,
    settled: bool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let previous = self.previous;
            self.inner.state.send_modify(|s| {
                if s.status == DashboardStatus::Loading {
                    s.status = previous;
                }
            });
        }
        self.inner.in_flight.store(false, Ordering::Release);
    }
}

impl DashboardController {
    pub fn new(
        aggregator: AnalyticsAggregator,
        forecaster: TrendForecaster,
        workspace: Workspace,
        date_range: DateRange,
        auto_refresh_interval: Duration,
    ) -> Self {
        let initial = DashboardState {
            status: DashboardStatus::Idle,
            snapshot: Arc::new(AnalyticsSnapshot::empty()),
            last_error: None,
            date_range,
            generation: 0,
            refreshed_at: None,
            auto_refresh: false,
            active_view_id: workspace.views.active_view_id().to_string(),
            layout_revision: 0,
        };
        let (state, _) = watch::channel(initial);

        Self {
            inner: Arc::new(Inner {
                aggregator,
                forecaster,
                state,
                in_flight: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                torn_down: AtomicBool::new(false),
                auto_refresh_interval,
                timer: Mutex::new(None),
                workspace: tokio::sync::Mutex::new(workspace),
            }),
        }
    }

    pub fn state(&self) -> DashboardState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.inner.state.subscribe()
    }

    /// Initial load, optionally arming auto-refresh.
    pub async fn mount(&self, auto_refresh: bool) -> RefreshOutcome {
        if auto_refresh {
            self.set_auto_refresh(true);
        }
        self.inner.run_refresh(RefreshTrigger::Mount, None).await
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        self.inner.run_refresh(RefreshTrigger::Manual, None).await
    }

    /// The only way out of `Error`.
    pub async fn retry(&self) -> RefreshOutcome {
        self.inner.run_refresh(RefreshTrigger::Retry, None).await
    }

    /// Refresh with a new range. The range is committed only when the refresh
    /// is admitted, or in `Error` where it is kept for the next retry. While
    /// another refresh is in flight the change is dropped along with it.
    pub async fn set_date_range(&self, range: DateRange) -> RefreshOutcome {
        self.inner
            .run_refresh(RefreshTrigger::DateRangeChange, Some(range))
            .await
    }

    /// Cancel any running timer, then arm a fresh one if `enabled`.
    pub fn set_auto_refresh(&self, enabled: bool) {
        let mut timer = self.inner.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = timer.take() {
            handle.abort();
        }

        let armed = enabled && !self.inner.torn_down.load(Ordering::Acquire);
        if armed {
            *timer = Some(spawn_timer(&self.inner));
        }
        drop(timer);

        self.inner.state.send_modify(|s| s.auto_refresh = armed);
        tracing::info!("Auto-refresh {}", if armed { "enabled" } else { "disabled" });
    }

    /// Stop the timer and invalidate any fetch still running.
    pub fn teardown(&self) {
        self.inner.torn_down.store(true, Ordering::Release);
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        if let Some(handle) = self
            .inner
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
        self.inner.state.send_modify(|s| {
            s.auto_refresh = false;
            s.status = DashboardStatus::Idle;
        });
        tracing::info!("Dashboard controller torn down");
    }

    /// Read the layout state without notifying observers.
    pub async fn read_workspace<R>(&self, f: impl FnOnce(&Workspace) -> R) -> R {
        let workspace = self.inner.workspace.lock().await;
        f(&workspace)
    }

    /// Apply a layout or view mutation. Observers are notified only when the
    /// mutation succeeds.
    pub async fn edit_workspace<T, E>(
        &self,
        f: impl FnOnce(&mut Workspace) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut workspace = self.inner.workspace.lock().await;
        let value = f(&mut workspace)?;
        let active_view_id = workspace.views.active_view_id().to_string();
        drop(workspace);

        self.inner.state.send_modify(|s| {
            s.layout_revision += 1;
            s.active_view_id = active_view_id;
        });
        Ok(value)
    }

    /// Project the current monthly revenue forward.
    pub fn forecast(&self, periods: usize) -> Result<Vec<f64>, ForecastError> {
        let snapshot = self.inner.state.borrow().snapshot.clone();
        self.inner.forecaster.forecast(&snapshot.monthly_revenue, periods)
    }

    /// Unusual months in the current monthly revenue.
    pub fn anomalies(&self, detector: &AnomalyDetector) -> Vec<Anomaly> {
        let snapshot = self.inner.state.borrow().snapshot.clone();
        detector.detect(&snapshot.monthly_revenue)
    }
}

impl Inner {
    async fn run_refresh(&self, trigger: RefreshTrigger, new_range: Option<DateRange>) -> RefreshOutcome {
        if self.torn_down.load(Ordering::Acquire) {
            return RefreshOutcome::TornDown;
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Refresh ({:?}) dropped: one is already in flight", trigger);
            return RefreshOutcome::InFlight;
        }

        let previous = self.state.borrow().status;
        let mut guard = InFlightGuard {
            inner: self,
            previous,
            settled: false,
        };
        if !accepts(previous, trigger) {
            tracing::debug!("Refresh ({:?}) rejected in {:?}", trigger, previous);
            guard.settled = true;
            if let (Some(range), DashboardStatus::Error) = (new_range, previous) {
                self.state.send_modify(|s| s.date_range = range);
            }
            return RefreshOutcome::Rejected;
        }

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let mut range = DateRange::default();
        self.state.send_modify(|s| {
            if let Some(new_range) = new_range {
                s.date_range = new_range;
            }
            s.status = DashboardStatus::Loading;
            s.generation = generation;
            range = s.date_range;
        });
        tracing::info!("Refresh #{} started ({:?})", generation, trigger);

        let result = self.aggregator.try_compute(&range).await;
        guard.settled = true;

        if self.torn_down.load(Ordering::Acquire) || self.generation.load(Ordering::Acquire) != generation {
            tracing::debug!("Discarding stale result of refresh #{}", generation);
            return RefreshOutcome::Stale;
        }

        match result {
            Ok(snapshot) => {
                self.state.send_modify(|s| {
                    s.status = DashboardStatus::Ready;
                    s.snapshot = Arc::new(snapshot);
                    s.last_error = None;
                    s.refreshed_at = Some(Utc::now());
                });
                tracing::info!("Refresh #{} ready", generation);
                RefreshOutcome::Ready
            }
            Err(e) => {
                // The last good snapshot stays rendered.
                let message = format!("{:#}", e);
                tracing::warn!("Refresh #{} failed: {}", generation, message);
                self.state.send_modify(|s| {
                    s.status = DashboardStatus::Error;
                    s.last_error = Some(message);
                });
                RefreshOutcome::Failed
            }
        }
    }
}

/// Each tick spawns its refresh so cancelling the timer never cancels a fetch
/// already under way. The task holds only a weak reference to the controller.
fn spawn_timer(inner: &Arc<Inner>) -> JoinHandle<()> {
    let weak: Weak<Inner> = Arc::downgrade(inner);
    let period = inner.auto_refresh_interval;

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let Some(inner) = weak.upgrade() else {
                break;
            };
            tokio::spawn(async move {
                let outcome = inner.run_refresh(RefreshTrigger::AutoRefresh, None).await;
                tracing::debug!("Auto-refresh tick: {:?}", outcome);
            });
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::aggregator::AggregatorOptions;
    use crate::application::forecaster::FixedJitter;
    use crate::application::metric_source::MetricSource;
    use crate::application::revenue_estimator::{FixedRevenueEstimator, SyntheticRevenueEstimator};
    use crate::application::view_repository::InMemoryViewRepository;
    use crate::application::widget_registry::WidgetRegistry;
    use crate::domain::analytics::{Entity, EntityKind, MONTHS, TrafficStats};
    use crate::domain::error::LayoutError;
    use crate::domain::widget::MoveDirection;
    use crate::infrastructure::static_metric_source::StaticMetricSource;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use tokio::sync::Semaphore;

    /// Blocks every fetch until permits are added.
    struct GatedSource {
        inner: StaticMetricSource,
        gate: Arc<Semaphore>,
    }

    #[async_trait]
    impl MetricSource for GatedSource {
        async fn list_entities(&self, kind: EntityKind) -> anyhow::Result<Vec<Entity>> {
            let _permit = self.gate.acquire().await?;
            self.inner.list_entities(kind).await
        }

        async fn traffic_stats(&self, range: &DateRange) -> anyhow::Result<TrafficStats> {
            self.inner.traffic_stats(range).await
        }
    }

    fn catalog() -> StaticMetricSource {
        StaticMetricSource::new(
            vec![
                Entity::new("p1", "Chair", "furniture", 100.0, 50, "active"),
                Entity::new("p2", "Lamp", "lighting", 40.0, 5, "active"),
            ],
            vec![Entity::new("s1", "Assembly", "support", 60.0, 12, "active")],
            TrafficStats { visits: 100, orders: 4 },
        )
    }

    fn range() -> DateRange {
        DateRange::trailing_days(NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(), 30)
    }

    fn controller_with(source: Arc<dyn MetricSource>) -> DashboardController {
        let aggregator = AnalyticsAggregator::new(
            source,
            Arc::new(SyntheticRevenueEstimator::new(Some(9))),
            AggregatorOptions::default(),
        );
        let workspace = Workspace {
            layout: LayoutEngine::new(Arc::new(WidgetRegistry::standard())),
            views: ViewStore::new(Box::new(InMemoryViewRepository::new())),
        };
        DashboardController::new(
            aggregator,
            TrendForecaster::new(Box::new(FixedJitter(1.0))),
            workspace,
            range(),
            DEFAULT_AUTO_REFRESH_INTERVAL,
        )
    }

    #[test]
    fn test_transition_table() {
        use DashboardStatus::*;
        use RefreshTrigger::*;

        assert!(accepts(Idle, Mount));
        assert!(accepts(Ready, Manual));
        assert!(accepts(Ready, AutoRefresh));
        assert!(!accepts(Error, Manual));
        assert!(!accepts(Error, AutoRefresh));
        assert!(!accepts(Error, DateRangeChange));
        assert!(accepts(Error, Retry));
        assert!(!accepts(Ready, Retry));
    }

    #[tokio::test]
    async fn test_mount_reaches_ready() {
        let controller = controller_with(Arc::new(catalog()));
        assert_eq!(controller.state().status, DashboardStatus::Idle);

        assert_eq!(controller.mount(false).await, RefreshOutcome::Ready);

        let state = controller.state();
        assert_eq!(state.status, DashboardStatus::Ready);
        assert_eq!(state.snapshot.product_count, 2);
        assert_eq!(state.generation, 1);
        assert!(state.refreshed_at.is_some());
    }

    #[tokio::test]
    async fn test_failure_requires_explicit_retry() {
        let source = Arc::new(catalog());
        let controller = controller_with(source.clone());
        controller.mount(false).await;
        let rendered = controller.state().snapshot;

        source.set_failing(true);
        assert_eq!(controller.refresh().await, RefreshOutcome::Failed);
        let state = controller.state();
        assert_eq!(state.status, DashboardStatus::Error);
        assert!(state.last_error.is_some());
        assert_eq!(state.snapshot, rendered);

        source.set_failing(false);
        assert_eq!(controller.refresh().await, RefreshOutcome::Rejected);
        assert_eq!(controller.state().status, DashboardStatus::Error);

        assert_eq!(controller.retry().await, RefreshOutcome::Ready);
        let state = controller.state();
        assert_eq!(state.status, DashboardStatus::Ready);
        assert!(state.last_error.is_none());
    }

    #[tokio::test]
    async fn test_overlapping_refresh_is_dropped() {
        let gate = Arc::new(Semaphore::new(0));
        let controller = controller_with(Arc::new(GatedSource {
            inner: catalog(),
            gate: gate.clone(),
        }));
        let mut rx = controller.subscribe();

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.refresh().await })
        };
        rx.wait_for(|s| s.status == DashboardStatus::Loading).await.unwrap();

        assert_eq!(controller.refresh().await, RefreshOutcome::InFlight);
        assert_eq!(controller.retry().await, RefreshOutcome::InFlight);

        gate.add_permits(8);
        assert_eq!(first.await.unwrap(), RefreshOutcome::Ready);
        assert_eq!(controller.state().generation, 1);
    }

    #[tokio::test]
    async fn test_teardown_discards_in_flight_result() {
        let gate = Arc::new(Semaphore::new(0));
        let controller = controller_with(Arc::new(GatedSource {
            inner: catalog(),
            gate: gate.clone(),
        }));
        let mut rx = controller.subscribe();

        let pending = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.refresh().await })
        };
        rx.wait_for(|s| s.status == DashboardStatus::Loading).await.unwrap();

        controller.teardown();
        gate.add_permits(8);

        assert_eq!(pending.await.unwrap(), RefreshOutcome::Stale);
        let state = controller.state();
        assert_eq!(state.status, DashboardStatus::Idle);
        assert!(state.snapshot.is_empty());
        assert_eq!(controller.refresh().await, RefreshOutcome::TornDown);
    }

    #[tokio::test]
    async fn test_dropped_refresh_releases_guard() {
        let gate = Arc::new(Semaphore::new(0));
        let controller = controller_with(Arc::new(GatedSource {
            inner: catalog(),
            gate: gate.clone(),
        }));
        let mut rx = controller.subscribe();

        let pending = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.refresh().await })
        };
        rx.wait_for(|s| s.status == DashboardStatus::Loading).await.unwrap();
        pending.abort();
        let _ = pending.await;

        assert_eq!(controller.state().status, DashboardStatus::Idle);
        gate.add_permits(8);
        assert_eq!(controller.refresh().await, RefreshOutcome::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_refresh_ticks_and_stops() {
        let source = Arc::new(catalog());
        let controller = controller_with(source.clone());

        controller.set_auto_refresh(true);
        controller.set_auto_refresh(true);
        assert!(controller.state().auto_refresh);

        tokio::time::sleep(Duration::from_secs(91)).await;
        tokio::task::yield_now().await;
        assert_eq!(source.fetch_count(), 3);
        assert_eq!(controller.state().status, DashboardStatus::Ready);

        controller.set_auto_refresh(false);
        assert!(!controller.state().auto_refresh);
        tokio::time::sleep(Duration::from_secs(300)).await;
        tokio::task::yield_now().await;
        assert_eq!(source.fetch_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_refresh_does_not_leave_error() {
        let source = Arc::new(catalog());
        let controller = controller_with(source.clone());
        source.set_failing(true);
        controller.mount(true).await;
        assert_eq!(controller.state().status, DashboardStatus::Error);

        source.set_failing(false);
        tokio::time::sleep(Duration::from_secs(95)).await;
        tokio::task::yield_now().await;

        assert_eq!(controller.state().status, DashboardStatus::Error);
        assert_eq!(source.fetch_count(), 1);
        controller.teardown();
    }

    #[tokio::test]
    async fn test_date_range_change_refreshes() {
        let controller = controller_with(Arc::new(catalog()));
        controller.mount(false).await;

        let new_range = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        )
        .unwrap();
        assert_eq!(controller.set_date_range(new_range).await, RefreshOutcome::Ready);

        let state = controller.state();
        assert_eq!(state.date_range, new_range);
        assert_eq!(state.snapshot.month_labels.last().unwrap(), "2025-01");
    }

    #[tokio::test]
    async fn test_date_range_change_during_refresh_is_not_committed() {
        let gate = Arc::new(Semaphore::new(0));
        let controller = controller_with(Arc::new(GatedSource {
            inner: catalog(),
            gate: gate.clone(),
        }));
        let mut rx = controller.subscribe();

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.refresh().await })
        };
        rx.wait_for(|s| s.status == DashboardStatus::Loading).await.unwrap();

        let january = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        )
        .unwrap();
        assert_eq!(controller.set_date_range(january).await, RefreshOutcome::InFlight);
        assert_eq!(controller.state().date_range, range());

        gate.add_permits(8);
        assert_eq!(first.await.unwrap(), RefreshOutcome::Ready);

        let state = controller.state();
        assert_eq!(state.status, DashboardStatus::Ready);
        assert_eq!(state.date_range, range());
        assert_eq!(state.snapshot.month_labels.last().unwrap(), "2026-06");
    }

    #[tokio::test]
    async fn test_date_range_set_in_error_is_used_by_retry() {
        let source = Arc::new(catalog());
        let controller = controller_with(source.clone());
        source.set_failing(true);
        controller.mount(false).await;

        let january = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        )
        .unwrap();
        assert_eq!(controller.set_date_range(january).await, RefreshOutcome::Rejected);
        assert_eq!(controller.state().date_range, january);

        source.set_failing(false);
        assert_eq!(controller.retry().await, RefreshOutcome::Ready);
        assert_eq!(controller.state().snapshot.month_labels.last().unwrap(), "2025-01");
    }

    #[tokio::test]
    async fn test_failed_workspace_edit_does_not_notify() {
        let controller = controller_with(Arc::new(catalog()));
        let mut rx = controller.subscribe();
        let _ = rx.borrow_and_update();

        let err = controller
            .edit_workspace(|ws| ws.layout.remove("w42"))
            .await
            .unwrap_err();

        assert_eq!(err, LayoutError::UnknownWidget("w42".to_string()));
        assert!(!rx.has_changed().unwrap());
        assert_eq!(controller.state().layout_revision, 0);
    }

    #[tokio::test]
    async fn test_workspace_edits_notify_observers() {
        let controller = controller_with(Arc::new(catalog()));
        let mut rx = controller.subscribe();
        let _ = rx.borrow_and_update();

        let moved = controller
            .edit_workspace(|ws| ws.layout.move_widget("w2", MoveDirection::Up))
            .await
            .unwrap();
        assert!(moved);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().layout_revision, 1);

        let view = controller
            .edit_workspace(|ws| ws.views.save("Mine", &ws.layout))
            .await
            .unwrap();
        assert_eq!(controller.state().active_view_id, view.id);

        let first = controller
            .read_workspace(|ws| ws.layout.visible_widgets()[0].id.clone())
            .await;
        assert_eq!(first, "w2");
    }

    #[tokio::test]
    async fn test_forecast_and_anomalies_use_current_snapshot() {
        let mut series = [100.0; MONTHS];
        series[10] = 120.0;
        series[11] = 1000.0;
        let aggregator = AnalyticsAggregator::new(
            Arc::new(catalog()),
            Arc::new(FixedRevenueEstimator::new(series)),
            AggregatorOptions::default(),
        );
        let controller = DashboardController::new(
            aggregator,
            TrendForecaster::new(Box::new(FixedJitter(1.0))),
            Workspace {
                layout: LayoutEngine::new(Arc::new(WidgetRegistry::standard())),
                views: ViewStore::new(Box::new(InMemoryViewRepository::new())),
            },
            range(),
            DEFAULT_AUTO_REFRESH_INTERVAL,
        );
        controller.mount(false).await;

        assert_eq!(controller.forecast(2).unwrap(), vec![1880.0, 2760.0]);
        let anomalies = controller.anomalies(&AnomalyDetector::default());
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].index, 11);
    }
}
