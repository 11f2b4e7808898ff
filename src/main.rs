// Main entry point - Dependency injection and server setup
use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use storefront_dashboard::application::aggregator::AnalyticsAggregator;
use storefront_dashboard::application::anomaly_detector::AnomalyDetector;
use storefront_dashboard::application::controller::{DashboardController, Workspace};
use storefront_dashboard::application::forecaster::TrendForecaster;
use storefront_dashboard::application::layout_engine::LayoutEngine;
use storefront_dashboard::application::metric_source::MetricSource;
use storefront_dashboard::application::revenue_estimator::SyntheticRevenueEstimator;
use storefront_dashboard::application::view_store::ViewStore;
use storefront_dashboard::application::widget_registry::WidgetRegistry;
use storefront_dashboard::domain::analytics::DateRange;
use storefront_dashboard::infrastructure::config::{MetricSourceSettings, SourceMode, load_settings};
use storefront_dashboard::infrastructure::file_view_repository::FileViewRepository;
use storefront_dashboard::infrastructure::http_metric_source::HttpMetricSource;
use storefront_dashboard::infrastructure::static_metric_source::StaticMetricSource;
use storefront_dashboard::presentation::app_state::AppState;
use storefront_dashboard::presentation::router::build_router;

fn build_metric_source(settings: &MetricSourceSettings) -> anyhow::Result<Arc<dyn MetricSource>> {
    match settings.mode {
        SourceMode::Static => {
            tracing::info!("Using built-in demo catalog");
            Ok(Arc::new(StaticMetricSource::demo()))
        }
        SourceMode::Http => {
            let base_url = settings
                .base_url
                .clone()
                .context("metric_source.base_url is required in http mode")?;
            tracing::info!("Reading storefront data from {}", base_url);
            Ok(Arc::new(HttpMetricSource::new(
                base_url,
                settings.token.clone(),
                settings.timeout(),
            )?))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let settings = load_settings()?;

    // Create adapters (infrastructure layer)
    let source = build_metric_source(&settings.metric_source)?;
    let views = FileViewRepository::open(&settings.views.storage_dir)?;

    // Create services (application layer)
    let aggregator = AnalyticsAggregator::new(
        source,
        Arc::new(SyntheticRevenueEstimator::new(settings.aggregator.seed)),
        settings.aggregator.to_options(),
    );
    let workspace = Workspace {
        layout: LayoutEngine::new(Arc::new(WidgetRegistry::standard())),
        views: ViewStore::new(Box::new(views)),
    };
    let controller = DashboardController::new(
        aggregator,
        TrendForecaster::default(),
        workspace,
        DateRange::default(),
        settings.controller.auto_refresh_interval(),
    );

    let outcome = controller.mount(settings.controller.auto_refresh).await;
    tracing::info!("Initial load finished: {:?}", outcome);

    // Create application state
    let state = Arc::new(AppState {
        controller: controller.clone(),
        anomaly_detector: AnomalyDetector::new(settings.analytics.anomaly_threshold),
        forecast_periods: settings.analytics.forecast_periods,
    });

    // Build router (presentation layer)
    let router = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(settings.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", settings.server.bind))?;
    tracing::info!("Starting storefront-dashboard on {}", settings.server.bind);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    controller.teardown();
    Ok(())
}
