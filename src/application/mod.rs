// Application layer - Use cases and the seams adapters plug into
pub mod aggregator;
pub mod anomaly_detector;
pub mod controller;
pub mod dashboard_page;
pub mod forecaster;
pub mod layout_engine;
pub mod metric_source;
pub mod revenue_estimator;
pub mod view_repository;
pub mod view_store;
pub mod widget_registry;
