// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod file_view_repository;
pub mod http_metric_source;
pub mod static_metric_source;
