// Application state for HTTP handlers
use crate::application::anomaly_detector::AnomalyDetector;
use crate::application::controller::DashboardController;

#[derive(Clone)]
pub struct AppState {
    pub controller: DashboardController,
    pub anomaly_detector: AnomalyDetector,
    pub forecast_periods: usize,
}
