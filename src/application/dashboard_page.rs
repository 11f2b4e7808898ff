// Dashboard page composition - visible widgets rendered against the current snapshot
use crate::application::controller::{DashboardController, DashboardState};
use crate::application::layout_engine::LayoutEngine;
use crate::domain::dashboard::{Dashboard, Panel};

/// One panel per visible widget, in render order.
pub fn compose(state: DashboardState, layout: &LayoutEngine) -> Dashboard<DashboardState> {
    let panels = layout
        .visible_widgets()
        .into_iter()
        .map(|widget| Panel {
            span: widget.effective_span(),
            model: layout
                .registry()
                .render(widget.kind, &state.snapshot, &state.date_range),
            widget: widget.clone(),
        })
        .collect();

    Dashboard::new(state, panels)
}

/// Current state and layout, both read while holding the workspace lock.
pub async fn current(controller: &DashboardController) -> Dashboard<DashboardState> {
    controller
        .read_workspace(|workspace| compose(controller.state(), &workspace.layout))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::aggregator::{AggregatorOptions, AnalyticsAggregator};
    use crate::application::controller::{DEFAULT_AUTO_REFRESH_INTERVAL, Workspace};
    use crate::application::forecaster::{FixedJitter, TrendForecaster};
    use crate::application::revenue_estimator::SyntheticRevenueEstimator;
    use crate::application::view_repository::InMemoryViewRepository;
    use crate::application::view_store::ViewStore;
    use crate::application::widget_registry::WidgetRegistry;
    use crate::domain::analytics::DateRange;
    use crate::infrastructure::static_metric_source::StaticMetricSource;
    use std::sync::Arc;

    fn controller(source: StaticMetricSource) -> DashboardController {
        let aggregator = AnalyticsAggregator::new(
            Arc::new(source),
            Arc::new(SyntheticRevenueEstimator::new(Some(3))),
            AggregatorOptions::default(),
        );
        DashboardController::new(
            aggregator,
            TrendForecaster::new(Box::new(FixedJitter(1.0))),
            Workspace {
                layout: LayoutEngine::new(Arc::new(WidgetRegistry::standard())),
                views: ViewStore::new(Box::new(InMemoryViewRepository::new())),
            },
            DateRange::default(),
            DEFAULT_AUTO_REFRESH_INTERVAL,
        )
    }

    #[tokio::test]
    async fn test_before_first_load_every_panel_is_empty() {
        let controller = controller(StaticMetricSource::demo());
        let page = current(&controller).await;

        assert_eq!(page.panels.len(), 6);
        assert!(page.panels.iter().all(|p| p.model.is_empty()));
    }

    #[tokio::test]
    async fn test_hidden_and_expanded_widgets_are_reflected() {
        let controller = controller(StaticMetricSource::demo());
        controller.refresh().await;
        controller
            .edit_workspace(|w| {
                w.layout.remove("w3")?;
                w.layout.toggle_expanded("w2")
            })
            .await
            .unwrap();

        let page = current(&controller).await;
        let ids: Vec<&str> = page.panels.iter().map(|p| p.widget.id.as_str()).collect();

        assert_eq!(ids, vec!["w1", "w2", "w4", "w5", "w6"]);
        assert_eq!(page.panels[1].span.columns, 4);
        assert_eq!(page.panels[1].span.rows, 2);
        assert!(!page.panels[0].model.is_empty());
    }
}
