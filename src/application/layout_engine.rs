// Layout engine - mutable arrangement of widget instances
use crate::application::widget_registry::WidgetRegistry;
use crate::domain::error::LayoutError;
use crate::domain::widget::{MoveDirection, Widget, WidgetKind, WidgetSize};
use std::sync::Arc;

/// Visibility, ordering, sizing and expansion of the dashboard's widgets,
/// independent of the data they show. Widgets are kept sorted by `position`
/// after every mutation, so slice order is render order.
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    registry: Arc<WidgetRegistry>,
    widgets: Vec<Widget>,
    next_seq: u64,
}

impl LayoutEngine {
    pub fn new(registry: Arc<WidgetRegistry>) -> Self {
        let widgets = registry.default_widgets();
        let mut engine = Self {
            registry,
            widgets: Vec::new(),
            next_seq: 1,
        };
        engine.replace(widgets);
        engine
    }

    pub fn registry(&self) -> &WidgetRegistry {
        &self.registry
    }

    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    /// Visible widgets in render order
    pub fn visible_widgets(&self) -> Vec<&Widget> {
        self.widgets.iter().filter(|w| w.visible).collect()
    }

    pub fn widget(&self, widget_id: &str) -> Option<&Widget> {
        self.widgets.iter().find(|w| w.id == widget_id)
    }

    /// Full copy of the current arrangement
    pub fn snapshot(&self) -> Vec<Widget> {
        self.widgets.clone()
    }

    /// Replace the whole arrangement, e.g. when switching views
    pub fn replace(&mut self, widgets: Vec<Widget>) {
        self.widgets = widgets;
        self.sort();
        self.next_seq = self
            .widgets
            .iter()
            .filter_map(|w| w.id.strip_prefix('w').and_then(|n| n.parse::<u64>().ok()))
            .max()
            .unwrap_or(0)
            + 1;
    }

    pub fn reset_to_defaults(&mut self) {
        let defaults = self.registry.default_widgets();
        self.replace(defaults);
    }

    /// Toggle visibility without touching `position`
    pub fn set_visible(&mut self, widget_id: &str, visible: bool) -> Result<(), LayoutError> {
        let widget = self.widget_mut(widget_id)?;
        widget.visible = visible;
        tracing::debug!("Widget {} visible={}", widget_id, visible);
        Ok(())
    }

    /// Flip `expanded`. Several widgets may be expanded at once.
    pub fn toggle_expanded(&mut self, widget_id: &str) -> Result<bool, LayoutError> {
        let widget = self.widget_mut(widget_id)?;
        widget.expanded = !widget.expanded;
        tracing::debug!("Widget {} expanded={}", widget_id, widget.expanded);
        Ok(widget.expanded)
    }

    /// Swap ranks with the adjacent visible widget. Returns `false` when the
    /// widget is hidden or already at that end of the sequence.
    pub fn move_widget(&mut self, widget_id: &str, direction: MoveDirection) -> Result<bool, LayoutError> {
        if self.widget(widget_id).is_none() {
            return Err(LayoutError::UnknownWidget(widget_id.to_string()));
        }

        let visible: Vec<usize> = self
            .widgets
            .iter()
            .enumerate()
            .filter(|(_, w)| w.visible)
            .map(|(i, _)| i)
            .collect();

        let Some(slot) = visible.iter().position(|&i| self.widgets[i].id == widget_id) else {
            return Ok(false);
        };

        let neighbour_slot = match direction {
            MoveDirection::Up => slot.checked_sub(1),
            MoveDirection::Down => Some(slot + 1).filter(|s| *s < visible.len()),
        };
        let Some(neighbour_slot) = neighbour_slot else {
            return Ok(false);
        };

        let (a, b) = (visible[slot], visible[neighbour_slot]);
        let rank = self.widgets[a].position;
        self.widgets[a].position = self.widgets[b].position;
        self.widgets[b].position = rank;
        self.sort();

        tracing::debug!("Moved widget {} {:?}", widget_id, direction);
        Ok(true)
    }

    /// Show a widget of `kind`. An already visible instance is left as is and
    /// a hidden one is re-enabled in place (keeping its position and size);
    /// otherwise a new instance is appended. Second visible instances only
    /// come from `add_duplicate`. Returns the id of the shown widget.
    pub fn add(&mut self, kind: WidgetKind) -> String {
        if let Some(visible) = self.widgets.iter().find(|w| w.kind == kind && w.visible) {
            tracing::debug!("Widget {} ({}) already visible", visible.id, kind);
            return visible.id.clone();
        }
        if let Some(hidden) = self.widgets.iter_mut().find(|w| w.kind == kind && !w.visible) {
            hidden.visible = true;
            tracing::debug!("Re-enabled widget {} ({})", hidden.id, kind);
            return hidden.id.clone();
        }

        let spec = self.registry.spec(kind);
        self.push_new(kind, spec.default_title.to_string(), spec.default_size)
    }

    /// `add` for a kind given by its wire name
    pub fn add_by_name(&mut self, kind: &str) -> Result<String, LayoutError> {
        let kind: WidgetKind = kind.parse()?;
        Ok(self.add(kind))
    }

    /// Always create a new instance, even when one of the same kind is visible
    pub fn add_duplicate(&mut self, kind: WidgetKind, title: Option<String>) -> String {
        let spec = self.registry.spec(kind);
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| spec.default_title.to_string());
        self.push_new(kind, title, spec.default_size)
    }

    /// Hide the widget; the record stays so `add` can restore it.
    pub fn remove(&mut self, widget_id: &str) -> Result<(), LayoutError> {
        self.set_visible(widget_id, false)
    }

    /// A blank title falls back to the kind's default title.
    pub fn rename(&mut self, widget_id: &str, title: &str) -> Result<(), LayoutError> {
        let default_title = {
            let widget = self
                .widget(widget_id)
                .ok_or_else(|| LayoutError::UnknownWidget(widget_id.to_string()))?;
            self.registry.spec(widget.kind).default_title
        };

        let trimmed = title.trim();
        let widget = self.widget_mut(widget_id)?;
        widget.title = if trimmed.is_empty() {
            default_title.to_string()
        } else {
            trimmed.to_string()
        };
        Ok(())
    }

    pub fn resize(&mut self, widget_id: &str, size: WidgetSize) -> Result<(), LayoutError> {
        self.widget_mut(widget_id)?.size = size;
        Ok(())
    }

    fn push_new(&mut self, kind: WidgetKind, title: String, size: WidgetSize) -> String {
        let max_rank = self.widgets.iter().map(|w| w.position).max().unwrap_or(0);
        let position = (self.widgets.len() as i64 + 1).max(max_rank + 1);

        let id = format!("w{}", self.next_seq);
        self.next_seq += 1;

        self.widgets.push(Widget::new(id.clone(), kind, title, size, position));
        self.sort();
        tracing::debug!("Added widget {} ({}) at position {}", id, kind, position);
        id
    }

    fn widget_mut(&mut self, widget_id: &str) -> Result<&mut Widget, LayoutError> {
        self.widgets
            .iter_mut()
            .find(|w| w.id == widget_id)
            .ok_or_else(|| LayoutError::UnknownWidget(widget_id.to_string()))
    }

    fn sort(&mut self) {
        self.widgets.sort_by_key(|w| w.position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> LayoutEngine {
        LayoutEngine::new(Arc::new(WidgetRegistry::standard()))
    }

    fn visible_ids(engine: &LayoutEngine) -> Vec<String> {
        engine.visible_widgets().iter().map(|w| w.id.clone()).collect()
    }

    fn assert_strictly_ordered(engine: &LayoutEngine) {
        let ranks: Vec<i64> = engine.visible_widgets().iter().map(|w| w.position).collect();
        assert!(ranks.windows(2).all(|w| w[0] < w[1]), "ranks not strictly increasing: {:?}", ranks);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut once = engine();
        once.remove("w2").unwrap();

        let mut twice = engine();
        twice.remove("w2").unwrap();
        twice.remove("w2").unwrap();

        assert_eq!(once.widgets(), twice.widgets());
        assert!(once.widget("w2").is_some());
    }

    #[test]
    fn test_set_visible_keeps_position() {
        let mut engine = engine();
        engine.set_visible("w3", false).unwrap();
        engine.set_visible("w3", true).unwrap();
        assert_eq!(engine.widget("w3").unwrap().position, 3);
    }

    #[test]
    fn test_move_up_on_topmost_is_noop() {
        let mut engine = engine();
        let before = engine.snapshot();

        assert!(!engine.move_widget("w1", MoveDirection::Up).unwrap());
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn test_move_down_on_last_is_noop() {
        let mut engine = engine();
        let before = engine.snapshot();

        assert!(!engine.move_widget("w6", MoveDirection::Down).unwrap());
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn test_move_on_single_widget_is_noop() {
        let mut engine = engine();
        engine.replace(vec![Widget::new(
            "w1".to_string(),
            WidgetKind::StatSummary,
            "Overview".to_string(),
            WidgetSize::Full,
            1,
        )]);
        let before = engine.snapshot();

        assert!(!engine.move_widget("w1", MoveDirection::Up).unwrap());
        assert!(!engine.move_widget("w1", MoveDirection::Down).unwrap());
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn test_move_swaps_with_neighbour() {
        let mut engine = engine();
        assert!(engine.move_widget("w2", MoveDirection::Up).unwrap());
        assert_eq!(&visible_ids(&engine)[..2], &["w2".to_string(), "w1".to_string()]);
        assert_eq!(engine.widget("w2").unwrap().position, 1);
        assert_eq!(engine.widget("w1").unwrap().position, 2);
    }

    #[test]
    fn test_move_skips_hidden_widgets() {
        let mut engine = engine();
        engine.remove("w2").unwrap();

        assert!(engine.move_widget("w3", MoveDirection::Up).unwrap());
        assert_eq!(&visible_ids(&engine)[..2], &["w3".to_string(), "w1".to_string()]);
        assert_eq!(engine.widget("w2").unwrap().position, 2);
    }

    #[test]
    fn test_moving_hidden_widget_is_noop() {
        let mut engine = engine();
        engine.remove("w4").unwrap();
        assert!(!engine.move_widget("w4", MoveDirection::Up).unwrap());
    }

    #[test]
    fn test_ordering_holds_after_many_moves() {
        let mut engine = engine();
        let moves = [
            ("w3", MoveDirection::Up),
            ("w1", MoveDirection::Down),
            ("w6", MoveDirection::Up),
            ("w6", MoveDirection::Up),
            ("w2", MoveDirection::Down),
            ("w1", MoveDirection::Up),
            ("w5", MoveDirection::Down),
        ];
        for (id, direction) in moves {
            engine.move_widget(id, direction).unwrap();
            assert_strictly_ordered(&engine);
            let slice_ranks: Vec<i64> = engine.widgets().iter().map(|w| w.position).collect();
            let mut sorted = slice_ranks.clone();
            sorted.sort();
            assert_eq!(slice_ranks, sorted);
        }
    }

    #[test]
    fn test_move_unknown_widget_fails() {
        let mut engine = engine();
        assert_eq!(
            engine.move_widget("nope", MoveDirection::Up).unwrap_err(),
            LayoutError::UnknownWidget("nope".to_string())
        );
    }

    #[test]
    fn test_add_reenables_hidden_widget_in_place() {
        let mut engine = engine();
        engine.resize("w4", WidgetSize::Large).unwrap();
        engine.remove("w4").unwrap();
        let count = engine.widgets().len();

        let id = engine.add(WidgetKind::TopEntities);

        assert_eq!(id, "w4");
        assert_eq!(engine.widgets().len(), count);
        let widget = engine.widget("w4").unwrap();
        assert!(widget.visible);
        assert_eq!(widget.position, 4);
        assert_eq!(widget.size, WidgetSize::Large);
    }

    #[test]
    fn test_add_new_kind_appends_with_default_size() {
        let mut engine = engine();
        let id = engine.add(WidgetKind::StatusDistribution);

        let widget = engine.widget(&id).unwrap();
        assert_eq!(id, "w7");
        assert_eq!(widget.position, 7);
        assert_eq!(widget.size, WidgetSize::Small);
        assert_eq!(widget.title, "Status Breakdown");
        assert!(widget.visible);
        assert_eq!(visible_ids(&engine).last().unwrap(), "w7");
    }

    #[test]
    fn test_add_visible_kind_returns_existing_instance() {
        let mut engine = engine();
        let before = engine.snapshot();

        let id = engine.add(WidgetKind::RevenueTrend);

        assert_eq!(id, "w2");
        assert_eq!(engine.snapshot(), before);
        assert_eq!(engine.add_by_name("revenue-trend").unwrap(), "w2");
    }

    #[test]
    fn test_add_unknown_kind_fails() {
        let mut engine = engine();
        let before = engine.snapshot();

        let err = engine.add_by_name("sparkle-graph").unwrap_err();

        assert_eq!(err, LayoutError::InvalidKind("sparkle-graph".to_string()));
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn test_add_duplicate_creates_second_instance() {
        let mut engine = engine();
        let id = engine.add_duplicate(WidgetKind::RevenueTrend, Some("Revenue (EU)".to_string()));

        let same_kind: Vec<_> = engine
            .visible_widgets()
            .into_iter()
            .filter(|w| w.kind == WidgetKind::RevenueTrend)
            .collect();
        assert_eq!(same_kind.len(), 2);
        assert_eq!(engine.widget(&id).unwrap().title, "Revenue (EU)");
    }

    #[test]
    fn test_multiple_widgets_can_be_expanded() {
        let mut engine = engine();
        assert!(engine.toggle_expanded("w1").unwrap());
        assert!(engine.toggle_expanded("w2").unwrap());
        assert!(engine.widget("w1").unwrap().expanded);
        assert!(engine.widget("w2").unwrap().expanded);

        assert!(!engine.toggle_expanded("w1").unwrap());
    }

    #[test]
    fn test_rename_blank_restores_default_title() {
        let mut engine = engine();
        engine.rename("w2", "  Sales  ").unwrap();
        assert_eq!(engine.widget("w2").unwrap().title, "Sales");

        engine.rename("w2", "   ").unwrap();
        assert_eq!(engine.widget("w2").unwrap().title, "Revenue Trend");
    }

    #[test]
    fn test_replace_continues_id_sequence() {
        let mut engine = engine();
        engine.replace(vec![Widget::new(
            "w9".to_string(),
            WidgetKind::StatSummary,
            "Overview".to_string(),
            WidgetSize::Full,
            1,
        )]);
        assert_eq!(engine.add_duplicate(WidgetKind::StatSummary, None), "w10");
    }
}
