// View store - named, persisted layout snapshots
use crate::application::layout_engine::LayoutEngine;
use crate::application::view_repository::ViewRepository;
use crate::domain::error::ViewError;
use crate::domain::view::{DEFAULT_VIEW_ID, DEFAULT_VIEW_NAME, View, ViewSummary};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SwitchOutcome {
    Switched,
    /// The requested view had no usable record; the default view is active.
    FellBackToDefault,
}

/// Saved views plus the id of the active one. Persistence is explicit:
/// switching never saves in-session edits.
pub struct ViewStore {
    repository: Box<dyn ViewRepository>,
    active_view_id: String,
}

impl ViewStore {
    pub fn new(repository: Box<dyn ViewRepository>) -> Self {
        Self {
            repository,
            active_view_id: DEFAULT_VIEW_ID.to_string(),
        }
    }

    pub fn active_view_id(&self) -> &str {
        &self.active_view_id
    }

    /// Persist the full current arrangement under a fresh id and make it active.
    /// Names need not be unique.
    pub fn save(&mut self, name: &str, layout: &LayoutEngine) -> Result<View, ViewError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ViewError::EmptyName);
        }

        let view = View::new(uuid::Uuid::new_v4().to_string(), name.to_string(), layout.snapshot());
        let value = serde_json::to_string(&view).map_err(|source| ViewError::Corrupt {
            id: view.id.clone(),
            source,
        })?;
        self.repository.set(&view.id, value)?;
        self.active_view_id = view.id.clone();

        tracing::info!("Saved view {} ({:?}) with {} widgets", view.id, view.name, view.widgets.len());
        Ok(view)
    }

    /// Load `view_id` into the layout. The default view, a missing record and an
    /// unreadable record all leave the registry defaults active.
    pub fn switch(&mut self, view_id: &str, layout: &mut LayoutEngine) -> Result<SwitchOutcome, ViewError> {
        if view_id == DEFAULT_VIEW_ID {
            self.activate_default(layout);
            return Ok(SwitchOutcome::Switched);
        }

        match self.load(view_id) {
            Ok(Some(view)) => {
                layout.replace(view.widgets);
                self.active_view_id = view.id;
                tracing::debug!("Switched to view {}", view_id);
                Ok(SwitchOutcome::Switched)
            }
            Ok(None) => {
                tracing::warn!("View {} not found, falling back to default", view_id);
                self.activate_default(layout);
                Ok(SwitchOutcome::FellBackToDefault)
            }
            Err(ViewError::Corrupt { id, source }) => {
                tracing::warn!("View {} is unreadable ({}), falling back to default", id, source);
                self.activate_default(layout);
                Ok(SwitchOutcome::FellBackToDefault)
            }
            Err(e) => Err(e),
        }
    }

    /// Remove a saved view. Deleting the active view activates the default.
    pub fn delete(&mut self, view_id: &str, layout: &mut LayoutEngine) -> Result<(), ViewError> {
        if view_id == DEFAULT_VIEW_ID {
            return Err(ViewError::ProtectedView);
        }

        if !self.repository.delete(view_id)? {
            return Err(ViewError::UnknownView(view_id.to_string()));
        }
        tracing::info!("Deleted view {}", view_id);

        if self.active_view_id == view_id {
            self.activate_default(layout);
        }
        Ok(())
    }

    pub fn load(&self, view_id: &str) -> Result<Option<View>, ViewError> {
        let Some(raw) = self.repository.get(view_id)? else {
            return Ok(None);
        };
        let view = serde_json::from_str::<View>(&raw).map_err(|source| ViewError::Corrupt {
            id: view_id.to_string(),
            source,
        })?;
        Ok(Some(view))
    }

    /// Default view first, then saved views by name.
    pub fn list(&self, layout: &LayoutEngine) -> Result<Vec<ViewSummary>, ViewError> {
        let mut saved = Vec::new();
        for key in self.repository.keys()? {
            match self.load(&key) {
                Ok(Some(view)) => saved.push(view),
                Ok(None) => {}
                Err(ViewError::Corrupt { id, source }) => {
                    tracing::warn!("Skipping unreadable view {}: {}", id, source);
                }
                Err(e) => return Err(e),
            }
        }
        saved.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        let mut summaries = vec![ViewSummary {
            id: DEFAULT_VIEW_ID.to_string(),
            name: DEFAULT_VIEW_NAME.to_string(),
            widget_count: layout.registry().default_widgets().len(),
            active: self.active_view_id == DEFAULT_VIEW_ID,
        }];
        summaries.extend(saved.into_iter().map(|view| ViewSummary {
            active: self.active_view_id == view.id,
            widget_count: view.widgets.len(),
            id: view.id,
            name: view.name,
        }));
        Ok(summaries)
    }

    fn activate_default(&mut self, layout: &mut LayoutEngine) {
        layout.reset_to_defaults();
        self.active_view_id = DEFAULT_VIEW_ID.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::view_repository::InMemoryViewRepository;
    use crate::application::widget_registry::WidgetRegistry;
    use crate::domain::widget::{MoveDirection, WidgetKind};
    use std::sync::Arc;

    fn setup() -> (ViewStore, LayoutEngine) {
        (
            ViewStore::new(Box::new(InMemoryViewRepository::new())),
            LayoutEngine::new(Arc::new(WidgetRegistry::standard())),
        )
    }

    #[test]
    fn test_save_requires_name() {
        let (mut store, layout) = setup();
        assert!(matches!(store.save("   ", &layout), Err(ViewError::EmptyName)));
        assert_eq!(store.active_view_id(), DEFAULT_VIEW_ID);
    }

    #[test]
    fn test_save_activates_new_view() {
        let (mut store, layout) = setup();
        let view = store.save("Sales", &layout).unwrap();

        assert_eq!(store.active_view_id(), view.id);
        assert_ne!(view.id, DEFAULT_VIEW_ID);
        assert_eq!(view.widgets, layout.snapshot());
    }

    #[test]
    fn test_save_switch_round_trip_reproduces_widgets() {
        let (mut store, mut layout) = setup();
        layout.move_widget("w3", MoveDirection::Up).unwrap();
        layout.toggle_expanded("w2").unwrap();
        layout.remove("w5").unwrap();
        layout.add(WidgetKind::GenericTimeSeries);
        let saved = layout.snapshot();

        let view = store.save("X", &layout).unwrap();
        store.switch(&view.id, &mut layout).unwrap();
        store.switch(DEFAULT_VIEW_ID, &mut layout).unwrap();
        assert_eq!(layout.snapshot(), WidgetRegistry::standard().default_widgets());

        store.switch(&view.id, &mut layout).unwrap();
        assert_eq!(layout.snapshot(), saved);
        assert_eq!(store.active_view_id(), view.id);
    }

    #[test]
    fn test_switch_does_not_autosave_edits() {
        let (mut store, mut layout) = setup();
        let view = store.save("X", &layout).unwrap();
        let saved = layout.snapshot();

        layout.remove("w1").unwrap();
        store.switch(DEFAULT_VIEW_ID, &mut layout).unwrap();
        store.switch(&view.id, &mut layout).unwrap();

        assert_eq!(layout.snapshot(), saved);
    }

    #[test]
    fn test_switch_to_missing_view_falls_back_to_default() {
        let (mut store, mut layout) = setup();
        layout.remove("w1").unwrap();

        let outcome = store.switch("gone", &mut layout).unwrap();

        assert_eq!(outcome, SwitchOutcome::FellBackToDefault);
        assert_eq!(store.active_view_id(), DEFAULT_VIEW_ID);
        assert_eq!(layout.snapshot(), WidgetRegistry::standard().default_widgets());
    }

    #[test]
    fn test_switch_to_corrupt_view_falls_back_to_default() {
        let mut repo = InMemoryViewRepository::new();
        repo.set("broken", "{not json".to_string()).unwrap();
        let mut store = ViewStore::new(Box::new(repo));
        let mut layout = LayoutEngine::new(Arc::new(WidgetRegistry::standard()));

        let outcome = store.switch("broken", &mut layout).unwrap();
        assert_eq!(outcome, SwitchOutcome::FellBackToDefault);
    }

    #[test]
    fn test_delete_default_is_protected() {
        let (mut store, mut layout) = setup();
        let view = store.save("X", &layout).unwrap();
        layout.remove("w2").unwrap();
        let before = layout.snapshot();

        assert!(matches!(
            store.delete(DEFAULT_VIEW_ID, &mut layout),
            Err(ViewError::ProtectedView)
        ));
        assert_eq!(layout.snapshot(), before);
        assert_eq!(store.active_view_id(), view.id);
        assert_eq!(store.list(&layout).unwrap().len(), 2);
    }

    #[test]
    fn test_delete_active_view_falls_back_to_default() {
        let (mut store, mut layout) = setup();
        let view = store.save("X", &layout).unwrap();
        layout.remove("w2").unwrap();

        store.delete(&view.id, &mut layout).unwrap();

        assert_eq!(store.active_view_id(), DEFAULT_VIEW_ID);
        assert_eq!(layout.snapshot(), WidgetRegistry::standard().default_widgets());
        assert!(store.load(&view.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_inactive_view_keeps_layout() {
        let (mut store, mut layout) = setup();
        let first = store.save("First", &layout).unwrap();
        let second = store.save("Second", &layout).unwrap();
        layout.remove("w2").unwrap();
        let before = layout.snapshot();

        store.delete(&first.id, &mut layout).unwrap();

        assert_eq!(store.active_view_id(), second.id);
        assert_eq!(layout.snapshot(), before);
    }

    #[test]
    fn test_delete_unknown_view_fails() {
        let (mut store, mut layout) = setup();
        assert!(matches!(
            store.delete("nope", &mut layout),
            Err(ViewError::UnknownView(_))
        ));
    }

    #[test]
    fn test_duplicate_names_are_permitted() {
        let (mut store, layout) = setup();
        let a = store.save("Same", &layout).unwrap();
        let b = store.save("Same", &layout).unwrap();
        assert_ne!(a.id, b.id);

        let views = store.list(&layout).unwrap();
        assert_eq!(views.len(), 3);
        assert_eq!(views[0].id, DEFAULT_VIEW_ID);
        assert!(!views[0].active);
        assert_eq!(views.iter().filter(|v| v.name == "Same").count(), 2);
        assert_eq!(views.iter().filter(|v| v.active).count(), 1);
    }
}
