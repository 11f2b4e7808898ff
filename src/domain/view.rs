// View domain model
use super::widget::Widget;
use serde::{Deserialize, Serialize};

/// Reserved id of the view that always exists and resets to registry defaults.
pub const DEFAULT_VIEW_ID: &str = "default";
pub const DEFAULT_VIEW_NAME: &str = "Default";

/// A named arrangement of widgets. Always a full snapshot, never a diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub id: String,
    pub name: String,
    pub widgets: Vec<Widget>,
}

impl View {
    pub fn new(id: String, name: String, widgets: Vec<Widget>) -> Self {
        Self { id, name, widgets }
    }
}

/// Listing entry returned to callers choosing a view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewSummary {
    pub id: String,
    pub name: String,
    pub widget_count: usize,
    pub active: bool,
}
