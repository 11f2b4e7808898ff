// Dashboard page model - what one render pass hands to a client
use super::render::RenderModel;
use super::widget::{Span, Widget};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Panel {
    pub widget: Widget,
    pub span: Span,
    pub model: RenderModel,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard<S> {
    pub state: S,
    pub panels: Vec<Panel>,
}

impl<S> Dashboard<S> {
    pub fn new(state: S, panels: Vec<Panel>) -> Self {
        Self { state, panels }
    }
}
