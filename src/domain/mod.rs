// Domain layer - Pure data types, no I/O
pub mod analytics;
pub mod dashboard;
pub mod error;
pub mod render;
pub mod view;
pub mod widget;
