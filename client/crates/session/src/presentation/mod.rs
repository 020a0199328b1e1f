//! Presentation Layer
//!
//! What the UI consumes: route guards, navigation and notifications.

pub mod app;
pub mod navigation;
pub mod notification;
pub mod route_guard;
