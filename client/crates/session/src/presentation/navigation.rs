//! Navigators
//!
//! [`RecordingNavigator`] remembers every redirect instead of performing it.
//! Headless hosts poll [`RecordingNavigator::last`] to learn where the user
//! should be.

use std::sync::{Mutex, PoisonError};

use crate::domain::navigation::{Location, Navigator};

#[derive(Debug, Default)]
pub struct RecordingNavigator {
    history: Mutex<Vec<Location>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<Location> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<Location> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Number of redirects to `path`
    pub fn count_to(&self, path: &str) -> usize {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|location| location.path == path)
            .count()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, to: &Location) {
        tracing::debug!(path = %to.path, from = ?to.from, "Navigate");
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(to.clone());
    }
}
