//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::db::UserStore;

/// Application state shared across all request handlers.
///
/// Holds no connection: the store opens and releases a client per call, so
/// concurrent requests share nothing mutable.
#[derive(Clone)]
pub struct AppState {
    /// Where user records are written and read.
    pub users: Arc<dyn UserStore>,
}

impl AppState {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }
}
