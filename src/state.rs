//! Shared application state for all routes. The registry is immutable after startup.

use crate::config::Registry;
use crate::store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub store: Arc<dyn Store>,
}

impl AppState {
    pub fn new(registry: Registry, store: Arc<dyn Store>) -> Self {
        AppState {
            registry: Arc::new(registry),
            store,
        }
    }
}
