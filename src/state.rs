//! Shared application state for SDK routes.

use crate::container::Container;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub container: Arc<Container>,
}

impl AppState {
    pub fn new(container: Arc<Container>) -> Self {
        AppState { container }
    }
}
