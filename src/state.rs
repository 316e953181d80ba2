// src/state.rs
use std::sync::Arc;

use crate::services::dispatcher::Dispatcher;

pub type SharedState = Arc<AppState>;

#[derive(Debug)]
pub struct AppState {
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }
}
