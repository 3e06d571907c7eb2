//! Application state shared by every handler.

use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::convert::Converter;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    converter: Converter,
}

impl AppState {
    pub fn new(converter: Converter) -> Self {
        Self {
            inner: Arc::new(AppStateInner { converter }),
        }
    }

    pub fn converter(&self) -> &Converter {
        &self.inner.converter
    }

    /// Get the configuration
    pub fn config(&self) -> &ServiceConfig {
        self.inner.converter.config()
    }
}
