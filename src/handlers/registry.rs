use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use super::log::LogResultHandler;
use super::save::SaveImageHandler;
use super::traits::ResultHandler;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("result handler not found: {0}")]
    NotFound(String),
}

/// Named result handlers, so settings files can refer to them by name.
#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: BTreeMap<String, Arc<dyn ResultHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn ResultHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn ResultHandler>, RegistryError> {
        self.handlers
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Look up a list of names, preserving order.
    pub fn resolve<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> Result<Vec<Arc<dyn ResultHandler>>, RegistryError> {
        names.iter().map(|name| self.get(name.as_ref())).collect()
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Registry with the built-in `save` and `log` handlers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(SaveImageHandler::NAME, Arc::new(SaveImageHandler::new()));
        registry.register(LogResultHandler::NAME, Arc::new(LogResultHandler::new()));
        registry
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
