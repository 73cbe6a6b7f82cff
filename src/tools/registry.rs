//! Name-keyed catalogue of computation units

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Result, TaError};

use super::catalogue::builtin_indicators;
use super::unit::ComputationUnit;

/// Registry of computation units.
///
/// Populated once during startup composition and then shared read-only
/// (usually behind an `Arc`) by every transport.
#[derive(Default)]
pub struct ToolRegistry {
    units: HashMap<String, Arc<dyn ComputationUnit>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the full built-in catalogue
    pub fn with_builtin_tools() -> Self {
        let mut registry = Self::new();
        for indicator in builtin_indicators() {
            let name = indicator.name().to_string();
            if let Err(e) = registry.register(name, Arc::new(indicator)) {
                tracing::error!("Skipping built-in tool: {}", e);
            }
        }
        registry
    }

    /// Registry holding only the named built-in tools.
    ///
    /// Unknown names are a configuration error.
    pub fn with_selected_tools<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut available: HashMap<String, Arc<dyn ComputationUnit>> = builtin_indicators()
            .into_iter()
            .map(|unit| {
                let unit: Arc<dyn ComputationUnit> = Arc::new(unit);
                (unit.name().to_string(), unit)
            })
            .collect();

        let mut registry = Self::new();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() || registry.contains(name) {
                continue;
            }
            let unit = available
                .remove(name)
                .ok_or_else(|| TaError::Config(format!("unknown tool '{}'", name)))?;
            registry.register(name, unit)?;
        }
        Ok(registry)
    }

    /// Add a unit under `name`. Fails if the name is already taken.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        unit: Arc<dyn ComputationUnit>,
    ) -> Result<()> {
        let name = name.into();
        if self.units.contains_key(&name) {
            return Err(TaError::Duplicate(name));
        }
        tracing::debug!("Registered tool {}", name);
        self.units.insert(name, unit);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ComputationUnit>> {
        self.units.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    /// Registered names, sorted
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.units.keys().cloned().collect();
        names.sort();
        names
    }

    /// Units in name order
    pub fn units(&self) -> Vec<Arc<dyn ComputationUnit>> {
        self.list()
            .iter()
            .filter_map(|name| self.get(name))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.list())
            .finish()
    }
}
