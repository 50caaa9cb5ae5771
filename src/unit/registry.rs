// src/unit/registry.rs

//! Name → unit factory lookup.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::errors::{Result, RunnerError};
use crate::types::ReplicaInfo;
use crate::unit::{LoadedUnit, UnitContext, UnitInfo};

/// Builds a fresh [`LoadedUnit`] for one run.
pub type UnitFactory = Arc<dyn Fn(&UnitContext) -> anyhow::Result<LoadedUnit> + Send + Sync>;

#[derive(Clone, Default)]
pub struct UnitRegistry {
    units: BTreeMap<String, UnitFactory>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&UnitContext) -> anyhow::Result<LoadedUnit> + Send + Sync + 'static,
    {
        self.units.insert(name.into(), Arc::new(factory));
    }

    /// Whether `name` (after [`resolve_unit_name`]) is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.units.contains_key(&resolve_unit_name(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }

    /// Resolve `name` and build the unit, handing the replica identity to
    /// its factory.
    pub fn load(&self, name: &str, replica: Option<ReplicaInfo>) -> Result<(UnitInfo, LoadedUnit)> {
        let resolved = resolve_unit_name(name);
        let factory = self
            .units
            .get(&resolved)
            .ok_or_else(|| RunnerError::UnknownUnit {
                name: resolved.clone(),
                known: self.names().collect::<Vec<_>>().join(", "),
            })?;

        let ctx = UnitContext {
            name: resolved.clone(),
            replica,
        };
        let unit = factory(&ctx)
            .map_err(|e| RunnerError::Unit(e.context(format!("loading unit '{resolved}'"))))?;

        debug!(unit = %resolved, model = %unit.model(), "unit loaded");

        let info = UnitInfo {
            name: resolved,
            model: unit.model(),
            replica,
        };
        Ok((info, unit))
    }
}

impl fmt::Debug for UnitRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.units.keys()).finish()
    }
}

/// Normalise a unit reference given on the command line.
///
/// A reference naming an existing file is turned into a module path: a
/// leading `./` and a trailing `.rs` are dropped and path separators become
/// `::` (`./jobs/report.rs` → `jobs::report`). Anything else is returned
/// unchanged.
pub fn resolve_unit_name(name: &str) -> String {
    if !Path::new(name).is_file() {
        return name.to_string();
    }

    let trimmed = name.strip_suffix(".rs").unwrap_or(name);
    let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
    trimmed.replace(['/', '\\'], "::")
}
