use crate::prelude::{ControlError, ControlResult, Junction};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Fixed, externally supplied list of monitorable junctions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JunctionCatalog {
    entries: Vec<Junction>,
}

impl JunctionCatalog {
    pub fn new(entries: Vec<Junction>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[Junction] {
        &self.entries
    }

    pub fn resolve(&self, id: &str) -> ControlResult<&Junction> {
        self.entries
            .iter()
            .find(|junction| junction.id.as_str() == id)
            .ok_or_else(|| ControlError::UnknownJunction(id.to_string()))
    }
}

/// Single source of truth for the junction under observation.
pub struct JunctionSelection {
    catalog: JunctionCatalog,
    current: watch::Sender<Option<Junction>>,
}

impl JunctionSelection {
    pub fn new(catalog: JunctionCatalog) -> Self {
        let (current, _) = watch::channel(None);
        Self { catalog, current }
    }

    pub fn catalog(&self) -> &JunctionCatalog {
        &self.catalog
    }

    /// Validates `id` against the catalog before publishing it. Unknown ids leave the
    /// selection untouched.
    pub fn select(&self, id: &str) -> ControlResult<Junction> {
        let junction = self.catalog.resolve(id)?.clone();
        self.current.send_replace(Some(junction.clone()));
        Ok(junction)
    }

    pub fn clear(&self) {
        self.current.send_replace(None);
    }

    pub fn current(&self) -> Option<Junction> {
        self.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Junction>> {
        self.current.subscribe()
    }
}
