use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{Catalog, CatalogError, CatalogRecord};
use crate::mock::{MockBehavior, SharedBehavior};

/// In-process catalog with primary-key semantics on `id`.
#[derive(Clone, Default)]
pub struct MemoryCatalog {
    rows: Arc<Mutex<HashMap<String, CatalogRecord>>>,
    behavior: SharedBehavior,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            behavior: SharedBehavior::new(behavior),
            ..Self::default()
        }
    }

    pub fn set_behavior(&self, behavior: MockBehavior) {
        self.behavior.set(behavior);
    }

    pub fn row(&self, id: &str) -> Option<CatalogRecord> {
        self.rows.lock().unwrap().get(id).cloned()
    }

    pub fn rows(&self) -> Vec<CatalogRecord> {
        let mut rows: Vec<CatalogRecord> = self.rows.lock().unwrap().values().cloned().collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        rows
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn insert(&self, record: &CatalogRecord) -> Result<(), CatalogError> {
        self.behavior
            .write_gate(&record.id)
            .await
            .map_err(CatalogError::Query)?;

        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&record.id) {
            return Err(CatalogError::Conflict(record.id.clone()));
        }
        rows.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn ping(&self) -> Result<(), CatalogError> {
        self.behavior.probe_gate().await.map_err(CatalogError::Query)
    }
}
