use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::{Catalog, CatalogError, CatalogRecord};
use crate::artifact::AudioArtifact;

#[derive(Clone)]
pub struct CatalogWriter {
    catalog: Arc<dyn Catalog>,
    timeout: Duration,
}

impl CatalogWriter {
    pub fn new(catalog: Arc<dyn Catalog>, timeout: Duration) -> Self {
        Self { catalog, timeout }
    }

    /// Inserts the artifact's row. Callers that retry must either reuse the
    /// id and accept `CatalogError::Conflict`, or pick a new id.
    pub async fn insert(&self, artifact: &AudioArtifact) -> Result<(), CatalogError> {
        let record = CatalogRecord::from(artifact);
        tokio::time::timeout(self.timeout, self.catalog.insert(&record))
            .await
            .map_err(|_| CatalogError::Timeout {
                operation: format!("insert of {}", artifact.id),
                after: self.timeout,
            })??;

        debug!(id = %artifact.id, "Catalog row inserted");
        Ok(())
    }
}
