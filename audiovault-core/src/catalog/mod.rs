pub mod memory;
pub mod postgres;
pub mod writer;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::artifact::AudioArtifact;

pub use memory::MemoryCatalog;
pub use postgres::PgCatalog;
pub use writer::CatalogWriter;

/// One row of the audio catalog, flattened to the text columns the table
/// stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRecord {
    pub id: String,
    pub input: String,
    pub groq_response: Option<String>,
    pub opentts_voice: String,
    pub opentts_model: String,
    pub filename: String,
    pub audio_base64: String,
}

impl From<&AudioArtifact> for CatalogRecord {
    fn from(artifact: &AudioArtifact) -> Self {
        Self {
            id: artifact.id.clone(),
            input: artifact.input.clone(),
            groq_response: artifact.provider_response_text(),
            opentts_voice: artifact.voice.clone(),
            opentts_model: artifact.model.clone(),
            filename: artifact.filename(),
            audio_base64: artifact.audio_base64.clone(),
        }
    }
}

/// Relational store for artifact metadata. Implementations hold a shared
/// connection pool; they are never owned by a single task.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Inserts a new row. An existing row with the same id is a
    /// `CatalogError::Conflict`, never an update.
    async fn insert(&self, record: &CatalogRecord) -> Result<(), CatalogError>;

    /// Cheapest round-trip that proves the catalog is reachable.
    async fn ping(&self) -> Result<(), CatalogError>;
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("artifact {0} is already catalogued")]
    Conflict(String),

    #[error("catalog query failed: {0}")]
    Query(anyhow::Error),

    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },
}

impl From<sqlx::Error> for CatalogError {
    fn from(source: sqlx::Error) -> Self {
        Self::Query(anyhow::anyhow!(source))
    }
}
