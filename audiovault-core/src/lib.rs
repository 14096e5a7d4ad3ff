pub mod artifact;
pub mod blob;
pub mod catalog;
pub mod health;
pub mod ingest;
pub mod metrics;
pub mod mock;
pub mod settings;

// Public library API. These names are meant to stay stable; everything
// else is public too, for tests and alternative wiring.
pub use artifact::AudioArtifact;
pub use blob::{BlobStore, BlobWriter};
pub use catalog::{Catalog, CatalogWriter};
pub use health::{HealthProber, HealthReport};
pub use ingest::{Accepted, Coordinator, CreateRequest, IngestError};
pub use metrics::{MetricsEmitter, MetricsTransport};
pub use settings::Settings;
