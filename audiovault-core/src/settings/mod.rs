pub mod config;
pub mod loader;


pub use config::{
    MinioSettings, PipelineSettings, PostgresSettings, PushgatewaySettings, ServerSettings,
    Settings,
};
