use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::blob::S3Config;
use crate::catalog::postgres::PgConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub postgres: PostgresSettings,

    #[serde(default)]
    pub minio: MinioSettings,

    #[serde(default)]
    pub pushgateway: PushgatewaySettings,

    #[serde(default)]
    pub pipeline: PipelineSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostgresSettings {
    #[serde(default = "default_pg_host")]
    pub host: String,
    #[serde(default = "default_pg_port")]
    pub port: u16,
    #[serde(default = "default_pg_user")]
    pub user: String,
    #[serde(default = "default_pg_password")]
    pub password: String,
    #[serde(default = "default_pg_database")]
    pub database: String,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Create the catalog table at startup if it does not exist
    #[serde(default)]
    pub auto_migrate: bool,
}

impl Default for PostgresSettings {
    fn default() -> Self {
        Self {
            host: default_pg_host(),
            port: default_pg_port(),
            user: default_pg_user(),
            password: default_pg_password(),
            database: default_pg_database(),
            table: default_table(),
            max_connections: default_max_connections(),
            auto_migrate: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MinioSettings {
    #[serde(default = "default_minio_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
}

impl Default for MinioSettings {
    fn default() -> Self {
        Self {
            endpoint: default_minio_endpoint(),
            access_key: String::new(),
            secret_key: String::new(),
            bucket: default_bucket(),
            region: default_region(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PushgatewaySettings {
    #[serde(default = "default_pushgateway_url")]
    pub url: String,
    #[serde(default = "default_job")]
    pub job: String,
    /// Value of the `service` label on every pushed metric
    #[serde(default = "default_service")]
    pub service: String,
}

impl Default for PushgatewaySettings {
    fn default() -> Self {
        Self {
            url: default_pushgateway_url(),
            job: default_job(),
            service: default_service(),
        }
    }
}

/// Concurrency and timeout knobs. Durations are in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineSettings {
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    /// How long a request waits for a free worker before being rejected.
    /// Zero rejects immediately when the pool is full.
    #[serde(default = "default_queue_timeout_ms")]
    pub queue_timeout_ms: u64,
    #[serde(default = "default_sink_timeout_ms")]
    pub sink_timeout_ms: u64,
    #[serde(default = "default_metrics_timeout_ms")]
    pub metrics_timeout_ms: u64,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
            queue_timeout_ms: default_queue_timeout_ms(),
            sink_timeout_ms: default_sink_timeout_ms(),
            metrics_timeout_ms: default_metrics_timeout_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl PipelineSettings {
    pub fn queue_timeout(&self) -> Duration {
        Duration::from_millis(self.queue_timeout_ms)
    }

    pub fn sink_timeout(&self) -> Duration {
        Duration::from_millis(self.sink_timeout_ms)
    }

    pub fn metrics_timeout(&self) -> Duration {
        Duration::from_millis(self.metrics_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl PostgresSettings {
    pub fn pg_config(&self, acquire_timeout: Duration) -> PgConfig {
        PgConfig {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
            database: self.database.clone(),
            max_connections: self.max_connections,
            acquire_timeout,
        }
    }
}

impl MinioSettings {
    pub fn s3_config(&self, operation_timeout: Duration) -> S3Config {
        S3Config {
            endpoint: self.endpoint.clone(),
            access_key: self.access_key.clone(),
            secret_key: self.secret_key.clone(),
            region: self.region.clone(),
            connect_timeout: operation_timeout,
            operation_timeout,
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_pg_host() -> String {
    "postgres".to_string()
}

fn default_pg_port() -> u16 {
    5432
}

fn default_pg_user() -> String {
    "lucky".to_string()
}

fn default_pg_password() -> String {
    "secret".to_string()
}

fn default_pg_database() -> String {
    "opentts".to_string()
}

fn default_table() -> String {
    "opentts_audio".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_minio_endpoint() -> String {
    "http://minio:9000".to_string()
}

fn default_bucket() -> String {
    "opentts-audio".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_pushgateway_url() -> String {
    "http://pushgateway-container:9091".to_string()
}

fn default_job() -> String {
    "opentts".to_string()
}

fn default_service() -> String {
    "audiovault".to_string()
}

fn default_max_in_flight() -> usize {
    64
}

fn default_queue_timeout_ms() -> u64 {
    250
}

fn default_sink_timeout_ms() -> u64 {
    10_000
}

fn default_metrics_timeout_ms() -> u64 {
    2_000
}

fn default_probe_timeout_ms() -> u64 {
    2_000
}

fn default_shutdown_grace_ms() -> u64 {
    15_000
}
