use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;

use super::config::Settings;
use crate::catalog::postgres::is_identifier;

/// Largest accepted `pipeline.max_in_flight`.
const MAX_IN_FLIGHT_LIMIT: usize = 100_000;

impl Settings {
    /// Loads settings once at process start: the TOML file if given, then
    /// environment overrides, then validation. There is no reload.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// A missing or malformed file is an error; an empty file yields defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {path:?}"))?;
        let settings = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse settings in {path:?}"))?;
        info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Applies the deployment's environment variables on top of the file.
    /// `lookup` is `std::env::var` in production.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |target: &mut String, key: &str| {
            if let Some(value) = lookup(key) {
                *target = value;
            }
        };

        set(&mut self.server.bind, "BIND_ADDR");
        set(&mut self.postgres.host, "PG_HOST");
        set(&mut self.postgres.user, "PG_USER");
        set(&mut self.postgres.password, "PG_PASS");
        set(&mut self.postgres.database, "PG_DB");
        set(&mut self.minio.endpoint, "MINIO_ENDPOINT");
        set(&mut self.minio.access_key, "MINIO_ACCESS_KEY");
        set(&mut self.minio.secret_key, "MINIO_SECRET_KEY");
        set(&mut self.minio.bucket, "MINIO_BUCKET");
        set(&mut self.pushgateway.url, "PUSHGATEWAY_URL");

        if let Some(port) = lookup("PG_PORT") {
            self.postgres.port = port
                .parse()
                .with_context(|| format!("PG_PORT is not a valid port: {port:?}"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let pipeline = &self.pipeline;
        if pipeline.max_in_flight == 0 || pipeline.max_in_flight > MAX_IN_FLIGHT_LIMIT {
            bail!(
                "pipeline.max_in_flight must be between 1 and {MAX_IN_FLIGHT_LIMIT}, got {}",
                pipeline.max_in_flight
            );
        }
        if pipeline.sink_timeout_ms == 0
            || pipeline.metrics_timeout_ms == 0
            || pipeline.probe_timeout_ms == 0
        {
            bail!("pipeline timeouts must be greater than zero");
        }
        if self.minio.bucket.is_empty() {
            bail!("minio.bucket must not be empty");
        }
        if !is_identifier(&self.postgres.table) {
            bail!("postgres.table is not a plain identifier: {:?}", self.postgres.table);
        }
        if self.pushgateway.job.is_empty() {
            bail!("pushgateway.job must not be empty");
        }
        Ok(())
    }
}
