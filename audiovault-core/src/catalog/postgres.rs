//! PostgreSQL catalog backed by a shared `sqlx` pool

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use super::{Catalog, CatalogError, CatalogRecord};

#[derive(Debug, Clone)]
pub struct PgConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
    table: String,
}

impl PgCatalog {
    pub fn new(pool: PgPool, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        if !is_identifier(&table) {
            anyhow::bail!("invalid catalog table name: {table:?}")
        }
        Ok(Self { pool, table })
    }

    /// Creates the pool without opening a connection, so the process starts
    /// (and reports unhealthy) even while the database is down.
    pub fn connect_lazy(config: &PgConfig, table: impl Into<String>) -> Result<Self> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_lazy_with(options);

        Self::new(pool, table)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ensure_schema(&self) -> Result<(), CatalogError> {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id TEXT PRIMARY KEY,
                input TEXT NOT NULL,
                groq_response TEXT,
                opentts_voice TEXT NOT NULL,
                opentts_model TEXT NOT NULL,
                filename TEXT NOT NULL,
                audio_base64 TEXT NOT NULL
            )",
            self.table
        );
        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Catalog for PgCatalog {
    async fn insert(&self, record: &CatalogRecord) -> Result<(), CatalogError> {
        let statement = format!(
            "INSERT INTO {} (id, input, groq_response, opentts_voice, opentts_model, filename, audio_base64)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
            self.table
        );

        let result = sqlx::query(&statement)
            .bind(&record.id)
            .bind(&record.input)
            .bind(record.groq_response.as_deref())
            .bind(&record.opentts_voice)
            .bind(&record.opentts_model)
            .bind(&record.filename)
            .bind(&record.audio_base64)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(CatalogError::Conflict(record.id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn ping(&self) -> Result<(), CatalogError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers() {
        assert!(is_identifier("opentts_audio"));
        assert!(is_identifier("_t1"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("1table"));
        assert!(!is_identifier("audio; DROP TABLE x"));
        assert!(!is_identifier("public.audio"));
    }
}
