//! Prometheus Pushgateway transport

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use super::MetricsTransport;

pub struct PushGateway {
    base_url: String,
    client: Client,
}

impl PushGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build metrics HTTP client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn job_url(&self, job: &str) -> String {
        format!("{}/metrics/job/{}", self.base_url, job)
    }
}

#[async_trait]
impl MetricsTransport for PushGateway {
    async fn send(&self, job: &str, payload: String) -> Result<()> {
        let response = self
            .client
            .post(self.job_url(job))
            .header("Content-Type", "text/plain")
            .body(payload)
            .send()
            .await
            .context("Failed to send metrics to Pushgateway")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Pushgateway error {status}: {body}");
        }
        Ok(())
    }

    async fn ready(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/-/ready", self.base_url))
            .send()
            .await
            .context("Failed to reach Pushgateway")?;

        if !response.status().is_success() {
            anyhow::bail!("Pushgateway not ready: {}", response.status());
        }
        Ok(())
    }
}
