use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use url::Url;

use crate::{
    config::BackendConfig,
    domain::{ClassificationVerdict, ComponentHealth, EmergencyRequest, HealthReport},
};

use super::fallback;

pub const MAX_BATCH_SIZE: usize = 50;
const FRONTEND_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Input problems caught before any request leaves the process.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("text is required and must not be empty")]
    EmptyText,
    #[error("batch size cannot exceed {max} texts (got {actual})")]
    BatchTooLarge { max: usize, actual: usize },
}

#[derive(Debug, Serialize)]
struct BatchRequest<'a> {
    texts: &'a [String],
}

#[derive(Clone)]
pub struct ClassifierClient {
    http: Client,
    base_url: Url,
    classify_timeout: Duration,
    request_timeout: Duration,
}

impl ClassifierClient {
    pub fn new(http: Client, config: &BackendConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.clone(),
            classify_timeout: config.classify_timeout,
            request_timeout: config.request_timeout,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("invalid endpoint path {path}"))
    }

    /// Classifies one request, falling back to the keyword heuristic when the
    /// backend does not answer successfully within the classify timeout.
    pub async fn classify(&self, request: &EmergencyRequest) -> Result<ClassificationVerdict> {
        if request.text.is_empty() {
            return Err(ClientError::EmptyText.into());
        }

        let url = self.endpoint("analyze/request")?;
        match self.classify_remote(url, request).await {
            Ok(verdict) => {
                tracing::info!(
                    target: "classifier",
                    urgency = %verdict.urgency_level(),
                    is_emergency = verdict.is_emergency(),
                    "backend classification received"
                );
                Ok(verdict)
            }
            Err(err) => {
                tracing::warn!(
                    target: "classifier",
                    error = %err,
                    "classification backend unavailable; using keyword heuristic"
                );
                Ok(fallback::classify(&request.text))
            }
        }
    }

    async fn classify_remote(
        &self,
        url: Url,
        request: &EmergencyRequest,
    ) -> Result<ClassificationVerdict> {
        let response = self
            .http
            .post(url)
            .timeout(self.classify_timeout)
            .json(request)
            .send()
            .await?
            .error_for_status()?;
        let verdict = response
            .json::<ClassificationVerdict>()
            .await
            .context("backend returned an unexpected classification body")?;
        Ok(verdict)
    }

    /// Sends up to [`MAX_BATCH_SIZE`] texts in one call. Oversized batches are
    /// rejected locally; backend failures are returned as errors.
    pub async fn classify_batch(&self, texts: &[String]) -> Result<Value> {
        validate_batch(texts)?;

        let url = self.endpoint("analyze/batch")?;
        let response = self
            .http
            .post(url)
            .timeout(self.request_timeout)
            .json(&BatchRequest { texts })
            .send()
            .await
            .context("batch analysis request failed")?
            .error_for_status()
            .context("batch analysis rejected by backend")?;
        let body = response.json::<Value>().await?;
        tracing::info!(target: "classifier", total = texts.len(), "batch analysis completed");
        Ok(body)
    }

    pub async fn health(&self) -> HealthReport {
        let frontend = ComponentHealth {
            status: "healthy".to_string(),
            version: FRONTEND_VERSION.to_string(),
        };

        match self.backend_health().await {
            Ok(backend) => HealthReport {
                status: "healthy".to_string(),
                timestamp: Utc::now().timestamp_millis(),
                frontend,
                backend,
            },
            Err(err) => {
                tracing::warn!(target: "classifier", error = %err, "backend health check failed");
                HealthReport {
                    status: "unhealthy".to_string(),
                    timestamp: Utc::now().timestamp_millis(),
                    frontend,
                    backend: json!({ "status": "unhealthy", "error": err.to_string() }),
                }
            }
        }
    }

    async fn backend_health(&self) -> Result<Value> {
        let response = self
            .http
            .get(self.endpoint("health")?)
            .timeout(self.classify_timeout)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Backend health check failed: {}", status.as_u16());
        }
        Ok(response.json::<Value>().await?)
    }
}

pub fn validate_batch(texts: &[String]) -> Result<(), ClientError> {
    if texts.len() > MAX_BATCH_SIZE {
        return Err(ClientError::BatchTooLarge {
            max: MAX_BATCH_SIZE,
            actual: texts.len(),
        });
    }
    Ok(())
}
