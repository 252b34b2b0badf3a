//! Mark-consumed collaborator
//!
//! Signals to an external messaging system that an item has been fully
//! presented to the user. Fire-and-forget from the orchestrator's
//! perspective: failures are logged, never retried, and never block
//! playback.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Consumption notification boundary
#[async_trait]
pub trait ConsumptionNotifier: Send + Sync {
    async fn mark_consumed(&self, source_id: &str, item_ids: &[String]) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct ConsumedRequest<'a> {
    source_id: &'a str,
    item_ids: &'a [String],
}

/// HTTP consumption notifier
pub struct HttpConsumptionNotifier {
    http: reqwest::Client,
    base_url: String,
}

impl HttpConsumptionNotifier {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Internal(format!("http client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ConsumptionNotifier for HttpConsumptionNotifier {
    async fn mark_consumed(&self, source_id: &str, item_ids: &[String]) -> Result<()> {
        let url = format!("{}/consumed", self.base_url);
        self.http
            .post(&url)
            .json(&ConsumedRequest {
                source_id,
                item_ids,
            })
            .send()
            .await
            .map_err(|e| Error::Http(format!("mark-consumed failed: {}", e)))?
            .error_for_status()
            .map_err(|e| Error::Http(format!("mark-consumed rejected: {}", e)))?;
        Ok(())
    }
}

/// Notifier used when no consumption endpoint is configured
pub struct NullConsumptionNotifier;

#[async_trait]
impl ConsumptionNotifier for NullConsumptionNotifier {
    async fn mark_consumed(&self, source_id: &str, item_ids: &[String]) -> Result<()> {
        debug!(source_id, count = item_ids.len(), "consumption endpoint not configured");
        Ok(())
    }
}
