//! External reports API client.
//!
//! Polls a reports endpoint that returns sighting-like records, either as a
//! bare JSON array or wrapped as `{"data": [...]}`.
//!
//! # Record shape
//!
//! ```json
//! { "id": "r-1", "type": "Urs", "latitude": 45.65, "longitude": 25.60,
//!   "description": "...", "posted": "2025-06-01T10:00:00Z" }
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::SourceBatch;
use crate::error::SourceError;

/// Client for the external reports API.
#[derive(Clone)]
pub struct ExternalReportsClient {
    client: reqwest::Client,
    url: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ReportsResponse {
    Bare(Vec<Value>),
    Wrapped { data: Vec<Value> },
}

impl ReportsResponse {
    fn into_values(self) -> Vec<Value> {
        match self {
            ReportsResponse::Bare(values) => values,
            ReportsResponse::Wrapped { data } => data,
        }
    }
}

impl ExternalReportsClient {
    /// Create a client for the given reports endpoint.
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch all reports currently published by the source.
    pub async fn fetch_reports(&self) -> Result<SourceBatch, SourceError> {
        self.get(&self.url).await
    }

    /// Fetch reports posted at or after `since`.
    ///
    /// The cut-off is sent as a `since` query parameter in RFC 3339 form.
    pub async fn fetch_reports_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<SourceBatch, SourceError> {
        let url = self.since_url(since);
        self.get(&url).await
    }

    fn since_url(&self, since: DateTime<Utc>) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}since={}",
            self.url,
            separator,
            urlencoding::encode(&since.to_rfc3339_opts(SecondsFormat::Secs, true))
        )
    }

    async fn get(&self, url: &str) -> Result<SourceBatch, SourceError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| SourceError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| SourceError::Http {
            url: url.to_string(),
            source,
        })?;

        let batch = parse_reports(&body)?;
        debug!(
            count = batch.records.len(),
            rejected = batch.rejected,
            "External reports fetched"
        );
        Ok(batch)
    }
}

/// Parse a reports response body.
///
/// Only a body that is not a list of entries fails; bad entries are counted
/// in [`SourceBatch::rejected`].
pub fn parse_reports(body: &str) -> Result<SourceBatch, SourceError> {
    let response: ReportsResponse = serde_json::from_str(body)?;
    Ok(SourceBatch::from_values(response.into_values()))
}
