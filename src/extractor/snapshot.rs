//! JSON quotes snapshot reader.

use super::{ExtractError, Extractor, Row};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use url::Url;

/// Floor for the readiness poll so a zero interval still yields.
const MIN_READY_POLL: Duration = Duration::from_millis(10);
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Either a bare array of rows or an object wrapping them.
#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotDocument {
    Rows(Vec<Option<Row>>),
    Wrapped {
        #[serde(default)]
        rows: Vec<Option<Row>>,
    },
}

impl SnapshotDocument {
    fn into_rows(self) -> Vec<Row> {
        let (Self::Rows(rows) | Self::Wrapped { rows }) = self;
        rows.into_iter().flatten().map(Row::normalized).collect()
    }
}

/// Reads quote rows from a `file://` path or an `http(s)://` endpoint.
///
/// Data counts as ready once the first row carries a non-empty value.
#[derive(Debug, Clone)]
pub struct SnapshotExtractor {
    url: Url,
    target: String,
    http: reqwest::Client,
}

impl SnapshotExtractor {
    pub fn new(url: Url) -> Result<Self> {
        match url.scheme() {
            "file" | "http" | "https" => {}
            other => {
                return Err(Error::configuration_with_context(
                    format!("unsupported target scheme '{}'", other),
                    ErrorContext::new()
                        .with_field_path("target")
                        .with_details("expected file, http or https")
                        .with_source("snapshot_extractor"),
                ))
            }
        }
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| {
                Error::runtime_with_context(
                    "failed to build snapshot HTTP client",
                    ErrorContext::new()
                        .with_details(e.to_string())
                        .with_source("snapshot_extractor"),
                )
            })?;
        Ok(Self {
            target: url.to_string(),
            url,
            http,
        })
    }

    async fn fetch(&self) -> std::result::Result<Vec<Row>, ExtractError> {
        let body = if self.url.scheme() == "file" {
            let path = self
                .url
                .to_file_path()
                .map_err(|_| ExtractError::UnsupportedScheme(self.target.clone()))?;
            tokio::fs::read(&path)
                .await
                .map_err(|source| ExtractError::Read {
                    target: self.target.clone(),
                    source,
                })?
        } else {
            self.http
                .get(self.url.clone())
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?
                .to_vec()
        };
        let doc: SnapshotDocument = serde_json::from_slice(&body)?;
        Ok(doc.into_rows())
    }
}

#[async_trait]
impl Extractor for SnapshotExtractor {
    fn target(&self) -> &str {
        &self.target
    }

    async fn is_ready(&self, timeout: Duration, poll: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let poll = poll.max(MIN_READY_POLL);
        while Instant::now() < deadline {
            // A hanging fetch must not outlive the caller's budget.
            let budget = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(budget, self.fetch()).await {
                Ok(Ok(rows)) if rows.first().map_or(false, |r| r.value.is_some()) => return true,
                Ok(Ok(_)) => debug!(url = %self.target, "snapshot present but not populated"),
                Ok(Err(err)) => {
                    debug!(url = %self.target, error = %err, "snapshot not readable yet")
                }
                Err(_) => {
                    debug!(
                        url = %self.target,
                        budget_ms = budget.as_millis() as u64,
                        "snapshot fetch outlasted readiness budget"
                    );
                    break;
                }
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            tokio::time::sleep(poll.min(remaining)).await;
        }
        false
    }

    async fn run(&self) -> std::result::Result<Vec<Row>, ExtractError> {
        let rows: Vec<Row> = self
            .fetch()
            .await?
            .into_iter()
            .filter(|row| !row.is_blank())
            .collect();
        debug!(url = %self.target, rows = rows.len(), "snapshot extracted");
        Ok(rows)
    }
}
