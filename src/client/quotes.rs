use super::error::{snippet, FetchError};
use super::report::FetchReport;
use crate::extractor::Row;
use crate::load::LoadLevel;
use crate::{Error, ErrorContext, Result};
use reqwest::header::{ACCEPT, RETRY_AFTER};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// A successful `/quotes` call.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotesFetch {
    pub status: u16,
    pub rows: Vec<Row>,
    /// Level the gateway stamped on the payload, if it sent one.
    pub level: Option<LoadLevel>,
    pub took: Duration,
}

#[derive(Debug, Clone)]
pub struct QuotesClient {
    http: reqwest::Client,
    base: Url,
    ready_timeout: Option<Duration>,
    poll_interval: Option<Duration>,
}

impl QuotesClient {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(6);

    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Self::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(base_url.trim()).map_err(|e| {
            Error::configuration_with_context(
                "invalid gateway URL",
                ErrorContext::new()
                    .with_field_path("base_url")
                    .with_details(format!("{}: {}", base_url, e))
                    .with_source("quotes_client"),
            )
        })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("quote-gate-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                Error::runtime_with_context(
                    "failed to build HTTP client",
                    ErrorContext::new()
                        .with_details(e.to_string())
                        .with_source("quotes_client"),
                )
            })?;

        Ok(Self {
            http,
            base,
            ready_timeout: None,
            poll_interval: None,
        })
    }

    /// Ask the gateway to wait at most `timeout` for readiness.
    pub fn ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = Some(timeout);
        self
    }

    pub fn poll_interval(mut self, poll: Duration) -> Self {
        self.poll_interval = Some(poll);
        self
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        url.set_path(&format!("{}{}", self.base.path(), path));
        url
    }

    pub fn quotes_url(&self) -> Url {
        let mut url = self.endpoint("quotes");
        if self.ready_timeout.is_some() || self.poll_interval.is_some() {
            let mut query = url.query_pairs_mut();
            if let Some(t) = self.ready_timeout {
                query.append_pair("readyTimeoutMs", &t.as_millis().to_string());
            }
            if let Some(p) = self.poll_interval {
                query.append_pair("pollMs", &p.as_millis().to_string());
            }
        }
        url
    }

    pub fn health_url(&self) -> Url {
        self.endpoint("health")
    }

    async fn get_json(&self, url: Url) -> std::result::Result<(u16, Value), FetchError> {
        let response = self
            .http
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status().as_u16();

        if status == 429 {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let detail = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|v| v.get("detail").and_then(Value::as_str).map(str::to_string));
            return Err(FetchError::Busy {
                retry_after,
                detail,
            });
        }

        let body = response.text().await?;
        if !(200..300).contains(&status) {
            return Err(FetchError::Http {
                status,
                body_snippet: snippet(&body),
            });
        }

        match serde_json::from_str::<Value>(&body) {
            Ok(value) if value.is_object() => Ok((status, value)),
            Ok(_) => Err(FetchError::InvalidBody {
                status,
                reason: "expected a JSON object".to_string(),
                body_snippet: snippet(&body),
            }),
            Err(e) => Err(FetchError::InvalidBody {
                status,
                reason: e.to_string(),
                body_snippet: snippet(&body),
            }),
        }
    }

    pub async fn fetch_quotes(&self) -> std::result::Result<QuotesFetch, FetchError> {
        let started = Instant::now();
        let (status, mut value) = self.get_json(self.quotes_url()).await?;

        if value.get("ok") != Some(&Value::Bool(true)) {
            return Err(FetchError::NotOk {
                status,
                response: value,
            });
        }

        let rows = match value.get_mut("rows").map(Value::take) {
            Some(rows @ Value::Array(_)) => {
                serde_json::from_value(rows).map_err(|e| FetchError::InvalidBody {
                    status,
                    reason: format!("malformed rows: {}", e),
                    body_snippet: String::new(),
                })?
            }
            _ => Vec::new(),
        };
        let level = value
            .get("level")
            .cloned()
            .and_then(|l| serde_json::from_value(l).ok());
        let took = started.elapsed();
        debug!(status, rows = rows.len(), took_ms = took.as_millis() as u64, "quotes fetched");

        Ok(QuotesFetch {
            status,
            rows,
            level,
            took,
        })
    }

    /// One fetch, folded into a report that never fails.
    pub async fn fetch_report(&self) -> FetchReport {
        let started = Instant::now();
        let url = self.quotes_url().to_string();
        match self.fetch_quotes().await {
            Ok(fetch) => FetchReport::success(url, fetch),
            Err(err) => FetchReport::failure(url, err, started.elapsed()),
        }
    }

    pub async fn health(&self) -> std::result::Result<Value, FetchError> {
        self.get_json(self.health_url()).await.map(|(_, v)| v)
    }
}
