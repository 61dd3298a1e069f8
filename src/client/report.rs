use super::error::FetchError;
use super::quotes::QuotesFetch;
use crate::extractor::Row;
use crate::load::LoadLevel;
use serde::Serialize;
use std::time::Duration;

/// Flat record of one fetch attempt.
#[derive(Debug, Clone, Serialize)]
pub struct FetchReport {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub upstream_url: String,
    /// Zero when no response arrived.
    pub upstream_http_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_body_snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_response: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
    pub took_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<LoadLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Row>>,
}

impl FetchReport {
    pub fn success(url: String, fetch: QuotesFetch) -> Self {
        Self {
            ok: true,
            error: None,
            upstream_url: url,
            upstream_http_code: fetch.status,
            upstream_body_snippet: None,
            upstream_response: None,
            retry_after_secs: None,
            took_ms: fetch.took.as_millis() as u64,
            level: fetch.level,
            rows: Some(fetch.rows),
        }
    }

    pub fn failure(url: String, err: FetchError, took: Duration) -> Self {
        let error = err.to_string();
        let upstream_http_code = err.status().unwrap_or(0);
        let upstream_body_snippet = err.body_snippet().map(str::to_string);
        let (upstream_response, retry_after_secs) = match err {
            FetchError::NotOk { response, .. } => (Some(response), None),
            FetchError::Busy { retry_after, .. } => (None, retry_after.map(|d| d.as_secs())),
            _ => (None, None),
        };
        Self {
            ok: false,
            error: Some(error),
            upstream_url: url,
            upstream_http_code,
            upstream_body_snippet,
            upstream_response,
            retry_after_secs,
            took_ms: took.as_millis() as u64,
            level: None,
            rows: None,
        }
    }
}
