//! The serialized resource behind the gateway.
//!
//! An [`Extractor`] is the only thing that touches the underlying resource.
//! The gateway asks it two questions, always from inside the pipeline's
//! single-holder resource section: is the data ready, and what are the rows.
//! Extraction may fail outright or come back short; both are tolerated by the
//! pipeline.
//!
//! [`SnapshotExtractor`] is the bundled implementation: it reads a JSON quotes
//! snapshot from a local file or an HTTP endpoint.

mod snapshot;
mod target;

pub use snapshot::SnapshotExtractor;
pub use target::resolve_target;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

/// One quote line. Every field is optional text, exactly as scraped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Row {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Value", default)]
    pub value: Option<String>,
    #[serde(rename = "Change", default)]
    pub change: Option<String>,
    #[serde(rename = "Chg%", default)]
    pub change_percent: Option<String>,
    #[serde(rename = "Open", default)]
    pub open: Option<String>,
    #[serde(rename = "High", default)]
    pub high: Option<String>,
    #[serde(rename = "Low", default)]
    pub low: Option<String>,
    #[serde(rename = "Prev", default)]
    pub prev_close: Option<String>,
}

impl Row {
    /// Shorthand for the common name/value pair; other fields stay empty.
    pub fn named(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// Trim every field and turn empty text into `None`.
    pub fn normalized(self) -> Self {
        fn clean(field: Option<String>) -> Option<String> {
            field
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        }
        Self {
            name: clean(self.name),
            value: clean(self.value),
            change: clean(self.change),
            change_percent: clean(self.change_percent),
            open: clean(self.open),
            high: clean(self.high),
            low: clean(self.low),
            prev_close: clean(self.prev_close),
        }
    }

    /// A row with neither a name nor a value carries nothing worth returning.
    pub fn is_blank(&self) -> bool {
        self.name.is_none() && self.value.is_none()
    }
}

/// Drop rows equal in every field to an earlier row, keeping first-seen order.
pub fn dedup_rows(rows: Vec<Row>) -> Vec<Row> {
    let mut seen = HashSet::with_capacity(rows.len());
    rows.into_iter().filter(|row| seen.insert(row.clone())).collect()
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read snapshot {target}: {source}")]
    Read {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unsupported target scheme: {0}")]
    UnsupportedScheme(String),

    #[error("resource unavailable: {0}")]
    Unavailable(String),
}

/// Access to the single shared resource.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Where the data comes from, as reported by `/health`.
    fn target(&self) -> &str;

    /// Poll until data is present, sleeping `poll` between attempts, for at
    /// most `timeout`. Never fails; `false` means not ready in time.
    async fn is_ready(&self, timeout: Duration, poll: Duration) -> bool;

    /// Read the current rows. May fail or return fewer rows than exist.
    async fn run(&self) -> Result<Vec<Row>, ExtractError>;
}
