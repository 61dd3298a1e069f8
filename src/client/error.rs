use crate::error_code::GateErrorCode;
use std::time::Duration;
use thiserror::Error;

/// Longest body excerpt kept on a failed fetch, in characters.
pub const BODY_SNIPPET_LIMIT: usize = 1000;

pub(crate) fn snippet(body: &str) -> String {
    body.chars().take(BODY_SNIPPET_LIMIT).collect()
}

fn busy_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(d) => format!(": {}", d),
        None => String::new(),
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server busy{}", busy_suffix(.detail))]
    Busy {
        retry_after: Option<Duration>,
        detail: Option<String>,
    },

    #[error("HTTP error: {status}")]
    Http { status: u16, body_snippet: String },

    #[error("invalid JSON response: {reason}")]
    InvalidBody {
        status: u16,
        reason: String,
        body_snippet: String,
    },

    #[error("upstream returned ok=false")]
    NotOk {
        status: u16,
        response: serde_json::Value,
    },
}

impl FetchError {
    /// HTTP status of the response, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Busy { .. } => Some(429),
            Self::Http { status, .. }
            | Self::InvalidBody { status, .. }
            | Self::NotOk { status, .. } => Some(*status),
        }
    }

    pub fn body_snippet(&self) -> Option<&str> {
        match self {
            Self::Http { body_snippet, .. } | Self::InvalidBody { body_snippet, .. } => {
                Some(body_snippet)
            }
            _ => None,
        }
    }

    pub fn code(&self) -> GateErrorCode {
        match self {
            Self::Busy { .. } => GateErrorCode::AdmissionTimeout,
            Self::Http { status, .. } => GateErrorCode::from_http_status(*status),
            _ => GateErrorCode::Unknown,
        }
    }

    /// Worth retrying after a short pause.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            other => other.code().retryable(),
        }
    }
}
