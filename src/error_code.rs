//! Stable error codes for request-path failures.
//!
//! Every condition that reaches an HTTP caller is classified into a
//! [`GateErrorCode`], which carries the transport status, retry semantics and
//! a short machine-readable name. The server uses it to build responses and
//! the quotes client uses [`GateErrorCode::from_http_status`] to interpret
//! them.
//!
//! | Prefix | Category  | Description                                |
//! |--------|-----------|--------------------------------------------|
//! | E1xxx  | client    | Malformed request parameters               |
//! | E2xxx  | admission | Rejected before any resource work started  |
//! | E3xxx  | resource  | Failed after admission, at the resource    |
//! | E9xxx  | unknown   | Catch-all                                  |
//!
//! ```rust
//! use quote_gate::error_code::GateErrorCode;
//!
//! let code = GateErrorCode::from_http_status(429);
//! assert_eq!(code.code(), "E2001");
//! assert!(code.retryable());
//! assert_eq!(code.category(), "admission");
//! ```

use crate::pipeline::PipelineError;
use crate::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateErrorCode {
    /// E1001: Query parameters could not be parsed
    InvalidRequest,
    /// E2001: No admission slot within the level's patience budget
    AdmissionTimeout,
    /// E3001: Internal fault while serving the request
    Internal,
    /// E3003: Resource never signalled readiness within the caller's budget
    ExtractionTimeout,
    /// E9999: Could not be classified
    Unknown,
}

impl GateErrorCode {
    #[inline]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "E1001",
            Self::AdmissionTimeout => "E2001",
            Self::Internal => "E3001",
            Self::ExtractionTimeout => "E3003",
            Self::Unknown => "E9999",
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::AdmissionTimeout => "admission_timeout",
            Self::Internal => "internal",
            Self::ExtractionTimeout => "extraction_timeout",
            Self::Unknown => "unknown",
        }
    }

    /// HTTP status used when this code is surfaced to a caller.
    #[inline]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest => 400,
            Self::AdmissionTimeout => 429,
            Self::Internal | Self::Unknown => 500,
            Self::ExtractionTimeout => 504,
        }
    }

    /// Both timeouts are transient: the caller may try again shortly.
    #[inline]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::AdmissionTimeout | Self::ExtractionTimeout)
    }

    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "client",
            Self::AdmissionTimeout => "admission",
            Self::Internal | Self::ExtractionTimeout => "resource",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_http_status(status: u16) -> Self {
        match status {
            400 | 422 => Self::InvalidRequest,
            429 => Self::AdmissionTimeout,
            500 => Self::Internal,
            504 => Self::ExtractionTimeout,
            _ => Self::Unknown,
        }
    }

    pub fn of(err: &Error) -> Self {
        match err {
            Error::Pipeline(p) => Self::from(p),
            Error::Fetch(f) => f.code(),
            Error::Configuration { .. } => Self::InvalidRequest,
            Error::Extract(_) | Error::Runtime { .. } | Error::Io(_) => Self::Internal,
            _ => Self::Unknown,
        }
    }
}

impl From<&PipelineError> for GateErrorCode {
    fn from(err: &PipelineError) -> Self {
        match err {
            PipelineError::AdmissionTimeout { .. } => Self::AdmissionTimeout,
            PipelineError::ExtractionTimeout { .. } => Self::ExtractionTimeout,
        }
    }
}

impl fmt::Display for GateErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
