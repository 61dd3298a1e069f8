use crate::client::FetchError;
use crate::extractor::ExtractError;
use crate::pipeline::PipelineError;
use thiserror::Error;

/// Where a configuration or runtime fault came from.
///
/// `field_path` names the offending setting as it is spelled in the settings
/// file (`"warn_pct"`, `"extra_delay_throttle"`) or the input it was read from
/// (`"target"`, `"GATE_CONFIG"`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    pub field_path: Option<String>,
    /// Offending value or the accepted range.
    pub details: Option<String>,
    /// Component that raised the error, e.g. `"settings"` or `"target_resolver"`.
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_path(self, path: impl Into<String>) -> Self {
        Self {
            field_path: Some(path.into()),
            ..self
        }
    }

    pub fn with_details(self, details: impl Into<String>) -> Self {
        Self {
            details: Some(details.into()),
            ..self
        }
    }

    pub fn with_source(self, source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..self
        }
    }
}

/// Unified error type for the gateway.
///
/// Request-path conditions (`Pipeline`) are the only ones surfaced to HTTP
/// callers with distinct statuses; the rest are startup or collaborator faults.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Request pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("Quotes fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Runtime error: {message}{}", format_context(.context))]
    Runtime {
        message: String,
        context: ErrorContext,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Settings file error: {0}")]
    Settings(#[from] serde_yaml::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new runtime error with structured context
    pub fn runtime_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Runtime {
            message: msg.into(),
            context,
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Runtime { context, .. } => Some(context),
            _ => None,
        }
    }
}
