use crate::error_code::GateErrorCode;
use crate::pipeline::PipelineError;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::time::Duration;

/// Error body in FastAPI shape: `{"detail": ..., "code": ...}`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub detail: String,
    pub code: &'static str,
    #[serde(skip)]
    status: StatusCode,
    #[serde(skip)]
    retry_after: Option<Duration>,
}

impl ApiError {
    pub fn new(code: GateErrorCode, detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            code: code.name(),
            status: StatusCode::from_u16(code.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            retry_after: None,
        }
    }

    pub fn invalid_request(detail: impl Into<String>) -> Self {
        Self::new(GateErrorCode::InvalidRequest, detail)
    }

    pub fn not_found() -> Self {
        Self {
            detail: "Not Found".to_string(),
            code: "not_found",
            status: StatusCode::NOT_FOUND,
            retry_after: None,
        }
    }

    /// Map a pipeline failure; busy rejections carry `Retry-After`.
    pub fn from_pipeline(err: &PipelineError, retry_after: Duration) -> Self {
        let code = GateErrorCode::from(err);
        let mut api = Self::new(code, err.to_string());
        if code == GateErrorCode::AdmissionTimeout {
            api.retry_after = Some(retry_after);
        }
        api
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(&self)).into_response();
        if let Some(retry_after) = self.retry_after {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(retry_after.as_secs()),
            );
        }
        response
    }
}
