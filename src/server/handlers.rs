use super::{ApiError, ServerState};
use crate::context::GateSignals;
use crate::pipeline::QuotesRequest;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub ok: bool,
    pub target_url: String,
    #[serde(flatten)]
    pub signals: GateSignals,
}

/// `/quotes` query string. Accepts camelCase and snake_case names.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotesQuery {
    #[serde(alias = "ready_timeout_ms")]
    pub ready_timeout_ms: Option<u64>,
    #[serde(alias = "poll_ms")]
    pub poll_ms: Option<u64>,
}

impl QuotesQuery {
    pub fn into_request(self, defaults: QuotesRequest) -> QuotesRequest {
        QuotesRequest {
            ready_timeout: self
                .ready_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.ready_timeout),
            poll_interval: self
                .poll_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
        }
    }
}

pub(super) async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let pipeline = state.pipeline();
    Json(HealthResponse {
        ok: true,
        target_url: pipeline.target().to_string(),
        signals: pipeline.context().signals(),
    })
}

pub(super) async fn quotes(
    State(state): State<ServerState>,
    query: Result<Query<QuotesQuery>, QueryRejection>,
) -> Response {
    let request = match query {
        Ok(Query(query)) => query.into_request(state.defaults),
        Err(rejection) => {
            warn!(error = %rejection, "rejected quotes query");
            return ApiError::invalid_request(rejection.body_text()).into_response();
        }
    };

    match state.pipeline.handle(request).await {
        Ok(response) => Json(response.payload.as_ref()).into_response(),
        Err(err) => ApiError::from_pipeline(&err, state.retry_after).into_response(),
    }
}

pub(super) async fn not_found() -> ApiError {
    ApiError::not_found()
}
