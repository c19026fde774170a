use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use tracing::error;

use super::AppState;
use crate::error::{ErrorKind, PipelineError, Stage};

/// Liveness probe
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        port: state.port,
    })
}

#[derive(Serialize)]
pub struct HealthResponse {
    ok: bool,
    port: u16,
}

/// Unparsable bodies and non-string fields are treated as missing.
#[derive(Deserialize, Default)]
struct ProcessAddressRequest {
    #[serde(default)]
    address: Option<String>,
}

#[derive(Deserialize, Default)]
struct SgFetchRequest {
    #[serde(default)]
    docref: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stack: Option<String>,
}

impl ErrorBody {
    fn code(error: &'static str) -> Self {
        Self {
            error,
            message: None,
            kind: None,
            stage: None,
            stack: None,
        }
    }
}

/// Resolve an address into a preview pack.
pub async fn process_address_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request: ProcessAddressRequest = serde_json::from_slice(&body).unwrap_or_default();

    match state.pipeline.run(request.address.as_deref()).await {
        Ok(pack) => Json(pack).into_response(),
        Err(PipelineError::Validation(code)) => {
            (StatusCode::BAD_REQUEST, Json(ErrorBody::code(code))).into_response()
        }
        Err(e) => {
            let stack = e.diagnostic_chain();
            error!("/api/process_address failed: {}", stack);
            let body = ErrorBody {
                error: "process_address_failed",
                message: Some(e.message()),
                kind: Some(e.kind()),
                stage: Some(e.stage()),
                stack: state.expose_error_detail.then_some(stack),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

/// Run the survey-diagram tool for a document reference.
pub async fn sg_fetch_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request: SgFetchRequest = serde_json::from_slice(&body).unwrap_or_default();
    let docref = request.docref.as_deref().map(str::trim).unwrap_or_default();
    if docref.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(ErrorBody::code("missing_docref"))).into_response();
    }

    Json(state.sg.fetch(docref).await).into_response()
}
