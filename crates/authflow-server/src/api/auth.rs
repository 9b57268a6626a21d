//! Flow round trip handlers

use authflow_core::SubmittedInput;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::errors::ApiError;
use super::SESSION_HEADER;
use crate::server::{AuthflowServer, FlowResponse};

/// Body of a form submission
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    /// Chosen transition, when the node offers several
    #[serde(default)]
    pub action: Option<String>,

    /// Submitted field values
    #[serde(default)]
    pub fields: HashMap<String, String>,
}

impl From<SubmitRequest> for SubmittedInput {
    fn from(request: SubmitRequest) -> Self {
        SubmittedInput {
            action: request.action,
            fields: request.fields,
        }
    }
}

/// Start a session, or re-render the current node of an existing one
pub async fn start_or_resume(
    State(server): State<Arc<AuthflowServer>>,
    Path((tenant, realm, route)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let response = server
        .advance(&tenant, &realm, &route, session_id(&headers), None)
        .await?;
    Ok(into_http(response))
}

/// Submit input for the session's current node
pub async fn submit(
    State(server): State<Arc<AuthflowServer>>,
    Path((tenant, realm, route)): Path<(String, String, String)>,
    headers: HeaderMap,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let response = server
        .advance(
            &tenant,
            &realm,
            &route,
            session_id(&headers),
            Some(request.into()),
        )
        .await?;
    Ok(into_http(response))
}

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

fn into_http(response: FlowResponse) -> Response {
    let status = match &response {
        FlowResponse::Error { retryable: true, .. } => StatusCode::SERVICE_UNAVAILABLE,
        FlowResponse::Error { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::OK,
    };
    (status, Json(response)).into_response()
}
