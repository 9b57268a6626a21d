//! Flow listing

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use super::errors::ApiError;
use crate::server::{AuthflowServer, FlowSummary};

/// Response for listing flows
#[derive(Debug, Serialize)]
pub struct ListFlowsResponse {
    /// Active flows, ordered by route
    pub flows: Vec<FlowSummary>,
}

/// List the active flows of a realm
pub async fn list_flows(
    State(server): State<Arc<AuthflowServer>>,
    Path((tenant, realm)): Path<(String, String)>,
) -> Result<Json<ListFlowsResponse>, ApiError> {
    let flows = server.list_flows(&tenant, &realm).await?;
    Ok(Json(ListFlowsResponse { flows }))
}
