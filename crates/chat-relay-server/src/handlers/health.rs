use axum::{extract::State, http::StatusCode, Json};
use conversation_memory::MemoryKey;
use serde::Serialize;
use std::sync::Arc;

use crate::services::ChatRelay;
use crate::utils::ApiError;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Ready once the conversation store answers a metadata probe.
pub async fn readiness_check(State(relay): State<Arc<ChatRelay>>) -> Result<StatusCode, ApiError> {
    relay
        .memory()
        .store()
        .exists(MemoryKey::new(0))
        .await
        .map_err(|e| ApiError::Unavailable(format!("Conversation store unreachable: {}", e)))?;

    Ok(StatusCode::OK)
}
