use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use std::sync::Arc;
use tracing::{debug, error, info, Instrument};
use uuid::Uuid;

use crate::models::WebhookPayload;
use crate::security::{SignatureVerifier, SIGNATURE_HEADER};
use crate::services::ChatRelay;
use crate::utils::ApiError;

/// LINE webhook endpoint.
///
/// Events are handled sequentially; a failing event is logged and does not
/// fail the delivery, so the platform does not redeliver the whole batch.
pub async fn callback(
    State(relay): State<Arc<ChatRelay>>,
    State(verifier): State<Arc<SignatureVerifier>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing signature header".to_string()))?;

    verifier.verify(&body, signature)?;

    let payload: WebhookPayload = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid webhook body: {}", e)))?;

    let request_id = Uuid::new_v4();
    let events = payload.into_events();
    info!(%request_id, events = events.len(), "Webhook received");

    for event in events {
        let kind = event.kind().to_string();
        let span = tracing::info_span!("event", %request_id, kind = %kind);

        match relay.handle_event(event).instrument(span).await {
            Ok(outcome) => debug!(%request_id, "Event {} handled: {:?}", kind, outcome),
            Err(e) => error!(%request_id, "Event {} failed: {:#}", kind, e),
        }
    }

    Ok((StatusCode::OK, "OK"))
}

pub async fn root_get() -> ApiError {
    ApiError::BadRequest("Webhook accepts POST only".to_string())
}
