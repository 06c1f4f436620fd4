use axum::extract::FromRef;
use std::sync::Arc;

use crate::security::SignatureVerifier;
use crate::services::ChatRelay;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<ChatRelay>,
    pub verifier: Arc<SignatureVerifier>,
}

impl FromRef<AppState> for Arc<ChatRelay> {
    fn from_ref(state: &AppState) -> Self {
        state.relay.clone()
    }
}

impl FromRef<AppState> for Arc<SignatureVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.verifier.clone()
    }
}
