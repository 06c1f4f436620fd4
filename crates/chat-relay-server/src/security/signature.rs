use crate::utils::error::ApiError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Verifies `X-Line-Signature`: base64(HMAC-SHA256(channel_secret, raw body)).
#[derive(Clone)]
pub struct SignatureVerifier {
    channel_secret: String,
}

impl SignatureVerifier {
    pub fn new(channel_secret: String) -> Self {
        Self { channel_secret }
    }

    fn mac(&self) -> Result<HmacSha256, ApiError> {
        HmacSha256::new_from_slice(self.channel_secret.as_bytes())
            .map_err(|e| ApiError::InternalError(format!("HMAC error: {}", e)))
    }

    pub fn verify(&self, body: &[u8], signature: &str) -> Result<(), ApiError> {
        let provided = STANDARD.decode(signature.trim()).map_err(|_| {
            warn!("Webhook signature is not valid base64");
            ApiError::Unauthorized("Invalid signature".to_string())
        })?;

        let mut mac = self.mac()?;
        mac.update(body);

        // Constant-time comparison
        mac.verify_slice(&provided).map_err(|_| {
            warn!("Webhook signature mismatch ({} byte body)", body.len());
            ApiError::Unauthorized("Invalid signature".to_string())
        })?;

        debug!("Webhook signature verified");
        Ok(())
    }

    /// Signature the platform would send for `body`.
    pub fn sign(&self, body: &[u8]) -> Result<String, ApiError> {
        let mut mac = self.mac()?;
        mac.update(body);
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier").finish_non_exhaustive()
    }
}
