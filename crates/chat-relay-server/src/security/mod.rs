pub mod signature;

pub use signature::{SignatureVerifier, SIGNATURE_HEADER};
