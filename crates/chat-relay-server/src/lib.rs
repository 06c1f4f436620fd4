//! LINE chat relay: verifies webhook deliveries, answers text messages through
//! a chat-completion API and keeps per-user memory in `conversation-memory`.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod security;
pub mod services;
pub mod state;
pub mod utils;

pub use router::build_router;
pub use state::AppState;
