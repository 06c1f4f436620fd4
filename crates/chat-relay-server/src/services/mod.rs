pub mod line_client;
pub mod llm_service;
pub mod prompt;
pub mod relay;

pub use line_client::{LineClient, MessagingPlatform, UserProfile};
pub use llm_service::{CompletionProvider, LlmService};
pub use relay::{ChatRelay, EventOutcome, RelayOptions};
