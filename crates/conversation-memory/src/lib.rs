//! Conversation memory for the chat relay
//!
//! Short-lived per-user history kept in an object store:
//! - Identity hashing of platform user ids into numeric memory keys
//! - One JSONL record per key (memory, filesystem or HTTP blob backends)
//! - Lazy age-based expiry on the read path
//! - Bounded trailing window of turns replayed to the model

pub mod error;
pub mod key;
pub mod manager;
pub mod record;
pub mod retention;
pub mod store;
pub mod window;

pub use error::{MemoryError, MemoryResult, TransportError};
pub use key::{IdentityHasher, KeyScheme, MemoryKey, KEY_MODULUS};
pub use manager::{HistoryOrigin, MemoryManager, TurnContext};
pub use record::{ConversationRecord, Turn};
pub use retention::{RetentionDecision, RetentionPolicy, RetentionPreset};
pub use store::{
    ConversationStore, FsObjectStore, HttpObjectStore, MemoryObjectStore, ObjectMeta, ObjectStore,
};
pub use window::{ContextWindow, DEFAULT_WINDOW_TURNS};
