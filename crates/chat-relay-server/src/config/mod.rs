pub mod settings;

pub use settings::{
    LineConfig, LlmConfig, MemoryConfig, PromptsConfig, RepliesConfig, ServerConfig, Settings,
    StorageBackend, StorageConfig,
};
