use anyhow::Result;
use config::{Config, Environment, File};
use conversation_memory::{
    ContextWindow, IdentityHasher, KeyScheme, RetentionPolicy, RetentionPreset,
    DEFAULT_WINDOW_TURNS,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub line: LineConfig,
    pub llm: LlmConfig,
    pub prompts: PromptsConfig,
    #[serde(default)]
    pub replies: RepliesConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LineConfig {
    pub channel_secret: String,
    pub channel_access_token: String,
    #[serde(default = "default_line_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_seconds: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PromptsConfig {
    pub system_prompt: String,
}

/// Fixed reply texts for events that never reach the model.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RepliesConfig {
    pub unsupported: String,
    pub forget_ack: String,
    pub completion_failed: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MemoryConfig {
    #[serde(default = "default_retention_preset")]
    pub retention_preset: RetentionPreset,
    /// Overrides the preset when set.
    #[serde(default)]
    pub retention_minutes: Option<i64>,
    #[serde(default = "default_window_turns")]
    pub window_turns: usize,
    #[serde(default)]
    pub key_scheme: KeyScheme,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory, // Lost on restart
    Fs,     // Local directory
    Http,   // REST blob gateway
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub backend: StorageBackend,
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub bearer_token: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_line_api_base_url() -> String {
    "https://api.line.me".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_retention_preset() -> RetentionPreset {
    RetentionPreset::Assistant
}

fn default_window_turns() -> usize {
    DEFAULT_WINDOW_TURNS
}

fn default_prefix() -> String {
    "text/".to_string()
}

fn default_storage_backend() -> StorageBackend {
    StorageBackend::Fs
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("data")
}

impl Default for RepliesConfig {
    fn default() -> Self {
        Self {
            unsupported: "ごめんね、そのメッセージにはまだ対応していないよ。".to_string(),
            forget_ack: "これまでの会話を忘れたよ。また最初から話そう！".to_string(),
            completion_failed:
                "ごめんね、今ちょっと調子が悪いみたい。少し待ってからもう一度送ってね。"
                    .to_string(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            retention_preset: default_retention_preset(),
            retention_minutes: None,
            window_turns: default_window_turns(),
            key_scheme: KeyScheme::default(),
            prefix: default_prefix(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            root: default_storage_root(),
            base_url: None,
            bearer_token: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl MemoryConfig {
    pub fn retention_policy(&self) -> Result<RetentionPolicy> {
        match self.retention_minutes {
            Some(minutes) => RetentionPolicy::from_minutes(minutes).ok_or_else(|| {
                anyhow::anyhow!("memory.retention_minutes out of range: {}", minutes)
            }),
            None => Ok(RetentionPolicy::preset(self.retention_preset)),
        }
    }

    pub fn context_window(&self) -> ContextWindow {
        ContextWindow::new(self.window_turns)
    }

    pub fn hasher(&self) -> IdentityHasher {
        IdentityHasher::new(self.key_scheme)
    }
}

impl StorageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/settings").required(false))
            // Example: APP__LINE__CHANNEL_SECRET=...
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.line.channel_secret.trim().is_empty() {
            anyhow::bail!("line.channel_secret must be set");
        }
        if self.line.channel_access_token.trim().is_empty() {
            anyhow::bail!("line.channel_access_token must be set");
        }
        if self.llm.api_key.trim().is_empty() {
            anyhow::bail!("llm.api_key must be set");
        }
        if self.llm.max_attempts == 0 {
            anyhow::bail!("llm.max_attempts must be at least 1");
        }
        if let Some(minutes) = self.memory.retention_minutes {
            if minutes <= 0 {
                anyhow::bail!("memory.retention_minutes must be positive, got {}", minutes);
            }
        }
        self.memory.retention_policy()?;
        if self.storage.backend == StorageBackend::Http
            && self.storage.base_url.as_deref().map_or(true, |u| u.trim().is_empty())
        {
            anyhow::bail!("storage.base_url is required for the http backend");
        }
        Ok(())
    }
}
