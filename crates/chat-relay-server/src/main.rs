use anyhow::{Context, Result};
use conversation_memory::{
    ConversationStore, FsObjectStore, HttpObjectStore, MemoryManager, MemoryObjectStore,
    ObjectStore,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use chat_relay_server::config::{Settings, StorageBackend, StorageConfig};
use chat_relay_server::security::SignatureVerifier;
use chat_relay_server::services::{ChatRelay, LineClient, LlmService, RelayOptions};
use chat_relay_server::utils::init_logger;
use chat_relay_server::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    init_logger()?;

    info!("🚀 Starting chat relay server...");

    // Load configuration
    let settings = Settings::load()?;
    info!("✅ Configuration loaded");

    let backend = build_object_store(&settings.storage)?;
    let memory = MemoryManager::new(ConversationStore::with_prefix(
        backend,
        settings.memory.prefix.clone(),
    ))
    .with_hasher(settings.memory.hasher())
    .with_retention(settings.memory.retention_policy()?)
    .with_window(settings.memory.context_window());
    info!(
        "✅ Conversation memory ready (backend: {:?}, key scheme: {:?}, window: {})",
        settings.storage.backend, settings.memory.key_scheme, settings.memory.window_turns
    );

    let platform = Arc::new(LineClient::new(&settings.line)?);
    let completion = Arc::new(LlmService::new(settings.llm.clone())?);

    let relay = Arc::new(ChatRelay::new(
        memory,
        platform,
        completion,
        RelayOptions::from_settings(&settings),
    ));

    let state = AppState {
        relay,
        verifier: Arc::new(SignatureVerifier::new(settings.line.channel_secret.clone())),
    };

    let app = build_router(state);

    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    info!("🎯 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_object_store(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>> {
    let store: Arc<dyn ObjectStore> = match config.backend {
        StorageBackend::Memory => {
            warn!("In-memory conversation store selected; history is lost on restart");
            Arc::new(MemoryObjectStore::new())
        }
        StorageBackend::Fs => {
            std::fs::create_dir_all(&config.root).with_context(|| {
                format!("Failed to create storage root {}", config.root.display())
            })?;
            Arc::new(FsObjectStore::new(config.root.clone()))
        }
        StorageBackend::Http => {
            let base_url = config
                .base_url
                .clone()
                .context("storage.base_url is required for the http backend")?;
            Arc::new(
                HttpObjectStore::new(base_url, config.bearer_token.clone(), config.timeout())
                    .context("Failed to create object store client")?,
            )
        }
    };

    Ok(store)
}
