use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use conversation_memory::MemoryManager;
use tracing::{debug, error, info, warn};

use crate::config::{RepliesConfig, Settings};
use crate::models::chat::ChatMessage;
use crate::models::event::{InboundEvent, PostbackAction, PostbackEvent, StickerEvent, TextEvent};
use crate::models::reply::{split_reply, ReplyMessage};
use crate::services::line_client::MessagingPlatform;
use crate::services::llm_service::CompletionProvider;
use crate::services::prompt::build_messages;

#[derive(Debug, Clone)]
pub struct RelayOptions {
    pub system_prompt: String,
    pub replies: RepliesConfig,
    pub completion_attempts: u32,
    pub retry_backoff: Duration,
}

impl RelayOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            system_prompt: settings.prompts.system_prompt.clone(),
            replies: settings.replies.clone(),
            completion_attempts: settings.llm.max_attempts,
            retry_backoff: Duration::from_millis(settings.llm.retry_backoff_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Replied,
    Ignored,
}

/// Routes webhook events to memory, completion and the messaging platform.
pub struct ChatRelay {
    memory: MemoryManager,
    platform: Arc<dyn MessagingPlatform>,
    completion: Arc<dyn CompletionProvider>,
    options: RelayOptions,
}

impl ChatRelay {
    pub fn new(
        memory: MemoryManager,
        platform: Arc<dyn MessagingPlatform>,
        completion: Arc<dyn CompletionProvider>,
        options: RelayOptions,
    ) -> Self {
        Self {
            memory,
            platform,
            completion,
            options,
        }
    }

    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    pub async fn handle_event(&self, event: InboundEvent) -> Result<EventOutcome> {
        match event {
            InboundEvent::Text(text) => self.handle_text(text).await,
            InboundEvent::Sticker(sticker) => self.handle_sticker(sticker).await,
            InboundEvent::Audio(audio) => {
                self.reply_fixed(&audio.reply_token, &self.options.replies.unsupported)
                    .await
            }
            InboundEvent::Location(location) => {
                self.reply_fixed(&location.reply_token, &self.options.replies.unsupported)
                    .await
            }
            InboundEvent::Postback(postback) => self.handle_postback(postback).await,
            InboundEvent::Unsupported { kind } => {
                debug!("Ignoring event: {}", kind);
                Ok(EventOutcome::Ignored)
            }
        }
    }

    async fn handle_text(&self, event: TextEvent) -> Result<EventOutcome> {
        let user_id = self.resolve_user_id(&event.user_id).await;

        let context = self.memory.load_context(&user_id).await;
        info!(
            memory_key = %context.key,
            origin = context.origin.as_str(),
            window = context.window().len(),
            "Loaded conversation context"
        );

        let messages = build_messages(context.window(), &event.text);

        let answer = match self.complete_with_retry(&messages).await {
            Ok(answer) => answer,
            Err(e) => {
                error!("Completion failed for message {}: {:#}", event.message_id, e);
                return self
                    .reply_fixed(&event.reply_token, &self.options.replies.completion_failed)
                    .await;
            }
        };

        self.platform
            .reply(&event.reply_token, split_reply(&answer))
            .await
            .context("Failed to send reply")?;

        if let Err(e) = self
            .memory
            .persist_turn(context, &event.text, &answer)
            .await
        {
            warn!("Failed to persist conversation: {}", e);
        }

        Ok(EventOutcome::Replied)
    }

    async fn handle_sticker(&self, event: StickerEvent) -> Result<EventOutcome> {
        self.platform
            .reply(
                &event.reply_token,
                vec![ReplyMessage::sticker(event.package_id, event.sticker_id)],
            )
            .await
            .context("Failed to echo sticker")?;

        Ok(EventOutcome::Replied)
    }

    async fn handle_postback(&self, event: PostbackEvent) -> Result<EventOutcome> {
        match event.action() {
            Some(PostbackAction::Forget) => {
                // Same identity resolution as the text path, so both address one key
                let user_id = self.resolve_user_id(&event.user_id).await;
                let key = self
                    .memory
                    .forget(&user_id)
                    .await
                    .context("Failed to forget conversation")?;
                debug!(memory_key = %key, "Forget requested via postback");

                self.reply_fixed(&event.reply_token, &self.options.replies.forget_ack)
                    .await
            }
            other => {
                debug!("Ignoring postback action {:?}", other);
                Ok(EventOutcome::Ignored)
            }
        }
    }

    /// Profile user id, or the event's source id when the lookup fails.
    async fn resolve_user_id(&self, source_user_id: &str) -> String {
        match self.platform.user_profile(source_user_id).await {
            Ok(profile) => profile.user_id,
            Err(e) => {
                warn!("Profile lookup failed, using source user id: {}", e);
                source_user_id.to_string()
            }
        }
    }

    async fn complete_with_retry(&self, messages: &[ChatMessage]) -> Result<String> {
        let attempts = self.options.completion_attempts.max(1);
        let mut last_error = anyhow::anyhow!("No completion attempted");

        for attempt in 1..=attempts {
            match self
                .completion
                .complete(&self.options.system_prompt, messages)
                .await
            {
                Ok(answer) if !answer.trim().is_empty() => return Ok(answer),
                Ok(_) => last_error = anyhow::anyhow!("Empty completion"),
                Err(e) => last_error = e,
            }

            if attempt < attempts {
                warn!(
                    "Completion attempt {}/{} failed: {}",
                    attempt, attempts, last_error
                );
                tokio::time::sleep(self.options.retry_backoff * attempt).await;
            }
        }

        Err(last_error.context(format!("Completion failed after {} attempts", attempts)))
    }

    async fn reply_fixed(&self, reply_token: &str, text: &str) -> Result<EventOutcome> {
        self.platform
            .reply(reply_token, vec![ReplyMessage::text(text)])
            .await
            .context("Failed to send reply")?;

        Ok(EventOutcome::Replied)
    }
}
