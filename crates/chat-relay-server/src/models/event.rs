use serde::Deserialize;
use tracing::warn;

// ===== WIRE MODELS (LINE webhook) =====

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub destination: String,
    /// Kept raw so one malformed event does not reject the whole batch.
    #[serde(default)]
    pub events: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    reply_token: Option<String>,
    #[serde(default)]
    source: Option<EventSource>,
    #[serde(default)]
    message: Option<RawMessage>,
    #[serde(default)]
    postback: Option<PostbackContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventSource {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RawMessage {
    Text {
        id: String,
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Sticker {
        package_id: String,
        sticker_id: String,
    },
    Audio {
        id: String,
        #[serde(default)]
        duration: Option<u64>,
    },
    Location {
        #[serde(default)]
        address: Option<String>,
        latitude: f64,
        longitude: f64,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct PostbackContent {
    data: String,
}

// ===== DOMAIN EVENTS =====

#[derive(Debug, Clone, PartialEq)]
pub struct TextEvent {
    pub reply_token: String,
    pub user_id: String,
    pub message_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StickerEvent {
    pub reply_token: String,
    pub user_id: String,
    pub package_id: String,
    pub sticker_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioEvent {
    pub reply_token: String,
    pub user_id: String,
    pub message_id: String,
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationEvent {
    pub reply_token: String,
    pub user_id: String,
    pub address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostbackEvent {
    pub reply_token: String,
    pub user_id: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostbackAction {
    Forget,
    Other(String),
}

impl PostbackEvent {
    /// Value of `action` in form-encoded postback data, e.g. `action=forget`.
    pub fn action(&self) -> Option<PostbackAction> {
        self.data
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| *k == "action")
            .map(|(_, v)| match v {
                "forget" => PostbackAction::Forget,
                other => PostbackAction::Other(other.to_string()),
            })
    }
}

/// Every inbound event the relay knows how to handle.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Text(TextEvent),
    Sticker(StickerEvent),
    Audio(AudioEvent),
    Location(LocationEvent),
    Postback(PostbackEvent),
    /// Follow, unfollow, group events, images, or anything without a reply
    /// token and user id.
    Unsupported { kind: String },
}

impl InboundEvent {
    pub fn kind(&self) -> &str {
        match self {
            InboundEvent::Text(_) => "text",
            InboundEvent::Sticker(_) => "sticker",
            InboundEvent::Audio(_) => "audio",
            InboundEvent::Location(_) => "location",
            InboundEvent::Postback(_) => "postback",
            InboundEvent::Unsupported { kind } => kind,
        }
    }

    fn from_raw(raw: RawEvent) -> Self {
        let source_kind = raw.source.as_ref().map(|s| s.kind.clone());
        let user_id = raw.source.and_then(|s| s.user_id);

        let (reply_token, user_id) = match (raw.reply_token, user_id) {
            (Some(token), Some(user)) if !token.is_empty() && !user.is_empty() => (token, user),
            _ => {
                return InboundEvent::Unsupported {
                    kind: format!("{}/{}", raw.kind, source_kind.unwrap_or_default()),
                }
            }
        };

        match (raw.kind.as_str(), raw.message, raw.postback) {
            ("message", Some(RawMessage::Text { id, text }), _) => InboundEvent::Text(TextEvent {
                reply_token,
                user_id,
                message_id: id,
                text,
            }),
            ("message", Some(RawMessage::Sticker { package_id, sticker_id }), _) => {
                InboundEvent::Sticker(StickerEvent {
                    reply_token,
                    user_id,
                    package_id,
                    sticker_id,
                })
            }
            ("message", Some(RawMessage::Audio { id, duration }), _) => {
                InboundEvent::Audio(AudioEvent {
                    reply_token,
                    user_id,
                    message_id: id,
                    duration_ms: duration,
                })
            }
            ("message", Some(RawMessage::Location { address, latitude, longitude }), _) => {
                InboundEvent::Location(LocationEvent {
                    reply_token,
                    user_id,
                    address,
                    latitude,
                    longitude,
                })
            }
            ("postback", _, Some(postback)) => InboundEvent::Postback(PostbackEvent {
                reply_token,
                user_id,
                data: postback.data,
            }),
            (kind, _, _) => InboundEvent::Unsupported {
                kind: kind.to_string(),
            },
        }
    }
}

impl WebhookPayload {
    pub fn into_events(self) -> Vec<InboundEvent> {
        self.events
            .into_iter()
            .map(|value| match serde_json::from_value::<RawEvent>(value) {
                Ok(raw) => InboundEvent::from_raw(raw),
                Err(e) => {
                    warn!("Skipping malformed webhook event: {}", e);
                    InboundEvent::Unsupported {
                        kind: "malformed".to_string(),
                    }
                }
            })
            .collect()
    }
}
