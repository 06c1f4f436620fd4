use serde::Serialize;

/// The platform accepts at most this many messages per reply token.
pub const MAX_REPLY_MESSAGES: usize = 5;

/// Outbound message sent against a reply token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReplyMessage {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Sticker {
        package_id: String,
        sticker_id: String,
    },
}

impl ReplyMessage {
    pub fn text(text: impl Into<String>) -> Self {
        ReplyMessage::Text { text: text.into() }
    }

    pub fn sticker(package_id: impl Into<String>, sticker_id: impl Into<String>) -> Self {
        ReplyMessage::Sticker {
            package_id: package_id.into(),
            sticker_id: sticker_id.into(),
        }
    }
}

/// One bubble per non-empty line; the whole text as a single bubble once the
/// line count reaches the per-reply message limit.
pub fn split_reply(text: &str) -> Vec<ReplyMessage> {
    let lines: Vec<&str> = text
        .split('\n')
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty())
        .collect();

    if lines.is_empty() {
        return Vec::new();
    }

    if lines.len() >= MAX_REPLY_MESSAGES {
        return vec![ReplyMessage::text(text.trim())];
    }

    lines.into_iter().map(ReplyMessage::text).collect()
}
