pub mod chat;
pub mod event;
pub mod reply;

pub use chat::ChatMessage;
pub use event::{
    AudioEvent, InboundEvent, LocationEvent, PostbackAction, PostbackEvent, StickerEvent,
    TextEvent, WebhookPayload,
};
pub use reply::{split_reply, ReplyMessage, MAX_REPLY_MESSAGES};
