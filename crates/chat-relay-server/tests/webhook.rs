use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

use chat_relay_server::config::RepliesConfig;
use chat_relay_server::models::{ChatMessage, ReplyMessage};
use chat_relay_server::security::{SignatureVerifier, SIGNATURE_HEADER};
use chat_relay_server::services::{
    ChatRelay, CompletionProvider, MessagingPlatform, RelayOptions, UserProfile,
};
use chat_relay_server::{build_router, AppState};
use conversation_memory::{
    ConversationStore, HistoryOrigin, MemoryManager, MemoryObjectStore,
};

const SECRET: &str = "channel-secret";
const USER: &str = "U206d25c2ea6bd87c17655609a1c37cb8";

#[derive(Default)]
struct RecordingPlatform {
    replies: Mutex<Vec<(String, Vec<ReplyMessage>)>>,
}

#[async_trait]
impl MessagingPlatform for RecordingPlatform {
    async fn reply(&self, reply_token: &str, messages: Vec<ReplyMessage>) -> Result<()> {
        self.replies
            .lock()
            .unwrap()
            .push((reply_token.to_string(), messages));
        Ok(())
    }

    async fn user_profile(&self, user_id: &str) -> Result<UserProfile> {
        Ok(UserProfile {
            user_id: user_id.to_string(),
            display_name: None,
        })
    }
}

struct EchoCompletion;

#[async_trait]
impl CompletionProvider for EchoCompletion {
    async fn complete(&self, _system_prompt: &str, messages: &[ChatMessage]) -> Result<String> {
        let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        Ok(format!("echo: {}", last))
    }
}

struct Harness {
    app: Router,
    platform: Arc<RecordingPlatform>,
    relay: Arc<ChatRelay>,
    verifier: Arc<SignatureVerifier>,
}

fn harness() -> Harness {
    let platform = Arc::new(RecordingPlatform::default());
    let memory = MemoryManager::new(ConversationStore::new(Arc::new(MemoryObjectStore::new())));
    let relay = Arc::new(ChatRelay::new(
        memory,
        platform.clone(),
        Arc::new(EchoCompletion),
        RelayOptions {
            system_prompt: "test".to_string(),
            replies: RepliesConfig::default(),
            completion_attempts: 1,
            retry_backoff: Duration::ZERO,
        },
    ));
    let verifier = Arc::new(SignatureVerifier::new(SECRET.to_string()));

    let app = build_router(AppState {
        relay: relay.clone(),
        verifier: verifier.clone(),
    });

    Harness {
        app,
        platform,
        relay,
        verifier,
    }
}

fn text_payload(text: &str) -> String {
    serde_json::json!({
        "destination": "Uxxxxxxxxxxxxxx",
        "events": [{
            "type": "message",
            "replyToken": "nHuyWiB7yP5Zw52FIkcQobQuGDXCTA",
            "source": {"type": "user", "userId": USER},
            "timestamp": 1462629479859u64,
            "message": {"type": "text", "id": "325708", "text": text}
        }]
    })
    .to_string()
}

fn signed_post(uri: &str, body: String, signature: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_text_message_round_trip() {
    let h = harness();
    let body = text_payload("こんにちは");
    let signature = h.verifier.sign(body.as_bytes()).unwrap();

    let response = h
        .app
        .oneshot(signed_post("/callback", body, &signature))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"OK");

    let replies = h.platform.replies.lock().unwrap().clone();
    assert_eq!(
        replies,
        vec![(
            "nHuyWiB7yP5Zw52FIkcQobQuGDXCTA".to_string(),
            vec![ReplyMessage::text("echo: こんにちは")]
        )]
    );

    let ctx = h.relay.memory().load_context(USER).await;
    assert_eq!(ctx.origin, HistoryOrigin::Reused);
    assert_eq!(ctx.history()[0].assistant_text, "echo: こんにちは");
}

#[tokio::test]
async fn test_root_path_accepts_webhook() {
    let h = harness();
    let body = text_payload("hi");
    let signature = h.verifier.sign(body.as_bytes()).unwrap();

    let response = h
        .app
        .oneshot(signed_post("/", body, &signature))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.platform.replies.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_bad_signature_is_rejected() {
    let h = harness();
    let body = text_payload("hi");
    let signature = h.verifier.sign(b"something else").unwrap();

    let response = h
        .app
        .oneshot(signed_post("/callback", body, &signature))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(h.platform.replies.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_signature_is_rejected() {
    let h = harness();
    let request = Request::builder()
        .method("POST")
        .uri("/callback")
        .body(Body::from(text_payload("hi")))
        .unwrap();

    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unparsable_body_is_bad_request() {
    let h = harness();
    let body = "not json".to_string();
    let signature = h.verifier.sign(body.as_bytes()).unwrap();

    let response = h
        .app
        .oneshot(signed_post("/callback", body, &signature))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_root_is_bad_request() {
    let h = harness();
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();

    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_endpoints() {
    let h = harness();

    let health = h
        .app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    let ready = h
        .app
        .oneshot(
            Request::builder()
                .uri("/health/ready")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(ready.status(), StatusCode::OK);
}
