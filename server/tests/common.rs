//! Common utilities for integration tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use base64::Engine as _;
use server::{
    app::build_app, config::ServerConfig, controller::PlaybackController, sink::TimedSink,
    AppState,
};
use speech_client::{Credential, EncodedAudio, SpeechClient, SpeechError, SynthesisRequest};
use tokio::sync::Notify;
use tower::ServiceExt;

pub type Reply = Result<Option<EncodedAudio>, SpeechError>;

/// Stands in for the Gemini service. Replies are served in order; when
/// `gate` is set every call parks until the test releases it.
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Reply>>,
    pub calls: AtomicUsize,
    pub entered: Notify,
    pub gate: Option<Notify>,
}

impl ScriptedClient {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
            entered: Notify::new(),
            gate: None,
        })
    }

    pub fn gated(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
            entered: Notify::new(),
            gate: Some(Notify::new()),
        })
    }
}

#[async_trait]
impl SpeechClient for ScriptedClient {
    async fn synthesize(
        &self,
        _request: &SynthesisRequest,
        credential: &Credential,
    ) -> Result<Option<EncodedAudio>, SpeechError> {
        if credential.is_empty() {
            return Err(SpeechError::MissingCredential);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let reply = self.replies.lock().unwrap().pop_front();
        reply.unwrap_or(Err(SpeechError::TransientFailure))
    }
}

/// Base64 PCM16 payload of `seconds` of silence at 24 kHz mono.
pub fn silence(seconds: usize) -> Reply {
    let bytes = vec![0u8; seconds * 24_000 * 2];
    Ok(Some(EncodedAudio {
        data: base64::engine::general_purpose::STANDARD.encode(bytes),
        mime_type: Some("audio/L16;codec=pcm;rate=24000".to_string()),
    }))
}

/// Create a test app backed by `client` and the headless sink.
pub fn create_test_app(client: Arc<ScriptedClient>) -> Router {
    create_test_app_with(client, ServerConfig::default())
}

pub fn create_test_app_with(client: Arc<ScriptedClient>, config: ServerConfig) -> Router {
    let controller = Arc::new(PlaybackController::new(client, Arc::new(TimedSink)));
    build_app(
        AppState {
            controller,
            config: config.clone(),
        },
        &config,
    )
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, Vec<u8>) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => request
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

pub async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let (status, body) = send(app, method, uri, body).await;
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

pub async fn save_key(app: &Router) {
    let (status, _) = send(
        app,
        "POST",
        "/credential",
        Some(serde_json::json!({ "api_key": "test-key" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
