//! Integration tests for the speech session API

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;
use server::config::ServerConfig;
use speech_client::SpeechError;

use common::*;

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app(ScriptedClient::new(vec![]));
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");

    let (status, _) = send(&app, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_list_voices() {
    let app = create_test_app(ScriptedClient::new(vec![]));
    let (status, voices) = send_json(&app, "GET", "/voices", None).await;

    assert_eq!(status, StatusCode::OK);
    let voices = voices.as_array().unwrap();
    assert_eq!(voices.len(), 10);
    assert!(voices.contains(&json!({ "name": "Kore", "gender": "female" })));
    assert!(voices.contains(&json!({ "name": "Charon", "gender": "male" })));
}

#[tokio::test]
async fn test_list_styles() {
    let app = create_test_app(ScriptedClient::new(vec![]));
    let (status, styles) = send_json(&app, "GET", "/api/styles", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(styles["ranges"]["speaking_rate"]["min"], json!(0.5));
    assert_eq!(styles["defaults"]["speaking_rate"], json!(1.0));
    assert_eq!(styles["defaults"]["volume_gain_db"], json!(0.0));
}

#[tokio::test]
async fn test_request_id_header() {
    let app = create_test_app(ScriptedClient::new(vec![]));
    let response = tower::ServiceExt::oneshot(
        app,
        axum::http::Request::builder()
            .uri("/health")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_speak_without_key() {
    let client = ScriptedClient::new(vec![silence(1)]);
    let app = create_test_app(client.clone());

    let (status, body) = send_json(&app, "POST", "/speak", Some(json!({ "text": "Hello" }))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Please enter your Gemini API key.");
    assert_eq!(body["code"], 401);
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_blank_key_rejected() {
    let app = create_test_app(ScriptedClient::new(vec![]));
    let (status, _) = send_json(&app, "POST", "/credential", Some(json!({ "api_key": "   " }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, status_body) = send_json(&app, "GET", "/status", None).await;
    assert_eq!(status_body["has_credential"], false);
}

#[tokio::test]
async fn test_speak_plays_and_stop_returns_to_idle() {
    let app = create_test_app(ScriptedClient::new(vec![silence(5)]));
    save_key(&app).await;

    let (status, outcome) = send_json(
        &app,
        "POST",
        "/speak",
        Some(json!({ "text": "Xin chào", "voice": "puck", "speaking_rate": 1.25 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome, json!({ "outcome": "playing", "duration_ms": 5000, "frames": 120000 }));

    let (_, session) = send_json(&app, "GET", "/status", None).await;
    assert_eq!(session["phase"], "playing");
    assert_eq!(session["has_credential"], true);

    let (_, stopped) = send_json(&app, "POST", "/stop", None).await;
    assert_eq!(stopped, json!({ "stopped": true }));
    let (_, session) = send_json(&app, "GET", "/status", None).await;
    assert_eq!(session["phase"], "idle");

    // a second stop has nothing to do
    let (_, stopped) = send_json(&app, "POST", "/stop", None).await;
    assert_eq!(stopped, json!({ "stopped": false }));
}

#[tokio::test]
async fn test_speak_input_errors() {
    let client = ScriptedClient::new(vec![]);
    let app = create_test_app(client.clone());
    save_key(&app).await;

    let (status, _) = send_json(&app, "POST", "/speak", Some(json!({ "text": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) =
        send_json(&app, "POST", "/speak", Some(json!({ "text": "Hi", "voice": "Nova" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Nova"));

    let (status, _) =
        send_json(&app, "POST", "/speak", Some(json!({ "text": "Hi", "pitch": 25.0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invalid_key_forces_reentry() {
    let app = create_test_app(ScriptedClient::new(vec![Err(SpeechError::InvalidCredential)]));
    save_key(&app).await;

    let (status, _) = send_json(&app, "POST", "/speak", Some(json!({ "text": "Hello" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, session) = send_json(&app, "GET", "/status", None).await;
    assert_eq!(session["has_credential"], false);
    assert_eq!(session["phase"], "idle");
}

#[tokio::test]
async fn test_halted_generation() {
    let app = create_test_app(ScriptedClient::new(vec![Err(SpeechError::GenerationHalted(
        "SAFETY".into(),
    ))]));
    save_key(&app).await;

    let (status, body) = send_json(&app, "POST", "/speak", Some(json!({ "text": "Hello" }))).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("SAFETY"));
}

#[tokio::test]
async fn test_no_audio_outcome() {
    let app = create_test_app(ScriptedClient::new(vec![Ok(None)]));
    save_key(&app).await;

    let (status, outcome) =
        send_json(&app, "POST", "/speak", Some(json!({ "text": "Hello" }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome, json!({ "outcome": "no_audio" }));
    let (_, metrics) = send_json(&app, "GET", "/metrics", None).await;
    assert_eq!(metrics["no_audio"], 1);
    assert_eq!(metrics["speak_requests"], 1);
}

#[tokio::test]
async fn test_busy_then_stop_discards_late_audio() {
    let client = ScriptedClient::gated(vec![silence(1)]);
    let app = create_test_app(client.clone());
    save_key(&app).await;

    let first = tokio::spawn({
        let app = app.clone();
        async move { send_json(&app, "POST", "/speak", Some(json!({ "text": "First" }))).await }
    });
    client.entered.notified().await;

    let (_, session) = send_json(&app, "GET", "/status", None).await;
    assert_eq!(session["phase"], "loading");

    let (status, _) = send_json(&app, "POST", "/speak", Some(json!({ "text": "Second" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, stopped) = send_json(&app, "POST", "/stop", None).await;
    assert_eq!(stopped, json!({ "stopped": true }));

    client.gate.as_ref().unwrap().notify_one();
    let (status, outcome) = first.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome, json!({ "outcome": "superseded" }));

    let (_, session) = send_json(&app, "GET", "/status", None).await;
    assert_eq!(session["phase"], "idle");
}

#[tokio::test]
async fn test_change_key() {
    let app = create_test_app(ScriptedClient::new(vec![]));
    save_key(&app).await;

    let (status, _) = send(&app, "DELETE", "/api/credential", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, session) = send_json(&app, "GET", "/status", None).await;
    assert_eq!(session["has_credential"], false);
}

#[tokio::test]
async fn test_text_stats() {
    let app = create_test_app(ScriptedClient::new(vec![]));
    let (status, stats) = send_json(
        &app,
        "POST",
        "/text/stats",
        Some(json!({ "text": "  one two\nthree  " })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats, json!({ "words": 3, "chars": 17 }));
}

#[tokio::test]
async fn test_abandoned_speak_does_not_block_the_next_one() {
    let client = ScriptedClient::gated(vec![silence(1), silence(1)]);
    let app = create_test_app(client.clone());
    save_key(&app).await;

    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        send_json(&app, "POST", "/speak", Some(json!({ "text": "First" }))),
    )
    .await;
    assert!(abandoned.is_err());

    let (_, session) = send_json(&app, "GET", "/status", None).await;
    assert_eq!(session["phase"], "idle");

    client.gate.as_ref().unwrap().notify_one();
    let (status, outcome) =
        send_json(&app, "POST", "/speak", Some(json!({ "text": "Second" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], "playing");
}

#[tokio::test]
async fn test_request_timeout_returns_to_idle() {
    let client = ScriptedClient::gated(vec![silence(1)]);
    let config = ServerConfig {
        request_timeout_secs: 1,
        ..ServerConfig::default()
    };
    let app = create_test_app_with(client.clone(), config);
    save_key(&app).await;

    let (status, _) = send(&app, "POST", "/speak", Some(json!({ "text": "Hello" }))).await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);

    let (_, session) = send_json(&app, "GET", "/status", None).await;
    assert_eq!(session["phase"], "idle");
    assert_eq!(
        session["last_message"],
        "The speech request was cancelled. Please try again."
    );
}
