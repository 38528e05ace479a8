use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use speech_client::{Gender, StyleRanges, Voice, VoiceStyle, STYLE_RANGES};
use tracing::info;

use crate::controller::{SessionStatus, SpeakOutcome, SpeakRequest};
use crate::error::ApiError;
use crate::metrics::MetricsResponse;
use crate::validation::{
    parse_voice, resolve_style, text_stats, validate_api_key, validate_text, TextStats,
};
use crate::AppState;

#[derive(Serialize)]
pub struct VoiceInfo {
    name: &'static str,
    gender: Gender,
}

#[derive(Serialize)]
pub struct StylesResponse {
    ranges: StyleRanges,
    defaults: VoiceStyle,
}

#[derive(Deserialize)]
pub struct CredentialRequest {
    api_key: String,
}

#[derive(Deserialize)]
pub struct SpeakRequestBody {
    text: String,
    voice: Option<String>,
    speaking_rate: Option<f32>,
    pitch: Option<f32>,
    volume_gain_db: Option<f32>,
}

#[derive(Deserialize)]
pub struct TextStatsRequest {
    text: String,
}

#[derive(Serialize)]
pub struct StopResponse {
    stopped: bool,
}

pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn list_voices() -> Json<Vec<VoiceInfo>> {
    Json(
        Voice::ALL
            .iter()
            .map(|v| VoiceInfo {
                name: v.as_str(),
                gender: v.gender(),
            })
            .collect(),
    )
}

/// Slider bounds plus the values "reset style" goes back to.
pub async fn list_styles() -> Json<StylesResponse> {
    Json(StylesResponse {
        ranges: STYLE_RANGES,
        defaults: VoiceStyle::default(),
    })
}

pub async fn set_credential(
    State(state): State<AppState>,
    Json(req): Json<CredentialRequest>,
) -> Result<StatusCode, ApiError> {
    validate_api_key(&req.api_key)?;
    state.controller.set_credential(&req.api_key)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn clear_credential(State(state): State<AppState>) -> StatusCode {
    state.controller.clear_credential();
    StatusCode::NO_CONTENT
}

pub async fn status(State(state): State<AppState>) -> Json<SessionStatus> {
    Json(state.controller.status())
}

pub async fn speak(
    State(state): State<AppState>,
    Json(req): Json<SpeakRequestBody>,
) -> Result<Json<SpeakOutcome>, ApiError> {
    validate_text(&req.text)?;
    let voice = parse_voice(req.voice.as_deref())?;
    let style = resolve_style(req.speaking_rate, req.pitch, req.volume_gain_db)?;

    info!(
        "Speak request received: text length={}, voice={}",
        req.text.chars().count(),
        voice
    );

    let outcome = state
        .controller
        .speak(SpeakRequest {
            text: req.text,
            voice,
            style,
        })
        .await?;
    Ok(Json(outcome))
}

pub async fn stop(State(state): State<AppState>) -> Json<StopResponse> {
    Json(StopResponse {
        stopped: state.controller.stop(),
    })
}

pub async fn count_text(Json(req): Json<TextStatsRequest>) -> Json<TextStats> {
    Json(text_stats(&req.text))
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(state.controller.metrics().snapshot())
}
