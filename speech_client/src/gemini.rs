use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::{
    Credential, EncodedAudio, SpeechClient, SpeechError, SynthesisRequest, FINISH_REASON_STOP,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-tts";

/// Marker the service puts in the error message of a rejected key.
const INVALID_KEY_MARKER: &str = "API key not valid";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Request body for `models/{model}:generateContent`
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_modalities: [&'static str; 1],
    speech_config: SpeechConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig<'a> {
    voice_config: VoiceConfig<'a>,
    speaking_rate: f32,
    pitch: f32,
    volume_gain_db: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig<'a> {
    prebuilt_voice_config: PrebuiltVoiceConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig<'a> {
    voice_name: &'a str,
}

impl<'a> GenerateContentRequest<'a> {
    fn from_request(request: &'a SynthesisRequest) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![TextPart { text: request.text() }],
            }],
            generation_config: GenerationConfig {
                response_modalities: ["AUDIO"],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: request.voice.as_str(),
                        },
                    },
                    speaking_rate: request.style.speaking_rate,
                    pitch: request.style.pitch,
                    volume_gain_db: request.style.volume_gain_db,
                },
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    #[serde(default)]
    data: String,
}

/// `{"error": {"code": 400, "message": "...", "status": "INVALID_ARGUMENT"}}`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

pub struct GeminiClient {
    client: Client,
    config: ClientConfig,
}

impl GeminiClient {
    pub fn new(config: ClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl SpeechClient for GeminiClient {
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
        credential: &Credential,
    ) -> Result<Option<EncodedAudio>, SpeechError> {
        if credential.is_empty() {
            return Err(SpeechError::MissingCredential);
        }

        let body = GenerateContentRequest::from_request(request);
        debug!(
            voice = %request.voice,
            chars = request.text().chars().count(),
            model = %self.config.model,
            "sending speech request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "speech request failed before a response arrived");
                SpeechError::TransientFailure
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &text));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            error!(error = %e, "speech response was not valid JSON");
            SpeechError::TransientFailure
        })?;

        interpret_response(parsed)
    }
}

/// Normalize a non-2xx reply. Only a rejected key is told apart.
fn classify_failure(status: StatusCode, body: &str) -> SpeechError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.to_string());

    warn!(status = status.as_u16(), message = %message, "speech service returned an error");

    if message.contains(INVALID_KEY_MARKER) || status == StatusCode::UNAUTHORIZED {
        SpeechError::InvalidCredential
    } else {
        SpeechError::TransientFailure
    }
}

fn interpret_response(response: GenerateContentResponse) -> Result<Option<EncodedAudio>, SpeechError> {
    let candidate = response.candidates.into_iter().next();
    let finish_reason = candidate.as_ref().and_then(|c| c.finish_reason.clone());

    let audio = candidate
        .and_then(|c| c.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.inline_data)
        .filter(|inline| !inline.data.is_empty());

    if let Some(inline) = audio {
        return Ok(Some(EncodedAudio {
            data: inline.data,
            mime_type: inline.mime_type,
        }));
    }

    match finish_reason.as_deref() {
        Some(FINISH_REASON_STOP) => {
            warn!("speech response finished normally but carried no audio");
            Ok(None)
        }
        other => {
            let reason = other.unwrap_or("UNKNOWN").to_string();
            warn!(finish_reason = %reason, "speech generation halted without audio");
            Err(SpeechError::GenerationHalted(reason))
        }
    }
}
