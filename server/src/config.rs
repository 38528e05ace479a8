// Configuration for the speech session server

use std::{net::IpAddr, str::FromStr, time::Duration};

use speech_client::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Which audio output the controller plays through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    /// No device; a timer stands in for the clip's duration.
    Timed,
    /// Default output device (needs the `device-audio` feature).
    Device,
}

impl FromStr for SinkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "timed" | "headless" | "none" => Ok(SinkKind::Timed),
            "device" | "speaker" => Ok(SinkKind::Device),
            other => Err(format!("unknown AUDIO_SINK value: {other}")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub gemini_timeout_secs: u64,
    pub sink: SinkKind,
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::from([127, 0, 0, 1]),
            port: 8085,
            request_timeout_secs: 90,
            gemini_base_url: DEFAULT_BASE_URL.to_string(),
            gemini_model: DEFAULT_MODEL.to_string(),
            gemini_timeout_secs: 60,
            sink: SinkKind::Timed,
            cors_allowed_origins: None,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl ServerConfig {
    /// Read settings from the environment. The API key is never read
    /// here; it is entered per session.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let sink = match std::env::var("AUDIO_SINK") {
            Ok(v) => v.parse::<SinkKind>().unwrap_or_else(|e| {
                tracing::warn!("{e}, using the timed sink");
                SinkKind::Timed
            }),
            Err(_) => defaults.sink,
        };

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            });

        Self {
            bind_addr: env_parse("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: env_parse("PORT").unwrap_or(defaults.port),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS")
                .unwrap_or(defaults.request_timeout_secs),
            gemini_base_url: std::env::var("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            gemini_model: std::env::var("GEMINI_TTS_MODEL").unwrap_or(defaults.gemini_model),
            gemini_timeout_secs: env_parse("GEMINI_TIMEOUT_SECS")
                .unwrap_or(defaults.gemini_timeout_secs),
            sink,
            cors_allowed_origins,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.gemini_base_url.clone(),
            model: self.gemini_model.clone(),
            timeout: Duration::from_secs(self.gemini_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_kind_parse() {
        assert_eq!("timed".parse::<SinkKind>(), Ok(SinkKind::Timed));
        assert_eq!(" Device ".parse::<SinkKind>(), Ok(SinkKind::Device));
        assert!("bluetooth".parse::<SinkKind>().is_err());
    }

    #[test]
    fn test_defaults_bind_loopback() {
        let config = ServerConfig::default();
        assert!(config.bind_addr.is_loopback());
        assert_eq!(config.sink, SinkKind::Timed);
        assert_eq!(config.client_config().model, DEFAULT_MODEL);
        // the HTTP layer must outlive the upstream call
        assert!(config.request_timeout_secs > config.gemini_timeout_secs);
    }
}
