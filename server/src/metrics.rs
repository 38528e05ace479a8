// Session counters exposed at /metrics

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct SessionMetrics {
    pub speak_requests: Arc<AtomicU64>,
    pub errors: Arc<AtomicU64>,
    pub no_audio: Arc<AtomicU64>,
    pub superseded: Arc<AtomicU64>,
    pub playbacks: Arc<AtomicU64>,
    pub total_audio_ms: Arc<AtomicU64>,
    pub total_latency_ms: Arc<AtomicU64>,
    pub max_latency_ms: Arc<AtomicU64>,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self {
            speak_requests: Arc::new(AtomicU64::new(0)),
            errors: Arc::new(AtomicU64::new(0)),
            no_audio: Arc::new(AtomicU64::new(0)),
            superseded: Arc::new(AtomicU64::new(0)),
            playbacks: Arc::new(AtomicU64::new(0)),
            total_audio_ms: Arc::new(AtomicU64::new(0)),
            total_latency_ms: Arc::new(AtomicU64::new(0)),
            max_latency_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn record_request(&self) {
        self.speak_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_no_audio(&self) {
        self.no_audio.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_superseded(&self) {
        self.superseded.fetch_add(1, Ordering::Relaxed);
    }

    /// `latency_ms` runs from the speak action to the start of output.
    pub fn record_playback(&self, audio_ms: u64, latency_ms: u64) {
        self.playbacks.fetch_add(1, Ordering::Relaxed);
        self.total_audio_ms.fetch_add(audio_ms, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.max_latency_ms.fetch_max(latency_ms, Ordering::Relaxed);
    }

    pub fn avg_latency_ms(&self) -> f64 {
        let count = self.playbacks.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        let total = self.total_latency_ms.load(Ordering::Relaxed);
        total as f64 / count as f64
    }

    pub fn snapshot(&self) -> MetricsResponse {
        MetricsResponse {
            timestamp: Utc::now(),
            speak_requests: self.speak_requests.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            no_audio: self.no_audio.load(Ordering::Relaxed),
            superseded: self.superseded.load(Ordering::Relaxed),
            playbacks: self.playbacks.load(Ordering::Relaxed),
            total_audio_ms: self.total_audio_ms.load(Ordering::Relaxed),
            avg_latency_ms: self.avg_latency_ms(),
            max_latency_ms: self.max_latency_ms.load(Ordering::Relaxed),
        }
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub timestamp: DateTime<Utc>,
    pub speak_requests: u64,
    pub errors: u64,
    pub no_audio: u64,
    pub superseded: u64,
    pub playbacks: u64,
    pub total_audio_ms: u64,
    pub avg_latency_ms: f64,
    pub max_latency_ms: u64,
}
