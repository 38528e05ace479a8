//! Local speech session service: one [`controller::PlaybackController`]
//! per process, driven over a small JSON API.

pub mod app;
pub mod config;
pub mod controller;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod sink;
pub mod validation;

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::controller::PlaybackController;

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<PlaybackController>,
    pub config: ServerConfig,
}
