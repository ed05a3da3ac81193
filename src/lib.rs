//! geoprofile library interface
//!
//! Exposes the aggregation engine and HTTP surface for integration testing
//! and for embedding without the service binary.

pub mod adapters;
pub mod api;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod registry;
pub mod types;

pub use crate::engine::ProfileEngine;
pub use crate::error::{ApiError, ApiResult, EngineError};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// The aggregation engine (registry, scorer, caches)
    pub engine: Arc<ProfileEngine>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(engine: Arc<ProfileEngine>) -> Self {
        Self {
            engine,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::profile_routes())
        .merge(api::health_routes())
        .with_state(state)
}
