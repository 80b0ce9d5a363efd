//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! There is one canvas per server process. Its log, presence map, connected
//! clients, and cursor limiter sit together behind a single `RwLock`; every
//! inbound event takes the write lock for its whole handling, fan-out
//! included, so the order of log mutations is the order clients observe.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};

use crate::canvas::log::OperationLog;
use crate::canvas::op::SessionId;
use crate::canvas::presence::PresenceTracker;
use crate::canvas::protocol::SyncStrategy;
use crate::config::ServerConfig;
use crate::frame::Frame;
use crate::rate_limit::CursorRateLimiter;
use crate::services::session::DisplayIdentity;

// =============================================================================
// CONNECTED CLIENT
// =============================================================================

pub struct ConnectedClient {
    pub identity: DisplayIdentity,
    /// Outgoing frames for this connection.
    pub tx: mpsc::Sender<Frame>,
}

// =============================================================================
// CANVAS STATE
// =============================================================================

/// Live canvas. Kept in memory only; lost on restart.
pub struct CanvasState {
    pub log: OperationLog,
    pub presence: PresenceTracker,
    pub clients: HashMap<SessionId, ConnectedClient>,
    pub cursor_limiter: CursorRateLimiter,
    pub sync_strategy: SyncStrategy,
}

impl CanvasState {
    #[must_use]
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            log: OperationLog::with_policy(config.log_policy),
            presence: PresenceTracker::new(),
            clients: HashMap::new(),
            cursor_limiter: CursorRateLimiter::new(config.cursor_rate),
            sync_strategy: config.sync_strategy,
        }
    }
}

impl Default for CanvasState {
    fn default() -> Self {
        Self::new(&ServerConfig::default())
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub canvas: Arc<RwLock<CanvasState>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self { canvas: Arc::new(RwLock::new(CanvasState::new(&config))), config: Arc::new(config) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
#[path = "state_helpers_test.rs"]
pub mod test_helpers;

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
