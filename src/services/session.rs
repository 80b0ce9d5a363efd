//! Session service — connection identity and registration.
//!
//! Every websocket connection gets an opaque [`SessionId`] and a default
//! display identity (a random adjective + animal name and a palette color).
//! Cursor reports that omit a name or color fall back to it.

use rand::Rng;
use rand::seq::IndexedRandom;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::canvas::op::SessionId;
use crate::canvas::protocol::{ServerEvent, Welcome};
use crate::frame::Frame;
use crate::state::{CanvasState, ConnectedClient};

const ADJECTIVES: &[&str] = &["Neon", "Cyber", "Happy", "Lazy", "Brave", "Quiet"];
const ANIMALS: &[&str] = &["Tiger", "Panda", "Eagle", "Fox", "Wolf", "Bear"];

/// Colors handed out to new sessions.
pub const PALETTE: &[&str] = &["#000", "#ef4444", "#3b82f6", "#22c55e", "#eab308"];

/// Name and color shown next to a participant's cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayIdentity {
    pub name: String,
    pub color: String,
}

impl DisplayIdentity {
    /// Pick a random name and palette color.
    #[must_use]
    pub fn random() -> Self {
        Self::random_with(&mut rand::rng())
    }

    pub fn random_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let adjective = ADJECTIVES.choose(rng).copied().unwrap_or("Quiet");
        let animal = ANIMALS.choose(rng).copied().unwrap_or("Panda");
        let color = PALETTE.choose(rng).copied().unwrap_or("#000");
        Self { name: format!("{adjective} {animal}"), color: color.to_owned() }
    }
}

/// Register a new connection and queue its `session:connected` frame.
///
/// The welcome goes through the connection's own channel so it is always the
/// first frame the client receives.
pub fn connect(
    canvas: &mut CanvasState,
    session_id: SessionId,
    identity: DisplayIdentity,
    tx: mpsc::Sender<Frame>,
) -> Welcome {
    let welcome = Welcome {
        session_id,
        display_name: identity.name.clone(),
        color: identity.color.clone(),
        discard_undone_on_draw: canvas.log.policy().discard_undone_on_draw,
    };
    if let Err(e) = tx.try_send(ServerEvent::Connected(welcome.clone()).to_frame()) {
        debug!(%session_id, error = %e, "session: welcome not queued");
    }
    canvas
        .clients
        .insert(session_id, ConnectedClient { identity, tx });
    info!(%session_id, name = %welcome.display_name, clients = canvas.clients.len(), "session connected");
    welcome
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
