//! Synchronization protocol: typed client requests and server events.
//!
//! ARCHITECTURE
//! ============
//! Both directions ride on [`Frame`]. This module owns the mapping between
//! syscall names + flat data and the typed events the canvas service and the
//! client replica work with.
//!
//! | Direction | syscall | Meaning |
//! |-----------|---------|---------|
//! | c -> s | `canvas:ready` | send me a full snapshot |
//! | c -> s | `canvas:draw` | append this submission |
//! | c -> s | `canvas:undo` / `canvas:redo` | toggle my latest stroke |
//! | c -> s | `canvas:clear` | wipe the canvas for everyone |
//! | c -> s | `cursor:move` | my pointer moved |
//! | s -> c | `session:connected` | your identity |
//! | s -> c | `canvas:sync` | replace local state with this snapshot |
//! | s -> c | `canvas:draw` | append one operation |
//! | s -> c | `canvas:visibility` | flip one owner's stroke (diff strategy only) |
//! | s -> c | `canvas:clear` | discard local state |
//! | s -> c | `cursor:moved` / `cursor:removed` | presence upsert / delete |

use serde::{Deserialize, Serialize};

use crate::canvas::history::StrokeToggle;
use crate::canvas::log::OperationLog;
use crate::canvas::op::{Operation, SessionId, StrokeId, Submission, Visibility};
use crate::frame::{Data, Frame};

pub const SESSION_CONNECTED: &str = "session:connected";
pub const CANVAS_READY: &str = "canvas:ready";
pub const CANVAS_DRAW: &str = "canvas:draw";
pub const CANVAS_UNDO: &str = "canvas:undo";
pub const CANVAS_REDO: &str = "canvas:redo";
pub const CANVAS_CLEAR: &str = "canvas:clear";
pub const CANVAS_SYNC: &str = "canvas:sync";
pub const CANVAS_VISIBILITY: &str = "canvas:visibility";
pub const CURSOR_MOVE: &str = "cursor:move";
pub const CURSOR_MOVED: &str = "cursor:moved";
pub const CURSOR_REMOVED: &str = "cursor:removed";

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown syscall: {0}")]
    UnknownSyscall(String),
    #[error("invalid payload for {syscall}: {source}")]
    Payload {
        syscall: String,
        #[source]
        source: serde_json::Error,
    },
}

impl crate::frame::ErrorCode for ProtocolError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownSyscall(_) => "E_UNKNOWN_SYSCALL",
            Self::Payload { .. } => "E_INVALID_PAYLOAD",
        }
    }
}

// =============================================================================
// PAYLOADS
// =============================================================================

/// Pointer report from a participant. Name and color fall back to the
/// session's assigned display identity when omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorReport {
    pub x: f64,
    pub y: f64,
    #[serde(default, rename = "name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Presence as seen by other participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceView {
    pub session_id: SessionId,
    pub x: f64,
    pub y: f64,
    #[serde(rename = "name")]
    pub display_name: String,
    pub color: String,
    /// Server time of the update, milliseconds since Unix epoch.
    pub last_update: i64,
}

/// Identity handed to a participant when its connection opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Welcome {
    pub session_id: SessionId,
    #[serde(rename = "name")]
    pub display_name: String,
    pub color: String,
    /// Whether the server discards this session's undone work when it draws
    /// again. Replicas mirror it for their optimistic copy.
    #[serde(default = "default_discard_undone")]
    pub discard_undone_on_draw: bool,
}

fn default_discard_undone() -> bool {
    true
}

#[derive(Serialize, Deserialize)]
struct SyncPayload {
    operations: Vec<Operation>,
}

#[derive(Serialize, Deserialize)]
struct VisibilityPayload {
    owner_id: SessionId,
    stroke_id: StrokeId,
    visibility: Visibility,
}

#[derive(Serialize, Deserialize)]
struct RemovedPayload {
    session_id: SessionId,
}

// =============================================================================
// CLIENT -> SERVER
// =============================================================================

/// A request from a participant.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientRequest {
    Ready,
    /// Raw submission data. Validation belongs to the canvas service, which
    /// drops malformed submissions without telling anyone.
    Draw(Data),
    Undo,
    Redo,
    Clear,
    CursorMove(CursorReport),
}

impl ClientRequest {
    /// Interpret an inbound frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownSyscall`] for syscalls outside the
    /// protocol and [`ProtocolError::Payload`] for cursor reports that lack
    /// coordinates.
    pub fn from_frame(frame: &Frame) -> Result<Self, ProtocolError> {
        match frame.syscall.as_str() {
            CANVAS_READY => Ok(Self::Ready),
            CANVAS_DRAW => Ok(Self::Draw(frame.data.clone())),
            CANVAS_UNDO => Ok(Self::Undo),
            CANVAS_REDO => Ok(Self::Redo),
            CANVAS_CLEAR => Ok(Self::Clear),
            CURSOR_MOVE => decode(frame).map(Self::CursorMove),
            other => Err(ProtocolError::UnknownSyscall(other.to_owned())),
        }
    }

    /// Build the request frame a client sends.
    #[must_use]
    pub fn to_frame(&self) -> Frame {
        match self {
            Self::Ready => Frame::request(CANVAS_READY, Data::new()),
            Self::Draw(data) => Frame::request(CANVAS_DRAW, data.clone()),
            Self::Undo => Frame::request(CANVAS_UNDO, Data::new()),
            Self::Redo => Frame::request(CANVAS_REDO, Data::new()),
            Self::Clear => Frame::request(CANVAS_CLEAR, Data::new()),
            Self::CursorMove(report) => Frame::request(CURSOR_MOVE, encode(report)),
        }
    }

    /// Convenience constructor for a draw request.
    #[must_use]
    pub fn draw(submission: &Submission) -> Self {
        Self::Draw(submission.to_data())
    }
}

// =============================================================================
// SERVER -> CLIENT
// =============================================================================

/// An event pushed by the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Connected(Welcome),
    /// The whole log, tombstoned entries included.
    FullResync(Vec<Operation>),
    /// An appended operation. Under the discard policy the receiver first
    /// drops the owner's undone entries, as the server log did.
    Incremental(Operation),
    /// One stroke changed visibility. Stroke ids are only unique per owner
    /// over time, so the owner scopes the flip.
    StrokeVisibility { owner_id: SessionId, stroke_id: StrokeId, visibility: Visibility },
    Clear,
    PresenceUpdate(PresenceView),
    PresenceRemove(SessionId),
}

impl ServerEvent {
    #[must_use]
    pub fn syscall(&self) -> &'static str {
        match self {
            Self::Connected(_) => SESSION_CONNECTED,
            Self::FullResync(_) => CANVAS_SYNC,
            Self::Incremental(_) => CANVAS_DRAW,
            Self::StrokeVisibility { .. } => CANVAS_VISIBILITY,
            Self::Clear => CANVAS_CLEAR,
            Self::PresenceUpdate(_) => CURSOR_MOVED,
            Self::PresenceRemove(_) => CURSOR_REMOVED,
        }
    }

    #[must_use]
    pub fn to_frame(&self) -> Frame {
        let data = match self {
            Self::Connected(welcome) => encode(welcome),
            Self::FullResync(operations) => encode(&SyncPayload { operations: operations.clone() }),
            Self::Incremental(op) => op.to_data(),
            Self::StrokeVisibility { owner_id, stroke_id, visibility } => encode(&VisibilityPayload {
                owner_id: *owner_id,
                stroke_id: stroke_id.clone(),
                visibility: *visibility,
            }),
            Self::Clear => Data::new(),
            Self::PresenceUpdate(view) => encode(view),
            Self::PresenceRemove(session_id) => encode(&RemovedPayload { session_id: *session_id }),
        };
        Frame::request(self.syscall(), data)
    }

    /// Interpret a frame received from the server.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownSyscall`] for frames outside the
    /// protocol and [`ProtocolError::Payload`] for undecodable data.
    pub fn from_frame(frame: &Frame) -> Result<Self, ProtocolError> {
        match frame.syscall.as_str() {
            SESSION_CONNECTED => decode(frame).map(Self::Connected),
            CANVAS_SYNC => decode::<SyncPayload>(frame).map(|p| Self::FullResync(p.operations)),
            CANVAS_DRAW => decode(frame).map(Self::Incremental),
            CANVAS_VISIBILITY => decode::<VisibilityPayload>(frame)
                .map(|p| Self::StrokeVisibility { owner_id: p.owner_id, stroke_id: p.stroke_id, visibility: p.visibility }),
            CANVAS_CLEAR => Ok(Self::Clear),
            CURSOR_MOVED => decode(frame).map(Self::PresenceUpdate),
            CURSOR_REMOVED => decode::<RemovedPayload>(frame).map(|p| Self::PresenceRemove(p.session_id)),
            other => Err(ProtocolError::UnknownSyscall(other.to_owned())),
        }
    }
}

// =============================================================================
// SYNC STRATEGY
// =============================================================================

/// How undo/redo results are propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncStrategy {
    /// Send the whole log. Converges any client regardless of missed messages.
    #[default]
    FullResync,
    /// Send only the toggled stroke. Assumes the receiver holds prior state
    /// and applies incremental appends the way [`OperationLog::append`] does.
    StrokeDiff,
}

impl SyncStrategy {
    /// Event announcing a toggle to every participant.
    #[must_use]
    pub fn after_toggle(self, log: &OperationLog, toggle: &StrokeToggle) -> ServerEvent {
        match self {
            Self::FullResync => ServerEvent::FullResync(log.snapshot()),
            Self::StrokeDiff => ServerEvent::StrokeVisibility {
                owner_id: toggle.owner_id,
                stroke_id: toggle.stroke_id.clone(),
                visibility: toggle.visibility,
            },
        }
    }
}

impl std::str::FromStr for SyncStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(Self::FullResync),
            "diff" => Ok(Self::StrokeDiff),
            other => Err(format!("expected `full` or `diff`, got `{other}`")),
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn encode<T: Serialize>(value: &T) -> Data {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => Data::new(),
    }
}

fn decode<T: serde::de::DeserializeOwned>(frame: &Frame) -> Result<T, ProtocolError> {
    serde_json::from_value(serde_json::Value::Object(frame.data.clone()))
        .map_err(|source| ProtocolError::Payload { syscall: frame.syscall.clone(), source })
}

#[cfg(test)]
#[path = "protocol_test.rs"]
mod tests;
