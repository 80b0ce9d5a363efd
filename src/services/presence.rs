//! Presence service — cursor updates and disconnect cleanup.
//!
//! DESIGN
//! ======
//! Cursor positions are ephemeral and advisory. They go into the presence
//! tracker and out to peers, and never touch the operation log. Updates over
//! the per-session rate limit or with unusable coordinates are dropped without
//! a trace; cursor traffic is too chatty to log.

use tracing::info;

use crate::canvas::op::{Point, SessionId};
use crate::canvas::protocol::{CursorReport, PresenceView, ServerEvent};
use crate::state::CanvasState;

/// Record a cursor report. Returns the presence event for the other
/// participants, or `None` if the update was dropped.
pub fn move_cursor(canvas: &mut CanvasState, session_id: SessionId, report: CursorReport, now_ms: i64) -> Option<ServerEvent> {
    let position = Point::new(report.x, report.y);
    if !position.is_finite() {
        return None;
    }
    let identity = &canvas.clients.get(&session_id)?.identity;
    if canvas.cursor_limiter.check_and_record(session_id).is_err() {
        return None;
    }

    let display_name = non_blank(report.display_name).unwrap_or_else(|| identity.name.clone());
    let color = non_blank(report.color).unwrap_or_else(|| identity.color.clone());
    let view: PresenceView = canvas
        .presence
        .update(session_id, position, display_name, color, now_ms);
    Some(ServerEvent::PresenceUpdate(view))
}

/// Forget a closed connection. The log is untouched; the session's strokes
/// stay where they are. Returns the removal event for the remaining
/// participants.
pub fn disconnect(canvas: &mut CanvasState, session_id: SessionId) -> ServerEvent {
    canvas.clients.remove(&session_id);
    canvas.presence.remove(session_id);
    canvas.cursor_limiter.forget(session_id);
    info!(%session_id, remaining = canvas.clients.len(), "session disconnected");
    ServerEvent::PresenceRemove(session_id)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
#[path = "presence_test.rs"]
mod tests;
