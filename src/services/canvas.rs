//! Canvas service — draw, undo, redo, clear, and fan-out.
//!
//! DESIGN
//! ======
//! Every function here runs with the canvas write lock already held by the
//! caller. Mutation and the resulting fan-out therefore happen as one step:
//! no other event can slip between appending an operation and queueing it
//! for peers.
//!
//! ERROR HANDLING
//! ==============
//! A malformed submission is dropped. It is logged at debug level and nobody,
//! the sender included, is told about it. Undo/redo with nothing to toggle is
//! equally silent.

use tracing::{debug, info, warn};

use crate::canvas::history;
use crate::canvas::op::{Operation, OperationError, SessionId, Submission};
use crate::canvas::protocol::ServerEvent;
use crate::frame::{Data, Frame};
use crate::state::CanvasState;

// =============================================================================
// OPERATIONS
// =============================================================================

/// Full snapshot for a client that signalled readiness.
#[must_use]
pub fn snapshot(canvas: &CanvasState) -> ServerEvent {
    ServerEvent::FullResync(canvas.log.snapshot())
}

/// Validate a submission and append it to the log.
///
/// # Errors
///
/// Returns [`OperationError`] if the data is not a drawable submission or
/// reuses another session's stroke id. The log is unchanged.
pub fn submit(canvas: &mut CanvasState, owner: SessionId, data: &Data) -> Result<Operation, OperationError> {
    let submission = Submission::from_data(data)?;
    let op = Operation::new(owner, submission);
    let appended = canvas.log.append(op.clone())?;
    if appended.discarded > 0 {
        info!(%owner, discarded = appended.discarded, "canvas: discarded undone entries");
    }
    info!(%owner, stroke_id = %op.stroke_id, index = appended.index, "canvas: appended operation");
    Ok(op)
}

/// Like [`submit`] but drops failures, which are only logged.
pub fn submit_or_drop(canvas: &mut CanvasState, owner: SessionId, data: &Data) -> Option<Operation> {
    match submit(canvas, owner, data) {
        Ok(op) => Some(op),
        Err(e) => {
            debug!(%owner, error = %e, "canvas: dropped submission");
            None
        }
    }
}

/// Undo `owner`'s latest visible stroke. Returns the event for everyone.
pub fn undo(canvas: &mut CanvasState, owner: SessionId) -> Option<ServerEvent> {
    let Some(toggle) = history::undo(&mut canvas.log, owner) else {
        debug!(%owner, "canvas: nothing to undo");
        return None;
    };
    info!(%owner, stroke_id = %toggle.stroke_id, entries = toggle.entries, "canvas: undo");
    Some(canvas.sync_strategy.after_toggle(&canvas.log, &toggle))
}

/// Redo `owner`'s next undone stroke. Returns the event for everyone.
pub fn redo(canvas: &mut CanvasState, owner: SessionId) -> Option<ServerEvent> {
    let Some(toggle) = history::redo(&mut canvas.log, owner) else {
        debug!(%owner, "canvas: nothing to redo");
        return None;
    };
    info!(%owner, stroke_id = %toggle.stroke_id, entries = toggle.entries, "canvas: redo");
    Some(canvas.sync_strategy.after_toggle(&canvas.log, &toggle))
}

/// Empty the log. Returns the event for everyone.
pub fn clear(canvas: &mut CanvasState, requested_by: SessionId) -> ServerEvent {
    let dropped = canvas.log.len();
    canvas.log.clear();
    info!(%requested_by, dropped, "canvas: cleared");
    ServerEvent::Clear
}

// =============================================================================
// FAN-OUT
// =============================================================================

/// Queue a frame for one connection. Returns whether it was queued.
pub fn send_to(canvas: &CanvasState, session_id: SessionId, frame: &Frame) -> bool {
    let Some(client) = canvas.clients.get(&session_id) else {
        return false;
    };
    match client.tx.try_send(frame.clone()) {
        Ok(()) => true,
        Err(e) => {
            if !frame.syscall.starts_with("cursor:") {
                warn!(%session_id, syscall = %frame.syscall, error = %e, "canvas: dropped outbound frame");
            }
            false
        }
    }
}

/// Queue a frame for every connection except `exclude`.
/// Returns how many connections it was queued for.
pub fn broadcast(canvas: &CanvasState, frame: &Frame, exclude: Option<SessionId>) -> usize {
    canvas
        .clients
        .keys()
        .filter(|id| exclude != Some(**id))
        .filter(|id| send_to(canvas, **id, frame))
        .count()
}

#[cfg(test)]
#[path = "canvas_test.rs"]
mod tests;
