//! Per-session undo/redo over the operation log.
//!
//! The resolver keeps no state of its own; every decision is a scan of the log
//! filtered to the invoking session, so one participant's undo can never touch
//! another participant's work. Each toggle flips a whole stroke at once.
//!
//! Redo only restores strokes recorded after the session's most recent visible
//! entry. A new stroke drawn after an undo therefore blocks redo of anything
//! undone before it.

use crate::canvas::log::OperationLog;
use crate::canvas::op::{SessionId, StrokeId, Visibility};

/// A stroke whose visibility changed as the result of undo or redo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrokeToggle {
    pub owner_id: SessionId,
    pub stroke_id: StrokeId,
    pub visibility: Visibility,
    /// Number of log entries flipped.
    pub entries: usize,
}

/// Tombstone the most recent visible stroke owned by `owner`.
///
/// Returns `None` (and leaves the log untouched) if `owner` has nothing
/// visible.
pub fn undo(log: &mut OperationLog, owner: SessionId) -> Option<StrokeToggle> {
    let index = log.last_visible_index(owner)?;
    let stroke_id = log.entries()[index].stroke_id.clone();
    let entries = log.set_stroke_visibility(owner, &stroke_id, Visibility::Tombstoned);
    Some(StrokeToggle { owner_id: owner, stroke_id, visibility: Visibility::Tombstoned, entries })
}

/// Restore the next undone stroke owned by `owner`.
///
/// The search starts right after the owner's most recent visible entry, or at
/// the start of the log if the owner has nothing visible. Returns `None` if
/// there is nothing to restore.
pub fn redo(log: &mut OperationLog, owner: SessionId) -> Option<StrokeToggle> {
    let from = log.last_visible_index(owner).map_or(0, |i| i + 1);
    let stroke_id = log.first_tombstoned_from(owner, from)?.stroke_id.clone();
    let entries = log.set_stroke_visibility(owner, &stroke_id, Visibility::Visible);
    Some(StrokeToggle { owner_id: owner, stroke_id, visibility: Visibility::Visible, entries })
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;
