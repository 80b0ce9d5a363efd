//! Operation log — the authoritative, ordered record of every draw action.
//!
//! DESIGN
//! ======
//! Insertion order is paint order and defines "most recent" for undo/redo.
//! Entries are never removed individually except in one case: when a session
//! submits new work, its own tombstoned (undone) entries are physically
//! discarded first, so abandoned undo chains do not grow the log forever.
//! `clear` is the only other removal and drops everything.
//!
//! A side index maps each stroke id to the session that owns it. A submission
//! that reuses another session's stroke id is refused, which keeps every
//! stroke single-owner and therefore safe to tombstone as a unit.

use std::collections::HashMap;

use crate::canvas::op::{Operation, OperationError, SessionId, StrokeId, Visibility};

/// Knobs that change log retention behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogPolicy {
    /// Physically discard a session's undone entries when it submits new work.
    pub discard_undone_on_draw: bool,
}

impl Default for LogPolicy {
    fn default() -> Self {
        Self { discard_undone_on_draw: true }
    }
}

/// What an accepted append did to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Appended {
    /// Index of the new entry.
    pub index: usize,
    /// Number of the owner's undone entries discarded before appending.
    pub discarded: usize,
}

#[derive(Debug, Default)]
pub struct OperationLog {
    entries: Vec<Operation>,
    owners: HashMap<StrokeId, SessionId>,
    policy: LogPolicy,
}

impl OperationLog {
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(LogPolicy::default())
    }

    #[must_use]
    pub fn with_policy(policy: LogPolicy) -> Self {
        Self { entries: Vec::new(), owners: HashMap::new(), policy }
    }

    #[must_use]
    pub fn policy(&self) -> LogPolicy {
        self.policy
    }

    /// Append an operation at the end of the log.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::StrokeOwnedByOther`] if the stroke id is
    /// already owned by a different session. The log is unchanged.
    pub fn append(&mut self, op: Operation) -> Result<Appended, OperationError> {
        if let Some(owner) = self.owners.get(&op.stroke_id) {
            if *owner != op.owner_id {
                return Err(OperationError::StrokeOwnedByOther(op.stroke_id));
            }
        }

        let discarded = if self.policy.discard_undone_on_draw {
            self.discard_undone(op.owner_id)
        } else {
            0
        };

        self.owners.insert(op.stroke_id.clone(), op.owner_id);
        self.entries.push(op);
        Ok(Appended { index: self.entries.len() - 1, discarded })
    }

    /// Physically remove every tombstoned entry owned by `owner`.
    /// Returns how many entries were removed.
    pub fn discard_undone(&mut self, owner: SessionId) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|op| !(op.owner_id == owner && op.is_tombstoned()));
        let removed = before - self.entries.len();
        if removed > 0 {
            self.reindex();
        }
        removed
    }

    /// Full ordered copy of the log, tombstoned entries included.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Operation> {
        self.entries.clone()
    }

    /// Drop every entry, tombstoned or not.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.owners.clear();
    }

    #[must_use]
    pub fn entries(&self) -> &[Operation] {
        &self.entries
    }

    /// Entries the rendering collaborator should draw, in paint order.
    pub fn visible(&self) -> impl Iterator<Item = &Operation> {
        self.entries.iter().filter(|op| op.is_visible())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // -------------------------------------------------------------------------
    // Scans used by the undo/redo resolver
    // -------------------------------------------------------------------------

    /// Index of the most recent visible entry owned by `owner`.
    #[must_use]
    pub fn last_visible_index(&self, owner: SessionId) -> Option<usize> {
        self.entries
            .iter()
            .rposition(|op| op.owner_id == owner && op.is_visible())
    }

    /// First tombstoned entry owned by `owner` at or after index `from`.
    #[must_use]
    pub fn first_tombstoned_from(&self, owner: SessionId, from: usize) -> Option<&Operation> {
        self.entries
            .iter()
            .skip(from)
            .find(|op| op.owner_id == owner && op.is_tombstoned())
    }

    /// Set the visibility of every entry of `owner` sharing `stroke_id`.
    /// Returns how many entries changed.
    pub fn set_stroke_visibility(&mut self, owner: SessionId, stroke_id: &StrokeId, visibility: Visibility) -> usize {
        let mut changed = 0;
        for op in &mut self.entries {
            if op.owner_id == owner && op.stroke_id == *stroke_id && op.visibility != visibility {
                op.visibility = visibility;
                changed += 1;
            }
        }
        changed
    }

    fn reindex(&mut self) {
        self.owners = self
            .entries
            .iter()
            .map(|op| (op.stroke_id.clone(), op.owner_id))
            .collect();
    }
}

#[cfg(test)]
#[path = "log_test.rs"]
mod tests;
