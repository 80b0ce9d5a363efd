//! Client replica — a participant's derived, disposable copy of the canvas.
//!
//! The replica applies server events to a local operation sequence and drives
//! a [`Renderer`]. A full resync replaces everything local, optimistic entries
//! included; the server snapshot is ground truth. Incremental operations are
//! appended in arrival order, with the same discard of the owner's undone
//! entries the server log performs, so visibility flips keep lining up with
//! the server under the stroke-diff strategy. Presence lives beside the operations in
//! [`RemoteCursors`] and never mixes with them.

use std::collections::HashMap;

use crate::canvas::op::{Operation, SessionId, Submission};
use crate::canvas::presence::is_idle;
use crate::canvas::protocol::{PresenceView, ServerEvent};
use crate::canvas::render::Renderer;
use crate::frame::now_ms;

/// What applying one event did to the replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Local operations were replaced or rewritten and repainted.
    Repainted,
    /// One operation was appended (and drawn if visible).
    Appended,
    /// Local state was discarded.
    Cleared,
    /// Only presence or identity changed.
    Presence,
}

#[derive(Debug)]
pub struct CanvasReplica {
    session_id: Option<SessionId>,
    discard_undone_on_draw: bool,
    entries: Vec<Operation>,
    cursors: RemoteCursors,
}

impl Default for CanvasReplica {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasReplica {
    #[must_use]
    pub fn new() -> Self {
        Self { session_id: None, discard_undone_on_draw: true, entries: Vec::new(), cursors: RemoteCursors::default() }
    }

    /// Session identity, known once `session:connected` has been applied.
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    #[must_use]
    pub fn entries(&self) -> &[Operation] {
        &self.entries
    }

    /// Operations currently on screen, in paint order.
    pub fn visible(&self) -> impl Iterator<Item = &Operation> {
        self.entries.iter().filter(|op| op.is_visible())
    }

    #[must_use]
    pub fn cursors(&self) -> &RemoteCursors {
        &self.cursors
    }

    /// Apply a server event, stamping presence with the local clock.
    pub fn apply<R: Renderer + ?Sized>(&mut self, event: &ServerEvent, renderer: &mut R) -> Applied {
        self.apply_at(event, renderer, now_ms())
    }

    /// Apply a server event received at `received_at_ms`.
    pub fn apply_at<R: Renderer + ?Sized>(&mut self, event: &ServerEvent, renderer: &mut R, received_at_ms: i64) -> Applied {
        match event {
            ServerEvent::Connected(welcome) => {
                self.session_id = Some(welcome.session_id);
                self.discard_undone_on_draw = welcome.discard_undone_on_draw;
                Applied::Presence
            }
            ServerEvent::FullResync(operations) => {
                self.entries.clone_from(operations);
                renderer.render_all(&self.entries);
                Applied::Repainted
            }
            ServerEvent::Incremental(op) => {
                // Only tombstoned entries go, so the surface needs no repaint.
                self.discard_undone(op.owner_id);
                self.entries.push(op.clone());
                if op.is_visible() {
                    renderer.render(op);
                }
                Applied::Appended
            }
            ServerEvent::StrokeVisibility { owner_id, stroke_id, visibility } => {
                for op in self
                    .entries
                    .iter_mut()
                    .filter(|op| op.owner_id == *owner_id && op.stroke_id == *stroke_id)
                {
                    op.visibility = *visibility;
                }
                renderer.render_all(&self.entries);
                Applied::Repainted
            }
            ServerEvent::Clear => {
                self.entries.clear();
                renderer.clear_surface();
                Applied::Cleared
            }
            ServerEvent::PresenceUpdate(view) => {
                if Some(view.session_id) != self.session_id {
                    self.cursors.upsert(view.clone(), received_at_ms);
                }
                Applied::Presence
            }
            ServerEvent::PresenceRemove(session_id) => {
                self.cursors.remove(*session_id);
                Applied::Presence
            }
        }
    }

    /// Record this participant's own submission before the server sees it.
    ///
    /// Drops the participant's own undone entries first, the same way the
    /// server will. Returns the optimistic operation, or `None` if the session
    /// identity is not known yet.
    pub fn submit_local<R: Renderer + ?Sized>(&mut self, submission: &Submission, renderer: &mut R) -> Option<Operation> {
        let owner = self.session_id?;
        self.discard_undone(owner);

        let op = Operation::new(owner, submission.clone());
        renderer.render(&op);
        self.entries.push(op.clone());
        Some(op)
    }

    /// Remove `owner`'s tombstoned entries if the discard policy is on.
    fn discard_undone(&mut self, owner: SessionId) {
        if self.discard_undone_on_draw {
            self.entries
                .retain(|op| !(op.owner_id == owner && op.is_tombstoned()));
        }
    }
}

// =============================================================================
// REMOTE CURSORS
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCursor {
    pub view: PresenceView,
    /// Local receipt time, milliseconds since Unix epoch.
    pub received_at: i64,
}

/// Other participants' pointers, keyed by session.
#[derive(Debug, Default)]
pub struct RemoteCursors {
    cursors: HashMap<SessionId, RemoteCursor>,
}

impl RemoteCursors {
    pub fn upsert(&mut self, view: PresenceView, received_at: i64) {
        self.cursors
            .insert(view.session_id, RemoteCursor { view, received_at });
    }

    pub fn remove(&mut self, session_id: SessionId) -> bool {
        self.cursors.remove(&session_id).is_some()
    }

    #[must_use]
    pub fn get(&self, session_id: SessionId) -> Option<&RemoteCursor> {
        self.cursors.get(&session_id)
    }

    /// Idle state judged against local receipt time, so clock skew between
    /// participants does not matter. `None` for unknown sessions.
    #[must_use]
    pub fn is_idle(&self, session_id: SessionId, now_ms: i64) -> Option<bool> {
        self.cursors
            .get(&session_id)
            .map(|c| is_idle(c.received_at, now_ms))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteCursor> {
        self.cursors.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }
}

#[cfg(test)]
#[path = "replica_test.rs"]
mod tests;
