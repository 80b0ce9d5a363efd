//! Presence tracker — ephemeral pointer positions per connection.
//!
//! DESIGN
//! ======
//! Presence is advisory. Entries are overwritten in place, never versioned,
//! and never touch the operation log. The tracker stores only the time of the
//! last update; whether a cursor is idle is decided by each receiver with
//! [`is_idle`], so idle transitions never need a broadcast of their own.

use std::collections::HashMap;

use crate::canvas::op::{Point, SessionId};
use crate::canvas::protocol::PresenceView;

/// A cursor that has not moved for longer than this is idle.
pub const IDLE_THRESHOLD_MS: i64 = 3000;

/// Whether a cursor last updated at `last_update_ms` is idle at `now_ms`.
#[must_use]
pub fn is_idle(last_update_ms: i64, now_ms: i64) -> bool {
    now_ms.saturating_sub(last_update_ms) > IDLE_THRESHOLD_MS
}

#[derive(Debug, Clone, PartialEq)]
pub struct PresenceEntry {
    pub position: Point,
    pub display_name: String,
    pub color: String,
    /// Milliseconds since Unix epoch.
    pub last_update: i64,
}

#[derive(Debug, Default)]
pub struct PresenceTracker {
    entries: HashMap<SessionId, PresenceEntry>,
}

impl PresenceTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the entry for `session_id`, stamped with `now_ms`.
    /// Returns the view to broadcast to the other participants.
    pub fn update(
        &mut self,
        session_id: SessionId,
        position: Point,
        display_name: impl Into<String>,
        color: impl Into<String>,
        now_ms: i64,
    ) -> PresenceView {
        let entry = PresenceEntry {
            position,
            display_name: display_name.into(),
            color: color.into(),
            last_update: now_ms,
        };
        let view = PresenceView {
            session_id,
            x: position.x,
            y: position.y,
            display_name: entry.display_name.clone(),
            color: entry.color.clone(),
            last_update: now_ms,
        };
        self.entries.insert(session_id, entry);
        view
    }

    /// Delete the entry for `session_id`. Returns whether one existed.
    pub fn remove(&mut self, session_id: SessionId) -> bool {
        self.entries.remove(&session_id).is_some()
    }

    #[must_use]
    pub fn get(&self, session_id: SessionId) -> Option<&PresenceEntry> {
        self.entries.get(&session_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "presence_test.rs"]
mod tests;
