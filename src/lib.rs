//! Scribble — a shared-canvas sync server.
//!
//! ARCHITECTURE
//! ============
//! | Module | Role |
//! |--------|------|
//! | [`canvas`] | operation model, log, undo/redo, sync protocol, client replica |
//! | [`services`] | canvas event handling, presence, session identity |
//! | [`routes`] | Axum router and websocket handler |
//! | [`state`] | shared canvas state behind one lock |
//! | [`frame`] | JSON wire envelope |
//! | [`config`] | environment configuration |
//! | [`rate_limit`] | per-session cursor throttle |
//!
//! The server owns the only authoritative log. Clients keep a
//! [`canvas::replica::CanvasReplica`] that can always be rebuilt from a full
//! snapshot.

pub mod canvas;
pub mod config;
pub mod frame;
pub mod rate_limit;
pub mod routes;
pub mod services;
pub mod state;
