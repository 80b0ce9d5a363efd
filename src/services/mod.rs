//! Domain services used by the websocket route.
//!
//! ARCHITECTURE
//! ============
//! Service functions take the already-locked canvas state and return the
//! event to fan out, so route handlers stay focused on protocol translation
//! and lock scope.

pub mod canvas;
pub mod presence;
pub mod session;
