//! WebSocket handler — bidirectional frame relay.
//!
//! DESIGN
//! ======
//! On upgrade, issues a session id, registers the connection, and enters a
//! `select!` loop:
//! - Incoming client frames → parse + dispatch by request kind
//! - Frames queued for this connection → forward to client
//!
//! Handler functions are pure canvas logic. They run under the canvas write
//! lock and return an `Outcome`; the dispatch layer queues the resulting
//! frames for the right connections before the lock is released. The only
//! frames written straight to the socket are error replies.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → register, queue `session:connected`
//! 2. Client sends frames → dispatch → handler returns Outcome
//! 3. Dispatch queues frames (reply / broadcast to others / broadcast to all)
//! 4. Close → drop presence → broadcast `cursor:removed`

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::canvas::op::SessionId;
use crate::canvas::protocol::{ClientRequest, ServerEvent};
use crate::frame::{Frame, Status, now_ms};
use crate::services;
use crate::services::session::DisplayIdentity;
use crate::state::{AppState, CanvasState};

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. The dispatch layer uses this to
/// decide who receives what — handlers never send frames directly.
#[derive(Debug, PartialEq)]
enum Outcome {
    /// Nothing to send. No-op undo/redo, dropped submissions, throttled cursors.
    Nothing,
    /// Send to the sender only, correlated with its request.
    Reply(ServerEvent),
    /// Send to every connection except the sender.
    BroadcastExcludeSender(ServerEvent),
    /// Send to every connection including the sender.
    BroadcastAll(ServerEvent),
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let session_id = SessionId::new();

    // Per-connection channel for frames queued by any event handler.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(state.config.client_channel_capacity);
    {
        let mut canvas = state.canvas.write().await;
        services::session::connect(&mut canvas, session_id, DisplayIdentity::random(), client_tx);
    }

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        for frame in process_inbound_text(&state, session_id, text.as_str()).await {
                            let _ = send_frame(&mut socket, &frame).await;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    let mut canvas = state.canvas.write().await;
    let removed = services::presence::disconnect(&mut canvas, session_id);
    services::canvas::broadcast(&canvas, &removed.to_frame().with_from(session_id.to_string()), Some(session_id));
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Parse and process one inbound text frame and return frames for the sender.
///
/// Everything except error replies is queued on connection channels while the
/// canvas lock is held, so tests can observe fan-out through the receivers.
async fn process_inbound_text(state: &AppState, session_id: SessionId, text: &str) -> Vec<Frame> {
    let mut req: Frame = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            warn!(%session_id, error = %e, "ws: invalid inbound frame");
            return vec![];
        }
    };

    // The session id is the only identity a client has.
    req.from = Some(session_id.to_string());

    let is_cursor = req.prefix() == "cursor";
    if !is_cursor {
        info!(%session_id, id = %req.id, syscall = %req.syscall, status = ?req.status, "ws: recv frame");
    }

    let request = match ClientRequest::from_frame(&req) {
        Ok(request) => request,
        Err(e) => return vec![req.error_from(&e)],
    };

    let mut canvas = state.canvas.write().await;
    let outcome = match request {
        ClientRequest::Ready => Outcome::Reply(services::canvas::snapshot(&canvas)),
        ClientRequest::Draw(data) => services::canvas::submit_or_drop(&mut canvas, session_id, &data)
            .map_or(Outcome::Nothing, |op| Outcome::BroadcastExcludeSender(ServerEvent::Incremental(op))),
        ClientRequest::Undo => services::canvas::undo(&mut canvas, session_id).map_or(Outcome::Nothing, Outcome::BroadcastAll),
        ClientRequest::Redo => services::canvas::redo(&mut canvas, session_id).map_or(Outcome::Nothing, Outcome::BroadcastAll),
        ClientRequest::Clear => Outcome::BroadcastAll(services::canvas::clear(&mut canvas, session_id)),
        ClientRequest::CursorMove(report) => services::presence::move_cursor(&mut canvas, session_id, report, now_ms())
            .map_or(Outcome::Nothing, Outcome::BroadcastExcludeSender),
    };
    deliver(&canvas, session_id, &req, outcome);
    vec![]
}

/// Queue the frames an outcome calls for. Caller holds the canvas lock.
fn deliver(canvas: &CanvasState, session_id: SessionId, req: &Frame, outcome: Outcome) {
    match outcome {
        Outcome::Nothing => {}
        Outcome::Reply(event) => {
            let frame = event.to_frame().with_parent(req.id);
            services::canvas::send_to(canvas, session_id, &frame);
        }
        Outcome::BroadcastExcludeSender(event) => {
            let frame = event.to_frame().with_from(session_id.to_string());
            services::canvas::broadcast(canvas, &frame, Some(session_id));
        }
        Outcome::BroadcastAll(event) => {
            let frame = event.to_frame().with_from(session_id.to_string());
            services::canvas::broadcast(canvas, &frame, None);
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), ()> {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize frame");
            return Err(());
        }
    };
    if !frame.syscall.starts_with("cursor:") {
        if frame.status == Status::Error {
            let code = frame
                .data
                .get("code")
                .and_then(|v| v.as_str())
                .unwrap_or("-");
            let message = frame
                .data
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("-");
            warn!(id = %frame.id, syscall = %frame.syscall, code, message, "ws: send frame status=Error");
        } else {
            info!(id = %frame.id, syscall = %frame.syscall, status = ?frame.status, "ws: send frame");
        }
    }
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
