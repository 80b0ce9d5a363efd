use serde_json::json;
use tokio::sync::mpsc;

use super::*;
use crate::canvas::op::Visibility;
use crate::canvas::protocol::SyncStrategy;
use crate::services::session::{self, DisplayIdentity};

fn pen(stroke: &str) -> Data {
    let value = json!({
        "stroke_id": stroke,
        "kind": "freehand",
        "prev_point": {"x": 0.0, "y": 0.0},
        "current_point": {"x": 1.0, "y": 1.0},
        "color": "#000",
        "width": 5.0,
        "tool": "pen",
    });
    value.as_object().cloned().unwrap()
}

fn connected(canvas: &mut CanvasState) -> (SessionId, mpsc::Receiver<Frame>) {
    let (tx, mut rx) = mpsc::channel(16);
    let id = SessionId::new();
    session::connect(canvas, id, DisplayIdentity::random(), tx);
    rx.try_recv().unwrap();
    (id, rx)
}

fn visible(canvas: &CanvasState) -> Vec<String> {
    canvas
        .log
        .visible()
        .map(|op| op.stroke_id.to_string())
        .collect()
}

#[test]
fn submit_stamps_owner_and_visibility() {
    let mut canvas = CanvasState::default();
    let owner = SessionId::new();
    let mut data = pen("S1");
    data.insert("owner_id".into(), json!(SessionId::new()));
    data.insert("visibility".into(), json!("tombstoned"));

    let op = submit(&mut canvas, owner, &data).unwrap();

    assert_eq!(op.owner_id, owner);
    assert_eq!(op.visibility, Visibility::Visible);
    assert_eq!(canvas.log.len(), 1);
}

#[test]
fn malformed_submission_is_dropped() {
    let mut canvas = CanvasState::default();
    let data = json!({"color": "#000"}).as_object().cloned().unwrap();

    assert!(submit_or_drop(&mut canvas, SessionId::new(), &data).is_none());
    assert!(canvas.log.is_empty());
}

#[test]
fn forged_stroke_id_is_dropped() {
    let mut canvas = CanvasState::default();
    let a = SessionId::new();
    let b = SessionId::new();
    submit(&mut canvas, a, &pen("S1")).unwrap();

    assert!(matches!(
        submit(&mut canvas, b, &pen("S1")),
        Err(OperationError::StrokeOwnedByOther(_))
    ));
    assert_eq!(canvas.log.len(), 1);
}

#[test]
fn undo_redo_walkthrough_emits_full_resync() {
    let mut canvas = CanvasState::default();
    let a = SessionId::new();
    let b = SessionId::new();
    submit(&mut canvas, a, &pen("S1")).unwrap();
    submit(&mut canvas, a, &pen("S1")).unwrap();
    submit(&mut canvas, a, &pen("S2")).unwrap();
    submit(&mut canvas, b, &pen("S3")).unwrap();

    let Some(ServerEvent::FullResync(ops)) = undo(&mut canvas, a) else {
        panic!("expected full resync");
    };
    assert_eq!(ops.len(), 4);
    assert_eq!(visible(&canvas), vec!["S1", "S1", "S3"]);

    undo(&mut canvas, a).unwrap();
    assert_eq!(visible(&canvas), vec!["S3"]);

    redo(&mut canvas, a).unwrap();
    assert_eq!(visible(&canvas), vec!["S1", "S1", "S3"]);
}

#[test]
fn diff_strategy_emits_visibility_event() {
    let mut canvas = CanvasState::default();
    canvas.sync_strategy = SyncStrategy::StrokeDiff;
    let a = SessionId::new();
    submit(&mut canvas, a, &pen("S1")).unwrap();

    let event = undo(&mut canvas, a).unwrap();

    assert!(matches!(
        event,
        ServerEvent::StrokeVisibility { owner_id, ref stroke_id, visibility: Visibility::Tombstoned } if owner_id == a && stroke_id.as_str() == "S1"
    ));
}

#[test]
fn noop_undo_and_redo_return_nothing() {
    let mut canvas = CanvasState::default();
    let a = SessionId::new();
    assert!(undo(&mut canvas, a).is_none());
    assert!(redo(&mut canvas, a).is_none());
}

#[test]
fn clear_empties_log_and_disarms_undo() {
    let mut canvas = CanvasState::default();
    let a = SessionId::new();
    submit(&mut canvas, a, &pen("S1")).unwrap();

    assert_eq!(clear(&mut canvas, a), ServerEvent::Clear);
    assert!(canvas.log.snapshot().is_empty());
    assert!(undo(&mut canvas, a).is_none());
}

#[test]
fn snapshot_includes_tombstoned_entries() {
    let mut canvas = CanvasState::default();
    let a = SessionId::new();
    submit(&mut canvas, a, &pen("S1")).unwrap();
    undo(&mut canvas, a);

    let ServerEvent::FullResync(ops) = snapshot(&canvas) else {
        panic!("expected full resync");
    };
    assert_eq!(ops.len(), 1);
    assert!(ops[0].is_tombstoned());
}

#[test]
fn broadcast_skips_excluded_session() {
    let mut canvas = CanvasState::default();
    let (a, mut rx_a) = connected(&mut canvas);
    let (_b, mut rx_b) = connected(&mut canvas);
    let (_c, mut rx_c) = connected(&mut canvas);

    let sent = broadcast(&canvas, &ServerEvent::Clear.to_frame(), Some(a));

    assert_eq!(sent, 2);
    assert!(rx_a.try_recv().is_err());
    assert!(rx_b.try_recv().is_ok());
    assert!(rx_c.try_recv().is_ok());
}

#[test]
fn full_channel_does_not_block_others() {
    let mut canvas = CanvasState::default();
    let (tx, _rx_slow) = mpsc::channel(1);
    let slow = SessionId::new();
    session::connect(&mut canvas, slow, DisplayIdentity::random(), tx);
    let (_fast, mut rx_fast) = connected(&mut canvas);

    let sent = broadcast(&canvas, &ServerEvent::Clear.to_frame(), None);

    assert_eq!(sent, 1);
    assert!(rx_fast.try_recv().is_ok());
    assert!(!send_to(&canvas, SessionId::new(), &ServerEvent::Clear.to_frame()));
}
