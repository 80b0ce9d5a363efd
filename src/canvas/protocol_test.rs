use serde_json::json;

use super::*;
use crate::canvas::history;
use crate::canvas::test_helpers::{segment, shape};

#[test]
fn client_requests_map_from_syscalls() {
    let cases = [
        (CANVAS_READY, ClientRequest::Ready),
        (CANVAS_UNDO, ClientRequest::Undo),
        (CANVAS_REDO, ClientRequest::Redo),
        (CANVAS_CLEAR, ClientRequest::Clear),
    ];
    for (syscall, expected) in cases {
        let frame = Frame::request(syscall, Data::new());
        assert_eq!(ClientRequest::from_frame(&frame).expect(syscall), expected);
    }
}

#[test]
fn draw_request_keeps_raw_data_for_validation() {
    let mut data = Data::new();
    data.insert("color".into(), json!("#000"));
    let frame = Frame::request(CANVAS_DRAW, data.clone());

    assert_eq!(ClientRequest::from_frame(&frame).unwrap(), ClientRequest::Draw(data));
}

#[test]
fn cursor_move_requires_coordinates() {
    let frame = Frame::request(CURSOR_MOVE, Data::new()).with_data("name", "Neon Fox");
    let err = ClientRequest::from_frame(&frame).unwrap_err();
    assert!(matches!(err, ProtocolError::Payload { .. }));

    let frame = Frame::request(CURSOR_MOVE, Data::new())
        .with_data("x", 10.0)
        .with_data("y", 20);
    let ClientRequest::CursorMove(report) = ClientRequest::from_frame(&frame).unwrap() else {
        panic!("expected cursor move");
    };
    assert!((report.x - 10.0).abs() < f64::EPSILON);
    assert!((report.y - 20.0).abs() < f64::EPSILON);
    assert!(report.display_name.is_none());
    assert!(report.color.is_none());
}

#[test]
fn unknown_syscall_is_an_error() {
    let frame = Frame::request("canvas:rewind", Data::new());
    let err = ClientRequest::from_frame(&frame).unwrap_err();
    assert!(matches!(err, ProtocolError::UnknownSyscall(ref s) if s == "canvas:rewind"));
}

#[test]
fn client_request_frames_use_protocol_syscalls() {
    let report = CursorReport { x: 1.0, y: 2.0, display_name: Some("Quiet Owl".into()), color: None };
    let frame = ClientRequest::CursorMove(report.clone()).to_frame();
    assert_eq!(frame.syscall, CURSOR_MOVE);
    assert_eq!(frame.data.get("name").and_then(|v| v.as_str()), Some("Quiet Owl"));
    assert!(!frame.data.contains_key("color"));
    assert_eq!(ClientRequest::from_frame(&frame).unwrap(), ClientRequest::CursorMove(report));
}

#[test]
fn full_resync_carries_tombstones() {
    let owner = SessionId::new();
    let mut log = OperationLog::new();
    log.append(segment(owner, "S1")).unwrap();
    log.append(shape(owner, "S2")).unwrap();
    history::undo(&mut log, owner).unwrap();

    let frame = ServerEvent::FullResync(log.snapshot()).to_frame();
    assert_eq!(frame.syscall, CANVAS_SYNC);
    let ops = frame.data.get("operations").and_then(|v| v.as_array()).expect("operations");
    assert_eq!(ops.len(), 2);
    assert_eq!(ops[1].get("visibility").and_then(|v| v.as_str()), Some("tombstoned"));

    let ServerEvent::FullResync(decoded) = ServerEvent::from_frame(&frame).unwrap() else {
        panic!("expected resync");
    };
    assert_eq!(decoded, log.snapshot());
}

#[test]
fn incremental_frame_is_the_flat_operation() {
    let op = segment(SessionId::new(), "S1");
    let frame = ServerEvent::Incremental(op.clone()).to_frame();

    assert_eq!(frame.syscall, CANVAS_DRAW);
    assert_eq!(frame.data.get("stroke_id").and_then(|v| v.as_str()), Some("S1"));
    assert_eq!(ServerEvent::from_frame(&frame).unwrap(), ServerEvent::Incremental(op));
}

#[test]
fn clear_and_presence_events_decode() {
    let clear = ServerEvent::Clear.to_frame();
    assert!(clear.data.is_empty());
    assert_eq!(ServerEvent::from_frame(&clear).unwrap(), ServerEvent::Clear);

    let session_id = SessionId::new();
    let removed = ServerEvent::PresenceRemove(session_id).to_frame();
    assert_eq!(ServerEvent::from_frame(&removed).unwrap(), ServerEvent::PresenceRemove(session_id));
}

#[test]
fn malformed_server_payload_is_reported() {
    let frame = Frame::request(CANVAS_SYNC, Data::new()).with_data("operations", "nope");
    assert!(matches!(ServerEvent::from_frame(&frame), Err(ProtocolError::Payload { .. })));
}

#[test]
fn sync_strategy_parses_from_config_values() {
    assert_eq!("full".parse::<SyncStrategy>().unwrap(), SyncStrategy::FullResync);
    assert_eq!(" DIFF ".parse::<SyncStrategy>().unwrap(), SyncStrategy::StrokeDiff);
    assert!("partial".parse::<SyncStrategy>().is_err());
    assert_eq!(SyncStrategy::default(), SyncStrategy::FullResync);
}

#[test]
fn sync_strategy_picks_toggle_event() {
    let owner = SessionId::new();
    let mut log = OperationLog::new();
    log.append(segment(owner, "S1")).unwrap();
    let toggle = history::undo(&mut log, owner).unwrap();

    let full = SyncStrategy::FullResync.after_toggle(&log, &toggle);
    assert_eq!(full, ServerEvent::FullResync(log.snapshot()));

    let diff = SyncStrategy::StrokeDiff.after_toggle(&log, &toggle);
    assert_eq!(
        diff,
        ServerEvent::StrokeVisibility { owner_id: owner, stroke_id: toggle.stroke_id.clone(), visibility: Visibility::Tombstoned }
    );

    let frame = diff.to_frame();
    assert_eq!(frame.data.get("owner_id").and_then(|v| v.as_str()), Some(owner.to_string().as_str()));
    assert_eq!(ServerEvent::from_frame(&frame).unwrap(), diff);
}
