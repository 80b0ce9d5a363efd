//! End-to-end tests: real router on an ephemeral port, websocket clients.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use scribble::canvas::op::{Geometry, Point, SessionId, StrokeId, Submission, Tool};
use scribble::canvas::protocol::{ClientRequest, CursorReport, ServerEvent, Welcome};
use scribble::canvas::render::NullRenderer;
use scribble::canvas::replica::CanvasReplica;
use scribble::config::ServerConfig;
use scribble::frame::{Data, Frame};
use scribble::routes;
use scribble::state::AppState;
use serde_json::json;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = routes::app(AppState::new(ServerConfig::default()));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

struct Client {
    ws: Ws,
    welcome: Welcome,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let (mut ws, _) = connect_async(format!("ws://{addr}/api/ws")).await.unwrap();
        let frame = next_frame(&mut ws).await;
        let Ok(ServerEvent::Connected(welcome)) = ServerEvent::from_frame(&frame) else {
            panic!("first frame must be session:connected");
        };
        Self { ws, welcome }
    }

    fn id(&self) -> SessionId {
        self.welcome.session_id
    }

    async fn send_frame(&mut self, frame: &Frame) {
        let text = serde_json::to_string(frame).unwrap();
        self.ws.send(Message::text(text)).await.unwrap();
    }

    async fn send(&mut self, request: &ClientRequest) {
        self.send_frame(&request.to_frame()).await;
    }

    async fn recv_frame(&mut self) -> Frame {
        next_frame(&mut self.ws).await
    }

    async fn recv(&mut self) -> ServerEvent {
        let frame = self.recv_frame().await;
        ServerEvent::from_frame(&frame).unwrap()
    }

    async fn expect_silence(&mut self) {
        assert!(
            timeout(Duration::from_millis(150), self.ws.next()).await.is_err(),
            "expected no frame"
        );
    }

    async fn ready(&mut self) -> Vec<scribble::canvas::op::Operation> {
        self.send(&ClientRequest::Ready).await;
        let ServerEvent::FullResync(ops) = self.recv().await else {
            panic!("ready must be answered with a full resync");
        };
        ops
    }
}

async fn next_frame(ws: &mut Ws) -> Frame {
    loop {
        let msg = timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("ws error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

fn segment(stroke: &str, x: f64) -> ClientRequest {
    ClientRequest::draw(&Submission {
        stroke_id: StrokeId::new(stroke).unwrap(),
        geometry: Geometry::Freehand {
            prev_point: None,
            current_point: Point::new(x, x),
            color: "#000".into(),
            width: Tool::Pen.width(),
            tool: Tool::Pen,
        },
    })
}

fn visible(event: &ServerEvent) -> Vec<String> {
    let ServerEvent::FullResync(ops) = event else {
        panic!("expected full resync, got {event:?}");
    };
    ops.iter()
        .filter(|op| op.is_visible())
        .map(|op| op.stroke_id.to_string())
        .collect()
}

#[tokio::test]
async fn healthz_is_ok() {
    let addr = spawn_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    tokio::io::AsyncWriteExt::write_all(&mut stream, b"GET /healthz HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    tokio::io::AsyncReadExt::read_to_string(&mut stream, &mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
}

#[tokio::test]
async fn undo_undo_redo_scenario() {
    let addr = spawn_server().await;
    let mut a = Client::connect(addr).await;
    let mut b = Client::connect(addr).await;
    assert_ne!(a.id(), b.id());
    assert!(a.ready().await.is_empty());
    assert!(b.ready().await.is_empty());

    a.send(&segment("S1", 1.0)).await;
    a.send(&segment("S1", 2.0)).await;
    a.send(&segment("S2", 3.0)).await;
    for _ in 0..3 {
        assert!(matches!(b.recv().await, ServerEvent::Incremental(op) if op.owner_id == a.id()));
    }
    b.send(&segment("S3", 4.0)).await;
    assert!(matches!(a.recv().await, ServerEvent::Incremental(op) if op.stroke_id.as_str() == "S3"));

    a.send(&ClientRequest::Undo).await;
    assert_eq!(visible(&a.recv().await), vec!["S1", "S1", "S3"]);
    assert_eq!(visible(&b.recv().await), vec!["S1", "S1", "S3"]);

    a.send(&ClientRequest::Undo).await;
    assert_eq!(visible(&a.recv().await), vec!["S3"]);
    assert_eq!(visible(&b.recv().await), vec!["S3"]);

    a.send(&ClientRequest::Redo).await;
    assert_eq!(visible(&a.recv().await), vec!["S1", "S1", "S3"]);
    assert_eq!(visible(&b.recv().await), vec!["S1", "S1", "S3"]);
}

#[tokio::test]
async fn malformed_submission_is_not_broadcast() {
    let addr = spawn_server().await;
    let mut a = Client::connect(addr).await;
    let mut b = Client::connect(addr).await;

    let mut data = Data::new();
    data.insert("color".into(), json!("#000"));
    a.send(&ClientRequest::Draw(data)).await;

    b.expect_silence().await;
    a.expect_silence().await;
    assert!(b.ready().await.is_empty());
}

#[tokio::test]
async fn late_joiner_converges_from_snapshot() {
    let addr = spawn_server().await;
    let mut a = Client::connect(addr).await;
    a.send(&segment("S1", 1.0)).await;
    a.send(&segment("S2", 2.0)).await;
    a.send(&ClientRequest::Undo).await;
    a.recv().await;

    let mut late = Client::connect(addr).await;
    let mut replica = CanvasReplica::new();
    replica.apply(&ServerEvent::Connected(late.welcome.clone()), &mut NullRenderer);
    let snapshot = late.ready().await;
    replica.apply(&ServerEvent::FullResync(snapshot), &mut NullRenderer);

    let ids: Vec<&str> = replica.visible().map(|op| op.stroke_id.as_str()).collect();
    assert_eq!(ids, vec!["S1"]);
    assert_eq!(replica.entries().len(), 2);
}

#[tokio::test]
async fn clear_reaches_everyone() {
    let addr = spawn_server().await;
    let mut a = Client::connect(addr).await;
    let mut b = Client::connect(addr).await;
    a.send(&segment("S1", 1.0)).await;
    b.recv().await;

    b.send(&ClientRequest::Clear).await;

    assert_eq!(a.recv().await, ServerEvent::Clear);
    assert_eq!(b.recv().await, ServerEvent::Clear);
    a.send(&ClientRequest::Undo).await;
    a.expect_silence().await;
}

#[tokio::test]
async fn presence_update_and_removal() {
    let addr = spawn_server().await;
    let mut a = Client::connect(addr).await;
    let mut b = Client::connect(addr).await;

    a.send(&ClientRequest::CursorMove(CursorReport { x: 10.0, y: 20.0, display_name: None, color: None }))
        .await;
    let ServerEvent::PresenceUpdate(view) = b.recv().await else {
        panic!("expected presence update");
    };
    assert_eq!(view.session_id, a.id());
    assert_eq!(view.display_name, a.welcome.display_name);
    assert!(view.last_update > 0);
    a.expect_silence().await;

    let a_id = a.id();
    a.ws.close(None).await.unwrap();
    drop(a);
    assert_eq!(b.recv().await, ServerEvent::PresenceRemove(a_id));
}

#[tokio::test]
async fn unknown_syscall_is_answered_with_error() {
    let addr = spawn_server().await;
    let mut a = Client::connect(addr).await;

    a.send_frame(&Frame::request("board:join", Data::new())).await;

    let frame = a.recv_frame().await;
    assert_eq!(frame.status, scribble::frame::Status::Error);
    assert_eq!(frame.data.get("code"), Some(&json!("E_UNKNOWN_SYSCALL")));
}
