mod render;

use std::io;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use futures_util::{SinkExt, StreamExt};
use scribble::canvas::op::{Geometry, Point, ShapeKind, Tool};
use scribble::canvas::protocol::{ClientRequest, CursorReport, ServerEvent};
use scribble::canvas::render::NullRenderer;
use scribble::canvas::replica::CanvasReplica;
use scribble::canvas::stroke::{DrawTool, PointerEvent, StrokeBuilder};
use scribble::frame::{Frame, Status};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::render::TextRenderer;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("websocket error: {0}")]
    Ws(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket closed")]
    WsClosed,
    #[error("timed out waiting for websocket frame")]
    Timeout,
    #[error("server returned error for {syscall}: {message}")]
    ServerError { syscall: String, message: String },
    #[error("invalid point `{0}`; expected x,y")]
    InvalidPoint(String),
    #[error("a stroke needs at least one point")]
    NoPoints,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for CliError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Ws(Box::new(error))
    }
}

#[derive(Parser, Debug)]
#[command(name = "scribble-cli", about = "Scribble canvas websocket CLI")]
struct Cli {
    #[arg(long, env = "SCRIBBLE_BASE_URL", default_value = "http://127.0.0.1:3001")]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the server health endpoint.
    Ping,
    /// Print every canvas change until interrupted or the duration elapses.
    Watch(WatchArgs),
    /// Draw one stroke or shape through the given points.
    Draw(DrawArgs),
    /// Undo this connection's latest stroke. A fresh connection has none.
    Undo,
    Redo,
    /// Clear the canvas for everyone.
    Clear,
}

#[derive(Args, Debug)]
struct WatchArgs {
    #[arg(long, help = "Stop after this many seconds")]
    duration_secs: Option<u64>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ToolArg {
    Pen,
    Eraser,
    Rectangle,
    Circle,
    Triangle,
    Arrow,
}

impl From<ToolArg> for DrawTool {
    fn from(tool: ToolArg) -> Self {
        match tool {
            ToolArg::Pen => Self::Freehand(Tool::Pen),
            ToolArg::Eraser => Self::Freehand(Tool::Eraser),
            ToolArg::Rectangle => Self::Shape(ShapeKind::Rectangle),
            ToolArg::Circle => Self::Shape(ShapeKind::Circle),
            ToolArg::Triangle => Self::Shape(ShapeKind::Triangle),
            ToolArg::Arrow => Self::Shape(ShapeKind::Arrow),
        }
    }
}

#[derive(Args, Debug)]
struct DrawArgs {
    #[arg(long, value_enum, default_value_t = ToolArg::Pen)]
    tool: ToolArg,

    #[arg(long, default_value = "#000")]
    color: String,

    /// Points as `x,y`, in drawing order.
    #[arg(required = true, num_args = 1..)]
    points: Vec<String>,

    #[arg(long, default_value_t = false, help = "Undo the stroke right after drawing it")]
    then_undo: bool,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Ping => run_ping(&cli.base_url).await,
        Command::Watch(args) => run_watch(&cli.base_url, args).await,
        Command::Draw(args) => run_draw(&cli.base_url, args).await,
        Command::Undo => run_simple(&cli.base_url, &ClientRequest::Undo).await,
        Command::Redo => run_simple(&cli.base_url, &ClientRequest::Redo).await,
        Command::Clear => run_simple(&cli.base_url, &ClientRequest::Clear).await,
    }
}

async fn run_ping(base_url: &str) -> Result<(), CliError> {
    let client = reqwest::Client::new();
    let url = format!("{}/healthz", base_url.trim_end_matches('/'));
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::ServerError {
            syscall: format!("HTTP {}", status.as_u16()),
            message: "health check failed".to_owned(),
        });
    }
    println!("ok");
    Ok(())
}

async fn run_watch(base_url: &str, args: WatchArgs) -> Result<(), CliError> {
    let (mut stream, mut replica) = join(base_url).await?;
    let mut renderer = TextRenderer::new(io::stdout());
    send_request(&mut stream, &ClientRequest::Ready).await?;

    let Some(secs) = args.duration_secs else {
        return watch_loop(&mut stream, &mut replica, &mut renderer).await;
    };
    let watched = tokio::time::timeout(
        Duration::from_secs(secs),
        watch_loop(&mut stream, &mut replica, &mut renderer),
    )
    .await;
    if let Ok(result) = watched {
        return result;
    }
    eprintln!("watched {} operations, {} visible", replica.entries().len(), replica.visible().count());
    Ok(())
}

async fn watch_loop(
    stream: &mut WsStream,
    replica: &mut CanvasReplica,
    renderer: &mut TextRenderer<io::Stdout>,
) -> Result<(), CliError> {
    loop {
        let frame = recv_any(stream).await?;
        let event = match ServerEvent::from_frame(&frame) {
            Ok(event) => event,
            Err(error) => {
                eprintln!("skipping frame {}: {error}", frame.syscall);
                continue;
            }
        };
        match &event {
            ServerEvent::PresenceUpdate(view) => {
                eprintln!("cursor {} at ({:.0},{:.0})", view.display_name, view.x, view.y);
            }
            ServerEvent::PresenceRemove(id) => eprintln!("cursor {id} left"),
            _ => {}
        }
        replica.apply(&event, renderer);
    }
}

async fn run_draw(base_url: &str, args: DrawArgs) -> Result<(), CliError> {
    let points = args
        .points
        .iter()
        .map(|raw| parse_point(raw))
        .collect::<Result<Vec<_>, _>>()?;
    let events = pointer_events(&points)?;

    let (mut stream, mut replica) = join(base_url).await?;
    let mut renderer = TextRenderer::new(io::stdout());
    let mut builder = StrokeBuilder::new(args.tool.into(), args.color.clone());

    let mut sent = 0_usize;
    for event in events {
        send_request(
            &mut stream,
            &ClientRequest::CursorMove(CursorReport { x: event.point.x, y: event.point.y, display_name: None, color: None }),
        )
        .await?;
        let Some(submission) = builder.feed(event) else {
            if let Some(Geometry::Shape { start_point, end_point, .. }) = builder.preview() {
                eprintln!("dragging ({}, {}) -> ({}, {})", start_point.x, start_point.y, end_point.x, end_point.y);
            }
            continue;
        };
        replica.submit_local(&submission, &mut renderer);
        send_request(&mut stream, &ClientRequest::draw(&submission)).await?;
        sent = sent.saturating_add(1);
    }

    if args.then_undo {
        send_request(&mut stream, &ClientRequest::Undo).await?;
        let frame = recv_any(&mut stream).await?;
        if let Ok(event) = ServerEvent::from_frame(&frame) {
            replica.apply(&event, &mut renderer);
        }
    }

    eprintln!("draw complete: tool={:?} submissions={sent} undone={}", args.tool, args.then_undo);
    Ok(())
}

async fn run_simple(base_url: &str, request: &ClientRequest) -> Result<(), CliError> {
    let (mut stream, _) = join(base_url).await?;
    send_request(&mut stream, request).await?;
    // A clear echoes back; undo/redo from a fresh session have nothing to toggle.
    if matches!(request, ClientRequest::Clear) {
        let frame = recv_any(&mut stream).await?;
        eprintln!("{}", frame.syscall);
    }
    Ok(())
}

// =============================================================================
// HELPERS
// =============================================================================

/// Connect, wait for `session:connected`, and seed a replica with it.
async fn join(base_url: &str) -> Result<(WsStream, CanvasReplica), CliError> {
    let (mut stream, _) = connect_async(ws_url(base_url)?).await?;
    let mut replica = CanvasReplica::new();
    loop {
        let frame = recv_any(&mut stream).await?;
        if let Ok(ServerEvent::Connected(welcome)) = ServerEvent::from_frame(&frame) {
            eprintln!("joined as {} ({})", welcome.display_name, welcome.session_id);
            replica.apply(&ServerEvent::Connected(welcome), &mut NullRenderer);
            return Ok((stream, replica));
        }
    }
}

fn ws_url(base_url: &str) -> Result<String, CliError> {
    let base_url = base_url.trim_end_matches('/');
    if let Some(rest) = base_url.strip_prefix("http://") {
        return Ok(format!("ws://{rest}/api/ws"));
    }
    if let Some(rest) = base_url.strip_prefix("https://") {
        return Ok(format!("wss://{rest}/api/ws"));
    }
    Err(CliError::InvalidBaseUrl(base_url.to_owned()))
}

async fn send_request(stream: &mut WsStream, request: &ClientRequest) -> Result<(), CliError> {
    let text = serde_json::to_string(&request.to_frame())?;
    stream.send(Message::text(text)).await?;
    Ok(())
}

async fn recv_any(stream: &mut WsStream) -> Result<Frame, CliError> {
    recv_next(stream, Duration::from_secs(3600)).await
}

async fn recv_next(stream: &mut WsStream, timeout: Duration) -> Result<Frame, CliError> {
    let fut = async {
        loop {
            let Some(message) = stream.next().await else {
                return Err(CliError::WsClosed);
            };
            match message? {
                Message::Text(text) => {
                    let frame: Frame = serde_json::from_str(text.as_str())?;
                    if frame.status == Status::Error {
                        return Err(CliError::ServerError {
                            syscall: frame.syscall,
                            message: frame
                                .data
                                .get("message")
                                .and_then(serde_json::Value::as_str)
                                .unwrap_or("unknown websocket error")
                                .to_owned(),
                        });
                    }
                    return Ok(frame);
                }
                Message::Close(_) => return Err(CliError::WsClosed),
                _ => {}
            }
        }
    };

    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| CliError::Timeout)?
}

fn parse_point(raw: &str) -> Result<Point, CliError> {
    let invalid = || CliError::InvalidPoint(raw.to_owned());
    let (x, y) = raw.split_once(',').ok_or_else(invalid)?;
    let x: f64 = x.trim().parse().map_err(|_| invalid())?;
    let y: f64 = y.trim().parse().map_err(|_| invalid())?;
    let point = Point::new(x, y);
    if !point.is_finite() {
        return Err(invalid());
    }
    Ok(point)
}

/// Down on the first point, moves through the middle, up on the last.
fn pointer_events(points: &[Point]) -> Result<Vec<PointerEvent>, CliError> {
    let (first, rest) = points.split_first().ok_or(CliError::NoPoints)?;
    let mut events = vec![PointerEvent::down(*first)];
    events.extend(rest.iter().map(|p| PointerEvent::moved(*p)));
    let last = events.last().map_or(*first, |e| e.point);
    events.push(PointerEvent::up(last));
    Ok(events)
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
