use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use shapes::{Envelope, RoomId, Shape, ShapeError, ShapeId, StrokeId};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[cfg(test)]
#[path = "main_test.rs"]
mod main_test;

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

const ACK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("missing token; pass --token or set DRAW_TOKEN")]
    MissingToken,
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket closed")]
    WsClosed,
    #[error("timed out waiting for the server")]
    Timeout,
    #[error("server rejected request ({code}): {message}")]
    Server { code: String, message: String },
    #[error("invalid shape: {0}")]
    Shape(#[from] ShapeError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for CliError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WsConnect(Box::new(error))
    }
}

#[derive(Parser, Debug)]
#[command(name = "draw", about = "Drawing room websocket and history CLI")]
struct Cli {
    #[arg(long, env = "DRAW_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[arg(long, env = "DRAW_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone)]
struct CliContext {
    base_url: String,
    token: Option<String>,
}

impl CliContext {
    fn token(&self) -> Result<&str, CliError> {
        self.token.as_deref().filter(|t| !t.trim().is_empty()).ok_or(CliError::MissingToken)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the server's liveness route.
    Ping,
    /// Print a room's stored messages, oldest first.
    History { room: String },
    /// Join a room and print every envelope it broadcasts.
    Tail {
        room: String,
        #[arg(long, help = "Exit after this many envelopes")]
        count: Option<usize>,
    },
    /// Draw a rectangle.
    Rect(BoxArgs),
    /// Draw a circle inscribed in the given box.
    Circle(BoxArgs),
    /// Draw a single-segment pencil stroke.
    Line(LineArgs),
    /// Delete shapes by id. Whole strokes go with any of their segments.
    Erase {
        room: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Args, Debug)]
struct BoxArgs {
    room: String,
    #[arg(allow_negative_numbers = true)]
    x: f64,
    #[arg(allow_negative_numbers = true)]
    y: f64,
    #[arg(allow_negative_numbers = true)]
    width: f64,
    #[arg(allow_negative_numbers = true)]
    height: f64,
}

#[derive(Args, Debug)]
struct LineArgs {
    room: String,
    #[arg(allow_negative_numbers = true)]
    x1: f64,
    #[arg(allow_negative_numbers = true)]
    y1: f64,
    #[arg(allow_negative_numbers = true)]
    x2: f64,
    #[arg(allow_negative_numbers = true)]
    y2: f64,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = CliContext { base_url: cli.base_url, token: cli.token };

    match cli.command {
        Command::Ping => run_ping(&ctx).await,
        Command::History { room } => run_history(&ctx, &RoomId::from(room)).await,
        Command::Tail { room, count } => run_tail(&ctx, &RoomId::from(room), count).await,
        Command::Rect(args) => {
            let shape = box_shape(ShapeKind::Rect, &args);
            run_draw(&ctx, &RoomId::from(args.room), shape).await
        }
        Command::Circle(args) => {
            let shape = box_shape(ShapeKind::Circle, &args);
            run_draw(&ctx, &RoomId::from(args.room), shape).await
        }
        Command::Line(args) => {
            let shape = line_shape(&args);
            run_draw(&ctx, &RoomId::from(args.room), shape).await
        }
        Command::Erase { room, ids } => {
            let ids = ids.into_iter().map(ShapeId::from).collect();
            run_erase(&ctx, &RoomId::from(room), ids).await
        }
    }
}

// =============================================================================
// HTTP
// =============================================================================

async fn run_ping(cli: &CliContext) -> Result<(), CliError> {
    let url = format!("{}/healthz", cli.base_url.trim_end_matches('/'));
    let response = reqwest::Client::new().get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::HttpStatus { status: status.as_u16(), body: "health check failed".to_owned() });
    }
    println!("ok");
    Ok(())
}

async fn run_history(cli: &CliContext, room_id: &RoomId) -> Result<(), CliError> {
    let url = format!("{}/chats/{room_id}", cli.base_url.trim_end_matches('/'));
    let response = reqwest::Client::new().get(url).query(&[("token", cli.token()?)]).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CliError::HttpStatus { status: status.as_u16(), body });
    }

    let body = response.json::<Value>().await?;
    let messages = body.get("messages").and_then(Value::as_array).cloned().unwrap_or_default();
    for message in &messages {
        println!("{}", serde_json::to_string(message)?);
    }
    eprintln!("{} messages in room {room_id}", messages.len());
    Ok(())
}

// =============================================================================
// WEBSOCKET
// =============================================================================

async fn run_tail(cli: &CliContext, room_id: &RoomId, count: Option<usize>) -> Result<(), CliError> {
    let mut stream = open_room(cli, room_id).await?;
    let mut seen = 0_usize;
    while count.is_none_or(|limit| seen < limit) {
        let envelope = recv_envelope(&mut stream).await?;
        println!("{}", envelope.to_json()?);
        seen = seen.saturating_add(1);
    }
    Ok(())
}

async fn run_draw(cli: &CliContext, room_id: &RoomId, shape: Shape) -> Result<(), CliError> {
    shape.validate()?;
    let chat = Envelope::chat(room_id.clone(), &shape)?;
    let mut stream = open_room(cli, room_id).await?;
    send_envelope(&mut stream, &chat).await?;

    // Creations are echoed to the sender; the echo confirms the server applied it.
    wait_for(&mut stream, |envelope| *envelope == chat).await?;
    println!("{}", shape.id);
    Ok(())
}

async fn run_erase(cli: &CliContext, room_id: &RoomId, ids: Vec<ShapeId>) -> Result<(), CliError> {
    let mut stream = open_room(cli, room_id).await?;
    send_envelope(&mut stream, &Envelope::delete(room_id.clone(), ids)).await?;

    let deletion = wait_for(&mut stream, |envelope| {
        matches!(envelope, Envelope::DeleteShapes { room_id: target, .. } if target == room_id)
    })
    .await?;
    if let Envelope::DeleteShapes { payload, .. } = deletion {
        for id in payload.ids {
            println!("{id}");
        }
    }
    Ok(())
}

/// Connect with the configured token and join `room_id`.
async fn open_room(cli: &CliContext, room_id: &RoomId) -> Result<WsStream, CliError> {
    let url = ws_url(&cli.base_url, cli.token()?)?;
    let (mut stream, _) = connect_async(url).await?;
    send_envelope(&mut stream, &Envelope::join(room_id.clone())).await?;
    debug!(%room_id, "joined room");
    Ok(stream)
}

async fn send_envelope(stream: &mut WsStream, envelope: &Envelope) -> Result<(), CliError> {
    stream.send(Message::Text(envelope.to_json()?.into())).await?;
    Ok(())
}

/// Receive envelopes until one matches `wanted`. An `error` envelope fails the
/// wait.
async fn wait_for(stream: &mut WsStream, wanted: impl Fn(&Envelope) -> bool) -> Result<Envelope, CliError> {
    let fut = async {
        loop {
            let envelope = recv_envelope(stream).await?;
            if let Envelope::Error { code, message } = envelope {
                return Err(CliError::Server { code, message });
            }
            if wanted(&envelope) {
                return Ok(envelope);
            }
            debug!(?envelope, "skipping unrelated envelope");
        }
    };
    tokio::time::timeout(ACK_TIMEOUT, fut).await.map_err(|_| CliError::Timeout)?
}

async fn recv_envelope(stream: &mut WsStream) -> Result<Envelope, CliError> {
    loop {
        let Some(message) = stream.next().await else {
            return Err(CliError::WsClosed);
        };
        match message? {
            Message::Text(text) => match Envelope::from_json(text.as_str()) {
                Ok(envelope) => return Ok(envelope),
                Err(error) => debug!(%error, "skipping undecodable message"),
            },
            Message::Close(_) => return Err(CliError::WsClosed),
            _ => {}
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum ShapeKind {
    Rect,
    Circle,
}

fn box_shape(kind: ShapeKind, args: &BoxArgs) -> Shape {
    let id = ShapeId::generate();
    match kind {
        ShapeKind::Rect => Shape::rect(id, args.x, args.y, args.width, args.height),
        ShapeKind::Circle => Shape::circle(id, args.x, args.y, args.width, args.height),
    }
}

fn line_shape(args: &LineArgs) -> Shape {
    Shape::pencil(ShapeId::generate(), (args.x1, args.y1), (args.x2, args.y2), StrokeId::generate())
}

fn ws_url(base_url: &str, token: &str) -> Result<String, CliError> {
    let base_url = base_url.trim_end_matches('/');
    if let Some(rest) = base_url.strip_prefix("http://") {
        return Ok(format!("ws://{rest}/api/ws?token={token}"));
    }
    if let Some(rest) = base_url.strip_prefix("https://") {
        return Ok(format!("wss://{rest}/api/ws?token={token}"));
    }

    Err(CliError::InvalidBaseUrl(base_url.to_owned()))
}
