//! Game gateway client.
//!
//! This is the main entry point for SDK consumers. It manages the TCP
//! connection to the gateway, sends the login frame, keeps the world model
//! current, and emits events. Commands go out through a cloneable
//! [`ClientHandle`].
//!
//! ## Lifecycle
//!
//! Every connection ends with exactly one [`Event::Disconnected`]. Transport
//! failures are additionally reported as [`Event::Error`] just before it.
//! Dropping every `ClientHandle` (or calling [`ClientHandle::quit`]) closes
//! the connection.
//!
//! ## Reconnection
//!
//! The SDK does not reconnect. Consumers listen for `Disconnected` and decide
//! for themselves when and as whom to connect again.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::event::Event;
use crate::goal::Goal;
use crate::wire::{self, ClientFrame, Control, Hand, ServerFrame};
use crate::world::{Entity, Vec3, World};

/// Configuration for connecting to a game server through the gateway.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Gateway host.
    pub host: String,
    /// Gateway port.
    pub port: u16,
    /// Login name for this connection.
    pub username: String,
    /// Account password, if the auth mode needs one.
    pub password: Option<String>,
    /// Authentication mode (`offline`, `microsoft`, ...).
    pub auth: String,
    /// Game protocol version, or `None` to let the gateway detect it.
    pub version: Option<String>,
    /// Silence longer than this is treated as a dead connection.
    pub check_timeout: Duration,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 25565,
            username: "afkbot".to_string(),
            password: None,
            auth: "offline".to_string(),
            version: None,
            check_timeout: Duration::from_secs(60),
        }
    }
}

impl ConnectConfig {
    fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn login_frame(&self) -> ClientFrame {
        ClientFrame::Login {
            username: self.username.clone(),
            password: self.password.clone(),
            auth: self.auth.clone(),
            host: self.host.clone(),
            port: self.port,
            version: self.version.clone(),
            check_timeout_ms: self.check_timeout.as_millis() as u64,
        }
    }
}

/// Commands the consumer can send to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    LoadPathfinder,
    Chat(String),
    SetControl { control: Control, state: bool },
    Look { yaw: f32, pitch: f32, force: bool },
    SwingArm(Hand),
    Attack(u32),
    SetGoal(Goal),
    Quit(Option<String>),
}

impl From<Command> for ClientFrame {
    fn from(cmd: Command) -> Self {
        match cmd {
            Command::LoadPathfinder => ClientFrame::LoadPathfinder,
            Command::Chat(text) => ClientFrame::Chat { text },
            Command::SetControl { control, state } => ClientFrame::SetControl { control, state },
            Command::Look { yaw, pitch, force } => ClientFrame::Look { yaw, pitch, force },
            Command::SwingArm(hand) => ClientFrame::SwingArm { hand },
            Command::Attack(entity) => ClientFrame::Attack { entity },
            Command::SetGoal(goal) => ClientFrame::SetGoal { goal },
            Command::Quit(reason) => ClientFrame::Quit { reason },
        }
    }
}

/// A handle to a running game client connection.
#[derive(Clone)]
pub struct ClientHandle {
    cmd_tx: mpsc::Sender<Command>,
    world: Arc<RwLock<World>>,
    username: Arc<str>,
}

impl ClientHandle {
    /// The name this connection logged in with.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Register the navigation capability with the gateway.
    pub async fn load_pathfinder(&self) -> Result<()> {
        self.send(Command::LoadPathfinder).await
    }

    pub async fn chat(&self, text: &str) -> Result<()> {
        self.send(Command::Chat(text.to_string())).await
    }

    pub async fn set_control(&self, control: Control, state: bool) -> Result<()> {
        self.send(Command::SetControl { control, state }).await
    }

    /// Turn to an absolute orientation.
    pub async fn look(&self, yaw: f32, pitch: f32, force: bool) -> Result<()> {
        self.world.write().set_orientation(yaw, pitch);
        self.send(Command::Look { yaw, pitch, force }).await
    }

    pub async fn swing_arm(&self, hand: Hand) -> Result<()> {
        self.send(Command::SwingArm(hand)).await
    }

    pub async fn attack(&self, entity: &Entity) -> Result<()> {
        self.send(Command::Attack(entity.id)).await
    }

    pub async fn set_goal(&self, goal: Goal) -> Result<()> {
        self.send(Command::SetGoal(goal)).await
    }

    pub async fn quit(&self, reason: Option<&str>) -> Result<()> {
        self.send(Command::Quit(reason.map(|s| s.to_string()))).await
    }

    /// Ask the connection to close without waiting for queue space.
    ///
    /// Used from synchronous teardown paths. If the queue is full or the
    /// connection is already gone the request is dropped; the connection
    /// still closes once every handle has been dropped.
    pub fn try_quit(&self, reason: &str) {
        let _ = self.cmd_tx.try_send(Command::Quit(Some(reason.to_string())));
    }

    pub fn position(&self) -> Option<Vec3> {
        self.world.read().position()
    }

    /// Current `(yaw, pitch)`.
    pub fn orientation(&self) -> (f32, f32) {
        self.world.read().orientation()
    }

    /// Closest known entity matching `predicate`.
    pub fn nearest_entity<F>(&self, predicate: F) -> Option<Entity>
    where
        F: Fn(&Entity) -> bool,
    {
        self.world.read().nearest(predicate)
    }

    async fn send(&self, cmd: Command) -> Result<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| anyhow::anyhow!("connection for {} is closed", self.username))
    }
}

/// Open the TCP connection to the gateway.
pub async fn establish_connection(config: &ConnectConfig) -> Result<TcpStream> {
    let addr = config.server_addr();
    tracing::debug!("Connecting to gateway at {addr}...");
    let tcp = TcpStream::connect(&addr)
        .await
        .with_context(|| format!("TCP connect to {addr} failed"))?;
    tcp.set_nodelay(true).ok();
    tracing::debug!("TCP connected to {addr}");
    Ok(tcp)
}

/// Run the client over an already-established stream.
///
/// Returns a handle for sending commands and a receiver for events.
/// The protocol runs in a spawned task.
pub fn connect_with_stream<S>(stream: S, config: ConnectConfig) -> (ClientHandle, mpsc::Receiver<Event>)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let Parts { handle, world, event_tx, event_rx, cmd_rx } = Parts::new(&config);

    tokio::spawn(async move {
        drive(stream, &config, &world, &event_tx, cmd_rx).await;
    });

    (handle, event_rx)
}

/// Connect to the gateway and run the client.
///
/// Returns immediately; a failed connect surfaces as `Error` followed by
/// `Disconnected` on the event receiver.
pub fn connect(config: ConnectConfig) -> (ClientHandle, mpsc::Receiver<Event>) {
    let Parts { handle, world, event_tx, event_rx, cmd_rx } = Parts::new(&config);

    tokio::spawn(async move {
        match establish_connection(&config).await {
            Ok(tcp) => drive(tcp, &config, &world, &event_tx, cmd_rx).await,
            Err(e) => {
                let reason = format!("{e:#}");
                let _ = event_tx.send(Event::Error { message: reason.clone() }).await;
                let _ = event_tx.send(Event::Disconnected { reason }).await;
            }
        }
    });

    (handle, event_rx)
}

struct Parts {
    handle: ClientHandle,
    world: Arc<RwLock<World>>,
    event_tx: mpsc::Sender<Event>,
    event_rx: mpsc::Receiver<Event>,
    cmd_rx: mpsc::Receiver<Command>,
}

impl Parts {
    fn new(config: &ConnectConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(4096);
        let (cmd_tx, cmd_rx) = mpsc::channel(256);
        let world = Arc::new(RwLock::new(World::default()));
        let handle = ClientHandle {
            cmd_tx,
            world: world.clone(),
            username: Arc::from(config.username.as_str()),
        };
        Self { handle, world, event_tx, event_rx, cmd_rx }
    }
}

async fn drive<S>(
    stream: S,
    config: &ConnectConfig,
    world: &RwLock<World>,
    event_tx: &mpsc::Sender<Event>,
    cmd_rx: mpsc::Receiver<Command>,
) where
    S: AsyncRead + AsyncWrite,
{
    let (reader, writer) = tokio::io::split(stream);
    let reason = match run_gateway(BufReader::new(reader), writer, config, world, event_tx, cmd_rx).await {
        Ok(reason) => reason,
        Err(e) => {
            let message = format!("{e:#}");
            let _ = event_tx.send(Event::Error { message: message.clone() }).await;
            message
        }
    };
    tracing::debug!(username = %config.username, %reason, "Gateway connection closed");
    let _ = event_tx.send(Event::Disconnected { reason }).await;
}

/// Protocol loop. Returns the reason the connection ended cleanly; I/O
/// failures are returned as errors.
async fn run_gateway<R, W>(
    reader: R,
    mut writer: W,
    config: &ConnectConfig,
    world: &RwLock<World>,
    event_tx: &mpsc::Sender<Event>,
    mut cmd_rx: mpsc::Receiver<Command>,
) -> Result<String>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    write_frame(&mut writer, &config.login_frame()).await?;
    let _ = event_tx.send(Event::Connected).await;

    let mut lines = reader.lines();
    let ping_interval = config.check_timeout / 2;
    let mut last_activity = Instant::now();
    let mut last_ping = last_activity;

    loop {
        let next_ping = last_activity.max(last_ping) + ping_interval;
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    return Ok("connection closed by gateway".to_string());
                };
                last_activity = Instant::now();
                let Some(frame) = ServerFrame::parse(&line) else {
                    tracing::debug!(%line, "Ignoring unrecognised gateway frame");
                    continue;
                };
                world.write().apply(&frame);
                if let Some(event) = event_for(frame) {
                    let _ = event_tx.send(event).await;
                }
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(Command::Quit(reason)) => {
                        let text = reason.clone().unwrap_or_else(|| "quit".to_string());
                        write_frame(&mut writer, &ClientFrame::Quit { reason }).await?;
                        return Ok(text);
                    }
                    Some(cmd) => write_frame(&mut writer, &cmd.into()).await?,
                    None => {
                        // Every handle is gone.
                        write_frame(&mut writer, &ClientFrame::Quit { reason: None }).await?;
                        return Ok("client handle dropped".to_string());
                    }
                }
            }
            _ = tokio::time::sleep_until(next_ping) => {
                if last_activity.elapsed() >= config.check_timeout {
                    return Ok("keep-alive timed out".to_string());
                }
                write_frame(&mut writer, &ClientFrame::Ping).await?;
                last_ping = Instant::now();
            }
        }
    }
}

fn event_for(frame: ServerFrame) -> Option<Event> {
    match frame {
        ServerFrame::Spawn { position, .. } => Some(Event::Spawned { position }),
        ServerFrame::Chat { username, message } => Some(Event::Chat { username, message }),
        ServerFrame::Death => Some(Event::Death),
        ServerFrame::Kicked { reason } => Some(Event::Kicked {
            reason: wire::raw_reason(&reason),
        }),
        ServerFrame::Error { message } => Some(Event::Error { message }),
        ServerFrame::Position { .. }
        | ServerFrame::EntitySpawn { .. }
        | ServerFrame::EntityMove { .. }
        | ServerFrame::EntityRemove { .. }
        | ServerFrame::Pong => None,
    }
}

async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &ClientFrame) -> Result<()> {
    let mut line = serde_json::to_string(frame)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
