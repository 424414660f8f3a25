//! End-to-end controller tests against an in-memory gateway.
//!
//! Tests cover:
//! - Pathfinder registration and behavior start on spawn
//! - Repeating chat playback order
//! - Patrol goals around the spawn point
//! - Attack-on-sight target selection
//! - Identity rotation on conflict kicks, with session teardown
//! - Late kicks after a connection error
//! - Fault recovery and the auto-reconnect switch
//!
//! All tests run on paused time, so reconnect delays and behavior intervals
//! elapse instantly and deterministically.

use std::sync::Arc;
use std::time::Duration;

use afkbot::config::Settings;
use afkbot::controller::{Connector, Controller, Signal};
use afkbot_sdk::client::{self, ClientHandle, ConnectConfig};
use afkbot_sdk::event::Event;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// The far end of one bot connection.
struct TestGateway {
    username: String,
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
}

impl TestGateway {
    /// Next non-ping frame, or `None` once the client has closed.
    async fn recv(&mut self) -> Option<Value> {
        loop {
            let line = self.lines.next_line().await.ok()??;
            let frame: Value = serde_json::from_str(&line).unwrap();
            if frame["op"] != "ping" {
                return Some(frame);
            }
        }
    }

    async fn expect(&mut self, op: &str) -> Value {
        let frame = self.recv().await.unwrap_or_else(|| panic!("closed while waiting for {op}"));
        assert_eq!(frame["op"], op, "unexpected frame {frame}");
        frame
    }

    /// Next frame with the given op, skipping others.
    async fn next_of(&mut self, op: &str) -> Value {
        loop {
            let frame = self.recv().await.unwrap_or_else(|| panic!("closed while waiting for {op}"));
            if frame["op"] == op {
                return frame;
            }
        }
    }

    async fn send(&mut self, frame: Value) {
        let mut line = frame.to_string();
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await.unwrap();
    }

    async fn spawn_at(&mut self, x: f64, y: f64, z: f64) {
        self.send(json!({"type": "spawn", "position": {"x": x, "y": y, "z": z}}))
            .await;
    }

    /// Login and pathfinder registration, which every session starts with.
    async fn handshake(&mut self) {
        let login = self.expect("login").await;
        assert_eq!(login["username"], self.username.as_str());
        self.expect("load_pathfinder").await;
    }
}

struct DuplexConnector {
    gateways: mpsc::UnboundedSender<TestGateway>,
}

impl Connector for DuplexConnector {
    fn connect(&self, config: ConnectConfig) -> (ClientHandle, mpsc::Receiver<Event>) {
        let (client_side, gateway_side) = tokio::io::duplex(64 * 1024);
        let (r, w) = tokio::io::split(gateway_side);
        let _ = self.gateways.send(TestGateway {
            username: config.username.clone(),
            lines: BufReader::new(r).lines(),
            writer: w,
        });
        client::connect_with_stream(client_side, config)
    }
}

struct Harness {
    gateways: mpsc::UnboundedReceiver<TestGateway>,
    signals: mpsc::UnboundedSender<Signal>,
    controller: JoinHandle<anyhow::Result<()>>,
}

impl Harness {
    fn start(settings: Value) -> Self {
        let settings = Settings::from_json_str(&settings.to_string()).unwrap();
        let (tx, gateways) = mpsc::unbounded_channel();
        let controller = Controller::new(Arc::new(settings), Box::new(DuplexConnector { gateways: tx }));
        let signals = controller.signals();
        let controller = tokio::spawn(controller.run());
        Self { gateways, signals, controller }
    }

    async fn next_gateway(&mut self) -> TestGateway {
        let mut gw = self.gateways.recv().await.expect("controller stopped connecting");
        gw.handshake().await;
        gw
    }
}

#[tokio::test(start_paused = true)]
async fn spawn_starts_configured_behaviors() {
    let mut h = Harness::start(json!({
        "bot-account": { "usernames": ["alpha", "beta"] },
        "position": { "enabled": true, "x": 5, "y": 64, "z": -5 },
        "utils": {
            "auto-auth": { "enabled": true, "password": "pw" },
            "chat-messages": { "enabled": true, "repeat": false, "messages": ["hello", "world"] },
            "anti-afk": { "enabled": true, "sneak": true, "jump": true }
        }
    }));

    let mut gw = h.next_gateway().await;
    assert_eq!(gw.username, "alpha");
    gw.spawn_at(0.0, 64.0, 0.0).await;

    let mut frames = Vec::new();
    for _ in 0..7 {
        frames.push(gw.recv().await.unwrap());
    }
    let of = |op: &str| frames.iter().filter(|f| f["op"] == op).cloned().collect::<Vec<_>>();

    let chats: Vec<Value> = of("chat").iter().map(|f| f["text"].clone()).collect();
    assert_eq!(chats, vec![json!("hello"), json!("world"), json!("/register pw pw"), json!("/login pw")]);

    let controls: Vec<Value> = of("set_control").iter().map(|f| f["control"].clone()).collect();
    assert_eq!(controls, vec![json!("sneak"), json!("jump")]);

    let goals = of("set_goal");
    assert_eq!(goals.len(), 1);
    assert_eq!(goals[0]["goal"], json!({"kind": "block", "x": 5, "y": 64, "z": -5}));
}

#[tokio::test(start_paused = true)]
async fn respawn_does_not_restart_behaviors() {
    let mut h = Harness::start(json!({
        "bot-account": { "usernames": ["alpha"] },
        "position": { "enabled": true, "x": 1, "y": 2, "z": 3 }
    }));
    let mut gw = h.next_gateway().await;
    gw.spawn_at(0.0, 64.0, 0.0).await;
    gw.expect("set_goal").await;

    gw.send(json!({"type": "death"})).await;
    gw.spawn_at(0.0, 64.0, 0.0).await;
    gw.send(json!({"type": "chat", "username": "steve", "message": "welcome back"})).await;

    // Nothing else is sent for the rest of the keep-alive window.
    let quiet = tokio::time::timeout(Duration::from_secs(20), gw.recv()).await;
    assert!(quiet.is_err(), "unexpected frame after respawn: {quiet:?}");
}

#[tokio::test(start_paused = true)]
async fn repeating_chat_cycles_in_order() {
    let mut h = Harness::start(json!({
        "bot-account": { "usernames": ["alpha"] },
        "utils": {
            "chat-messages": {
                "enabled": true,
                "repeat": true,
                "repeat-delay": 2,
                "messages": ["one", "two", "three"]
            }
        }
    }));
    let mut gw = h.next_gateway().await;
    gw.spawn_at(0.0, 64.0, 0.0).await;

    let started = tokio::time::Instant::now();
    let mut said = Vec::new();
    for _ in 0..7 {
        said.push(gw.expect("chat").await["text"].as_str().unwrap().to_string());
    }
    assert_eq!(said, ["one", "two", "three", "one", "two", "three", "one"]);
    assert!(started.elapsed() >= Duration::from_secs(14));
}

#[tokio::test(start_paused = true)]
async fn patrol_walks_a_diamond_around_spawn() {
    let mut h = Harness::start(json!({
        "bot-account": { "usernames": ["alpha"] },
        "utils": {
            "anti-afk": { "enabled": true, "circle-walk": { "enabled": true, "radius": 2 } }
        }
    }));
    let mut gw = h.next_gateway().await;
    gw.spawn_at(100.0, 70.0, -50.0).await;

    let mut corners = Vec::new();
    for _ in 0..5 {
        let goal = gw.expect("set_goal").await["goal"].clone();
        assert_eq!(goal["kind"], "xz");
        corners.push((goal["x"].as_f64().unwrap(), goal["z"].as_f64().unwrap()));
    }
    assert_eq!(
        corners,
        vec![(102.0, -50.0), (100.0, -48.0), (98.0, -50.0), (100.0, -52.0), (102.0, -50.0)]
    );
}

#[tokio::test(start_paused = true)]
async fn hit_attacks_nearest_mob_else_swings() {
    let mut h = Harness::start(json!({
        "bot-account": { "usernames": ["alpha"] },
        "utils": {
            "anti-afk": {
                "enabled": true,
                "hit": { "enabled": true, "delay": 500, "attack-mobs": true }
            }
        }
    }));
    let mut gw = h.next_gateway().await;
    gw.spawn_at(0.0, 64.0, 0.0).await;
    gw.send(json!({"type": "entity_spawn", "id": 10, "kind": "player", "position": {"x": 1, "y": 64, "z": 0}}))
        .await;
    gw.send(json!({"type": "entity_spawn", "id": 11, "kind": "orb", "position": {"x": 0.5, "y": 64, "z": 0}}))
        .await;
    gw.send(json!({"type": "entity_spawn", "id": 12, "kind": "mob", "name": "zombie", "position": {"x": 4, "y": 64, "z": 0}}))
        .await;

    let attack = gw.expect("attack").await;
    assert_eq!(attack["entity"], 12);

    gw.send(json!({"type": "entity_remove", "id": 12})).await;
    let swing = gw.next_of("swing_arm").await;
    assert_eq!(swing["hand"], "right");
}

#[tokio::test(start_paused = true)]
async fn conflict_kick_rotates_username_and_tears_down() {
    let mut h = Harness::start(json!({
        "bot-account": { "usernames": ["alpha", "beta"] },
        "utils": {
            "chat-messages": { "enabled": true, "repeat": true, "repeat-delay": 1, "messages": ["tick"] },
            "auto-reconnect-delay": 3000
        }
    }));

    let mut first = h.next_gateway().await;
    assert_eq!(first.username, "alpha");
    first.spawn_at(0.0, 64.0, 0.0).await;
    first.expect("chat").await;

    first
        .send(json!({"type": "kicked", "reason": {"extra": [{"text": "Someone "}, {"text": "with your name is already online"}]}}))
        .await;
    let kicked_at = tokio::time::Instant::now();

    // The session's chat timer is gone: only the quit frame follows, then EOF.
    let mut after_kick = Vec::new();
    while let Some(frame) = first.recv().await {
        after_kick.push(frame["op"].as_str().unwrap().to_string());
    }
    assert_eq!(after_kick, ["quit"]);

    let mut second = h.next_gateway().await;
    assert_eq!(second.username, "beta");
    assert!(kicked_at.elapsed() >= Duration::from_millis(3000));

    // A kick that is not a conflict keeps the name.
    second.send(json!({"type": "kicked", "reason": "§cServer restarting"})).await;
    let mut third = h.next_gateway().await;
    assert_eq!(third.username, "beta");

    // Rotation wraps back to the first name.
    third
        .send(json!({"type": "kicked", "reason": "{\"text\":\"You have been idle for too long\"}"}))
        .await;
    let fourth = h.next_gateway().await;
    assert_eq!(fourth.username, "alpha");
}

#[tokio::test(start_paused = true)]
async fn conflict_kick_after_error_still_rotates() {
    let mut h = Harness::start(json!({
        "bot-account": { "usernames": ["alpha", "beta"] },
        "utils": { "auto-reconnect-delay": 1000 }
    }));
    let mut first = h.next_gateway().await;
    first.send(json!({"type": "error", "message": "ECONNRESET"})).await;
    first
        .send(json!({"type": "kicked", "reason": "You are banned from this server"}))
        .await;

    let second = h.next_gateway().await;
    assert_eq!(second.username, "beta");
    let extra = tokio::time::timeout(Duration::from_secs(10), h.gateways.recv()).await;
    assert!(extra.is_err(), "the kick scheduled a second reconnect");
}

#[tokio::test(start_paused = true)]
async fn error_then_close_reconnects_once() {
    let mut h = Harness::start(json!({
        "bot-account": { "usernames": ["alpha"] },
        "utils": { "auto-reconnect-delay": 1000 }
    }));
    let mut first = h.next_gateway().await;
    first.send(json!({"type": "error", "message": "ECONNRESET"})).await;
    drop(first);

    let _second = h.next_gateway().await;
    // No third connection follows from the same disconnect.
    let extra = tokio::time::timeout(Duration::from_secs(10), h.gateways.recv()).await;
    assert!(extra.is_err(), "a second reconnect was scheduled");
}

#[tokio::test(start_paused = true)]
async fn fault_in_session_recycles_connection() {
    let mut h = Harness::start(json!({
        "bot-account": { "usernames": ["alpha", "beta"] },
        "utils": { "auto-reconnect-delay": 500 }
    }));
    let mut first = h.next_gateway().await;
    first.spawn_at(0.0, 64.0, 0.0).await;

    h.signals
        .send(Signal::Fault { session: 1, error: "behavior blew up".to_string() })
        .unwrap();
    first.expect("quit").await;
    assert!(first.recv().await.is_none());

    // Faults do not rotate identity.
    let second = h.next_gateway().await;
    assert_eq!(second.username, "alpha");
}

#[tokio::test(start_paused = true)]
async fn auto_reconnect_off_stops_after_first_session() {
    let mut h = Harness::start(json!({
        "bot-account": { "usernames": ["alpha"] },
        "utils": { "auto-reconnect": false }
    }));
    let first = h.next_gateway().await;
    drop(first);

    h.controller.await.unwrap().unwrap();
    assert!(h.gateways.recv().await.is_none());
}
