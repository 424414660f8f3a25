//! Gateway wire format: one JSON object per line in each direction.
//!
//! Client frames are tagged by `op`, server frames by `type`.

use serde::{Deserialize, Serialize};

use crate::goal::Goal;
use crate::world::Vec3;

/// Movement control the gateway can hold down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    Forward,
    Back,
    Left,
    Right,
    Jump,
    Sprint,
    Sneak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hand {
    Left,
    Right,
}

/// Frames sent from the client to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ClientFrame {
    Login {
        username: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        password: Option<String>,
        auth: String,
        host: String,
        port: u16,
        #[serde(skip_serializing_if = "Option::is_none")]
        version: Option<String>,
        check_timeout_ms: u64,
    },
    LoadPathfinder,
    Chat {
        text: String,
    },
    SetControl {
        control: Control,
        state: bool,
    },
    Look {
        yaw: f32,
        pitch: f32,
        force: bool,
    },
    SwingArm {
        hand: Hand,
    },
    Attack {
        entity: u32,
    },
    SetGoal {
        goal: Goal,
    },
    Quit {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    Ping,
}

/// Frames sent from the gateway to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Spawn {
        position: Vec3,
        #[serde(default)]
        yaw: f32,
        #[serde(default)]
        pitch: f32,
    },
    Position {
        position: Vec3,
        #[serde(default)]
        yaw: f32,
        #[serde(default)]
        pitch: f32,
    },
    Chat {
        username: String,
        message: String,
    },
    Death,
    /// `reason` is either a plain string or a chat component object.
    Kicked {
        reason: serde_json::Value,
    },
    Error {
        message: String,
    },
    EntitySpawn {
        id: u32,
        kind: String,
        #[serde(default)]
        name: Option<String>,
        position: Vec3,
    },
    EntityMove {
        id: u32,
        position: Vec3,
    },
    EntityRemove {
        id: u32,
    },
    Pong,
}

impl ServerFrame {
    pub fn parse(line: &str) -> Option<Self> {
        serde_json::from_str(line.trim()).ok()
    }
}

/// Flatten a kick payload to the raw text the consumer sees.
///
/// Strings pass through untouched; structured payloads are re-serialized
/// so they can be decoded downstream.
pub fn raw_reason(reason: &serde_json::Value) -> String {
    match reason {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
