//! Client-side world model built from gateway frames.
//!
//! Only what the bot needs: our own position and orientation, and the
//! entities the gateway has told us about, so that nearest-entity queries
//! can be answered locally without a round trip.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::wire::ServerFrame;

/// A point in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance_squared(&self, other: &Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// An entity reported by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: u32,
    /// Entity category as reported by the game (`mob`, `player`, `object`, ...).
    pub kind: String,
    pub name: Option<String>,
    pub position: Vec3,
}

#[derive(Debug, Default)]
pub struct World {
    position: Option<Vec3>,
    yaw: f32,
    pitch: f32,
    entities: HashMap<u32, Entity>,
}

impl World {
    /// Our own position, once the gateway has reported a spawn.
    pub fn position(&self) -> Option<Vec3> {
        self.position
    }

    /// Current `(yaw, pitch)` in radians.
    pub fn orientation(&self) -> (f32, f32) {
        (self.yaw, self.pitch)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Fold a frame into the model. Frames that carry no world state are ignored.
    pub fn apply(&mut self, frame: &ServerFrame) {
        match frame {
            ServerFrame::Spawn { position, yaw, pitch }
            | ServerFrame::Position { position, yaw, pitch } => {
                self.position = Some(*position);
                self.yaw = *yaw;
                self.pitch = *pitch;
            }
            ServerFrame::EntitySpawn { id, kind, name, position } => {
                self.entities.insert(
                    *id,
                    Entity {
                        id: *id,
                        kind: kind.clone(),
                        name: name.clone(),
                        position: *position,
                    },
                );
            }
            ServerFrame::EntityMove { id, position } => {
                if let Some(entity) = self.entities.get_mut(id) {
                    entity.position = *position;
                }
            }
            ServerFrame::EntityRemove { id } => {
                self.entities.remove(id);
            }
            _ => {}
        }
    }

    /// Record a look command we issued so the next relative turn builds on it.
    pub fn set_orientation(&mut self, yaw: f32, pitch: f32) {
        self.yaw = yaw;
        self.pitch = pitch;
    }

    /// Closest entity to us that satisfies `predicate`.
    ///
    /// Returns `None` before the first spawn, since there is no reference point.
    pub fn nearest<F>(&self, predicate: F) -> Option<Entity>
    where
        F: Fn(&Entity) -> bool,
    {
        let origin = self.position?;
        self.entities
            .values()
            .filter(|e| predicate(e))
            .min_by(|a, b| {
                a.position
                    .distance_squared(&origin)
                    .total_cmp(&b.position.distance_squared(&origin))
            })
            .cloned()
    }
}
