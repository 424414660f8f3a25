//! Navigation goals understood by the gateway's pathfinder.

use serde::{Deserialize, Serialize};

/// Where the pathfinder should take us.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Goal {
    /// Stand on an exact block.
    Block { x: i64, y: i64, z: i64 },
    /// Reach a column on the horizontal plane, any height.
    Xz { x: f64, z: f64 },
}

impl Goal {
    pub fn block(x: i64, y: i64, z: i64) -> Self {
        Goal::Block { x, y, z }
    }

    pub fn xz(x: f64, z: f64) -> Self {
        Goal::Xz { x, z }
    }
}

impl std::fmt::Display for Goal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Goal::Block { x, y, z } => write!(f, "block({x}, {y}, {z})"),
            Goal::Xz { x, z } => write!(f, "xz({x}, {z})"),
        }
    }
}
