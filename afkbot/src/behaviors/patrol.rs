//! Walk a diamond around the spawn point, forever.

use std::time::Duration;

use afkbot_sdk::client::ClientHandle;
use afkbot_sdk::goal::Goal;
use afkbot_sdk::world::Vec3;

use crate::timers::TimerSet;

pub const PATROL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct Patrol {
    corners: [(f64, f64); 4],
    next: usize,
}

impl Patrol {
    /// Corners at `radius` east, south, west and north of `center`.
    pub fn around(center: Vec3, radius: f64) -> Self {
        let (x, z) = (center.x, center.z);
        Self {
            corners: [
                (x + radius, z),
                (x, z + radius),
                (x - radius, z),
                (x, z - radius),
            ],
            next: 0,
        }
    }

    pub fn next_goal(&mut self) -> Goal {
        let (x, z) = self.corners[self.next];
        self.next = (self.next + 1) % self.corners.len();
        Goal::xz(x, z)
    }
}

pub fn start(radius: f64, handle: &ClientHandle, timers: &mut TimerSet) {
    let Some(center) = handle.position() else {
        tracing::warn!("Spawn position unknown; circle-walk not started");
        return;
    };
    tracing::info!(%center, radius, "Started circle-walk module");
    let mut patrol = Patrol::around(center, radius);
    let handle = handle.clone();
    timers.every("circle-walk", PATROL_INTERVAL, move || {
        let goal = patrol.next_goal();
        let handle = handle.clone();
        async move { handle.set_goal(goal).await }
    });
}
