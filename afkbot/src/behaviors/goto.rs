//! Walk to a fixed block once after spawning.

use std::time::Duration;

use afkbot_sdk::client::ClientHandle;
use afkbot_sdk::goal::Goal;

use crate::config::Position;
use crate::timers::TimerSet;

pub fn start(target: &Position, handle: &ClientHandle, timers: &mut TimerSet) {
    let goal = Goal::block(target.x, target.y, target.z);
    tracing::info!(
        "Starting moving to target location ({}, {}, {})",
        target.x,
        target.y,
        target.z
    );
    let handle = handle.clone();
    timers.after("goto", Duration::ZERO, async move {
        handle.set_goal(goal).await?;
        if let Some(position) = handle.position() {
            tracing::info!(%goal, "Navigation goal set; bot is at {position}");
        }
        anyhow::Ok(())
    });
}
