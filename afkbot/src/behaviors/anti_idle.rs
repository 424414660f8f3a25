//! Keep the server from flagging the bot as idle.

use std::time::Duration;

use afkbot_sdk::client::ClientHandle;
use afkbot_sdk::wire::{Control, Hand};
use afkbot_sdk::world::Entity;

use crate::config::AntiAfk;
use crate::timers::TimerSet;

use super::patrol;

pub const ROTATE_INTERVAL: Duration = Duration::from_millis(100);

/// Entity kinds never worth swinging at.
const PASSIVE_KINDS: [&str; 5] = ["object", "player", "global", "orb", "other"];

pub fn is_attack_target(entity: &Entity) -> bool {
    !PASSIVE_KINDS.contains(&entity.kind.as_str())
}

pub fn start(cfg: &AntiAfk, handle: &ClientHandle, timers: &mut TimerSet) {
    let mut held = Vec::new();
    if cfg.sneak {
        held.push(Control::Sneak);
    }
    if cfg.jump {
        held.push(Control::Jump);
    }
    if !held.is_empty() {
        let handle = handle.clone();
        timers.after("anti-afk-posture", Duration::ZERO, async move {
            for control in held {
                handle.set_control(control, true).await?;
            }
            anyhow::Ok(())
        });
    }

    if cfg.hit.enabled {
        let attack_mobs = cfg.hit.attack_mobs;
        let handle = handle.clone();
        timers.every("anti-afk-hit", Duration::from_millis(cfg.hit.delay), move || {
            let handle = handle.clone();
            async move { hit(&handle, attack_mobs).await }
        });
    }

    if cfg.rotate {
        let handle = handle.clone();
        timers.every("anti-afk-rotate", ROTATE_INTERVAL, move || {
            let handle = handle.clone();
            async move {
                let (yaw, pitch) = handle.orientation();
                handle.look(yaw + 1.0, pitch, true).await
            }
        });
    }

    if cfg.circle_walk.enabled {
        patrol::start(cfg.circle_walk.radius, handle, timers);
    }
}

/// Attack the nearest hostile if asked to, otherwise just swing.
async fn hit(handle: &ClientHandle, attack_mobs: bool) -> anyhow::Result<()> {
    if attack_mobs {
        if let Some(target) = handle.nearest_entity(is_attack_target) {
            return handle.attack(&target).await;
        }
    }
    handle.swing_arm(Hand::Right).await
}
