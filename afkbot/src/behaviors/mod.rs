//! Scripted behaviors, registered once per session when the bot first spawns.
//!
//! Each behavior only schedules work on the session's [`TimerSet`]; nothing
//! here blocks the controller. Failures inside a scheduled task surface as
//! faults and recycle the session.
//!
//! [`TimerSet`]: crate::timers::TimerSet

pub mod anti_idle;
pub mod auth;
pub mod chat;
pub mod goto;
pub mod patrol;

use afkbot_sdk::client::ClientHandle;

use crate::config::Settings;
use crate::session::Session;

/// Register every enabled behavior for a session that just became ready.
pub fn start(settings: &Settings, session: &mut Session) {
    let handle = session.handle.clone();
    let timers = &mut session.timers;
    let utils = &settings.utils;

    if utils.auto_auth.enabled {
        auth::start(&utils.auto_auth, &handle, timers);
    }
    if utils.chat_messages.enabled {
        chat::start(&utils.chat_messages, &handle, timers);
    }
    if settings.position.enabled {
        goto::start(&settings.position, &handle, timers);
    }
    if utils.anti_afk.enabled {
        anti_idle::start(&utils.anti_afk, &handle, timers);
    }
}

pub fn log_chat(settings: &Settings, username: &str, message: &str) {
    if settings.utils.chat_log {
        tracing::info!("<{username}> {message}");
    }
}

pub fn log_death(handle: &ClientHandle) {
    match handle.position() {
        Some(position) => tracing::warn!("Bot has died and was respawned at {position}"),
        None => tracing::warn!("Bot has died"),
    }
}
