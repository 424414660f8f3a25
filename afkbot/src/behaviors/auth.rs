//! Server-side login plugins (`/register`, `/login`).

use std::time::Duration;

use afkbot_sdk::client::ClientHandle;

use crate::config::AutoAuth;
use crate::timers::TimerSet;

/// Give the server a moment after spawn before typing commands.
pub const AUTH_DELAY: Duration = Duration::from_millis(500);

pub fn commands(password: &str) -> [String; 2] {
    [
        format!("/register {password} {password}"),
        format!("/login {password}"),
    ]
}

pub fn start(cfg: &AutoAuth, handle: &ClientHandle, timers: &mut TimerSet) {
    tracing::info!("Started auto-auth module");
    let handle = handle.clone();
    let lines = commands(&cfg.password);
    timers.after("auto-auth", AUTH_DELAY, async move {
        for line in &lines {
            handle.chat(line).await?;
        }
        tracing::info!("Authentication commands executed");
        anyhow::Ok(())
    });
}
