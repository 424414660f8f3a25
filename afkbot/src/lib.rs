//! afkbot: keeps a game account online unattended.
//!
//! One process, one connection at a time. On spawn it runs the configured
//! behaviors (chat playback, anti-idle, go-to-point, patrol, auto-auth); on
//! any disconnect it tears the session down and reconnects after a fixed
//! delay, switching to the next username when the server rejects the
//! current one.

pub mod behaviors;
pub mod config;
pub mod controller;
pub mod health;
pub mod identity;
pub mod kick;
pub mod session;
pub mod timers;
