//! afkbot-sdk: client side of the game gateway protocol.
//!
//! The gateway owns the real game connection and the navigation engine.
//! This crate connects to it, keeps a small model of the world the gateway
//! reports, and exposes typed events and commands to consumers.

pub mod client;
pub mod event;
pub mod goal;
pub mod wire;
pub mod world;
