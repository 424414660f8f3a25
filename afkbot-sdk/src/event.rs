//! Events emitted by the game client for the bot layer to consume.

use crate::world::Vec3;

/// Events that the SDK emits to the consumer (bot, test harness, etc.)
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Transport is up and the login frame has been sent.
    Connected,

    /// The player entity exists in the world. Fires again after respawn.
    Spawned {
        position: Vec3,
    },

    /// A chat line from another player.
    Chat {
        username: String,
        message: String,
    },

    /// Our player died (the gateway respawns automatically).
    Death,

    /// The server kicked us. `reason` is the raw payload: either plain text
    /// or a serialized chat component.
    Kicked {
        reason: String,
    },

    /// Protocol-level error reported by the gateway or the transport.
    Error {
        message: String,
    },

    /// Connection was closed. Always the last event of a connection.
    Disconnected {
        reason: String,
    },
}
