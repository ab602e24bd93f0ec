//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};

use crate::game::persist::EntityData;
use crate::game::world::{Particle, Sound, WorldEvent};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Block interaction performed by the client's player
    PlayerAction {
        /// Wire action code
        action: i32,
        /// Block face, 0..=5
        #[serde(default)]
        face: i32,
        /// Target block
        #[serde(default)]
        pos: [i32; 3],
        /// Runtime id of the acting entity; must be the client's own
        entity_runtime_id: u64,
    },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        /// Id the client uses to refer to its own player
        runtime_id: u64,
        /// World-wide id of the spawned player
        entity_id: u64,
        server_time: u64,
    },

    /// Visible state of an entity changed
    EntityState {
        entity_id: u64,
        name: String,
        data: EntityData,
    },

    Sound {
        pos: [f64; 3],
        sound: Sound,
    },

    Particle {
        pos: [f64; 3],
        particle: Particle,
    },

    /// A player action was refused; the connection stays open
    ActionRejected {
        code: String,
        message: String,
    },

    /// Error message
    Error {
        code: String,
        message: String,
    },

    /// Pong response
    Pong {
        /// Echo of client timestamp
        t: u64,
        /// Server timestamp
        server_time: u64,
    },
}

impl From<WorldEvent> for ServerMsg {
    fn from(event: WorldEvent) -> Self {
        match event {
            WorldEvent::Sound { pos, sound } => ServerMsg::Sound {
                pos: pos.to_array(),
                sound,
            },
            WorldEvent::Particle { pos, particle } => ServerMsg::Particle {
                pos: pos.to_array(),
                particle,
            },
        }
    }
}
