//! Network Layer
//!
//! WebSocket server for game clients.
//! This layer holds no achievement state; everything goes through `service`.

pub mod protocol;
pub mod server;

pub use protocol::{
    ClientMessage, ErrorCode, GameSubmission, PlayerInfo, ServerError, ServerMessage,
    SignatureRequest, SignatureResponse,
};
pub use server::{BadgeServer, BadgeServerError};
