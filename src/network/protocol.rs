//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! All messages are JSON text frames tagged by `type`.

use serde::{Deserialize, Serialize};

use crate::attest::store::AchievementRecord;
use crate::attest::SignatureBytes;
use crate::core::address::AccountAddress;
use crate::game::achievement::AchievementId;
use crate::game::stats::{GameResult, LeaderboardEntry, PlayerStats};
use crate::service::ServiceError;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Report a finished game.
    SubmitGame(GameSubmission),

    /// Look up a player's stats and achievements.
    GetPlayer { address: String },

    /// Ask for a credential for an earned achievement.
    RequestSignature(SignatureRequest),

    /// Top players by best score.
    Leaderboard {
        #[serde(default)]
        limit: Option<usize>,
    },

    /// Top players of one tournament.
    TournamentLeaderboard {
        tournament_id: u64,
        #[serde(default)]
        limit: Option<usize>,
    },

    /// Liveness check.
    Ping { timestamp: u64 },
}

/// Finished game report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSubmission {
    /// Player address (hex, any case).
    pub player_address: String,
    /// Final score.
    pub score: u32,
    /// Lines cleared.
    pub lines_cleared: u32,
    /// Duration in seconds.
    #[serde(default)]
    pub duration: Option<u32>,
    /// Tournament game flag.
    #[serde(default)]
    pub is_tournament: bool,
    /// Tournament id.
    #[serde(default)]
    pub tournament_id: Option<u64>,
}

impl GameSubmission {
    /// Validate the address and build a game result.
    pub fn into_result(self) -> Result<GameResult, ServiceError> {
        let player = AccountAddress::parse(&self.player_address)?;
        Ok(GameResult {
            player,
            score: self.score,
            lines_cleared: self.lines_cleared,
            duration_secs: self.duration,
            is_tournament: self.is_tournament,
            tournament_id: self.tournament_id,
        })
    }
}

/// Credential request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureRequest {
    /// Player address (hex, any case).
    pub player_address: String,
    /// Catalog id of the achievement.
    pub achievement_id: u64,
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Game stored.
    GameRecorded {
        game_id: String,
        achievements: Vec<AchievementId>,
    },

    /// Player lookup result.
    Player(PlayerInfo),

    /// Issued credential.
    Signature(SignatureResponse),

    /// Leaderboard rows.
    Leaderboard { leaderboard: Vec<LeaderboardEntry> },

    /// Pong response.
    Pong { timestamp: u64, server_time: u64 },

    /// Error message.
    Error(ServerError),

    /// Server is shutting down.
    Shutdown { reason: String },
}

/// Player lookup payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfo {
    /// Whether the player has any recorded games.
    pub exists: bool,
    /// Player totals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<PlayerStats>,
    /// Earned achievements.
    #[serde(default)]
    pub achievements: Vec<AchievementRecord>,
}

/// Credential payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureResponse {
    /// Achievement the signature covers.
    pub achievement_id: AchievementId,
    /// 65-byte signature, 0x-hex.
    pub signature: SignatureBytes,
}

/// Server error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

impl ServerError {
    /// Build an error with a code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<&ServiceError> for ServerError {
    fn from(err: &ServiceError) -> Self {
        let code = if err.is_authorization() {
            ErrorCode::Forbidden
        } else if err.is_invalid_input() {
            ErrorCode::InvalidInput
        } else {
            ErrorCode::InternalError
        };
        Self::new(code, err.to_string())
    }
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed request.
    InvalidInput,
    /// Achievement not earned.
    Forbidden,
    /// Unknown resource.
    NotFound,
    /// Connection limit reached.
    ServerOverloaded,
    /// Internal server error.
    InternalError,
}

impl ErrorCode {
    /// Equivalent HTTP status.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorCode::InvalidInput => 400,
            ErrorCode::Forbidden => 403,
            ErrorCode::NotFound => 404,
            ErrorCode::ServerOverloaded => 503,
            ErrorCode::InternalError => 500,
        }
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
