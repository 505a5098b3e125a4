//! Decoding of the free-text replies the game service sends back.
//!
//! The service speaks in loosely structured strings (`SUCCESS:<token>`,
//! `DISPLACED:<message>`, multi-line config dumps). Everything here turns
//! those into typed values at the boundary so the rest of the client never
//! splits strings by hand.

use crate::{domain::GameId, error::ProtocolError};

pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_DISPLACEMENT_REASON: &str =
    "This account has been logged in from another client.";

const SUCCESS_PREFIX: &str = "SUCCESS:";
const FAILURE_PREFIX: &str = "FAILURE:";
const TAKEOVER_MARKER: &str = "GAME_TAKEOVER";
const WAIT_TIME_KEY: &str = "wait_time:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameTakeover {
    pub game_id: GameId,
    pub status: String,
}

impl GameTakeover {
    /// The taken-over game is still sitting in its wait room.
    pub fn is_waiting(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case("waiting")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginReply {
    Success {
        token: String,
        takeover: Option<GameTakeover>,
    },
    Failure {
        reason: String,
    },
}

impl LoginReply {
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let raw = raw.trim();
        let Some(rest) = raw.strip_prefix(SUCCESS_PREFIX) else {
            let reason = raw.strip_prefix(FAILURE_PREFIX).unwrap_or(raw).trim();
            return Ok(Self::Failure {
                reason: reason.to_string(),
            });
        };

        let parts: Vec<&str> = rest.split(':').collect();
        let token = parts.first().map(|t| t.trim()).unwrap_or_default();
        if token.is_empty() {
            return Err(ProtocolError::MissingToken {
                raw: raw.to_string(),
            });
        }

        let takeover = match parts.as_slice() {
            [_, marker, game_id, status @ ..] if *marker == TAKEOVER_MARKER && !status.is_empty() => {
                Some(GameTakeover {
                    game_id: GameId(game_id.to_string()),
                    status: status.join(":"),
                })
            }
            _ => None,
        };

        Ok(Self::Success {
            token: token.to_string(),
            takeover,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Displaced { reason: String },
    ForceLogout { reason: String },
    /// `NO_SESSION`, `ERROR` and anything newer; the monitor keeps polling.
    Unrecognized(String),
}

impl SessionStatus {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(reason) = raw.strip_prefix("DISPLACED:") {
            return Self::Displaced {
                reason: reason_or_default(reason),
            };
        }
        if let Some(reason) = raw.strip_prefix("FORCE_LOGOUT:") {
            return Self::ForceLogout {
                reason: reason_or_default(reason),
            };
        }
        match raw {
            "OK" | "ACTIVE" => Self::Active,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    /// The reason to show the user when the session has been taken away.
    pub fn eviction_reason(&self) -> Option<&str> {
        match self {
            Self::Displaced { reason } | Self::ForceLogout { reason } => Some(reason),
            Self::Active | Self::Unrecognized(_) => None,
        }
    }
}

fn reason_or_default(reason: &str) -> String {
    let reason = reason.trim();
    if reason.is_empty() {
        DEFAULT_DISPLACEMENT_REASON.to_string()
    } else {
        reason.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartGameReply {
    Started {
        message: String,
        game_id: Option<GameId>,
    },
    Rejected {
        message: String,
    },
}

impl StartGameReply {
    pub fn parse(fields: &[String]) -> Result<Self, ProtocolError> {
        let [status, message, rest @ ..] = fields else {
            return Err(ProtocolError::ShortStartGameReply {
                fields: fields.len(),
            });
        };
        if status.trim() != "SUCCESS" {
            return Ok(Self::Rejected {
                message: message.clone(),
            });
        }
        Ok(Self::Started {
            message: message.clone(),
            game_id: rest.first().map(|id| GameId(id.clone())),
        })
    }

    /// The caller created (or rejoined) a lobby that still needs a second player.
    /// True when the server paired us with a waiting player just now, as
    /// opposed to resuming a game already under way.
    pub fn joins_fresh_game(&self) -> bool {
        match self {
            Self::Started { message, .. } => message.to_ascii_lowercase().contains("game started"),
            Self::Rejected { .. } => false,
        }
    }

    pub fn opens_wait_room(&self) -> bool {
        match self {
            Self::Started { message, .. } => message
                .to_ascii_lowercase()
                .contains("waiting for another player"),
            Self::Rejected { .. } => false,
        }
    }
}

/// Extracts the wait-room timeout from the `getGameConfig` dump.
///
/// The first `wait_time: <N> seconds` line with a parsable `N` wins; anything
/// else falls back to [`DEFAULT_WAIT_TIMEOUT_SECS`].
pub fn parse_wait_timeout(config: &str) -> u64 {
    config
        .lines()
        .filter_map(|line| {
            let idx = line.find(WAIT_TIME_KEY)?;
            line[idx + WAIT_TIME_KEY.len()..]
                .split_whitespace()
                .next()?
                .parse::<u64>()
                .ok()
        })
        .next()
        .unwrap_or(DEFAULT_WAIT_TIMEOUT_SECS)
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
