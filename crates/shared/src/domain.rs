use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::InvalidGuess;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub String);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Player,
    Other(String),
}

impl UserRole {
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim() {
            "admin" => Self::Admin,
            "player" => Self::Player,
            other => Self::Other(other.to_string()),
        }
    }

    /// Only plain player accounts may use the terminal client.
    pub fn is_permitted(&self) -> bool {
        matches!(self, Self::Player)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => f.write_str("admin"),
            Self::Player => f.write_str("player"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// A single validated, lowercased letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Guess(char);

impl Guess {
    pub fn parse(input: &str) -> Result<Self, InvalidGuess> {
        let trimmed = input.trim();
        let mut chars = trimmed.chars();
        let (Some(letter), None) = (chars.next(), chars.next()) else {
            return Err(InvalidGuess::WrongLength(trimmed.chars().count()));
        };
        if !letter.is_alphabetic() {
            return Err(InvalidGuess::NotAlphabetic(letter));
        }
        let lowered = letter.to_lowercase().next().unwrap_or(letter);
        Ok(Self(lowered))
    }

    pub fn letter(self) -> char {
        self.0
    }
}

impl fmt::Display for Guess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
