use thiserror::Error;

/// A reply from the game service that does not carry the fields its
/// operation promises.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("login reply is missing a session token: {raw:?}")]
    MissingToken { raw: String },
    #[error("start game reply has {fields} field(s), expected at least 2")]
    ShortStartGameReply { fields: usize },
}

/// Local rejection of a guess before anything is sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidGuess {
    #[error("a guess must be exactly one character, got {0}")]
    WrongLength(usize),
    #[error("a guess must be a letter, got {0:?}")]
    NotAlphabetic(char),
}
