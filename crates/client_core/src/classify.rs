//! Decoding of the free-text game status into a [`GameLoopState`].
//!
//! The server has no status schema, only phrases. The rules below are
//! checked in order and the first match wins. All matching is done on the
//! lowercased text.

const COMPLETE_MARKERS: &[&str] = &["won the game", "game finished"];
const GAME_STARTING_MARKERS: &[&str] = &["starting soon", "starting in", "game will start in"];
const NEXT_ROUND_MARKERS: &[&str] = &["starting next round", "starting new round"];
const WAIT_ROOM_MARKERS: &[&str] = &["waiting for another player", "lobby created", "game created"];
const HOLDING_MARKERS: &[&str] = &["waiting", "starting"];
const ROUND_MARKERS: &[&str] = &["_", "word:", "round:"];
const NO_GAME_MARKERS: &[&str] = &["not in a game", "no active game"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The match is about to begin; the client runs its own 3-second countdown.
    GameStarting,
    /// Holding text between rounds; refreshed once per second.
    NextRound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameLoopState {
    AwaitingStart,
    WaitingForPlayer,
    RoundTransition(Transition),
    RoundActive,
    GameComplete,
    NotInGame,
    SessionExpired,
}

/// Loop-local facts the classification depends on besides the text itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifyContext {
    pub session_lost: bool,
    /// No round has been seen yet in this game loop.
    pub awaiting_start: bool,
    pub wait_timer_active: bool,
}

pub fn classify(status: &str, ctx: &ClassifyContext) -> GameLoopState {
    if ctx.session_lost {
        return GameLoopState::SessionExpired;
    }

    let text = status.to_lowercase();
    let has = |markers: &[&str]| markers.iter().any(|marker| text.contains(marker));

    if has(COMPLETE_MARKERS) {
        return GameLoopState::GameComplete;
    }
    if has(GAME_STARTING_MARKERS) {
        return GameLoopState::RoundTransition(Transition::GameStarting);
    }
    if has(NEXT_ROUND_MARKERS) {
        return GameLoopState::RoundTransition(Transition::NextRound);
    }

    // A lobby creator sees "No active game" until a second player joins.
    let no_game = has(NO_GAME_MARKERS);
    if has(WAIT_ROOM_MARKERS) || (ctx.awaiting_start && ctx.wait_timer_active && no_game) {
        return GameLoopState::WaitingForPlayer;
    }
    if has(HOLDING_MARKERS) {
        return GameLoopState::RoundTransition(Transition::NextRound);
    }
    if has(ROUND_MARKERS) {
        return GameLoopState::RoundActive;
    }
    if no_game && !ctx.awaiting_start && !ctx.wait_timer_active {
        return GameLoopState::NotInGame;
    }
    GameLoopState::AwaitingStart
}

#[cfg(test)]
#[path = "tests/classify_tests.rs"]
mod tests;
