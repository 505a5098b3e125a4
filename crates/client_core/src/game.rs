//! The game loop: poll, classify, act, repeat.

use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

use shared::{
    domain::Guess,
    error::ProtocolError,
    protocol::{parse_wait_timeout, GameTakeover, StartGameReply, DEFAULT_WAIT_TIMEOUT_SECS},
};
use thiserror::Error;
use tokio::{
    sync::broadcast::{self, error::RecvError},
    time::Instant,
};
use tracing::{debug, info, warn};

use crate::{
    classify::{classify, ClassifyContext, GameLoopState, Transition},
    session::{SessionEvent, SessionManager},
    terminal::Terminal,
    transport::{GameService, RpcError},
};

pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const START_COUNTDOWN_SECS: u64 = 3;

/// Local countdown for one wait-room episode.
#[derive(Debug, Clone, Copy)]
pub struct WaitTimer {
    started_at: Instant,
    timeout_secs: u64,
}

impl WaitTimer {
    pub fn start(timeout_secs: u64) -> Self {
        Self {
            started_at: Instant::now(),
            timeout_secs,
        }
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Whole seconds left, never below zero.
    pub fn remaining_secs(&self) -> u64 {
        self.timeout_secs
            .saturating_sub(self.started_at.elapsed().as_secs())
    }
}

/// Why the game loop handed control back to the menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameExit {
    Quit,
    Completed,
    NotInGame,
    TimedOut,
    StartRejected { message: String },
    SessionExpired { reason: String },
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error("not logged in")]
    NotLoggedIn,
    #[error("transport error during game: {0}")]
    Transport(#[from] RpcError),
    #[error("malformed game response: {0}")]
    Malformed(#[from] ProtocolError),
    #[error(transparent)]
    Terminal(#[from] anyhow::Error),
}

enum Prompted {
    Line(String),
    EndOfInput,
    SessionEnded,
}

/// Per-game state; dropped (with any wait timer) when the loop returns.
struct GameRound {
    awaiting_start: bool,
    wait_timer: Option<WaitTimer>,
}

pub struct GameController {
    service: Arc<dyn GameService>,
    sessions: Arc<SessionManager>,
    wait_timeout: OnceLock<u64>,
    poll_interval: Duration,
}

impl GameController {
    pub fn new(service: Arc<dyn GameService>, sessions: Arc<SessionManager>) -> Self {
        Self {
            service,
            sessions,
            wait_timeout: OnceLock::new(),
            poll_interval: POLL_INTERVAL,
        }
    }

    /// The wait-room timeout from the server config, fetched once.
    ///
    /// A transport failure yields the default without caching it, so the next
    /// wait room tries again.
    pub async fn wait_timeout_secs(&self) -> u64 {
        if let Some(secs) = self.wait_timeout.get() {
            return *secs;
        }
        match self.service.get_game_config().await {
            Ok(config) => *self.wait_timeout.get_or_init(|| parse_wait_timeout(&config)),
            Err(err) => {
                warn!(error = %err, "game: could not read wait timeout, using default");
                DEFAULT_WAIT_TIMEOUT_SECS
            }
        }
    }

    pub async fn start_game(&self, terminal: &mut dyn Terminal) -> Result<GameExit, GameError> {
        let username = self.sessions.username().await.ok_or(GameError::NotLoggedIn)?;
        let fields = self.service.start_game(&username).await?;
        let reply = StartGameReply::parse(&fields)?;

        match &reply {
            StartGameReply::Rejected { message } => {
                terminal.show(&format!("Failed to start game: {message}"));
                return Ok(GameExit::StartRejected {
                    message: message.clone(),
                });
            }
            StartGameReply::Started { message, game_id } => {
                terminal.show(&format!("Game: {message}"));
                if let Some(game_id) = game_id {
                    terminal.show(&format!("Game ID: {game_id}"));
                }
                info!(username = %username, game_id = ?game_id, "game: start accepted");
            }
        }

        let primed = if reply.opens_wait_room() {
            terminal.show("Creating new lobby - waiting for another player to join...");
            let timer = WaitTimer::start(self.wait_timeout_secs().await);
            terminal.show(&format!("Timeout set to {} seconds", timer.timeout_secs()));
            Some(timer)
        } else {
            if reply.joins_fresh_game() {
                terminal.show("Joining existing game - starting immediately!");
            }
            None
        };

        self.play(&username, primed, terminal).await
    }

    /// Re-enters a game this account was already part of before logging in.
    pub async fn resume_takeover(
        &self,
        takeover: &GameTakeover,
        terminal: &mut dyn Terminal,
    ) -> Result<GameExit, GameError> {
        let username = self.sessions.username().await.ok_or(GameError::NotLoggedIn)?;
        terminal.show("*** GAME TAKEOVER DETECTED ***");
        terminal.show(&format!(
            "Automatically loading game {} (status: {})",
            takeover.game_id, takeover.status
        ));

        let primed = if takeover.is_waiting() {
            terminal.show("Resuming waiting state - looking for another player...");
            Some(WaitTimer::start(self.wait_timeout_secs().await))
        } else {
            terminal.show("Resuming active game...");
            None
        };
        info!(username = %username, game_id = %takeover.game_id, "game: resuming taken-over game");

        self.play(&username, primed, terminal).await
    }

    async fn play(
        &self,
        username: &str,
        primed: Option<WaitTimer>,
        terminal: &mut dyn Terminal,
    ) -> Result<GameExit, GameError> {
        let mut events = self.sessions.subscribe_events();
        let mut round = GameRound {
            awaiting_start: true,
            wait_timer: primed,
        };

        terminal.show(&format!("=== Game Started - Player: {username} ==="));
        terminal.show("Guess letters to complete the word! (Type 'quit' to leave game)");
        terminal.show("Waiting for game to be ready...");

        loop {
            if !self.sessions.is_active().await {
                return Ok(self.session_expired(username, terminal).await);
            }

            let status = self.service.get_partial_word(username).await?;
            let ctx = ClassifyContext {
                session_lost: !self.sessions.is_active().await,
                awaiting_start: round.awaiting_start,
                wait_timer_active: round.wait_timer.is_some(),
            };
            let state = classify(&status, &ctx);
            debug!(username, ?state, status = %status, "game: status classified");

            if state != GameLoopState::WaitingForPlayer && state != GameLoopState::AwaitingStart {
                round.wait_timer = None;
            }

            match state {
                GameLoopState::SessionExpired => {
                    return Ok(self.session_expired(username, terminal).await);
                }
                GameLoopState::GameComplete => {
                    terminal.show(&format!("Player: {username} | Game Status: {status}"));
                    terminal.show(&format!("({username}) GAME COMPLETE: Game completed!"));
                    let ack = self
                        .prompt(terminal, &mut events, "Press Enter to return to main menu...")
                        .await?;
                    if matches!(ack, Prompted::SessionEnded) {
                        continue;
                    }
                    self.leave_game(username, terminal).await;
                    return Ok(GameExit::Completed);
                }
                GameLoopState::RoundTransition(Transition::GameStarting) => {
                    terminal.show(&format!("GAME STARTING ({username}): {status}"));
                    for remaining in (1..=START_COUNTDOWN_SECS).rev() {
                        terminal.show(&format!(
                            "COUNTDOWN ({username}): Game starting in {remaining} seconds..."
                        ));
                        tokio::time::sleep(self.poll_interval).await;
                    }
                    terminal.show(&format!("COUNTDOWN ({username}): Game starting NOW!"));
                    round.awaiting_start = false;
                }
                GameLoopState::RoundTransition(Transition::NextRound) => {
                    terminal.show(&format!("ROUND TRANSITION ({username}): {status}"));
                    tokio::time::sleep(self.poll_interval).await;
                }
                GameLoopState::WaitingForPlayer => {
                    let timer = match round.wait_timer {
                        Some(timer) => timer,
                        None => {
                            let timer = WaitTimer::start(self.wait_timeout_secs().await);
                            terminal.show(&format!(
                                "WAITING: Another player needed to join... (Timeout in {} seconds)",
                                timer.timeout_secs()
                            ));
                            round.wait_timer = Some(timer);
                            timer
                        }
                    };

                    let remaining = timer.remaining_secs();
                    if remaining == 0 {
                        terminal.show("TIMEOUT: No player joined within the time limit!");
                        terminal.show("Returning to main menu...");
                        info!(username, "game: wait room timed out");
                        self.leave_game(username, terminal).await;
                        return Ok(GameExit::TimedOut);
                    }

                    terminal.clear();
                    terminal.show(&format!("=== Game Status - Player: {username} ==="));
                    terminal.show(&format!(
                        "WAITING ({username}): Another player needed to join..."
                    ));
                    terminal.show(&format!(
                        "COUNTDOWN ({username}): Time remaining: {remaining} seconds"
                    ));
                    terminal.show(&format!("({username}): The game will start automatically"));
                    tokio::time::sleep(self.poll_interval).await;
                }
                GameLoopState::RoundActive => {
                    if round.awaiting_start {
                        round.awaiting_start = false;
                        terminal.show(&format!("GAME STARTED ({username}): Game has started!"));
                    }
                    terminal.show(&format!("Player: {username} | Game Status: {status}"));
                    if let Some(exit) = self.take_turn(username, terminal, &mut events).await? {
                        return Ok(exit);
                    }
                }
                GameLoopState::NotInGame => {
                    terminal.show("You are not currently in a game.");
                    return Ok(GameExit::NotInGame);
                }
                GameLoopState::AwaitingStart => {
                    if status.trim().is_empty() {
                        terminal.show(&format!("WAITING ({username}): Game initializing..."));
                    } else {
                        terminal.show(&format!("Current status: '{status}'"));
                    }
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    /// Prompts for one guess. `Some` ends the game loop.
    async fn take_turn(
        &self,
        username: &str,
        terminal: &mut dyn Terminal,
        events: &mut broadcast::Receiver<SessionEvent>,
    ) -> Result<Option<GameExit>, GameError> {
        let prompt = format!("({username}) Enter a letter (or 'quit' to exit, Enter to refresh): ");
        let line = match self.prompt(terminal, events, &prompt).await? {
            Prompted::Line(line) => line,
            Prompted::EndOfInput => {
                terminal.show(&format!("({username}): Leaving game..."));
                self.leave_game(username, terminal).await;
                return Ok(Some(GameExit::Quit));
            }
            Prompted::SessionEnded => return Ok(None),
        };

        let input = line.trim().to_lowercase();
        match input.as_str() {
            "quit" => {
                terminal.show(&format!("({username}): Leaving game..."));
                self.leave_game(username, terminal).await;
                return Ok(Some(GameExit::Quit));
            }
            "" | "status" => return Ok(None),
            _ => {}
        }

        let guess = match Guess::parse(&input) {
            Ok(guess) => guess,
            Err(err) => {
                debug!(username, error = %err, "game: guess rejected locally");
                terminal.show(&format!("({username}): Please enter a single letter!"));
                return Ok(None);
            }
        };

        // The session may have been taken while the prompt was open.
        if !self.sessions.is_active().await {
            return Ok(None);
        }

        if self.service.guess_letter(username, guess).await? {
            terminal.show(&format!("({username}) ACCEPTED: Letter '{guess}' accepted!"));
        } else {
            terminal.show(&format!(
                "({username}) REJECTED: Letter '{guess}' was not accepted."
            ));
        }
        Ok(None)
    }

    /// Reads a line unless the session ends first.
    async fn prompt(
        &self,
        terminal: &mut dyn Terminal,
        events: &mut broadcast::Receiver<SessionEvent>,
        prompt: &str,
    ) -> Result<Prompted, GameError> {
        let mut read = terminal.read_line(prompt);
        loop {
            tokio::select! {
                line = &mut read => {
                    return Ok(match line? {
                        Some(line) => Prompted::Line(line),
                        None => Prompted::EndOfInput,
                    });
                }
                event = events.recv() => match event {
                    Ok(SessionEvent::Displaced { .. } | SessionEvent::LoggedOut { .. }) => {
                        return Ok(Prompted::SessionEnded);
                    }
                    Ok(SessionEvent::MonitorStopped { .. }) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => {
                        return Ok(match read.await? {
                            Some(line) => Prompted::Line(line),
                            None => Prompted::EndOfInput,
                        });
                    }
                },
            }
        }
    }

    async fn session_expired(&self, username: &str, terminal: &mut dyn Terminal) -> GameExit {
        let reason = self
            .sessions
            .snapshot()
            .await
            .displacement_reason
            .unwrap_or_else(|| "Session expired.".to_string());
        terminal.show(&format!(
            "({username}): Game interrupted due to account displacement."
        ));
        terminal.show(&reason);
        terminal.show("Returning to main menu...");
        info!(username, %reason, "game: left game after session loss");
        GameExit::SessionExpired { reason }
    }

    async fn leave_game(&self, username: &str, terminal: &mut dyn Terminal) {
        match self.service.quit_game(username).await {
            Ok(()) => terminal.show("You have left the current game."),
            Err(err) => {
                warn!(username, error = %err, "game: quit call failed");
                terminal.show(&format!("Could not leave the game cleanly: {err}"));
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/game_tests.rs"]
mod tests;
