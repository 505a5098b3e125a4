use std::sync::Arc;

use anyhow::Result;
use client_core::{
    AuthError, GameController, GameError, GameExit, GameService, SessionEvent, SessionManager,
    Terminal,
};
use shared::domain::UserRole;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

enum MenuInput {
    Choice(String),
    Closed,
    Interrupted,
}

/// Top-level interactive loop: login, start a game, leaderboard, logout.
pub struct Menu<T: Terminal> {
    sessions: Arc<SessionManager>,
    games: GameController,
    events: broadcast::Receiver<SessionEvent>,
    terminal: T,
}

impl<T: Terminal> Menu<T> {
    pub fn new(service: Arc<dyn GameService>, sessions: Arc<SessionManager>, terminal: T) -> Self {
        let games = GameController::new(service, Arc::clone(&sessions));
        let events = sessions.subscribe_events();
        Self {
            sessions,
            games,
            events,
            terminal,
        }
    }

    /// Runs until the user exits or stdin closes. Errors from the
    /// game or session layers are printed, never propagated; only a
    /// broken terminal ends the loop with an error.
    pub async fn run(&mut self) -> Result<()> {
        self.terminal.show("=== WHAT'S THE WORD ===");

        loop {
            let logged_in = self.sessions.is_active().await;
            self.show_menu(logged_in).await;

            let choice = match self.read_choice().await? {
                MenuInput::Choice(choice) => choice,
                MenuInput::Interrupted => continue,
                MenuInput::Closed => break,
            };

            match (choice.trim(), logged_in) {
                ("0", _) => break,
                ("1", false) => self.login().await?,
                ("1", true) => self.play().await,
                ("2", true) => self.leaderboard().await,
                ("3", true) => self.logout().await,
                _ => self.terminal.show("Invalid choice! Please try again."),
            }
        }

        if self.sessions.is_active().await {
            self.logout().await;
        }
        self.terminal.show("Goodbye!");
        Ok(())
    }

    async fn show_menu(&mut self, logged_in: bool) {
        self.terminal.show("");
        if logged_in {
            let username = self.sessions.username().await.unwrap_or_default();
            self.terminal.show(&format!("Logged in as: {username}"));
            self.terminal.show("1. Start/Join Game");
            self.terminal.show("2. View Leaderboard");
            self.terminal.show("3. Logout");
        } else {
            self.terminal.show("1. Login");
        }
        self.terminal.show("0. Exit");
    }

    async fn read_choice(&mut self) -> Result<MenuInput> {
        loop {
            tokio::select! {
                line = self.terminal.read_line("Enter your choice: ") => {
                    return Ok(match line? {
                        Some(line) => MenuInput::Choice(line),
                        None => MenuInput::Closed,
                    });
                }
                event = self.events.recv() => match event {
                    Ok(SessionEvent::Displaced { reason, .. }) => {
                        self.terminal.show("");
                        self.terminal.show("*** IMPORTANT ***");
                        self.terminal.show(&reason);
                        self.terminal.show("You have been logged out.");
                        return Ok(MenuInput::Interrupted);
                    }
                    Ok(SessionEvent::MonitorStopped { reason }) => {
                        self.terminal.show(&format!("Session monitoring stopped: {reason}"));
                    }
                    Ok(SessionEvent::LoggedOut { .. }) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "menu: session events lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        self.events = self.sessions.subscribe_events();
                    }
                },
            }
        }
    }

    async fn login(&mut self) -> Result<()> {
        let Some(username) = self.terminal.read_line("Enter username: ").await? else {
            return Ok(());
        };
        let Some(password) = self.terminal.read_line("Enter password: ").await? else {
            return Ok(());
        };

        match self.sessions.login(username.trim(), password.trim()).await {
            Ok(outcome) => {
                info!(username = %outcome.session.username, "menu: logged in");
                self.terminal
                    .show(&format!("Welcome, {}!", outcome.session.username));
                if let Some(takeover) = outcome.takeover {
                    let result = self
                        .games
                        .resume_takeover(&takeover, &mut self.terminal)
                        .await;
                    self.report(result);
                    self.resubscribe();
                }
            }
            Err(AuthError::RoleNotPermitted {
                role: UserRole::Admin,
            }) => {
                self.terminal
                    .show("ERROR: Admin accounts cannot use the player client!");
            }
            Err(AuthError::InvalidCredentials(reason)) => {
                self.terminal.show(&format!("Login failed: {reason}"));
            }
            Err(err) => self.terminal.show(&format!("Error during login: {err}")),
        }
        Ok(())
    }

    async fn play(&mut self) {
        let result = self.games.start_game(&mut self.terminal).await;
        self.report(result);
        self.resubscribe();
    }

    async fn leaderboard(&mut self) {
        match self.sessions.leaderboard().await {
            Ok(board) => {
                self.terminal.show("=== LEADERBOARD ===");
                for line in board.lines() {
                    self.terminal.show(line);
                }
            }
            Err(err) => self
                .terminal
                .show(&format!("Error getting leaderboard: {err}")),
        }
    }

    async fn logout(&mut self) {
        let username = self.sessions.username().await;
        match self.sessions.logout().await {
            Ok(true) => {
                let name = username.unwrap_or_default();
                self.terminal.show(&format!("Goodbye, {name}!"));
            }
            Ok(false) => self.terminal.show("You are not logged in!"),
            Err(err) => self.terminal.show(&format!("Error during logout: {err}")),
        }
    }

    fn report(&mut self, result: Result<GameExit, GameError>) {
        match result {
            Ok(exit) => debug!(?exit, "menu: game loop returned"),
            Err(err) => {
                warn!(error = %err, "menu: game loop failed");
                self.terminal.show(&format!("Error during game: {err}"));
            }
        }
    }

    // The game loop already reported anything that arrived while it ran.
    fn resubscribe(&mut self) {
        self.events = self.sessions.subscribe_events();
    }
}

#[cfg(test)]
#[path = "tests/menu_tests.rs"]
mod tests;
