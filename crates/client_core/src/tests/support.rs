//! Shared fakes for the client_core test suites.

use std::{collections::VecDeque, sync::Mutex};

use anyhow::Result;
use async_trait::async_trait;
use shared::domain::Guess;

use crate::{
    terminal::Terminal,
    transport::{GameService, RpcError},
};

fn unavailable(operation: &'static str) -> RpcError {
    RpcError::Status {
        operation,
        status: 503,
    }
}

pub(crate) struct FakeGameService {
    login_reply: String,
    user_type: String,
    start_game_reply: Vec<String>,
    guess_accepted: bool,
    game_config: String,
    session_statuses: Mutex<VecDeque<String>>,
    partial_words: Mutex<VecDeque<String>>,
    fail_partial_word: bool,
    fail_session_check: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeGameService {
    pub(crate) fn new() -> Self {
        Self {
            login_reply: "SUCCESS:tok123".into(),
            user_type: "player".into(),
            start_game_reply: vec!["SUCCESS".into(), "Game started".into(), "g1".into()],
            guess_accepted: true,
            game_config: "GAME CONFIGURATION:\nwait_time: 15 seconds\nround_duration: 30 seconds\n"
                .into(),
            session_statuses: Mutex::new(VecDeque::new()),
            partial_words: Mutex::new(VecDeque::from(["_ _ _ | Score: 0/3".to_string()])),
            fail_partial_word: false,
            fail_session_check: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_login_reply(mut self, reply: &str) -> Self {
        self.login_reply = reply.into();
        self
    }

    pub(crate) fn with_user_type(mut self, user_type: &str) -> Self {
        self.user_type = user_type.into();
        self
    }

    pub(crate) fn with_start_game_reply(mut self, fields: &[&str]) -> Self {
        self.start_game_reply = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub(crate) fn with_guess_accepted(mut self, accepted: bool) -> Self {
        self.guess_accepted = accepted;
        self
    }

    pub(crate) fn with_game_config(mut self, config: &str) -> Self {
        self.game_config = config.into();
        self
    }

    /// Replies for successive session checks; `OK` once exhausted.
    pub(crate) fn with_session_statuses(self, statuses: &[&str]) -> Self {
        *self.session_statuses.lock().expect("statuses") =
            statuses.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Replies for successive status polls; the last one repeats.
    pub(crate) fn with_partial_words(self, words: &[&str]) -> Self {
        *self.partial_words.lock().expect("words") = words.iter().map(|s| s.to_string()).collect();
        self
    }

    pub(crate) fn failing_partial_word(mut self) -> Self {
        self.fail_partial_word = true;
        self
    }

    pub(crate) fn failing_session_check(mut self) -> Self {
        self.fail_session_check = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls").clone()
    }

    pub(crate) fn count(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.split(':').next() == Some(operation))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("calls").push(call);
    }
}

#[async_trait]
impl GameService for FakeGameService {
    async fn login(&self, username: &str, _password: &str) -> Result<String, RpcError> {
        self.record(format!("login:{username}"));
        Ok(self.login_reply.clone())
    }

    async fn get_user_type(&self, username: &str) -> Result<String, RpcError> {
        self.record(format!("getUserType:{username}"));
        Ok(self.user_type.clone())
    }

    async fn check_session_status(
        &self,
        username: &str,
        _token: &str,
    ) -> Result<String, RpcError> {
        self.record(format!("checkSessionStatus:{username}"));
        if self.fail_session_check {
            return Err(unavailable("checkSessionStatus"));
        }
        let next = self.session_statuses.lock().expect("statuses").pop_front();
        Ok(next.unwrap_or_else(|| "OK".into()))
    }

    async fn start_game(&self, username: &str) -> Result<Vec<String>, RpcError> {
        self.record(format!("startGame:{username}"));
        Ok(self.start_game_reply.clone())
    }

    async fn get_partial_word(&self, username: &str) -> Result<String, RpcError> {
        self.record(format!("getPartialWord:{username}"));
        if self.fail_partial_word {
            return Err(unavailable("getPartialWord"));
        }
        let mut words = self.partial_words.lock().expect("words");
        let word = if words.len() > 1 {
            words.pop_front()
        } else {
            words.front().cloned()
        };
        Ok(word.unwrap_or_default())
    }

    async fn guess_letter(&self, username: &str, guess: Guess) -> Result<bool, RpcError> {
        self.record(format!("guessLetter:{username}:{guess}"));
        Ok(self.guess_accepted)
    }

    async fn quit_game(&self, username: &str) -> Result<(), RpcError> {
        self.record(format!("quitGame:{username}"));
        Ok(())
    }

    async fn logout(&self, username: &str) -> Result<(), RpcError> {
        self.record(format!("logout:{username}"));
        Ok(())
    }

    async fn get_leaderboard(&self) -> Result<String, RpcError> {
        self.record("getLeaderboard".into());
        Ok("1. alice - 3 wins".into())
    }

    async fn get_game_config(&self) -> Result<String, RpcError> {
        self.record("getGameConfig".into());
        Ok(self.game_config.clone())
    }
}

/// A terminal fed from a script. Once the script runs out it either reports
/// end of input or blocks forever, depending on how it was built.
pub(crate) struct ScriptedTerminal {
    inputs: VecDeque<String>,
    block_when_empty: bool,
    pub(crate) output: Vec<String>,
    pub(crate) prompts: Vec<String>,
}

impl ScriptedTerminal {
    pub(crate) fn new(inputs: &[&str]) -> Self {
        Self {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            block_when_empty: false,
            output: Vec::new(),
            prompts: Vec::new(),
        }
    }

    pub(crate) fn blocking_when_empty(mut self) -> Self {
        self.block_when_empty = true;
        self
    }

    pub(crate) fn printed(&self, needle: &str) -> bool {
        self.output.iter().any(|line| line.contains(needle))
    }
}

#[async_trait]
impl Terminal for ScriptedTerminal {
    fn show(&mut self, line: &str) {
        self.output.push(line.to_string());
    }

    async fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        if let Some(line) = self.inputs.pop_front() {
            return Ok(Some(line));
        }
        if self.block_when_empty {
            std::future::pending::<()>().await;
        }
        Ok(None)
    }
}
