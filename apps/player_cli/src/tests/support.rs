//! Stub service and scripted terminal shared by the binary's test suites.

use std::{collections::VecDeque, future, sync::Mutex};

use anyhow::Result;
use async_trait::async_trait;
use client_core::{GameService, RpcError, Terminal};
use shared::domain::Guess;

pub(crate) struct StubService {
    pub(crate) login_reply: String,
    pub(crate) user_type: String,
    pub(crate) partial_word: String,
    pub(crate) session_statuses: Mutex<VecDeque<String>>,
    pub(crate) calls: Mutex<Vec<String>>,
}

impl StubService {
    pub(crate) fn new() -> Self {
        Self {
            login_reply: "SUCCESS:tok123".into(),
            user_type: "player".into(),
            partial_word: "_ _ _ | Score: 0/3".into(),
            session_statuses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .expect("calls")
            .iter()
            .filter(|call| call.as_str() == operation)
            .count()
    }

    fn record(&self, operation: &str) {
        self.calls.lock().expect("calls").push(operation.to_string());
    }
}

#[async_trait]
impl GameService for StubService {
    async fn login(&self, _username: &str, _password: &str) -> Result<String, RpcError> {
        self.record("login");
        Ok(self.login_reply.clone())
    }

    async fn get_user_type(&self, _username: &str) -> Result<String, RpcError> {
        self.record("getUserType");
        Ok(self.user_type.clone())
    }

    async fn check_session_status(
        &self,
        _username: &str,
        _token: &str,
    ) -> Result<String, RpcError> {
        let next = self.session_statuses.lock().expect("statuses").pop_front();
        Ok(next.unwrap_or_else(|| "OK".into()))
    }

    async fn start_game(&self, _username: &str) -> Result<Vec<String>, RpcError> {
        self.record("startGame");
        Ok(vec!["FAILURE".into(), "No opponents online".into()])
    }

    async fn get_partial_word(&self, _username: &str) -> Result<String, RpcError> {
        self.record("getPartialWord");
        Ok(self.partial_word.clone())
    }

    async fn guess_letter(&self, _username: &str, _guess: Guess) -> Result<bool, RpcError> {
        self.record("guessLetter");
        Ok(false)
    }

    async fn quit_game(&self, _username: &str) -> Result<(), RpcError> {
        self.record("quitGame");
        Ok(())
    }

    async fn logout(&self, _username: &str) -> Result<(), RpcError> {
        self.record("logout");
        Ok(())
    }

    async fn get_leaderboard(&self) -> Result<String, RpcError> {
        self.record("getLeaderboard");
        Ok("1. alice - 3 wins\n2. bob - 1 wins".into())
    }

    async fn get_game_config(&self) -> Result<String, RpcError> {
        Ok("wait_time: 10 seconds".into())
    }
}

#[derive(Default)]
pub(crate) struct ScriptedTerminal {
    script: VecDeque<String>,
    pub(crate) output: Vec<String>,
    pub(crate) block_when_empty: bool,
}

impl ScriptedTerminal {
    pub(crate) fn new(lines: &[&str]) -> Self {
        Self {
            script: lines.iter().map(|line| line.to_string()).collect(),
            ..Self::default()
        }
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

    async fn read_line(&mut self, _prompt: &str) -> Result<Option<String>> {
        match self.script.pop_front() {
            Some(line) => Ok(Some(line)),
            None if self.block_when_empty => future::pending().await,
            None => Ok(None),
        }
    }
}
