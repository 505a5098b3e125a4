//! The RPC gateway to the remote game service.
//!
//! [`GameService`] is the narrow contract the client consumes. The only
//! production implementation is [`HttpGameService`], which talks to the
//! broker through its HTTP bridge: the naming-service entry `Game` is served
//! under `/Game`, and every operation is a `POST /Game/<operation>` whose
//! JSON reply wraps the return value as `{"result": ...}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use shared::domain::Guess;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

pub const SERVICE_NAME: &str = "Game";

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("invalid game service endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("game service request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("game service not found at {0}")]
    ServiceNotFound(String),
    #[error("game service call {operation} failed with status {status}")]
    Status { operation: &'static str, status: u16 },
}

#[async_trait]
pub trait GameService: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<String, RpcError>;
    async fn get_user_type(&self, username: &str) -> Result<String, RpcError>;
    async fn check_session_status(&self, username: &str, token: &str)
        -> Result<String, RpcError>;
    async fn start_game(&self, username: &str) -> Result<Vec<String>, RpcError>;
    async fn get_partial_word(&self, username: &str) -> Result<String, RpcError>;
    async fn guess_letter(&self, username: &str, guess: Guess) -> Result<bool, RpcError>;
    async fn quit_game(&self, username: &str) -> Result<(), RpcError>;
    async fn logout(&self, username: &str) -> Result<(), RpcError>;
    async fn get_leaderboard(&self) -> Result<String, RpcError>;
    async fn get_game_config(&self) -> Result<String, RpcError>;
}

#[derive(Debug, Deserialize)]
struct RpcReply<T> {
    result: T,
}

pub struct HttpGameService {
    http: Client,
    root: Url,
}

impl HttpGameService {
    /// Resolves the `Game` entry on the bridge at `host:port`.
    ///
    /// Fails when the bridge is unreachable or does not serve the entry; the
    /// caller treats that as a transport initialization failure.
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, RpcError> {
        let root = Url::parse(&format!("http://{host}:{port}/"))?;
        let http = Client::builder().timeout(timeout).build()?;
        let service = Self { http, root };

        let entry = service.root.join(SERVICE_NAME)?;
        let res = service.http.get(entry.clone()).send().await?;
        match res.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(RpcError::ServiceNotFound(entry.to_string())),
            status => {
                return Err(RpcError::Status {
                    operation: "resolve",
                    status: status.as_u16(),
                })
            }
        }

        info!(endpoint = %entry, "transport: game service resolved");
        Ok(service)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        args: serde_json::Value,
    ) -> Result<T, RpcError> {
        let url = self.root.join(&format!("{SERVICE_NAME}/{operation}"))?;
        debug!(operation, "transport: calling game service");
        let res = self.http.post(url).json(&args).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(RpcError::Status {
                operation,
                status: status.as_u16(),
            });
        }
        let reply: RpcReply<T> = res.json().await?;
        Ok(reply.result)
    }

    async fn call_void(
        &self,
        operation: &'static str,
        args: serde_json::Value,
    ) -> Result<(), RpcError> {
        self.call::<Option<serde_json::Value>>(operation, args)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl GameService for HttpGameService {
    async fn login(&self, username: &str, password: &str) -> Result<String, RpcError> {
        self.call(
            "login",
            json!({ "username": username, "password": password }),
        )
        .await
    }

    async fn get_user_type(&self, username: &str) -> Result<String, RpcError> {
        self.call("getUserType", json!({ "username": username }))
            .await
    }

    async fn check_session_status(
        &self,
        username: &str,
        token: &str,
    ) -> Result<String, RpcError> {
        self.call(
            "checkSessionStatus",
            json!({ "username": username, "sessionToken": token }),
        )
        .await
    }

    async fn start_game(&self, username: &str) -> Result<Vec<String>, RpcError> {
        self.call("startGame", json!({ "username": username }))
            .await
    }

    async fn get_partial_word(&self, username: &str) -> Result<String, RpcError> {
        self.call("getPartialWord", json!({ "username": username }))
            .await
    }

    async fn guess_letter(&self, username: &str, guess: Guess) -> Result<bool, RpcError> {
        self.call(
            "guessLetter",
            json!({ "username": username, "letter": guess }),
        )
        .await
    }

    async fn quit_game(&self, username: &str) -> Result<(), RpcError> {
        self.call_void("quitGame", json!({ "username": username }))
            .await
    }

    async fn logout(&self, username: &str) -> Result<(), RpcError> {
        self.call_void("logout", json!({ "username": username }))
            .await
    }

    async fn get_leaderboard(&self) -> Result<String, RpcError> {
        self.call("getLeaderboard", json!({})).await
    }

    async fn get_game_config(&self) -> Result<String, RpcError> {
        self.call("getGameConfig", json!({})).await
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
