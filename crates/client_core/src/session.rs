//! Login, logout and the background session monitor.
//!
//! [`SessionManager`] is the single owner of the [`Session`]. The foreground
//! reads it through [`SessionManager::snapshot`]; the monitor task is the
//! only other writer and announces what it did on the [`SessionEvent`]
//! channel.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use shared::{
    domain::UserRole,
    error::ProtocolError,
    protocol::{GameTakeover, LoginReply, SessionStatus},
};
use thiserror::Error;
use tokio::{
    sync::{broadcast, watch, Mutex, RwLock},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::transport::{GameService, RpcError};

pub const MONITOR_POLL_INTERVAL: Duration = Duration::from_secs(1);
const MONITOR_STOP_GRACE: Duration = Duration::from_millis(250);
const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub token: String,
    pub logged_in: bool,
    pub displaced: bool,
    pub displacement_reason: Option<String>,
}

impl Session {
    fn active(username: &str, token: String) -> Self {
        Self {
            username: username.to_string(),
            token,
            logged_in: true,
            displaced: false,
            displacement_reason: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Displaced { username: String, reason: String },
    LoggedOut { username: String },
    MonitorStopped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub session: Session,
    pub takeover: Option<GameTakeover>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("username and password cannot be empty")]
    MissingCredentials,
    #[error("already logged in as {0}")]
    AlreadyLoggedIn(String),
    #[error("login failed: {0}")]
    InvalidCredentials(String),
    #[error("{role} accounts cannot use the terminal client")]
    RoleNotPermitted { role: UserRole },
    #[error("malformed login response: {0}")]
    MalformedResponse(#[from] ProtocolError),
    #[error("transport error during login: {0}")]
    Transport(#[from] RpcError),
}

struct MonitorHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

pub struct SessionManager {
    service: Arc<dyn GameService>,
    state: Arc<RwLock<Session>>,
    monitor: Mutex<Option<MonitorHandle>>,
    events: broadcast::Sender<SessionEvent>,
    poll_interval: Duration,
    shut_down: AtomicBool,
}

impl SessionManager {
    pub fn new(service: Arc<dyn GameService>) -> Arc<Self> {
        Self::with_poll_interval(service, MONITOR_POLL_INTERVAL)
    }

    pub fn with_poll_interval(service: Arc<dyn GameService>, poll_interval: Duration) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            service,
            state: Arc::new(RwLock::new(Session::default())),
            monitor: Mutex::new(None),
            events,
            poll_interval,
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> Session {
        self.state.read().await.clone()
    }

    pub async fn is_active(&self) -> bool {
        let state = self.state.read().await;
        state.logged_in && !state.displaced
    }

    pub async fn is_displaced(&self) -> bool {
        self.state.read().await.displaced
    }

    pub async fn leaderboard(&self) -> Result<String, RpcError> {
        self.service.get_leaderboard().await
    }

    pub async fn username(&self) -> Option<String> {
        let state = self.state.read().await;
        state.logged_in.then(|| state.username.clone())
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let username = username.trim();
        let password = password.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        {
            let state = self.state.read().await;
            if state.logged_in {
                return Err(AuthError::AlreadyLoggedIn(state.username.clone()));
            }
        }

        let reply = self.service.login(username, password).await?;
        let (token, takeover) = match LoginReply::parse(&reply)? {
            LoginReply::Success { token, takeover } => (token, takeover),
            LoginReply::Failure { reason } => {
                info!(username, %reason, "session: login rejected by server");
                return Err(AuthError::InvalidCredentials(reason));
            }
        };

        let role = match self.service.get_user_type(username).await {
            Ok(raw) => UserRole::from_wire(&raw),
            Err(err) => {
                self.release_server_session(username).await;
                return Err(err.into());
            }
        };
        if !role.is_permitted() {
            warn!(username, %role, "session: role not permitted, releasing server session");
            self.release_server_session(username).await;
            return Err(AuthError::RoleNotPermitted { role });
        }

        let session = Session::active(username, token);
        *self.state.write().await = session.clone();
        self.start_monitor(&session).await;

        info!(
            username,
            takeover = takeover.is_some(),
            "session: login accepted"
        );
        Ok(LoginOutcome { session, takeover })
    }

    /// Ends the current session. Returns `Ok(false)` when there was nothing
    /// to end. Local state is cleared even if the server call fails.
    pub async fn logout(&self) -> Result<bool, RpcError> {
        self.stop_monitor().await;

        let username = {
            let mut state = self.state.write().await;
            if !state.logged_in {
                warn!("session: logout requested while not logged in");
                return Ok(false);
            }
            let username = std::mem::take(&mut state.username);
            *state = Session::default();
            username
        };

        let result = self.service.logout(&username).await;
        info!(username = %username, ok = result.is_ok(), "session: logged out");
        let _ = self.events.send(SessionEvent::LoggedOut { username });
        result.map(|()| true)
    }

    /// Stops the monitor and logs out. Only the first call does anything.
    pub async fn shutdown(&self) -> Result<bool, RpcError> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }
        self.stop_monitor().await;
        if !self.state.read().await.logged_in {
            return Ok(false);
        }
        self.logout().await
    }

    pub async fn start_monitor(&self, session: &Session) {
        self.stop_monitor().await;

        let (stop, stop_rx) = watch::channel(false);
        let monitor = SessionMonitor {
            service: Arc::clone(&self.service),
            state: Arc::clone(&self.state),
            events: self.events.clone(),
            username: session.username.clone(),
            token: session.token.clone(),
            poll_interval: self.poll_interval,
        };
        let task = tokio::spawn(monitor.run(stop_rx));
        *self.monitor.lock().await = Some(MonitorHandle { stop, task });
    }

    /// Cancels the monitor. Once this returns no new status poll is issued;
    /// a poll already in flight gets a short grace period before it is
    /// dropped.
    pub async fn stop_monitor(&self) {
        let Some(handle) = self.monitor.lock().await.take() else {
            return;
        };
        handle.stop.send_replace(true);

        let mut task = handle.task;
        if tokio::time::timeout(MONITOR_STOP_GRACE, &mut task)
            .await
            .is_err()
        {
            task.abort();
        }
        debug!("session: monitor stopped");
    }

    async fn release_server_session(&self, username: &str) {
        if let Err(err) = self.service.logout(username).await {
            warn!(username, error = %err, "session: failed to release server session");
        }
    }
}

struct SessionMonitor {
    service: Arc<dyn GameService>,
    state: Arc<RwLock<Session>>,
    events: broadcast::Sender<SessionEvent>,
    username: String,
    token: String,
    poll_interval: Duration,
}

impl SessionMonitor {
    async fn run(self, mut stop: watch::Receiver<bool>) {
        debug!(username = %self.username, "session: monitor started");
        loop {
            if *stop.borrow() {
                break;
            }

            let reply = match self
                .service
                .check_session_status(&self.username, &self.token)
                .await
            {
                Ok(reply) => reply,
                Err(err) => {
                    warn!(
                        username = %self.username,
                        error = %err,
                        "session: monitor stopped after transport error"
                    );
                    let _ = self.events.send(SessionEvent::MonitorStopped {
                        reason: err.to_string(),
                    });
                    break;
                }
            };
            if *stop.borrow() {
                break;
            }

            let status = SessionStatus::parse(&reply);
            if let Some(reason) = status.eviction_reason() {
                if self.evict(reason).await {
                    let _ = self.events.send(SessionEvent::Displaced {
                        username: self.username.clone(),
                        reason: reason.to_string(),
                    });
                }
                break;
            }
            if let SessionStatus::Unrecognized(raw) = &status {
                debug!(username = %self.username, status = %raw, "session: unrecognized status");
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
    }

    /// Marks the session displaced if it is still the one being monitored.
    async fn evict(&self, reason: &str) -> bool {
        let mut state = self.state.write().await;
        if !state.logged_in || state.token != self.token {
            return false;
        }
        state.displaced = true;
        state.logged_in = false;
        state.token.clear();
        state.username.clear();
        state.displacement_reason = Some(reason.to_string());
        warn!(username = %self.username, %reason, "session: displaced by server");
        true
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
