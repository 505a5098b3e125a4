use std::fs;

use serde::Deserialize;
use tracing::warn;

const CONFIG_FILE: &str = "player_client.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub rpc_host: String,
    pub rpc_port: u16,
    pub request_timeout_seconds: u64,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rpc_host: "localhost".into(),
            rpc_port: 1050,
            request_timeout_seconds: 10,
            log_filter: "warn".into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    rpc_host: Option<String>,
    rpc_port: Option<u16>,
    request_timeout_seconds: Option<u64>,
    log_filter: Option<String>,
}

/// Defaults, then `player_client.toml`, then environment variables.
/// Command line flags are applied by the caller on top.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    let path = std::env::var("PLAYER_CLIENT_CONFIG").unwrap_or_else(|_| CONFIG_FILE.into());
    if let Ok(raw) = fs::read_to_string(&path) {
        apply_file(&mut settings, &raw);
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<FileSettings>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(err) => {
            warn!(error = %err, "config: ignoring unreadable settings file");
            return;
        }
    };

    if let Some(v) = file_cfg.rpc_host {
        settings.rpc_host = v;
    }
    if let Some(v) = file_cfg.rpc_port {
        settings.rpc_port = v;
    }
    if let Some(v) = file_cfg.request_timeout_seconds {
        settings.request_timeout_seconds = v;
    }
    if let Some(v) = file_cfg.log_filter {
        settings.log_filter = v;
    }
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("GAME_RPC_HOST") {
        settings.rpc_host = v;
    }
    if let Some(v) = lookup("APP__RPC_HOST") {
        settings.rpc_host = v;
    }

    for key in ["GAME_RPC_PORT", "APP__RPC_PORT"] {
        if let Some(v) = lookup(key) {
            match v.parse::<u16>() {
                Ok(port) => settings.rpc_port = port,
                Err(_) => warn!(key, value = %v, "config: ignoring invalid port"),
            }
        }
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECONDS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_seconds = parsed;
        }
    }

    if let Some(v) = lookup("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
}
