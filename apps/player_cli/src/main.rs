mod config;
mod menu;
mod stdio;

use std::{future::Future, io, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{GameService, HttpGameService, SessionManager};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::{config::load_settings, menu::Menu, stdio::StdioTerminal};

#[derive(Parser, Debug)]
#[command(name = "player_cli", about = "Terminal player client for What's The Word")]
struct Args {
    /// Game service host; overrides settings file and environment.
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = load_settings();
    if let Some(host) = args.host {
        settings.rpc_host = host;
    }
    if let Some(port) = args.port {
        settings.rpc_port = port;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let service = HttpGameService::connect(
        &settings.rpc_host,
        settings.rpc_port,
        Duration::from_secs(settings.request_timeout_seconds),
    )
    .await
    .with_context(|| {
        format!(
            "failed to initialize game service transport at {}:{}",
            settings.rpc_host, settings.rpc_port
        )
    })?;
    info!(host = %settings.rpc_host, port = settings.rpc_port, "client: connected to game service");
    println!("Successfully connected to game service!");

    let service: Arc<dyn GameService> = Arc::new(service);
    let sessions = SessionManager::new(Arc::clone(&service));
    let terminal =
        StdioTerminal::spawn().context("failed to start reading from the terminal")?;
    let mut menu = Menu::new(service, Arc::clone(&sessions), terminal);

    run_until_interrupted(menu.run(), tokio::signal::ctrl_c(), &sessions).await;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    MenuFinished,
    Interrupted,
}

/// Drives the menu until it returns or `interrupt` fires, then releases the
/// session exactly once. A prompt still waiting on stdin is abandoned.
async fn run_until_interrupted(
    menu: impl Future<Output = Result<()>>,
    interrupt: impl Future<Output = io::Result<()>>,
    sessions: &SessionManager,
) -> Stop {
    let stop = tokio::select! {
        result = menu => {
            if let Err(err) = result {
                error!(error = %err, "client: menu stopped");
                println!("Unexpected error: {err}");
            }
            Stop::MenuFinished
        }
        signal = interrupt => {
            match signal {
                Ok(()) => println!("\nReceived interrupt signal, logging out..."),
                Err(err) => error!(error = %err, "client: failed to listen for interrupt"),
            }
            Stop::Interrupted
        }
    };

    match sessions.shutdown().await {
        Ok(true) => println!("Logged out."),
        Ok(false) => {}
        Err(err) => println!("Error during logout: {err}"),
    }
    info!(?stop, "client: shut down");
    stop
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
