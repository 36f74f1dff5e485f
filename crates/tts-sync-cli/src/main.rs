//! tts-sync: script-sync bridge for Tabletop Simulator
//!
//! Listens for the game's messages and mirrors every object's scripts into a
//! local directory, and exposes a small HTTP API that relays commands back
//! into the game.

mod api;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use tts_bridge::config::{DEFAULT_GAME_PORT, DEFAULT_LISTEN_PORT, default_scripts_dir};
use tts_bridge::{Bridge, BridgeConfig};

#[derive(Debug, Parser)]
#[command(name = "tts-sync", version, about = "Tabletop Simulator script-sync bridge")]
struct Args {
    /// Host for all sockets
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to receive game messages on
    #[arg(long, default_value_t = DEFAULT_LISTEN_PORT)]
    listen_port: u16,

    /// Port the game accepts commands on
    #[arg(long, default_value_t = DEFAULT_GAME_PORT)]
    game_port: u16,

    /// Port for the command API
    #[arg(long, default_value_t = api::DEFAULT_API_PORT)]
    api_port: u16,

    /// Don't start the command API
    #[arg(long)]
    no_api: bool,

    /// Script directory (default: `scripts` next to the executable)
    #[arg(long, value_name = "DIR")]
    scripts_dir: Option<PathBuf>,

    /// Seconds to wait when dialing the game
    #[arg(long, default_value_t = 5)]
    connect_timeout_secs: u64,

    /// Close game connections silent for this many seconds
    #[arg(long)]
    idle_timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            host: self.host.clone(),
            listen_port: self.listen_port,
            game_port: self.game_port,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            idle_timeout: self.idle_timeout_secs.map(Duration::from_secs),
            scripts_dir: self.scripts_dir.clone().unwrap_or_else(default_scripts_dir),
        }
    }

    fn api_addr(&self) -> Option<String> {
        (!self.no_api).then(|| format!("{}:{}", self.host, self.api_port))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = args.bridge_config();
    info!("Starting tts-sync, scripts in {}", config.scripts_dir.display());

    let bridge = Bridge::new(config)
        .await
        .context("could not prepare the script directory")?;
    let mut listener = bridge
        .listen()
        .await
        .context("could not listen for game messages")?;

    let api_listener = match args.api_addr() {
        Some(addr) => Some(
            api::bind(&addr)
                .await
                .with_context(|| format!("could not start command API on {}", addr))?,
        ),
        None => None,
    };
    let forwarder = Arc::new(bridge.forwarder());
    let api_task = async move {
        match api_listener {
            Some(listener) => api::serve(listener, forwarder).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl-C, shutting down");
        }
        res = &mut listener.task => {
            error!("Listener stopped unexpectedly: {:?}", res);
            anyhow::bail!("listener stopped");
        }
        res = api_task => {
            res.context("command API failed")?;
        }
    }

    listener.task.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_protocol_ports() {
        let args = Args::try_parse_from(["tts-sync"]).unwrap();
        let config = args.bridge_config();

        assert_eq!(config.listen_addr(), "127.0.0.1:39998");
        assert_eq!(config.game_addr(), "127.0.0.1:39999");
        assert_eq!(args.api_addr().as_deref(), Some("127.0.0.1:39997"));
        assert!(config.idle_timeout.is_none());
    }

    #[test]
    fn test_overrides() {
        let args = Args::try_parse_from([
            "tts-sync",
            "--scripts-dir",
            "/tmp/tts",
            "--idle-timeout-secs",
            "30",
            "--no-api",
        ])
        .unwrap();
        let config = args.bridge_config();

        assert_eq!(config.scripts_dir, PathBuf::from("/tmp/tts"));
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(30)));
        assert_eq!(args.api_addr(), None);
    }
}
