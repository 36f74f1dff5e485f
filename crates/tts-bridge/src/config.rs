//! Bridge configuration

use std::path::PathBuf;
use std::time::Duration;

/// Port the bridge listens on for game messages
pub const DEFAULT_LISTEN_PORT: u16 = 39998;

/// Port the game listens on for editor commands
pub const DEFAULT_GAME_PORT: u16 = 39999;

/// Configuration for the bridge
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Host for both sockets (default: 127.0.0.1)
    pub host: String,
    /// Inbound listener port (default: 39998)
    pub listen_port: u16,
    /// Game command port (default: 39999)
    pub game_port: u16,
    /// Outbound connect timeout
    pub connect_timeout: Duration,
    /// Close inbound connections silent for this long; `None` waits forever
    pub idle_timeout: Option<Duration>,
    /// Where scripts are mirrored
    pub scripts_dir: PathBuf,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            listen_port: DEFAULT_LISTEN_PORT,
            game_port: DEFAULT_GAME_PORT,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None,
            scripts_dir: default_scripts_dir(),
        }
    }
}

impl BridgeConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.listen_port)
    }

    pub fn game_addr(&self) -> String {
        format!("{}:{}", self.host, self.game_port)
    }
}

/// `scripts` next to the running executable, or in the working directory if
/// the executable path is unavailable
pub fn default_scripts_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("scripts")))
        .unwrap_or_else(|| PathBuf::from("scripts"))
}
