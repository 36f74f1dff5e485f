//! TCP transport for the bridge
//!
//! The game listens for commands on its own port; each command gets a fresh
//! connection that is closed once the message is written.

use crate::forward::Dialer;
use crate::transport::{AsyncWriter, StreamWriter};
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;
use tts_sync_core::{Result, SyncError};

/// Dials the game's command port
#[derive(Debug, Clone)]
pub struct GameConnector {
    addr: String,
    connect_timeout: Duration,
}

impl GameConnector {
    pub fn new(addr: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Open a connection to the game
    pub async fn connect(&self) -> Result<TcpStream> {
        debug!("Dialing game at {}", self.addr);

        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| SyncError::Dial(format!("Connection timeout to {}", self.addr)))?
            .map_err(|e| SyncError::Dial(format!("Failed to connect to {}: {}", self.addr, e)))?;

        stream
            .set_nodelay(true)
            .map_err(|e| SyncError::Dial(format!("Failed to set TCP_NODELAY: {}", e)))?;

        Ok(stream)
    }
}

#[async_trait]
impl Dialer for GameConnector {
    async fn dial(&self) -> Result<Box<dyn AsyncWriter>> {
        let stream = self.connect().await?;
        Ok(Box::new(StreamWriter(stream)))
    }
}
