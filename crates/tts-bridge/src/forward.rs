//! Command forwarding into the game

use crate::codec::encode;
use crate::sync::ScriptSynchronizer;
use crate::transport::AsyncWriter;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};
use tts_sync_core::{Operation, OutboundMessage, Result};

/// Source of outbound connections
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self) -> Result<Box<dyn AsyncWriter>>;
}

/// Relays commands to the game, one connection per command, no retries
pub struct CommandForwarder {
    dialer: Arc<dyn Dialer>,
    scripts: Option<Arc<ScriptSynchronizer>>,
}

impl CommandForwarder {
    pub fn new(dialer: Arc<dyn Dialer>) -> Self {
        Self {
            dialer,
            scripts: None,
        }
    }

    /// Attach the script directory so SEND_SCRIPT_DATA carries its contents
    pub fn with_scripts(mut self, scripts: Arc<ScriptSynchronizer>) -> Self {
        self.scripts = Some(scripts);
        self
    }

    /// Forward an operation id.
    ///
    /// SEND_SCRIPT_DATA is filled from the script directory when one is
    /// attached; every other id is sent as-is, known or not.
    pub async fn forward(&self, operation: i64) -> Result<()> {
        match (Operation::from_id(operation), &self.scripts) {
            (Some(Operation::SendScriptData), Some(_)) => self.push_scripts().await.map(|_| ()),
            _ => self.send(&OutboundMessage::operation(operation)).await,
        }
    }

    /// Send the script directory's contents to the game. Returns how many
    /// scripts were sent.
    pub async fn push_scripts(&self) -> Result<usize> {
        let states = match &self.scripts {
            Some(scripts) => scripts.collect().await?,
            None => Vec::new(),
        };
        let count = states.len();
        self.send(&OutboundMessage::send_scripts(states)).await?;
        info!("Pushed {} scripts to the game", count);
        Ok(count)
    }

    /// Encode and write one command
    pub async fn send(&self, msg: &OutboundMessage) -> Result<()> {
        let data = encode(msg)?;

        let json_preview: String = String::from_utf8_lossy(&data).chars().take(200).collect();
        debug!("[Editor→TTS] len={} json={}", data.len(), json_preview);

        let mut writer = self.dialer.dial().await?;
        writer.write_message(&data).await
    }
}
