//! Transport abstractions for the bridge
//!
//! Provides AsyncReader/AsyncWriter traits and the per-connection task that
//! drains a reader into the dispatcher.

use crate::dispatch::Dispatcher;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};
use tts_sync_core::{Envelope, Result, SyncError};

/// Trait for async reading of envelopes from a transport
#[async_trait]
pub trait AsyncReader: Send {
    /// Read the next envelope.
    ///
    /// [`SyncError::ConnectionClosed`] signals a normal close and
    /// [`SyncError::Decode`] a skipped message. [`SyncError::Idle`] ends the
    /// connection.
    async fn read_envelope(&mut self) -> Result<Envelope>;
}

/// Trait for async writing to a transport
#[async_trait]
pub trait AsyncWriter: Send + Sync {
    /// Write one encoded message and flush it
    async fn write_message(&mut self, data: &[u8]) -> Result<()>;
}

/// Writer over any byte stream; messages are written raw, unframed
pub struct StreamWriter<W>(pub W);

#[async_trait]
impl<W: AsyncWrite + Unpin + Send + Sync> AsyncWriter for StreamWriter<W> {
    async fn write_message(&mut self, data: &[u8]) -> Result<()> {
        self.0
            .write_all(data)
            .await
            .map_err(|e| SyncError::Write(format!("write failed: {}", e)))?;

        self.0
            .flush()
            .await
            .map_err(|e| SyncError::Write(format!("flush failed: {}", e)))?;

        Ok(())
    }
}

/// What happened on a connection before it ended
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSummary {
    /// Envelopes handed to the dispatcher
    pub dispatched: usize,
    /// Malformed messages skipped
    pub malformed: usize,
}

/// Per-connection task
///
/// This task:
/// - Reads envelopes in arrival order and dispatches each before reading the next
/// - Skips malformed messages without closing the connection
/// - Ends on peer close, read failure, or the reader's idle timeout
pub async fn connection_task<R: AsyncReader>(
    mut reader: R,
    dispatcher: Arc<Dispatcher>,
) -> ConnectionSummary {
    let mut summary = ConnectionSummary::default();

    loop {
        match reader.read_envelope().await {
            Ok(envelope) => {
                dispatcher.dispatch(envelope).await;
                summary.dispatched += 1;
            }
            Err(SyncError::ConnectionClosed) => {
                info!("Connection closed by peer");
                break;
            }
            Err(SyncError::Idle(limit)) => {
                warn!("Connection idle for {:?}, closing", limit);
                break;
            }
            Err(e) if e.is_recoverable() => {
                warn!("Skipping malformed message: {}", e);
                summary.malformed += 1;
            }
            Err(e) => {
                error!("Connection failed: {}", e);
                break;
            }
        }
    }

    debug!(
        "Connection task exiting: {} dispatched, {} malformed",
        summary.dispatched, summary.malformed
    );
    summary
}
