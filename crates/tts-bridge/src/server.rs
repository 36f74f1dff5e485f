//! Inbound connection management

use crate::codec::EnvelopeReader;
use crate::dispatch::Dispatcher;
use crate::transport::connection_task;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};
use tts_sync_core::{Result, SyncError};

/// Accepts game connections and runs one task per connection
#[derive(Clone)]
pub struct ConnectionManager {
    dispatcher: Arc<Dispatcher>,
    idle_timeout: Option<Duration>,
}

impl ConnectionManager {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            idle_timeout: None,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Bind the listener
    pub async fn listen(addr: &str) -> Result<TcpListener> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| SyncError::Bind(format!("Could not listen on {}: {}", addr, e)))?;
        if let Ok(local) = listener.local_addr() {
            info!("Listening for game messages on {}", local);
        }
        Ok(listener)
    }

    /// Run the accept loop on its own task
    pub fn spawn(self, listener: TcpListener) -> JoinHandle<()> {
        tokio::spawn(self.accept_loop(listener))
    }

    /// Accept forever. A failed accept is logged and the loop keeps going.
    pub async fn accept_loop(self, listener: TcpListener) {
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Could not accept connection: {}", e);
                    continue;
                }
            };

            info!("Started handling connection from {}", peer);
            let dispatcher = self.dispatcher.clone();
            let idle_timeout = self.idle_timeout;
            tokio::spawn(async move {
                let reader = EnvelopeReader::new(stream).with_idle_timeout(idle_timeout);
                let summary = connection_task(reader, dispatcher).await;
                info!(
                    "Finished connection from {} ({} messages, {} malformed)",
                    peer, summary.dispatched, summary.malformed
                );
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::ScriptSynchronizer;
    use tempfile::TempDir;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;
    use tts_sync_core::{GameEvent, MessageKind};

    async fn start() -> (TempDir, Arc<Dispatcher>, String) {
        let tmp = TempDir::new().unwrap();
        let sync = ScriptSynchronizer::create(tmp.path()).await.unwrap();
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(sync)));

        let listener = ConnectionManager::listen("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        ConnectionManager::new(dispatcher.clone()).spawn(listener);

        (tmp, dispatcher, addr)
    }

    #[tokio::test]
    async fn test_connections_are_independent() {
        let (tmp, dispatcher, addr) = start().await;
        let mut events = dispatcher.subscribe();

        // A broken connection that closes mid-message
        let mut broken = TcpStream::connect(&addr).await.unwrap();
        broken.write_all(br#"{"messageID":0,"scriptSt"#).await.unwrap();
        drop(broken);

        // A healthy connection opened afterwards still gets served
        let mut good = TcpStream::connect(&addr).await.unwrap();
        good.write_all(
            br#"{"messageID":0,"scriptStates":[{"name":"Card","guid":"abc123","script":"ok"}]}{"messageID":6}"#,
        )
        .await
        .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, GameEvent { kind: MessageKind::UserSaved, message: None });

        let lua = std::fs::read_to_string(tmp.path().join("Card_abc123.lua")).unwrap();
        assert_eq!(lua, "ok");
    }

    #[tokio::test]
    async fn test_listen_on_taken_port_fails() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap().to_string();

        let err = ConnectionManager::listen(&addr).await.unwrap_err();
        assert!(matches!(err, SyncError::Bind(_)));
    }
}
