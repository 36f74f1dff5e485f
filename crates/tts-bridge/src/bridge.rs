//! Bridge between Tabletop Simulator and an external editor

use crate::config::BridgeConfig;
use crate::dispatch::Dispatcher;
use crate::forward::CommandForwarder;
use crate::server::ConnectionManager;
use crate::sync::ScriptSynchronizer;
use crate::tcp::GameConnector;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;
use tts_sync_core::{GameEvent, Result, SyncError};

/// Wires the synchronizer, dispatcher and connection manager together
pub struct Bridge {
    config: BridgeConfig,
    synchronizer: Arc<ScriptSynchronizer>,
    dispatcher: Arc<Dispatcher>,
}

/// A running listener
pub struct ListenerHandle {
    pub local_addr: SocketAddr,
    pub task: JoinHandle<()>,
}

impl Bridge {
    /// Prepare the script directory. Fails if it cannot be created.
    pub async fn new(config: BridgeConfig) -> Result<Self> {
        let synchronizer = Arc::new(ScriptSynchronizer::create(&config.scripts_dir).await?);
        let dispatcher = Arc::new(Dispatcher::new(synchronizer.clone()));

        Ok(Self {
            config,
            synchronizer,
            dispatcher,
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn synchronizer(&self) -> Arc<ScriptSynchronizer> {
        self.synchronizer.clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<GameEvent> {
        self.dispatcher.subscribe()
    }

    /// Bind the inbound port and start accepting. Fails if the port is taken.
    pub async fn listen(&self) -> Result<ListenerHandle> {
        let listener = ConnectionManager::listen(&self.config.listen_addr()).await?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| SyncError::Bind(format!("Listener has no address: {}", e)))?;

        let task = ConnectionManager::new(self.dispatcher.clone())
            .with_idle_timeout(self.config.idle_timeout)
            .spawn(listener);

        Ok(ListenerHandle { local_addr, task })
    }

    /// Forwarder for commands into the game
    pub fn forwarder(&self) -> CommandForwarder {
        let connector = GameConnector::new(self.config.game_addr(), self.config.connect_timeout);
        info!("Commands will be sent to {}", connector.addr());
        CommandForwarder::new(Arc::new(connector)).with_scripts(self.synchronizer.clone())
    }
}
