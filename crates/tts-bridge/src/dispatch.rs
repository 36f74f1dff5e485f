//! Routes decoded envelopes to their handlers

use crate::sync::ScriptSynchronizer;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use tts_sync_core::{Envelope, GameEvent, MessageKind};

/// Maps each message kind to its handler.
///
/// Object and load messages drive the synchronizer. Everything else is
/// logged and published on a broadcast channel for whoever is listening.
pub struct Dispatcher {
    synchronizer: Arc<ScriptSynchronizer>,
    event_tx: broadcast::Sender<GameEvent>,
}

impl Dispatcher {
    pub fn new(synchronizer: Arc<ScriptSynchronizer>) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            synchronizer,
            event_tx,
        }
    }

    /// Subscribe to non-synchronizing game messages
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.event_tx.subscribe()
    }

    pub async fn dispatch(&self, envelope: Envelope) {
        match envelope {
            Envelope::NewObject { script_states } => {
                debug!("New object message with {} scripts", script_states.len());
                self.synchronizer.apply(&script_states).await;
            }
            Envelope::LoadGame { script_states } => {
                info!("Game loaded, resyncing {} scripts", script_states.len());
                self.synchronizer.load_game(&script_states).await;
            }
            Envelope::Print { message } => {
                info!("[TTS] {}", message);
                self.publish(MessageKind::Print, Some(message));
            }
            Envelope::Error { message } => {
                warn!("[TTS error] {}", message);
                self.publish(MessageKind::Error, Some(message));
            }
            Envelope::Custom { message } => {
                debug!("Custom message: {}", message);
                self.publish(MessageKind::Custom, Some(message));
            }
            Envelope::Return { message } => {
                debug!("Return value: {}", message);
                self.publish(MessageKind::Return, Some(message));
            }
            Envelope::UserSaved => {
                info!("Game saved");
                self.publish(MessageKind::UserSaved, None);
            }
            Envelope::UserCreatedObject => {
                info!("Object created in game");
                self.publish(MessageKind::UserCreatedObject, None);
            }
            Envelope::Unknown { message_id } => {
                debug!("Ignoring message with unknown id {}", message_id);
            }
        }
    }

    fn publish(&self, kind: MessageKind, message: Option<String>) {
        // No subscribers is fine
        let _ = self.event_tx.send(GameEvent { kind, message });
    }
}
