//! Tabletop Simulator editor bridge
//!
//! This crate provides:
//! - Envelope codec for the game's concatenated-JSON stream
//! - Script directory synchronization
//! - Dispatch of inbound messages
//! - TCP listener and per-connection tasks
//! - Command forwarding back into the game

pub mod bridge;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod forward;
pub mod server;
pub mod sync;
pub mod tcp;
pub mod transport;

pub use bridge::{Bridge, ListenerHandle};
pub use codec::{EnvelopeReader, FrameScanner, encode};
pub use config::BridgeConfig;
pub use dispatch::Dispatcher;
pub use forward::{CommandForwarder, Dialer};
pub use server::ConnectionManager;
pub use sync::{ApplyReport, ScriptSynchronizer};
pub use tcp::GameConnector;
pub use transport::{AsyncReader, AsyncWriter, connection_task};
