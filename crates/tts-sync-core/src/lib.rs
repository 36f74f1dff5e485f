//! # tts-sync-core
//!
//! Core types for the Tabletop Simulator script-sync protocol.
//!
//! This crate provides the types shared by the bridge and its front ends:
//! - Script states and their filesystem naming
//! - Inbound envelopes and the closed set of message kinds
//! - Outbound command envelopes
//! - Error types

pub mod command;
pub mod error;
pub mod message;
pub mod script;

pub use command::{Operation, OutboundMessage};
pub use error::{Result, SyncError};
pub use message::{Envelope, GameEvent, MessageKind};
pub use script::{SCRIPT_EXTENSION, ScriptState, UI_EXTENSION, base_name, split_base_name};
