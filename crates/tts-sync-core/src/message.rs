//! Inbound messages (game -> editor)
//!
//! Wire format: `{"messageID": <int>, "scriptStates": [...]?, "message": <str>?}`.
//! The numeric tag is mapped onto [`MessageKind`] once, at decode time, so
//! nothing downstream ever sees a magic number.

use crate::error::{Result, SyncError};
use crate::script::ScriptState;
use serde::Deserialize;

/// Closed set of message types the game sends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    NewObject,
    LoadGame,
    Print,
    Error,
    Custom,
    Return,
    UserSaved,
    UserCreatedObject,
}

impl MessageKind {
    /// Map a wire tag to a kind
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            0 => Some(MessageKind::NewObject),
            1 => Some(MessageKind::LoadGame),
            2 => Some(MessageKind::Print),
            3 => Some(MessageKind::Error),
            4 => Some(MessageKind::Custom),
            5 => Some(MessageKind::Return),
            6 => Some(MessageKind::UserSaved),
            7 => Some(MessageKind::UserCreatedObject),
            _ => None,
        }
    }

    /// Wire tag
    pub fn id(self) -> i64 {
        match self {
            MessageKind::NewObject => 0,
            MessageKind::LoadGame => 1,
            MessageKind::Print => 2,
            MessageKind::Error => 3,
            MessageKind::Custom => 4,
            MessageKind::Return => 5,
            MessageKind::UserSaved => 6,
            MessageKind::UserCreatedObject => 7,
        }
    }
}

/// One decoded protocol message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    /// Incremental upsert of one or more objects
    NewObject { script_states: Vec<ScriptState> },
    /// Game (re)loaded; carries the full object set
    LoadGame { script_states: Vec<ScriptState> },
    Print { message: String },
    Error { message: String },
    Custom { message: String },
    Return { message: String },
    UserSaved,
    UserCreatedObject,
    /// Tag outside the known set; accepted but never acted on
    Unknown { message_id: i64 },
}

impl Envelope {
    /// Kind of this envelope, `None` for unknown tags
    pub fn kind(&self) -> Option<MessageKind> {
        match self {
            Envelope::NewObject { .. } => Some(MessageKind::NewObject),
            Envelope::LoadGame { .. } => Some(MessageKind::LoadGame),
            Envelope::Print { .. } => Some(MessageKind::Print),
            Envelope::Error { .. } => Some(MessageKind::Error),
            Envelope::Custom { .. } => Some(MessageKind::Custom),
            Envelope::Return { .. } => Some(MessageKind::Return),
            Envelope::UserSaved => Some(MessageKind::UserSaved),
            Envelope::UserCreatedObject => Some(MessageKind::UserCreatedObject),
            Envelope::Unknown { .. } => None,
        }
    }

    /// Decode one complete JSON value into an envelope.
    ///
    /// Fails with [`SyncError::Decode`] for syntax errors and for well-formed
    /// JSON that does not have the envelope shape.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let raw: RawEnvelope =
            serde_json::from_slice(bytes).map_err(|e| SyncError::Decode(e.to_string()))?;
        raw.into_envelope()
    }
}

/// Some producers send the tag as a string (`"0"`), most as a number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MessageId {
    Number(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "messageID")]
    message_id: MessageId,
    #[serde(rename = "scriptStates", default)]
    script_states: Option<Vec<ScriptState>>,
    #[serde(default)]
    message: Option<String>,
}

impl RawEnvelope {
    fn into_envelope(self) -> Result<Envelope> {
        let id = match self.message_id {
            MessageId::Number(id) => id,
            MessageId::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| SyncError::Decode(format!("non-numeric messageID {:?}", text)))?,
        };

        let Some(kind) = MessageKind::from_id(id) else {
            return Ok(Envelope::Unknown { message_id: id });
        };

        let script_states = self.script_states.unwrap_or_default();
        let message = self.message.unwrap_or_default();

        Ok(match kind {
            MessageKind::NewObject => Envelope::NewObject { script_states },
            MessageKind::LoadGame => Envelope::LoadGame { script_states },
            MessageKind::Print => Envelope::Print { message },
            MessageKind::Error => Envelope::Error { message },
            MessageKind::Custom => Envelope::Custom { message },
            MessageKind::Return => Envelope::Return { message },
            MessageKind::UserSaved => Envelope::UserSaved,
            MessageKind::UserCreatedObject => Envelope::UserCreatedObject,
        })
    }
}

/// A non-synchronizing message, published for observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameEvent {
    pub kind: MessageKind,
    /// Freeform text for print/error/custom/return messages
    pub message: Option<String>,
}
