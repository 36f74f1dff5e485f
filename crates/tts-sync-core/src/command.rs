//! Outbound commands (editor -> game)

use crate::script::ScriptState;
use serde::{Deserialize, Serialize};

/// Known operations the game accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Ask the game to push every object's scripts
    GetAll,
    /// Push edited scripts into the game
    SendScriptData,
    SendCustomMessage,
    ExecLuaCode,
}

impl Operation {
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            0 => Some(Operation::GetAll),
            1 => Some(Operation::SendScriptData),
            2 => Some(Operation::SendCustomMessage),
            3 => Some(Operation::ExecLuaCode),
            _ => None,
        }
    }

    pub fn id(self) -> i64 {
        match self {
            Operation::GetAll => 0,
            Operation::SendScriptData => 1,
            Operation::SendCustomMessage => 2,
            Operation::ExecLuaCode => 3,
        }
    }
}

/// Command envelope sent to the game.
///
/// Only the fields relevant to a command are emitted; unset optional fields
/// are left out rather than written as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    #[serde(rename = "messageID")]
    pub message_id: i64,
    #[serde(rename = "scriptStates", default, skip_serializing_if = "Option::is_none")]
    pub script_states: Option<Vec<ScriptState>>,
    #[serde(rename = "customMessage", default, skip_serializing_if = "Option::is_none")]
    pub custom_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

impl OutboundMessage {
    /// Bare command carrying only the operation id, forwarded verbatim
    pub fn operation(message_id: i64) -> Self {
        Self {
            message_id,
            script_states: None,
            custom_message: None,
            guid: None,
            script: None,
        }
    }

    pub fn get_all() -> Self {
        Self::operation(Operation::GetAll.id())
    }

    pub fn send_scripts(script_states: Vec<ScriptState>) -> Self {
        Self {
            script_states: Some(script_states),
            ..Self::operation(Operation::SendScriptData.id())
        }
    }

    pub fn custom_message(message: impl Into<String>) -> Self {
        Self {
            custom_message: Some(message.into()),
            ..Self::operation(Operation::SendCustomMessage.id())
        }
    }

    /// Run `script` on the object `guid` (`"-1"` is the global script)
    pub fn exec_lua(guid: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            guid: Some(guid.into()),
            script: Some(script.into()),
            ..Self::operation(Operation::ExecLuaCode.id())
        }
    }

    /// Known operation, if the id is one
    pub fn known_operation(&self) -> Option<Operation> {
        Operation::from_id(self.message_id)
    }
}

impl From<Operation> for OutboundMessage {
    fn from(op: Operation) -> Self {
        Self::operation(op.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_operation_is_minimal() {
        let json = serde_json::to_string(&OutboundMessage::get_all()).unwrap();
        assert_eq!(json, r#"{"messageID":0}"#);
    }

    #[test]
    fn test_unknown_operation_is_forwarded_verbatim() {
        let msg = OutboundMessage::operation(42);
        assert_eq!(msg.known_operation(), None);
        assert_eq!(serde_json::to_string(&msg).unwrap(), r#"{"messageID":42}"#);
    }

    #[test]
    fn test_exec_lua_format() {
        let json = serde_json::to_string(&OutboundMessage::exec_lua("-1", "print('x')")).unwrap();
        assert!(json.contains("\"messageID\":3"));
        assert!(json.contains("\"guid\":\"-1\""));
        assert!(json.contains("\"script\":\"print('x')\""));
        assert!(!json.contains("null"), "{}", json);
        assert!(!json.contains("scriptStates"));
    }

    #[test]
    fn test_send_scripts_format() {
        let msg = OutboundMessage::send_scripts(vec![ScriptState::new("Card", "abc123", "x = 1")]);
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            json,
            r#"{"messageID":1,"scriptStates":[{"name":"Card","guid":"abc123","script":"x = 1"}]}"#
        );
    }
}
