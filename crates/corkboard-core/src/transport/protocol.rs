//! Messages exchanged with the relay server.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::presence::{PresenceMeta, PresenceState};

/// Messages sent to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join a board channel
    Join { board: String },
    /// Leave the current board channel
    Leave,
    /// Fan an event out to the other members
    Broadcast { event: String, payload: Value },
    /// Announce presence metadata
    Track { meta: PresenceMeta },
    /// Withdraw presence metadata
    Untrack,
}

/// Messages received from the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms a join, with the registry at that moment
    Joined {
        board: String,
        client_id: String,
        presence: PresenceState,
    },
    /// An event broadcast by another member
    Broadcast {
        from: String,
        event: String,
        payload: Value,
    },
    /// A member tracked presence
    PresenceJoin { key: String, metas: Vec<PresenceMeta> },
    /// A member untracked or disconnected
    PresenceLeave { key: String, metas: Vec<PresenceMeta> },
    /// Full registry after any presence change
    PresenceState { state: PresenceState },
    /// Error message
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_serialize() {
        let msg = ClientMessage::Join {
            board: "b1".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"join\""));
        assert!(json.contains("\"board\":\"b1\""));

        let msg = ClientMessage::Track {
            meta: PresenceMeta::new("u1", "Ada"),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["meta"]["displayName"], "Ada");
    }

    #[test]
    fn test_server_message_deserialize() {
        let json = r#"{"type":"broadcast","from":"c2","event":"objects","payload":{"kind":"ops","ops":[]}}"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        match msg {
            ServerMessage::Broadcast { from, event, payload } => {
                assert_eq!(from, "c2");
                assert_eq!(event, "objects");
                assert_eq!(payload["kind"], "ops");
            }
            _ => panic!("Wrong message type"),
        }

        let json = r#"{"type":"presence_state","state":{"c1":[{"userId":"u1","displayName":"Ada"}]}}"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ServerMessage::PresenceState { state } if state["c1"].len() == 1));
    }
}
