use serde::{Deserialize, Serialize};

use crate::models::{GameType, Notification};

/// Events pushed over the WebSocket gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: String },

    /// A receiver finished one of the sender's games
    GameCompleted {
        game_id: String,
        game_type: GameType,
        claimed_reward_id: Option<String>,
        reward_name: Option<String>,
    },

    /// The sender's game list changed; clients should refetch it
    GamesChanged { owner_id: String },

    /// A new notification was stored for this user
    NotificationCreated { notification: Notification },

    /// Notifications were marked read or cleared
    NotificationsChanged { unread_count: usize },
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_adjacently_tagged() {
        let event = GatewayEvent::GamesChanged {
            owner_id: "u1".into(),
        };
        let text = serde_json::to_string(&event).unwrap();
        assert_eq!(text, r#"{"type":"GamesChanged","data":{"owner_id":"u1"}}"#);
    }

    #[test]
    fn identify_command_parses() {
        let cmd: GatewayCommand =
            serde_json::from_str(r#"{"type":"Identify","data":{"token":"abc"}}"#).unwrap();
        let GatewayCommand::Identify { token } = cmd;
        assert_eq!(token, "abc");
    }
}
