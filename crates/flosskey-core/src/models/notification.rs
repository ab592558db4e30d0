use serde::{Deserialize, Serialize};

/// Notification types the formatter knows how to render.
///
/// Anything else the server sends lands in `Other` and is never shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationKind {
    Follow,
    Mention,
    Reply,
    Quote,
    Reaction,
    ReceiveFollowRequest,
    AllowFollowRequest,
    Other(String),
}

impl NotificationKind {
    pub fn from_type(value: &str) -> Self {
        match value {
            "follow" => NotificationKind::Follow,
            "mention" => NotificationKind::Mention,
            "reply" => NotificationKind::Reply,
            "quote" => NotificationKind::Quote,
            "reaction" => NotificationKind::Reaction,
            "receiveFollowRequest" => NotificationKind::ReceiveFollowRequest,
            "allowFollowRequest" => NotificationKind::AllowFollowRequest,
            other => NotificationKind::Other(other.to_string()),
        }
    }
}

/// The notification author as returned by the API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUser {
    /// Display name; `null` for users who never set one
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// One entry of the notifications page, kept as close to the wire as possible.
///
/// `created_at` stays a string until deduplication so a single bad timestamp
/// fails the cycle instead of the whole response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub created_at: String,
    #[serde(default)]
    pub user: Option<RawUser>,
    #[serde(default)]
    pub reaction: Option<String>,
}

impl RawEvent {
    pub fn kind(&self) -> NotificationKind {
        NotificationKind::from_type(&self.event_type)
    }

    /// Display name of the actor, falling back to the username
    pub fn actor_name(&self) -> Option<&str> {
        let user = self.user.as_ref()?;
        user.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| user.username.as_deref().filter(|n| !n.trim().is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_reaction_event() {
        let json = r#"{
            "id": "9abc",
            "type": "reaction",
            "createdAt": "2024-01-02T00:00:00.000Z",
            "user": {"name": "Bob", "username": "bob"},
            "reaction": "👍"
        }"#;
        let event: RawEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind(), NotificationKind::Reaction);
        assert_eq!(event.created_at, "2024-01-02T00:00:00.000Z");
        assert_eq!(event.actor_name(), Some("Bob"));
        assert_eq!(event.reaction.as_deref(), Some("👍"));
    }

    #[test]
    fn test_unknown_type_maps_to_other() {
        assert_eq!(
            NotificationKind::from_type("achievementEarned"),
            NotificationKind::Other("achievementEarned".to_string())
        );
    }

    #[test]
    fn test_actor_name_falls_back_to_username() {
        let json = r#"{"type":"follow","createdAt":"2024-01-02T00:00:00Z","user":{"name":null,"username":"alice"}}"#;
        let event: RawEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.actor_name(), Some("alice"));
    }

    #[test]
    fn test_actor_name_missing_user() {
        let json = r#"{"type":"app","createdAt":"2024-01-02T00:00:00Z"}"#;
        let event: RawEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.actor_name(), None);
    }
}
