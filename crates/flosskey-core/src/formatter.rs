use serde::{Deserialize, Serialize};

use crate::models::{NotificationKind, RawEvent};

/// Language of the alert text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    #[serde(alias = "en")]
    English,
    #[serde(alias = "ja")]
    Japanese,
}

/// Maps a notification to the text of its alert
#[derive(Debug, Clone, Copy, Default)]
pub struct Formatter {
    locale: Locale,
}

impl Formatter {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Alert text for `event`, or `None` when its type is not shown
    pub fn format(&self, event: &RawEvent) -> Option<String> {
        let kind = event.kind();
        if let NotificationKind::Other(_) = kind {
            return None;
        }

        let actor = event.actor_name().unwrap_or(match self.locale {
            Locale::English => "Someone",
            Locale::Japanese => "誰か",
        });
        let reaction = event
            .reaction
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty());

        let text = match self.locale {
            Locale::English => match (kind, reaction) {
                (NotificationKind::Follow, _) => format!("{} followed you", actor),
                (NotificationKind::Mention, _) => format!("{} mentioned you", actor),
                (NotificationKind::Reply, _) => format!("{} replied to you", actor),
                (NotificationKind::Quote, _) => format!("{} quoted you", actor),
                (NotificationKind::Reaction, Some(r)) => format!("{} reacted with {}", actor, r),
                (NotificationKind::Reaction, None) => format!("{} reacted", actor),
                (NotificationKind::ReceiveFollowRequest, _) => {
                    format!("{} requested to follow you", actor)
                }
                (NotificationKind::AllowFollowRequest, _) => {
                    format!("{} accepted your follow request", actor)
                }
                (NotificationKind::Other(_), _) => return None,
            },
            Locale::Japanese => match (kind, reaction) {
                (NotificationKind::Follow, _) => format!("{}にフォローされました", actor),
                (NotificationKind::Mention, _) => format!("{}にメンションされました", actor),
                (NotificationKind::Reply, _) => format!("{}から返信がありました", actor),
                (NotificationKind::Quote, _) => format!("{}に引用されました", actor),
                (NotificationKind::Reaction, Some(r)) => format!("{}から{}されました", actor, r),
                (NotificationKind::Reaction, None) => format!("{}からリアクションされました", actor),
                (NotificationKind::ReceiveFollowRequest, _) => {
                    format!("{}からフォロー申請されました", actor)
                }
                (NotificationKind::AllowFollowRequest, _) => {
                    format!("{}へのフォローが許可されました", actor)
                }
                (NotificationKind::Other(_), _) => return None,
            },
        };

        Some(text)
    }
}
