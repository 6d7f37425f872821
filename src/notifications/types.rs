//! Notification type definitions

use serde::{Deserialize, Serialize};

/// Why a notification row was last touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationAction {
    Comment, // New comment in a subscribed topic
    Mention, // User was @named in a comment
}

impl NotificationAction {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Comment => "comment",
            Self::Mention => "mention",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "comment" => Some(Self::Comment),
            "mention" => Some(Self::Mention),
            _ => None,
        }
    }
}
