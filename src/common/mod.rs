pub mod errors;

use serde::{Deserialize, Serialize};

pub const NOTIFICATION_TITLE: &str = "Duo Challenge Invite";
pub const INVITE_NOTIFICATION_TYPE: &str = "duo_challenge_invite";

const INVITER_NAME_DEFAULT: &str = "Someone";

/// A pending challenge request, read from the invites collection. Created
/// by an external writer; this service only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invite {
    pub to_user_id: String,
    pub from_user_id: String,
}

/// The slice of a user record this service consumes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub fcm_token: Option<String>,
    pub username: Option<String>,
    pub display_name: Option<String>,
}

impl UserProfile {
    /// Device push token, if one is registered. Empty strings count as
    /// unregistered.
    pub fn device_token(&self) -> Option<&str> {
        self.fcm_token.as_deref().filter(|token| !token.is_empty())
    }

    /// Human-readable name: `username` over `displayName`, with a
    /// placeholder when neither is set.
    pub fn preferred_name(&self) -> &str {
        self.username
            .as_deref()
            .filter(|name| !name.is_empty())
            .or_else(|| self.display_name.as_deref().filter(|name| !name.is_empty()))
            .unwrap_or(INVITER_NAME_DEFAULT)
    }
}

/// Notification sent to the invitee's device. Built per dispatch, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    pub notification: Notification,
    pub data: InviteData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// Opaque strings for client-side routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteData {
    #[serde(rename = "type")]
    pub kind: String,
    pub inviter_username: String,
    pub invite_id: String,
}

impl NotificationPayload {
    pub fn duo_challenge_invite(inviter_username: &str, invite_id: &str) -> Self {
        Self {
            notification: Notification {
                title: NOTIFICATION_TITLE.into(),
                body: format!("{} is inviting you to a Duo Challenge!", inviter_username),
            },
            data: InviteData {
                kind: INVITE_NOTIFICATION_TYPE.into(),
                inviter_username: inviter_username.into(),
                invite_id: invite_id.into(),
            },
        }
    }
}
