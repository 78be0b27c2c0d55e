use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

/// Server-assigned numeric user id.
pub type UserId = i64;

/// Client-generated token naming a local profile before the server knows it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A roster entry as reported by the collaborator service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(rename = "session_id")]
    pub identity: Identity,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub status: Option<String>,
    pub last_seen: Option<NaiveDateTime>,
}

impl User {
    /// Name to show for this user; the server falls back to `User_<id>`.
    pub fn display_name(&self) -> String {
        match self.username.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => default_username(self.id),
        }
    }

    pub fn is_online(&self) -> bool {
        self.status.as_deref().unwrap_or("online") == "online"
    }
}

pub fn default_username(id: UserId) -> String {
    format!("User_{}", id)
}

/// The local user, learned by matching our identity against the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub name: String,
    pub avatar_url: Option<String>,
}

impl From<&User> for Profile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.username.clone().unwrap_or_default(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

/// Server-side pairing of two users. The pair is unordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub user1_id: String,
    pub user2_id: String,
    pub created_at: Option<NaiveDateTime>,
}

impl Conversation {
    pub fn involves(&self, user: UserId) -> bool {
        let user = user.to_string();
        self.user1_id == user || self.user2_id == user
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(rename = "chat_id")]
    pub conversation_id: ConversationId,
    pub sender_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    /// Self-contained `data:` URL when the message carries an attachment.
    #[serde(rename = "photo_url")]
    pub media: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_read: bool,
    pub created_at: Option<NaiveDateTime>,
}

impl Message {
    pub fn is_from(&self, user: UserId) -> bool {
        self.sender_id == user.to_string()
    }

    pub fn has_media(&self) -> bool {
        self.media.as_deref().is_some_and(|m| !m.is_empty())
    }

    /// Creation order, ties broken by id.
    pub fn chronological(&self, other: &Self) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Reads an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// True when `messages` is already in creation order.
pub fn is_chronological(messages: &[Message]) -> bool {
    messages
        .windows(2)
        .all(|pair| pair[0].chronological(&pair[1]) != Ordering::Greater)
}
