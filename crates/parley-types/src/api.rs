use serde::{Deserialize, Serialize};

use crate::models::{ConversationId, Identity, UserId};

// -- Profile --

#[derive(Debug, Clone, Serialize)]
pub struct UpdateProfileRequest {
    pub user_id: UserId,
    pub username: String,
    pub avatar_url: Option<String>,
    pub status: String,
}

// -- Conversations --

#[derive(Debug, Clone, Serialize)]
pub struct ResolveConversationRequest {
    pub user1_id: UserId,
    pub user2_id: UserId,
}

// -- Messages --

#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest {
    #[serde(rename = "chat_id")]
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub content: String,
    #[serde(rename = "photo_url", skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
}

// -- Presence --

#[derive(Debug, Clone, Serialize)]
pub struct PresenceRequest {
    #[serde(rename = "sessionId")]
    pub session_id: Identity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PresenceResponse {
    #[serde(rename = "onlineUsers")]
    pub online_users: u64,
}

/// Body the collaborator service returns alongside a non-success status.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
