use serde::{Deserialize, Serialize};

use crate::models::{Conversation, ConversationId, Profile, UserId};

/// State changes published by the synchronizer for a view to render.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SyncEvent {
    /// The roster was replaced by a fresh fetch
    RosterUpdated { online: usize },

    /// Our own entry was found in the roster (or changed)
    ProfileResolved { profile: Profile },

    /// A conversation became the active selection
    ConversationOpened {
        conversation: Conversation,
        partner_id: UserId,
    },

    /// The active conversation was closed
    ConversationClosed { conversation_id: ConversationId },

    /// The visible message list was replaced
    MessagesUpdated {
        conversation_id: ConversationId,
        count: usize,
    },

    /// A message was acknowledged by the service
    MessageSent { conversation_id: ConversationId },

    /// A send was rejected; the draft was kept
    SendFailed { reason: String },
}

impl SyncEvent {
    /// Returns the conversation this event is scoped to, if any.
    pub fn conversation_id(&self) -> Option<&ConversationId> {
        match self {
            Self::ConversationOpened { conversation, .. } => Some(&conversation.id),
            Self::ConversationClosed { conversation_id } => Some(conversation_id),
            Self::MessagesUpdated { conversation_id, .. } => Some(conversation_id),
            Self::MessageSent { conversation_id } => Some(conversation_id),
            _ => None,
        }
    }
}
