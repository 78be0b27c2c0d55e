use std::collections::HashSet;

use parley_types::models::{ConversationId, Message, User, UserId};

/// Turns wholesale list replacements into "new lines since last time".
#[derive(Default)]
pub struct Transcript {
    conversation: Option<ConversationId>,
    shown: HashSet<String>,
}

impl Transcript {
    pub fn reset(&mut self, conversation: Option<ConversationId>) {
        self.conversation = conversation;
        self.shown.clear();
    }

    /// Messages in `messages` not printed yet for the current conversation.
    pub fn unseen<'a>(&mut self, messages: &'a [Message]) -> Vec<&'a Message> {
        messages
            .iter()
            .filter(|m| Some(&m.conversation_id) == self.conversation.as_ref())
            .filter(|m| self.shown.insert(m.id.clone()))
            .collect()
    }
}

pub fn user_line(user: &User) -> String {
    let status = if user.is_online() { "online" } else { "away" };
    format!("  [{}] {} ({})", user.id, user.display_name(), status)
}

pub fn message_line(message: &Message, me: Option<UserId>, partner: &str) -> String {
    let who = match me {
        Some(id) if message.is_from(id) => "you",
        _ => partner,
    };
    let time = message
        .created_at
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string());
    let attachment = if message.has_media() { " [attachment]" } else { "" };
    format!("{} {}: {}{}", time, who, message.content, attachment)
}
