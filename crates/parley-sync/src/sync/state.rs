use tokio_util::sync::CancellationToken;

use parley_types::models::{Conversation, ConversationId, Message, Profile, User};

/// The conversation the view is focused on.
pub(crate) struct Selection {
    pub partner: User,
    /// Value of [`SyncState::epoch`] when this selection was made.
    pub epoch: u64,
    /// `None` while the conversation is still being resolved.
    pub conversation: Option<Conversation>,
    /// Cancels this selection's poller.
    pub token: Option<CancellationToken>,
}

#[derive(Default)]
pub(crate) struct SyncState {
    pub roster: Vec<User>,
    pub profile: Option<Profile>,
    pub selection: Option<Selection>,
    pub messages: Vec<Message>,
    pub draft: String,
    /// Bumped on every selection change.
    pub epoch: u64,
    pub roster_applied: u64,
    pub messages_applied: u64,
}

impl SyncState {
    pub fn active_conversation(&self) -> Option<&ConversationId> {
        self.selection.as_ref()?.conversation.as_ref().map(|c| &c.id)
    }

    /// Drop the current selection, cancelling its poller and clearing the
    /// visible messages. Returns the conversation that was open, if any.
    pub fn clear_selection(&mut self) -> Option<ConversationId> {
        self.epoch += 1;
        let selection = self.selection.take()?;
        if let Some(token) = selection.token {
            token.cancel();
        }
        self.messages.clear();
        selection.conversation.map(|c| c.id)
    }
}
