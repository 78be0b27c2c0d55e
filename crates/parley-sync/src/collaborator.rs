use std::future::Future;
use std::sync::Arc;

use parley_types::api::{SendMessageRequest, UpdateProfileRequest};
use parley_types::models::{Conversation, ConversationId, Identity, Message, User, UserId};

use crate::error::Result;

/// The external service the synchronizer polls. Every call is a single
/// request/response round trip; the service owns ordering and idempotency.
pub trait Collaborator: Send + Sync + 'static {
    /// Currently online users, in the service's preferred order.
    fn online_users(&self) -> impl Future<Output = Result<Vec<User>>> + Send;

    /// The conversation's messages in creation order.
    fn messages(
        &self,
        conversation: &ConversationId,
    ) -> impl Future<Output = Result<Vec<Message>>> + Send;

    fn update_profile(
        &self,
        request: UpdateProfileRequest,
    ) -> impl Future<Output = Result<User>> + Send;

    /// Get-or-create the conversation for the unordered pair `(a, b)`.
    fn resolve_conversation(
        &self,
        a: UserId,
        b: UserId,
    ) -> impl Future<Output = Result<Conversation>> + Send;

    fn send_message(&self, request: SendMessageRequest) -> impl Future<Output = Result<()>> + Send;

    /// Register the identity as present. Returns the online count when the
    /// service reports one, `None` when presence is not supported.
    fn announce_presence(
        &self,
        _identity: &Identity,
    ) -> impl Future<Output = Result<Option<u64>>> + Send {
        async { Ok(None) }
    }
}

impl<C: Collaborator> Collaborator for Arc<C> {
    fn online_users(&self) -> impl Future<Output = Result<Vec<User>>> + Send {
        (**self).online_users()
    }

    fn messages(
        &self,
        conversation: &ConversationId,
    ) -> impl Future<Output = Result<Vec<Message>>> + Send {
        (**self).messages(conversation)
    }

    fn update_profile(
        &self,
        request: UpdateProfileRequest,
    ) -> impl Future<Output = Result<User>> + Send {
        (**self).update_profile(request)
    }

    fn resolve_conversation(
        &self,
        a: UserId,
        b: UserId,
    ) -> impl Future<Output = Result<Conversation>> + Send {
        (**self).resolve_conversation(a, b)
    }

    fn send_message(&self, request: SendMessageRequest) -> impl Future<Output = Result<()>> + Send {
        (**self).send_message(request)
    }

    fn announce_presence(
        &self,
        identity: &Identity,
    ) -> impl Future<Output = Result<Option<u64>>> + Send {
        (**self).announce_presence(identity)
    }
}
