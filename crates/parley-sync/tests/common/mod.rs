//! In-memory collaborator used to drive the synchronizer in tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDateTime;

use parley_sync::{Collaborator, Result, SyncError};
use parley_types::api::{SendMessageRequest, UpdateProfileRequest};
use parley_types::models::{Conversation, ConversationId, Identity, Message, User, UserId};

pub fn user(id: UserId, identity: &str, name: &str) -> User {
    User {
        id,
        identity: identity.into(),
        username: Some(name.to_string()),
        avatar_url: None,
        status: Some("online".to_string()),
        last_seen: None,
    }
}

#[derive(Default)]
struct FakeState {
    roster: Vec<User>,
    conversations: Vec<Conversation>,
    logs: HashMap<ConversationId, Vec<Message>>,
    message_fetches: HashMap<ConversationId, usize>,
    roster_fetches: usize,
    resolutions: usize,
    fail_roster: bool,
    fail_sends: bool,
    fail_resolutions: bool,
    fail_presence: bool,
    delays: VecDeque<Duration>,
    resolution_delays: VecDeque<Duration>,
    calls: Vec<&'static str>,
    next_message: i64,
}

/// Append-only logs, idempotent conversation pairing and call counters.
#[derive(Default)]
pub struct FakeCollaborator {
    state: Mutex<FakeState>,
}

impl FakeCollaborator {
    pub fn with_roster(roster: Vec<User>) -> Arc<Self> {
        let fake = Self::default();
        fake.state.lock().unwrap().roster = roster;
        Arc::new(fake)
    }

    pub fn set_roster(&self, roster: Vec<User>) {
        self.state.lock().unwrap().roster = roster;
    }

    pub fn fail_roster(&self, fail: bool) {
        self.state.lock().unwrap().fail_roster = fail;
    }

    pub fn fail_sends(&self, fail: bool) {
        self.state.lock().unwrap().fail_sends = fail;
    }

    pub fn fail_resolutions(&self, fail: bool) {
        self.state.lock().unwrap().fail_resolutions = fail;
    }

    pub fn fail_presence(&self, fail: bool) {
        self.state.lock().unwrap().fail_presence = fail;
    }

    /// Delay the next conversation resolution. Delays queue up like fetch delays.
    pub fn delay_next_resolution(&self, delay: Duration) {
        self.state.lock().unwrap().resolution_delays.push_back(delay);
    }

    /// Presence and roster calls in the order they arrived.
    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Delay the next message fetch. Delays queue up, one per fetch.
    pub fn delay_next_fetch(&self, delay: Duration) {
        self.state.lock().unwrap().delays.push_back(delay);
    }

    pub fn message_fetches(&self, conversation: &ConversationId) -> usize {
        let state = self.state.lock().unwrap();
        state.message_fetches.get(conversation).copied().unwrap_or(0)
    }

    pub fn roster_fetches(&self) -> usize {
        self.state.lock().unwrap().roster_fetches
    }

    pub fn resolutions(&self) -> usize {
        self.state.lock().unwrap().resolutions
    }

    pub fn log(&self, conversation: &ConversationId) -> Vec<Message> {
        let state = self.state.lock().unwrap();
        state.logs.get(conversation).cloned().unwrap_or_default()
    }

    /// Append a message as if another client had sent it.
    pub fn append(&self, conversation: &ConversationId, sender: UserId, content: &str) {
        let mut state = self.state.lock().unwrap();
        push_message(&mut state, conversation.clone(), sender, content.to_string(), None);
    }
}

fn push_message(
    state: &mut FakeState,
    conversation_id: ConversationId,
    sender: UserId,
    content: String,
    media: Option<String>,
) {
    state.next_message += 1;
    let n = state.next_message;
    let created_at = NaiveDateTime::parse_from_str("2024-03-01 10:00:00", "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|t| t + chrono::Duration::seconds(n));
    let message = Message {
        id: format!("msg_{:04}", n),
        conversation_id: conversation_id.clone(),
        sender_id: sender.to_string(),
        content,
        media,
        is_read: false,
        created_at,
    };
    state.logs.entry(conversation_id).or_default().push(message);
}

impl Collaborator for FakeCollaborator {
    async fn online_users(&self) -> Result<Vec<User>> {
        let mut state = self.state.lock().unwrap();
        state.roster_fetches += 1;
        state.calls.push("online");
        if state.fail_roster {
            return Err(SyncError::Unavailable("roster offline".into()));
        }
        Ok(state.roster.clone())
    }

    async fn messages(&self, conversation: &ConversationId) -> Result<Vec<Message>> {
        let (snapshot, delay) = {
            let mut state = self.state.lock().unwrap();
            *state.message_fetches.entry(conversation.clone()).or_default() += 1;
            let snapshot = state.logs.get(conversation).cloned().unwrap_or_default();
            (snapshot, state.delays.pop_front())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(snapshot)
    }

    async fn update_profile(&self, request: UpdateProfileRequest) -> Result<User> {
        let mut state = self.state.lock().unwrap();
        let Some(user) = state.roster.iter_mut().find(|u| u.id == request.user_id) else {
            return Err(SyncError::Status {
                action: "update_user",
                status: 404,
                message: "User not found".into(),
            });
        };
        user.username = Some(request.username);
        if request.avatar_url.is_some() {
            user.avatar_url = request.avatar_url;
        }
        user.status = Some(request.status);
        Ok(user.clone())
    }

    async fn resolve_conversation(&self, a: UserId, b: UserId) -> Result<Conversation> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.resolutions += 1;
            state.resolution_delays.pop_front()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        if state.fail_resolutions {
            return Err(SyncError::Status {
                action: "chat",
                status: 500,
                message: "database unavailable".into(),
            });
        }
        let (a, b) = (a.to_string(), b.to_string());
        let existing = state.conversations.iter().find(|c| {
            (c.user1_id == a && c.user2_id == b) || (c.user1_id == b && c.user2_id == a)
        });
        if let Some(conversation) = existing {
            return Ok(conversation.clone());
        }
        let conversation = Conversation {
            id: ConversationId::new(format!("chat_{}_{}", a, b)),
            user1_id: a,
            user2_id: b,
            created_at: None,
        };
        state.conversations.push(conversation.clone());
        Ok(conversation)
    }

    async fn announce_presence(&self, _identity: &Identity) -> Result<Option<u64>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("presence");
        if state.fail_presence {
            return Err(SyncError::Unavailable("presence offline".into()));
        }
        Ok(Some(state.roster.len() as u64))
    }

    async fn send_message(&self, request: SendMessageRequest) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_sends {
            return Err(SyncError::Status {
                action: "send",
                status: 500,
                message: "database unavailable".into(),
            });
        }
        push_message(
            &mut state,
            request.conversation_id,
            request.sender_id,
            request.content,
            request.media,
        );
        Ok(())
    }
}
