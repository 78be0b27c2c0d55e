//! The chat view synchronizer.
//!
//! Owns the roster, the discovered local profile, the current selection and
//! its message list. Two tasks poll the collaborator: a roster poller that
//! runs for the synchronizer's lifetime, and a conversation poller that lives
//! exactly as long as one selection. Every response is applied through a
//! sequence check so an older reply can never overwrite a newer one, and
//! message replies are dropped unless their conversation is still selected.

mod poller;
mod state;

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use parley_types::api::{SendMessageRequest, UpdateProfileRequest};
use parley_types::events::SyncEvent;
use parley_types::models::{
    Conversation, ConversationId, Identity, Message, Profile, User, UserId, default_username,
    is_chronological,
};

use crate::collaborator::Collaborator;
use crate::config::SyncConfig;
use crate::error::{Result, ValidationError};
use crate::media;

use self::state::{Selection, SyncState};

const EVENT_CAPACITY: usize = 256;

pub struct Synchronizer<C: Collaborator> {
    inner: Arc<Inner<C>>,
}

pub(crate) struct Inner<C> {
    collaborator: C,
    identity: Identity,
    config: SyncConfig,
    state: Mutex<SyncState>,
    /// Last sequence number handed to a roster request.
    roster_issued: AtomicU64,
    /// Last sequence number handed to a message request.
    messages_issued: AtomicU64,
    events: broadcast::Sender<SyncEvent>,
    /// Parent of every poller token; cancelled on teardown.
    shutdown: CancellationToken,
    started: AtomicBool,
}

impl<C: Collaborator> Synchronizer<C> {
    pub fn new(collaborator: C, identity: Identity, config: SyncConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                collaborator,
                identity,
                config,
                state: Mutex::new(SyncState::default()),
                roster_issued: AtomicU64::new(0),
                messages_issued: AtomicU64::new(0),
                events,
                shutdown: CancellationToken::new(),
                started: AtomicBool::new(false),
            }),
        }
    }

    /// Spawn the roster poller. Must be called from within a tokio runtime.
    /// Calling it again is a no-op.
    pub fn start(&self) {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Starting synchronizer for {}", self.inner.identity);
        tokio::spawn(poller::run_roster_poller(
            Arc::clone(&self.inner),
            self.inner.shutdown.child_token(),
        ));
    }

    /// Stop every poller. In-flight replies that land afterwards are ignored
    /// by the conversation guard; roster replies still apply.
    pub fn shutdown(&self) {
        if !self.inner.shutdown.is_cancelled() {
            info!("Shutting down synchronizer");
        }
        self.inner.shutdown.cancel();
        let closed = self.inner.lock().clear_selection();
        if let Some(conversation_id) = closed {
            self.inner.emit(SyncEvent::ConversationClosed { conversation_id });
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.inner.events.subscribe()
    }

    // -- Snapshots --

    pub fn identity(&self) -> &Identity {
        &self.inner.identity
    }

    pub fn profile(&self) -> Option<Profile> {
        self.inner.lock().profile.clone()
    }

    pub fn roster(&self) -> Vec<User> {
        self.inner.lock().roster.clone()
    }

    /// The roster without our own entry.
    pub fn others(&self) -> Vec<User> {
        let state = self.inner.lock();
        state
            .roster
            .iter()
            .filter(|u| u.identity != self.inner.identity)
            .cloned()
            .collect()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.inner.lock().messages.clone()
    }

    pub fn selected_partner(&self) -> Option<User> {
        self.inner.lock().selection.as_ref().map(|s| s.partner.clone())
    }

    pub fn active_conversation(&self) -> Option<Conversation> {
        let state = self.inner.lock();
        state.selection.as_ref()?.conversation.clone()
    }

    // -- Compose field --

    pub fn draft(&self) -> String {
        self.inner.lock().draft.clone()
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        self.inner.lock().draft = text.into();
    }

    // -- Operations --

    /// Fetch the roster now, outside the timer.
    pub async fn refresh_roster(&self) -> Result<()> {
        self.inner.refresh_roster().await
    }

    /// Fetch the active conversation's messages now, outside the timer.
    /// Does nothing when no conversation is selected.
    pub async fn refresh_messages(&self) -> Result<()> {
        let active = self.inner.lock().active_conversation().cloned();
        match active {
            Some(conversation_id) => self.inner.fetch_messages(&conversation_id).await,
            None => Ok(()),
        }
    }

    /// Focus the view on a conversation with `partner`.
    ///
    /// The previous selection's poller is cancelled before anything else. The
    /// conversation is resolved by round trip every time, then fetched once
    /// immediately and polled until the selection changes. If another
    /// selection is made while this one is resolving, the resolved
    /// conversation is returned but not activated. A failed resolution leaves
    /// nothing selected.
    pub async fn select_user(&self, partner: &User) -> Result<Conversation> {
        let inner = &self.inner;

        let (me, epoch, closed) = {
            let mut state = inner.lock();
            let me = state
                .profile
                .as_ref()
                .map(|p| p.id)
                .ok_or(ValidationError::NoProfile)?;
            let closed = state.clear_selection();
            let epoch = state.epoch;
            state.selection = Some(Selection {
                partner: partner.clone(),
                epoch,
                conversation: None,
                token: None,
            });
            (me, epoch, closed)
        };
        if let Some(conversation_id) = closed {
            info!("Closed conversation {}", conversation_id);
            inner.emit(SyncEvent::ConversationClosed { conversation_id });
        }

        let conversation = match inner.collaborator.resolve_conversation(me, partner.id).await {
            Ok(conversation) => conversation,
            Err(e) => {
                let mut state = inner.lock();
                if state.selection.as_ref().is_some_and(|s| s.epoch == epoch) {
                    state.clear_selection();
                }
                return Err(e);
            }
        };

        let token = inner.shutdown.child_token();
        {
            let mut state = inner.lock();
            let current = state.selection.as_mut().filter(|s| s.epoch == epoch);
            let Some(selection) = current else {
                debug!(
                    "Conversation {} resolved for a superseded selection, not activating",
                    conversation.id
                );
                return Ok(conversation);
            };
            selection.conversation = Some(conversation.clone());
            selection.token = Some(token.clone());
        }

        info!("Opened conversation {} with user {}", conversation.id, partner.id);
        inner.emit(SyncEvent::ConversationOpened {
            conversation: conversation.clone(),
            partner_id: partner.id,
        });

        if let Err(e) = inner.fetch_messages(&conversation.id).await {
            warn!("Initial fetch for {} failed: {}", conversation.id, e);
        }

        tokio::spawn(poller::run_conversation_poller(
            Arc::clone(inner),
            conversation.id.clone(),
            token,
        ));

        Ok(conversation)
    }

    /// Close the current conversation and stop its poller.
    pub fn deselect(&self) {
        let closed = self.inner.lock().clear_selection();
        if let Some(conversation_id) = closed {
            info!("Closed conversation {}", conversation_id);
            self.inner.emit(SyncEvent::ConversationClosed { conversation_id });
        }
    }

    /// Send the draft to the active conversation.
    ///
    /// On success the draft is cleared (unless it was edited while the send
    /// was in flight) and the message list is fetched once more. On failure
    /// the draft is left as it was.
    pub async fn submit_draft(&self) -> Result<()> {
        let inner = &self.inner;

        let (conversation_id, sender_id, content) = {
            let state = inner.lock();
            if state.draft.trim().is_empty() {
                return Err(ValidationError::EmptyBody.into());
            }
            let (conversation_id, sender_id) = state.send_target()?;
            (conversation_id, sender_id, state.draft.clone())
        };

        inner
            .deliver(SendMessageRequest {
                conversation_id: conversation_id.clone(),
                sender_id,
                content: content.clone(),
                media: None,
            })
            .await?;

        {
            let mut state = inner.lock();
            if state.draft == content {
                state.draft.clear();
            }
        }

        inner.refresh_after_send(&conversation_id).await;
        Ok(())
    }

    /// Send a local file as an inline attachment. `None` means the user
    /// picked nothing.
    pub async fn send_media(&self, path: Option<&Path>) -> Result<()> {
        let inner = &self.inner;
        let path = path.ok_or(ValidationError::NoFile)?;
        let (conversation_id, sender_id) = inner.lock().send_target()?;

        let payload = media::encode_file(path).await?;
        debug!("Encoded {} as {} byte payload", path.display(), payload.len());

        inner
            .deliver(SendMessageRequest {
                conversation_id: conversation_id.clone(),
                sender_id,
                content: media::PHOTO_CAPTION.to_string(),
                media: Some(payload),
            })
            .await?;

        inner.refresh_after_send(&conversation_id).await;
        Ok(())
    }

    /// Push a new name and avatar for the local profile. An empty name falls
    /// back to `User_<id>`; status is always `online`.
    pub async fn update_profile(&self, name: &str, avatar_url: Option<String>) -> Result<User> {
        let inner = &self.inner;
        let id = inner
            .lock()
            .profile
            .as_ref()
            .map(|p| p.id)
            .ok_or(ValidationError::NoProfile)?;

        let name = name.trim();
        let username = if name.is_empty() {
            default_username(id)
        } else {
            name.to_string()
        };

        let user = inner
            .collaborator
            .update_profile(UpdateProfileRequest {
                user_id: id,
                username,
                avatar_url,
                status: "online".to_string(),
            })
            .await?;

        let profile = Profile::from(&user);
        inner.lock().profile = Some(profile.clone());
        info!("Profile {} updated", profile.id);
        inner.emit(SyncEvent::ProfileResolved { profile });

        if let Err(e) = inner.refresh_roster().await {
            warn!("Roster refresh after profile update failed: {}", e);
        }
        Ok(user)
    }
}

impl<C: Collaborator> Drop for Synchronizer<C> {
    fn drop(&mut self) {
        self.inner.shutdown.cancel();
        self.inner.lock().clear_selection();
    }
}

impl SyncState {
    /// Conversation and sender for an outgoing message.
    fn send_target(&self) -> Result<(ConversationId, UserId)> {
        let conversation_id = self
            .active_conversation()
            .cloned()
            .ok_or(ValidationError::NoConversation)?;
        let sender_id = self
            .profile
            .as_ref()
            .map(|p| p.id)
            .ok_or(ValidationError::NoProfile)?;
        Ok((conversation_id, sender_id))
    }
}

impl<C: Collaborator> Inner<C> {
    fn lock(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SyncEvent) {
        let _ = self.events.send(event);
    }

    async fn refresh_roster(&self) -> Result<()> {
        match self.collaborator.announce_presence(&self.identity).await {
            Ok(Some(online)) => debug!("Presence announced, {} online", online),
            Ok(None) => {}
            Err(e) => warn!("Presence heartbeat failed: {}", e),
        }

        let seq = self.roster_issued.fetch_add(1, Ordering::SeqCst) + 1;
        let users = self.collaborator.online_users().await?;
        self.apply_roster(seq, users);
        Ok(())
    }

    /// Replace the roster wholesale and adopt our own entry as the profile.
    fn apply_roster(&self, seq: u64, users: Vec<User>) {
        let online = users.len();
        let discovered = {
            let mut state = self.lock();
            if seq <= state.roster_applied {
                debug!("Dropping stale roster response #{}", seq);
                return;
            }
            state.roster_applied = seq;

            let mut discovered = None;
            if let Some(me) = users.iter().find(|u| u.identity == self.identity) {
                let profile = Profile::from(me);
                if state.profile.as_ref() != Some(&profile) {
                    discovered = Some(profile.clone());
                }
                state.profile = Some(profile);
            }
            state.roster = users;
            discovered
        };

        debug!("Roster updated, {} online", online);
        self.emit(SyncEvent::RosterUpdated { online });
        if let Some(profile) = discovered {
            info!("Discovered local profile {} ({})", profile.id, profile.name);
            self.emit(SyncEvent::ProfileResolved { profile });
        }
    }

    async fn fetch_messages(&self, conversation_id: &ConversationId) -> Result<()> {
        let seq = self.messages_issued.fetch_add(1, Ordering::SeqCst) + 1;
        let messages = self.collaborator.messages(conversation_id).await?;
        self.apply_messages(seq, conversation_id, messages);
        Ok(())
    }

    /// Replace the visible list, unless the reply is for a conversation that
    /// is no longer selected or an older request than one already applied.
    fn apply_messages(&self, seq: u64, conversation_id: &ConversationId, messages: Vec<Message>) {
        if !is_chronological(&messages) {
            warn!("Messages for {} arrived out of creation order", conversation_id);
        }
        let count = messages.len();

        {
            let mut state = self.lock();
            if state.active_conversation() != Some(conversation_id) {
                debug!("Dropping messages for inactive conversation {}", conversation_id);
                return;
            }
            if seq <= state.messages_applied {
                debug!("Dropping stale message response #{} for {}", seq, conversation_id);
                return;
            }
            state.messages_applied = seq;
            state.messages = messages;
        }

        self.emit(SyncEvent::MessagesUpdated {
            conversation_id: conversation_id.clone(),
            count,
        });
    }

    async fn deliver(&self, request: SendMessageRequest) -> Result<()> {
        let conversation_id = request.conversation_id.clone();
        if let Err(e) = self.collaborator.send_message(request).await {
            warn!("Send to {} failed: {}", conversation_id, e);
            self.emit(SyncEvent::SendFailed {
                reason: e.to_string(),
            });
            return Err(e);
        }

        debug!("Message delivered to {}", conversation_id);
        self.emit(SyncEvent::MessageSent { conversation_id });
        Ok(())
    }

    /// One extra fetch so a sent message shows without waiting for the timer.
    async fn refresh_after_send(&self, conversation_id: &ConversationId) {
        if let Err(e) = self.fetch_messages(conversation_id).await {
            warn!("Refresh after send to {} failed: {}", conversation_id, e);
        }
    }
}
