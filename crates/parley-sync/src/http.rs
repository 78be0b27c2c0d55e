use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use parley_types::api::{
    ErrorResponse, PresenceRequest, PresenceResponse, ResolveConversationRequest,
    SendMessageRequest, UpdateProfileRequest,
};
use parley_types::models::{Conversation, ConversationId, Identity, Message, User, UserId};

use crate::collaborator::Collaborator;
use crate::config::ClientConfig;
use crate::error::{Result, SyncError};

/// Collaborator backed by the JSON endpoint. One base URL serves every
/// action, selected with the `action` query parameter.
pub struct HttpCollaborator {
    client: Client,
    api_url: Url,
    presence_url: Option<Url>,
}

impl HttpCollaborator {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            presence_url: config.presence_url.clone(),
        })
    }

    fn action_url(&self, action: &str) -> Url {
        let mut url = self.api_url.clone();
        url.query_pairs_mut().append_pair("action", action);
        url
    }

    async fn get<T: DeserializeOwned>(&self, action: &'static str, url: Url) -> Result<T> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let response = check_status(action, response).await?;
        Ok(response.json().await?)
    }

    async fn post<B, T>(&self, action: &'static str, body: &B) -> Result<T>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.post_raw(action, body).await?;
        Ok(response.json().await?)
    }

    async fn post_raw<B>(&self, action: &'static str, body: &B) -> Result<Response>
    where
        B: serde::Serialize + ?Sized,
    {
        let url = self.action_url(action);
        debug!("POST {}", url);
        let response = self.client.post(url).json(body).send().await?;
        check_status(action, response).await
    }
}

/// Non-2xx responses become [`SyncError::Status`], carrying the service's
/// `{"error": ...}` message when it sent one.
async fn check_status(action: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error)
        .unwrap_or(body);

    Err(SyncError::Status {
        action,
        status: status.as_u16(),
        message,
    })
}

impl Collaborator for HttpCollaborator {
    async fn online_users(&self) -> Result<Vec<User>> {
        self.get("online", self.action_url("online")).await
    }

    async fn messages(&self, conversation: &ConversationId) -> Result<Vec<Message>> {
        let mut url = self.action_url("messages");
        url.query_pairs_mut().append_pair("chat_id", conversation.as_str());
        self.get("messages", url).await
    }

    async fn update_profile(&self, request: UpdateProfileRequest) -> Result<User> {
        self.post("update_user", &request).await
    }

    async fn resolve_conversation(&self, a: UserId, b: UserId) -> Result<Conversation> {
        let request = ResolveConversationRequest {
            user1_id: a,
            user2_id: b,
        };
        self.post("chat", &request).await
    }

    async fn send_message(&self, request: SendMessageRequest) -> Result<()> {
        self.post_raw("send", &request).await?;
        Ok(())
    }

    async fn announce_presence(&self, identity: &Identity) -> Result<Option<u64>> {
        let Some(url) = self.presence_url.clone() else {
            return Ok(None);
        };

        let request = PresenceRequest {
            session_id: identity.clone(),
        };
        debug!("POST {}", url);
        let response = self.client.post(url).json(&request).send().await?;
        let response = check_status("presence", response).await?;
        let presence: PresenceResponse = response.json().await?;
        Ok(Some(presence.online_users))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    use axum::{
        Json, Router,
        extract::{Query, State},
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::{get, post},
    };
    use serde_json::{Value, json};

    use super::*;

    /// In-process stand-in for the collaborator service.
    #[derive(Default)]
    struct Stub {
        chats: Mutex<Vec<Value>>,
        messages: Mutex<Vec<Value>>,
    }

    fn bad_request(error: &str) -> Response {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": error }))).into_response()
    }

    async fn handle_get(
        State(stub): State<Arc<Stub>>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Response {
        match params.get("action").map(String::as_str) {
            Some("online") => Json(json!([
                {"id": 7, "session_id": "s1", "username": "Ann", "avatar_url": null,
                 "status": "online", "last_seen": "2024-03-01T10:15:30.500000"},
                {"id": 8, "session_id": "s2", "username": "Bob", "avatar_url": "https://img/b.png",
                 "status": "online", "last_seen": null}
            ]))
            .into_response(),
            Some("messages") => {
                let Some(chat_id) = params.get("chat_id") else {
                    return bad_request("chat_id is required");
                };
                let messages = stub.messages.lock().unwrap();
                let found: Vec<Value> = messages
                    .iter()
                    .filter(|m| m["chat_id"] == chat_id.as_str())
                    .cloned()
                    .collect();
                Json(found).into_response()
            }
            _ => bad_request("Invalid action"),
        }
    }

    async fn handle_post(
        State(stub): State<Arc<Stub>>,
        Query(params): Query<HashMap<String, String>>,
        Json(body): Json<Value>,
    ) -> Response {
        match params.get("action").map(String::as_str) {
            Some("chat") => {
                let a = body["user1_id"].to_string();
                let b = body["user2_id"].to_string();
                let mut chats = stub.chats.lock().unwrap();
                let existing = chats.iter().find(|c| {
                    (c["user1_id"] == a.as_str() && c["user2_id"] == b.as_str())
                        || (c["user1_id"] == b.as_str() && c["user2_id"] == a.as_str())
                });
                let chat = match existing {
                    Some(chat) => chat.clone(),
                    None => {
                        let chat = json!({
                            "id": format!("chat_{}_{}", a, b),
                            "user1_id": a,
                            "user2_id": b,
                            "created_at": "2024-03-01T10:00:00"
                        });
                        chats.push(chat.clone());
                        chat
                    }
                };
                Json(chat).into_response()
            }
            Some("send") => {
                if body["chat_id"].is_null() || body["sender_id"].is_null() {
                    return bad_request("chat_id and sender_id required");
                }
                let mut messages = stub.messages.lock().unwrap();
                let message = json!({
                    "id": format!("msg_{}", messages.len() + 1),
                    "chat_id": body["chat_id"],
                    "sender_id": body["sender_id"].to_string(),
                    "content": body["content"],
                    "photo_url": body.get("photo_url").cloned().unwrap_or(Value::Null),
                    "is_read": false,
                    "created_at": format!("2024-03-01T10:00:{:02}", messages.len() + 1)
                });
                messages.push(message.clone());
                (StatusCode::CREATED, Json(message)).into_response()
            }
            Some("update_user") => {
                if body["user_id"] != 7 {
                    return (StatusCode::NOT_FOUND, Json(json!({"error": "User not found"})))
                        .into_response();
                }
                Json(json!({
                    "id": 7,
                    "session_id": "s1",
                    "username": body["username"],
                    "avatar_url": body["avatar_url"],
                    "status": body["status"],
                    "last_seen": "2024-03-01T10:20:00"
                }))
                .into_response()
            }
            _ => bad_request("Invalid action"),
        }
    }

    async fn handle_presence(Json(body): Json<Value>) -> Response {
        if body["sessionId"].is_null() {
            return bad_request("sessionId required");
        }
        Json(json!({ "onlineUsers": 3 })).into_response()
    }

    async fn serve() -> SocketAddr {
        let app = Router::new()
            .route("/api", get(handle_get).post(handle_post))
            .route("/online", post(handle_presence))
            .with_state(Arc::new(Stub::default()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn collaborator(addr: SocketAddr, presence: bool) -> HttpCollaborator {
        let mut config = ClientConfig::new(format!("http://{}/api", addr).parse().unwrap());
        if presence {
            config.presence_url = Some(format!("http://{}/online", addr).parse().unwrap());
        }
        HttpCollaborator::new(&config).unwrap()
    }

    #[tokio::test]
    async fn fetches_roster() {
        let addr = serve().await;
        let users = collaborator(addr, false).online_users().await.unwrap();

        assert_eq!(users.len(), 2);
        assert_eq!(users[0].id, 7);
        assert_eq!(users[0].identity.as_str(), "s1");
        assert_eq!(users[1].avatar_url.as_deref(), Some("https://img/b.png"));
    }

    #[tokio::test]
    async fn conversation_resolution_is_idempotent_for_either_order() {
        let addr = serve().await;
        let api = collaborator(addr, false);

        let ab = api.resolve_conversation(7, 8).await.unwrap();
        let ba = api.resolve_conversation(8, 7).await.unwrap();
        let again = api.resolve_conversation(7, 8).await.unwrap();

        assert_eq!(ab.id, ba.id);
        assert_eq!(ab.id, again.id);
        assert!(ab.involves(7) && ab.involves(8));
    }

    #[tokio::test]
    async fn sent_message_appears_in_next_fetch() {
        let addr = serve().await;
        let api = collaborator(addr, false);
        let chat = api.resolve_conversation(7, 8).await.unwrap();

        api.send_message(SendMessageRequest {
            conversation_id: chat.id.clone(),
            sender_id: 7,
            content: "hello".to_string(),
            media: None,
        })
        .await
        .unwrap();

        let messages = api.messages(&chat.id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "hello");
        assert!(messages[0].is_from(7));
    }

    #[tokio::test]
    async fn non_success_status_carries_service_message() {
        let addr = serve().await;
        let err = collaborator(addr, false)
            .update_profile(UpdateProfileRequest {
                user_id: 99,
                username: "Nobody".to_string(),
                avatar_url: None,
                status: "online".to_string(),
            })
            .await
            .unwrap_err();

        match err {
            SyncError::Status {
                action,
                status,
                message,
            } => {
                assert_eq!(action, "update_user");
                assert_eq!(status, 404);
                assert_eq!(message, "User not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn update_profile_returns_server_user() {
        let addr = serve().await;
        let user = collaborator(addr, false)
            .update_profile(UpdateProfileRequest {
                user_id: 7,
                username: "Annie".to_string(),
                avatar_url: Some("https://img/a.png".to_string()),
                status: "online".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(user.display_name(), "Annie");
        assert_eq!(user.avatar_url.as_deref(), Some("https://img/a.png"));
    }

    #[tokio::test]
    async fn presence_is_optional() {
        let addr = serve().await;
        let identity = Identity::from("s1");

        assert_eq!(collaborator(addr, false).announce_presence(&identity).await.unwrap(), None);
        assert_eq!(collaborator(addr, true).announce_presence(&identity).await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_error() {
        let config = ClientConfig::new("http://127.0.0.1:1/api".parse().unwrap());
        let err = HttpCollaborator::new(&config)
            .unwrap()
            .online_users()
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Transport(_)));
    }
}
