use std::collections::BTreeSet;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use dearly_games::wizard::{PersistRequest, PersistTarget};
use dearly_types::api::{
    AuthResponse, CompleteGameRequest, CompletionResponse, ErrorBody, GameDraft,
    LinkReceiverRequest, LinkReceiverResponse, LoginRequest, NotificationsResponse,
    RegisterRequest, SaveGoogleUserRequest, UpdateProfileRequest, VerificationStatus,
    ViewedRewards,
};
use dearly_types::models::{Game, ReceiverData, UserProfile};

use crate::error::ClientError;

/// Profile and receiver lookups give up after 10 seconds.
const PROFILE_TIMEOUT: Duration = Duration::from_secs(10);

/// Audio downloads give up after 15 seconds.
const AUDIO_TIMEOUT: Duration = Duration::from_secs(15);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the Dearly REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    pub fn sign_out(&mut self) {
        self.token = None;
    }

    /// WebSocket URL of the gateway on the same host.
    pub fn gateway_url(&self) -> String {
        let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        };
        format!("{ws_base}/gateway")
    }

    // -- Auth --

    /// Create an account. The returned token is kept for later calls.
    pub async fn register(&mut self, req: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        let auth: AuthResponse = send_json(self.request(Method::POST, "/api/auth/register").json(req)).await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let req = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let auth: AuthResponse = send_json(self.request(Method::POST, "/api/auth/login").json(&req)).await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    pub async fn profile(&self, user_id: &str) -> Result<UserProfile, ClientError> {
        send_json(
            self.request(Method::GET, &format!("/api/auth/user/{user_id}"))
                .timeout(PROFILE_TIMEOUT),
        )
        .await
    }

    pub async fn create_profile(
        &self,
        user_id: &str,
        req: &UpdateProfileRequest,
    ) -> Result<UserProfile, ClientError> {
        send_json(self.request(Method::POST, &format!("/api/auth/user/{user_id}")).json(req)).await
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        req: &UpdateProfileRequest,
    ) -> Result<UserProfile, ClientError> {
        send_json(self.request(Method::PUT, &format!("/api/auth/user/{user_id}")).json(req)).await
    }

    pub async fn save_google_user(
        &self,
        req: &SaveGoogleUserRequest,
    ) -> Result<UserProfile, ClientError> {
        send_json(self.request(Method::POST, "/api/auth/save-google-user").json(req)).await
    }

    pub async fn check_verification(&self, user_id: &str) -> Result<bool, ClientError> {
        let status: VerificationStatus = send_json(
            self.request(Method::GET, &format!("/api/auth/check-verification/{user_id}"))
                .timeout(PROFILE_TIMEOUT),
        )
        .await?;
        Ok(status.email_verified)
    }

    // -- Games --

    pub async fn games(&self, user_id: &str) -> Result<Vec<Game>, ClientError> {
        send_json(self.request(Method::GET, &format!("/api/games/{user_id}"))).await
    }

    pub async fn game(&self, user_id: &str, game_id: &str) -> Result<Game, ClientError> {
        send_json(self.request(Method::GET, &format!("/api/games/{user_id}/{game_id}"))).await
    }

    pub async fn create_game(&self, user_id: &str, draft: &GameDraft) -> Result<Game, ClientError> {
        send_json(self.request(Method::POST, &format!("/api/games/{user_id}")).json(draft)).await
    }

    pub async fn update_game(
        &self,
        user_id: &str,
        game_id: &str,
        draft: &GameDraft,
    ) -> Result<Game, ClientError> {
        send_json(
            self.request(Method::PUT, &format!("/api/games/{user_id}/{game_id}"))
                .json(draft),
        )
        .await
    }

    pub async fn delete_game(&self, user_id: &str, game_id: &str) -> Result<(), ClientError> {
        send_empty(self.request(Method::DELETE, &format!("/api/games/{user_id}/{game_id}"))).await
    }

    /// Send the write a finished wizard asks for: create or update.
    pub async fn persist(&self, user_id: &str, request: &PersistRequest) -> Result<Game, ClientError> {
        match &request.target {
            PersistTarget::Create => self.create_game(user_id, request.draft()).await,
            PersistTarget::Update { game_id } => {
                self.update_game(user_id, game_id, request.draft()).await
            }
        }
    }

    pub async fn completion(
        &self,
        user_id: &str,
        game_id: &str,
    ) -> Result<CompletionResponse, ClientError> {
        send_json(self.request(
            Method::GET,
            &format!("/api/games/{user_id}/{game_id}/completion"),
        ))
        .await
    }

    pub async fn complete_game(
        &self,
        user_id: &str,
        game_id: &str,
        claimed_reward_id: Option<&str>,
    ) -> Result<CompletionResponse, ClientError> {
        let body = CompleteGameRequest {
            claimed_reward_id: claimed_reward_id.map(str::to_string),
        };
        send_json(
            self.request(Method::PUT, &format!("/api/games/{user_id}/{game_id}/complete"))
                .json(&body),
        )
        .await
    }

    pub async fn fulfill_reward(&self, user_id: &str, game_id: &str) -> Result<Game, ClientError> {
        send_json(self.request(Method::PUT, &format!("/api/games/{user_id}/{game_id}/fulfill")))
            .await
    }

    // -- Viewed rewards --

    pub async fn viewed_rewards(&self, user_id: &str) -> Result<BTreeSet<String>, ClientError> {
        let body: ViewedRewards = send_json(self.request(
            Method::GET,
            &format!("/api/games/{user_id}/viewed-rewards"),
        ))
        .await?;
        Ok(body.viewed_rewards)
    }

    pub async fn save_viewed_rewards(
        &self,
        user_id: &str,
        keys: &BTreeSet<String>,
    ) -> Result<(), ClientError> {
        let body = ViewedRewards {
            viewed_rewards: keys.clone(),
        };
        let _: ViewedRewards = send_json(
            self.request(Method::PUT, &format!("/api/games/{user_id}/viewed-rewards"))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    // -- Receivers --

    pub async fn link_receiver(
        &self,
        sender_id: &str,
        receiver_id: &str,
    ) -> Result<LinkReceiverResponse, ClientError> {
        let body = LinkReceiverRequest {
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
        };
        send_json(self.request(Method::POST, "/api/receiver-accounts/link").json(&body)).await
    }

    /// `None` when the sender has not entered receiver details yet.
    pub async fn receiver_data(&self, user_id: &str) -> Result<Option<ReceiverData>, ClientError> {
        let result: Result<ReceiverData, ClientError> = send_json(
            self.request(Method::GET, &format!("/api/receiver-data/{user_id}"))
                .timeout(PROFILE_TIMEOUT),
        )
        .await;
        match result {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.status() == Some(404) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn create_receiver_data(
        &self,
        user_id: &str,
        data: &ReceiverData,
    ) -> Result<ReceiverData, ClientError> {
        send_json(self.request(Method::POST, &format!("/api/receiver-data/{user_id}")).json(data))
            .await
    }

    pub async fn update_receiver_data(
        &self,
        user_id: &str,
        data: &ReceiverData,
    ) -> Result<ReceiverData, ClientError> {
        send_json(self.request(Method::PUT, &format!("/api/receiver-data/{user_id}")).json(data))
            .await
    }

    // -- Notifications --

    pub async fn notifications(&self, user_id: &str) -> Result<NotificationsResponse, ClientError> {
        send_json(self.request(Method::GET, &format!("/api/notifications/{user_id}"))).await
    }

    pub async fn mark_notification_read(
        &self,
        user_id: &str,
        notification_id: &str,
    ) -> Result<(), ClientError> {
        send_empty(self.request(
            Method::PUT,
            &format!("/api/notifications/{user_id}/{notification_id}/read"),
        ))
        .await
    }

    pub async fn mark_all_notifications_read(&self, user_id: &str) -> Result<(), ClientError> {
        send_empty(self.request(Method::PUT, &format!("/api/notifications/{user_id}/read-all")))
            .await
    }

    pub async fn delete_notification(
        &self,
        user_id: &str,
        notification_id: &str,
    ) -> Result<(), ClientError> {
        send_empty(self.request(
            Method::DELETE,
            &format!("/api/notifications/{user_id}/{notification_id}"),
        ))
        .await
    }

    pub async fn clear_notifications(&self, user_id: &str) -> Result<(), ClientError> {
        send_empty(self.request(Method::DELETE, &format!("/api/notifications/{user_id}"))).await
    }

    // -- Audio --

    /// Download an audio file through the backend proxy.
    pub async fn fetch_audio(&self, path: &str) -> Result<Vec<u8>, ClientError> {
        let path = path.trim_start_matches('/');
        let response = check(
            self.request(Method::GET, &format!("/api/audio-proxy/{path}"))
                .timeout(AUDIO_TIMEOUT)
                .send()
                .await?,
        )
        .await?;
        Ok(response.bytes().await?.to_vec())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ClientError> {
    let response = check(builder.send().await?).await?;
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn send_empty(builder: RequestBuilder) -> Result<(), ClientError> {
    check(builder.send().await?).await?;
    Ok(())
}

/// Turn non-2xx responses into [`ClientError::Http`], reading the server's
/// `{ error, message }` body when there is one.
async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().path().to_string();
    let bytes = response.bytes().await.unwrap_or_default();
    let (code, message) = match serde_json::from_slice::<ErrorBody>(&bytes) {
        Ok(body) => (body.error, body.message),
        Err(_) => {
            debug!("Non-JSON error body from {}", url);
            (
                "unknown".to_string(),
                String::from_utf8_lossy(&bytes).into_owned(),
            )
        }
    };
    warn!("{} failed with {} ({})", url, status, code);

    Err(ClientError::Http {
        status: status.as_u16(),
        code,
        message,
    })
}
