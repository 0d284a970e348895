use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{info, warn};
use uuid::Uuid;

use dearly_db::Database;
use dearly_db::models::UserRow;
use dearly_gateway::dispatcher::Dispatcher;
use dearly_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest};
use dearly_types::models::AuthProvider;

use crate::error::ApiError;

/// Tokens stay valid for 30 days.
const TOKEN_LIFETIME_DAYS: i64 = 30;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub dispatcher: Dispatcher,
    pub http: reqwest::Client,
    /// Base URL of the object store that serves audio files.
    pub storage_url: Option<String>,
}

impl AppStateInner {
    /// Run a blocking database call off the async runtime.
    pub async fn with_db<F, T>(self: &Arc<Self>, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let state = Arc::clone(self);
        let result = tokio::task::spawn_blocking(move || f(&state.db)).await?;
        Ok(result?)
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&req.email)?;
    if req.password.len() < 8 {
        return Err(ApiError::WeakPassword);
    }
    let display_name = req.display_name.trim().to_string();
    if display_name.is_empty() || display_name.len() > 64 {
        return Err(ApiError::BadRequest(
            "Display name must be between 1 and 64 characters".into(),
        ));
    }

    let lookup = email.clone();
    if state
        .with_db(move |db| db.get_user_by_email(&lookup))
        .await?
        .is_some()
    {
        return Err(ApiError::EmailInUse);
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))?
        .to_string();

    let row = UserRow {
        id: Uuid::new_v4().to_string(),
        email,
        password: Some(password_hash),
        display_name,
        role: req.role.as_str().to_string(),
        provider: AuthProvider::Password.as_str().to_string(),
        email_verified: false,
        created_at: Utc::now().to_rfc3339(),
    };

    let profile = state
        .with_db(move |db| {
            db.create_user(&row)?;
            Ok(row.into_profile())
        })
        .await
        .map_err(|e| match e {
            // Lost a race with another registration of the same address
            ApiError::Conflict(_) => ApiError::EmailInUse,
            other => other,
        })?;

    let token = create_token(&state.jwt_secret, &profile.id, &profile.email)?;
    info!("Registered {} as {}", profile.id, profile.role.as_str());

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user_id: profile.id.clone(),
            token,
            profile,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    let user = state
        .with_db(move |db| db.get_user_by_email(&email))
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    // Google accounts have no password to check against
    let stored = user.password.as_deref().ok_or(ApiError::InvalidCredentials)?;
    let parsed_hash = PasswordHash::new(stored).map_err(|e| {
        warn!("Stored password hash for {} is unreadable: {}", user.id, e);
        ApiError::InvalidCredentials
    })?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::InvalidCredentials)?;

    let profile = user.into_profile();
    let token = create_token(&state.jwt_secret, &profile.id, &profile.email)?;

    Ok(Json(AuthResponse {
        user_id: profile.id.clone(),
        token,
        profile,
    }))
}

pub fn create_token(secret: &str, user_id: &str, email: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: (Utc::now() + chrono::Duration::days(TOKEN_LIFETIME_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Lowercase and sanity-check an email address.
pub(crate) fn normalize_email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if valid { Ok(email) } else { Err(ApiError::InvalidEmail) }
}
