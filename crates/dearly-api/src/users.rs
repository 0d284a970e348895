use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;

use dearly_types::api::{Claims, SaveGoogleUserRequest, UpdateProfileRequest, VerificationStatus};
use dearly_types::models::UserProfile;

use crate::access::{require_owner, require_owner_or_receiver};
use crate::auth::{AppState, normalize_email};
use crate::error::ApiError;

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner_or_receiver(&state, &claims, &user_id).await?;
    Ok(Json(load_profile(&state, user_id).await?))
}

/// First-time profile setup after sign-up. Requires a display name.
pub async fn create_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&claims, &user_id)?;
    if req.display_name.is_none() {
        return Err(ApiError::BadRequest("displayName is required".into()));
    }
    let profile = apply_profile_update(&state, user_id, req).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&claims, &user_id)?;
    Ok(Json(apply_profile_update(&state, user_id, req).await?))
}

/// Record the profile of a Google-authenticated account. Google accounts
/// are stored as verified.
pub async fn save_google_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SaveGoogleUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&claims, &req.uid)?;
    let email = normalize_email(&req.email)?;
    let display_name = req.display_name.trim().to_string();

    let uid = req.uid.clone();
    let created_at = Utc::now().to_rfc3339();
    state
        .with_db(move |db| db.upsert_google_user(&uid, &email, &display_name, &created_at))
        .await?;

    info!("Saved Google profile for {}", req.uid);
    Ok(Json(load_profile(&state, req.uid).await?))
}

pub async fn check_verification(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&claims, &user_id)?;
    let profile = load_profile(&state, user_id).await?;
    Ok(Json(VerificationStatus {
        email_verified: profile.email_verified,
    }))
}

async fn load_profile(state: &AppState, user_id: String) -> Result<UserProfile, ApiError> {
    state
        .with_db(move |db| db.get_user_by_id(&user_id))
        .await?
        .map(|row| row.into_profile())
        .ok_or(ApiError::NotFound("User"))
}

async fn apply_profile_update(
    state: &AppState,
    user_id: String,
    req: UpdateProfileRequest,
) -> Result<UserProfile, ApiError> {
    let display_name = match req.display_name.as_deref().map(str::trim) {
        Some("") => return Err(ApiError::BadRequest("displayName cannot be blank".into())),
        Some(name) if name.len() > 64 => {
            return Err(ApiError::BadRequest("displayName is too long".into()));
        }
        other => other.map(str::to_string),
    };
    let role = req.role.map(|r| r.as_str());

    let id = user_id.clone();
    let updated = state
        .with_db(move |db| db.update_profile(&id, display_name.as_deref(), role))
        .await?;
    if !updated {
        return Err(ApiError::NotFound("User"));
    }
    load_profile(state, user_id).await
}
