use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::debug;

use dearly_types::api::{Claims, ViewedRewards};

use crate::access::require_owner;
use crate::auth::AppState;
use crate::error::ApiError;

pub async fn get_viewed_rewards(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&claims, &user_id)?;
    let viewed_rewards = state
        .with_db(move |db| db.get_viewed_rewards(&user_id))
        .await?;
    Ok(Json(ViewedRewards { viewed_rewards }))
}

/// Overwrites the stored set; the last writer wins.
pub async fn save_viewed_rewards(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
    Json(body): Json<ViewedRewards>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&claims, &user_id)?;
    debug!("{} viewed {} rewards", user_id, body.viewed_rewards.len());

    let keys = body.viewed_rewards.clone();
    state
        .with_db(move |db| db.replace_viewed_rewards(&user_id, &keys))
        .await?;
    Ok(Json(body))
}
