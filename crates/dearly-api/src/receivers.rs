use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::{info, warn};

use dearly_db::models::{ReceiverDataRow, ReceiverLinkRow, parse_timestamp};
use dearly_types::api::{Claims, LinkReceiverRequest, LinkReceiverResponse};
use dearly_types::models::{NotificationKind, ReceiverData, Role};

use crate::access::{require_owner, require_owner_or_receiver};
use crate::auth::{AppState, normalize_email};
use crate::error::ApiError;
use crate::notifications::notify;

pub async fn get_receiver_data(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner_or_receiver(&state, &claims, &user_id).await?;

    let row = state
        .with_db(move |db| db.get_receiver_data(&user_id))
        .await?
        .ok_or(ApiError::NotFound("Receiver data"))?;

    Ok(Json(ReceiverData {
        name: row.name,
        email: row.email,
    }))
}

pub async fn create_receiver_data(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
    Json(data): Json<ReceiverData>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&claims, &user_id)?;
    let (created, data) = save_receiver_data(&state, user_id, data).await?;
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(data)))
}

pub async fn update_receiver_data(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
    Json(data): Json<ReceiverData>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&claims, &user_id)?;
    let (_, data) = save_receiver_data(&state, user_id, data).await?;
    Ok(Json(data))
}

/// Link a receiver account to a sender. Only the sender can create the link,
/// and both accounts must hold the matching role.
pub async fn link_receiver(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<LinkReceiverRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&claims, &req.sender_id)?;
    if req.sender_id == req.receiver_id {
        return Err(ApiError::BadRequest("An account cannot link to itself".into()));
    }

    let ids = (req.sender_id.clone(), req.receiver_id.clone());
    let (sender, receiver) = state
        .with_db(move |db| Ok((db.get_user_by_id(&ids.0)?, db.get_user_by_id(&ids.1)?)))
        .await?;
    let sender = sender.ok_or(ApiError::NotFound("Sender"))?;
    let receiver = receiver.ok_or(ApiError::NotFound("Receiver"))?;
    if Role::parse(&sender.role) != Some(Role::Sender) {
        warn!("{} tried to link receivers without a sender account", claims.sub);
        return Err(ApiError::Forbidden);
    }
    if Role::parse(&receiver.role) != Some(Role::Receiver) {
        return Err(ApiError::BadRequest(format!(
            "{} is not a receiver account",
            req.receiver_id
        )));
    }

    let link = ReceiverLinkRow {
        sender_id: req.sender_id.clone(),
        receiver_id: req.receiver_id.clone(),
        linked_at: Utc::now().to_rfc3339(),
    };
    let linked_at = parse_timestamp(&link.linked_at);
    let (sender_id, receiver_id) = (link.sender_id.clone(), link.receiver_id.clone());
    let already_linked = state
        .with_db(move |db| {
            let existed = db.is_linked_receiver(&link.sender_id, &link.receiver_id)?;
            db.link_receiver(&link)?;
            Ok(existed)
        })
        .await?;

    if !already_linked {
        info!("Linked receiver {} to sender {}", receiver_id, sender_id);
        notify(
            &state,
            &sender_id,
            NotificationKind::ReceiverLinked {
                receiver_name: receiver.display_name,
            },
        )
        .await?;
    }

    Ok(Json(LinkReceiverResponse {
        sender_id,
        receiver_id,
        linked_at,
    }))
}

async fn save_receiver_data(
    state: &AppState,
    user_id: String,
    data: ReceiverData,
) -> Result<(bool, ReceiverData), ApiError> {
    let name = data.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Receiver name cannot be empty".into()));
    }
    let email = normalize_email(&data.email)?;

    let row = ReceiverDataRow {
        user_id,
        name: name.clone(),
        email: email.clone(),
        updated_at: Utc::now().to_rfc3339(),
    };
    let created = state
        .with_db(move |db| db.upsert_receiver_data(&row))
        .await?;
    Ok((created, ReceiverData { name, email }))
}
