use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use dearly_db::models::NotificationRow;
use dearly_types::api::{Claims, NotificationsResponse};
use dearly_types::events::GatewayEvent;
use dearly_types::models::{Notification, NotificationKind};

use crate::access::require_owner;
use crate::auth::AppState;
use crate::error::ApiError;

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&claims, &user_id)?;

    let response = state
        .with_db(move |db| {
            let notifications = db
                .list_notifications(&user_id)?
                .into_iter()
                .map(|row| row.into_notification())
                .collect::<anyhow::Result<Vec<_>>>()?;
            let unread_count = notifications.iter().filter(|n| !n.read).count();
            Ok(NotificationsResponse {
                notifications,
                unread_count,
            })
        })
        .await?;

    Ok(Json(response))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((user_id, notification_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&claims, &user_id)?;

    let uid = user_id.clone();
    let found = state
        .with_db(move |db| db.mark_notification_read(&uid, &notification_id))
        .await?;
    if !found {
        return Err(ApiError::NotFound("Notification"));
    }

    publish_unread_count(&state, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&claims, &user_id)?;

    let uid = user_id.clone();
    let changed = state
        .with_db(move |db| db.mark_all_notifications_read(&uid))
        .await?;
    debug!("Marked {} notifications read for {}", changed, user_id);

    publish_unread_count(&state, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_notification(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((user_id, notification_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&claims, &user_id)?;

    let uid = user_id.clone();
    let found = state
        .with_db(move |db| db.delete_notification(&uid, &notification_id))
        .await?;
    if !found {
        return Err(ApiError::NotFound("Notification"));
    }

    publish_unread_count(&state, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn clear_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&claims, &user_id)?;

    let uid = user_id.clone();
    let removed = state
        .with_db(move |db| db.clear_notifications(&uid))
        .await?;
    debug!("Cleared {} notifications for {}", removed, user_id);

    publish_unread_count(&state, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Store a notification for `user_id` and push it to their open connections.
pub async fn notify(
    state: &AppState,
    user_id: &str,
    kind: NotificationKind,
) -> Result<Notification, ApiError> {
    let notification = Notification {
        id: Uuid::new_v4().to_string(),
        message: kind.format_message(),
        kind,
        read: false,
        created_at: Utc::now(),
    };
    let row = NotificationRow::from_notification(user_id, &notification)?;

    let uid = user_id.to_string();
    let unread_count = state
        .with_db(move |db| {
            db.insert_notification(&row)?;
            db.unread_notification_count(&uid)
        })
        .await?;

    debug!("Notified {}: {}", user_id, notification.kind.type_str());
    state.dispatcher.publish(
        user_id,
        GatewayEvent::NotificationCreated {
            notification: notification.clone(),
        },
    );
    state
        .dispatcher
        .publish(user_id, GatewayEvent::NotificationsChanged { unread_count });

    Ok(notification)
}

async fn publish_unread_count(state: &AppState, user_id: String) -> Result<(), ApiError> {
    let uid = user_id.clone();
    let unread_count = state
        .with_db(move |db| db.unread_notification_count(&uid))
        .await?;
    state
        .dispatcher
        .publish(&user_id, GatewayEvent::NotificationsChanged { unread_count });
    Ok(())
}
