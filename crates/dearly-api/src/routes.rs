use axum::{
    Json, Router,
    extract::State,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use serde_json::json;

use crate::auth::{self, AppState};
use crate::middleware::require_auth;
use crate::{audio, games, notifications, receivers, users, viewed_rewards};

/// Every REST route of the backend. The WebSocket gateway and the outer
/// layers (CORS, tracing) are added by the server binary.
pub fn api_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/audio-proxy/{*path}", get(audio::proxy_audio))
        .route("/health", get(health));

    let protected_routes = Router::new()
        // Accounts
        .route(
            "/api/auth/user/{user_id}",
            get(users::get_profile)
                .post(users::create_profile)
                .put(users::update_profile),
        )
        .route("/api/auth/save-google-user", post(users::save_google_user))
        .route(
            "/api/auth/check-verification/{user_id}",
            get(users::check_verification),
        )
        // Games
        .route(
            "/api/games/{user_id}/viewed-rewards",
            get(viewed_rewards::get_viewed_rewards).put(viewed_rewards::save_viewed_rewards),
        )
        .route(
            "/api/games/{user_id}",
            get(games::list_games).post(games::create_game),
        )
        .route(
            "/api/games/{user_id}/{game_id}",
            get(games::get_game)
                .put(games::update_game)
                .delete(games::delete_game),
        )
        .route(
            "/api/games/{user_id}/{game_id}/completion",
            get(games::get_completion),
        )
        .route(
            "/api/games/{user_id}/{game_id}/complete",
            put(games::complete_game),
        )
        .route(
            "/api/games/{user_id}/{game_id}/fulfill",
            put(games::fulfill_reward),
        )
        // Receivers
        .route("/api/receiver-accounts/link", post(receivers::link_receiver))
        .route(
            "/api/receiver-data/{user_id}",
            get(receivers::get_receiver_data)
                .post(receivers::create_receiver_data)
                .put(receivers::update_receiver_data),
        )
        // Notifications
        .route(
            "/api/notifications/{user_id}",
            get(notifications::list_notifications).delete(notifications::clear_notifications),
        )
        .route(
            "/api/notifications/{user_id}/read-all",
            put(notifications::mark_all_read),
        )
        .route(
            "/api/notifications/{user_id}/{notification_id}",
            delete(notifications::delete_notification),
        )
        .route(
            "/api/notifications/{user_id}/{notification_id}/read",
            put(notifications::mark_read),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "connections": state.dispatcher.connection_count().await,
    }))
}
