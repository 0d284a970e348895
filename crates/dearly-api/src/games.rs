use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use dearly_db::models::GameRow;
use dearly_games::resolve_claimed_reward;
use dearly_games::reward_setup::REWARD_SLOTS;
use dearly_games::wizard::QuizSetup;
use dearly_types::api::{Claims, CompleteGameRequest, CompletionResponse, GameDraft};
use dearly_types::events::GatewayEvent;
use dearly_types::models::{Game, GameType, NotificationKind, Reward, RewardIndex, RewardSet};

use crate::access::{require_owner, require_owner_or_receiver};
use crate::auth::AppState;
use crate::error::ApiError;
use crate::notifications::notify;

pub async fn list_games(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner_or_receiver(&state, &claims, &user_id).await?;
    Ok(Json(load_games(&state, user_id).await?))
}

pub async fn get_game(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((user_id, game_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner_or_receiver(&state, &claims, &user_id).await?;
    Ok(Json(load_game(&state, user_id, game_id).await?))
}

pub async fn create_game(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
    Json(draft): Json<GameDraft>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&claims, &user_id)?;
    let draft = validate_draft(draft)?;

    let existing = load_games(&state, user_id.clone()).await?;
    let replace = same_type_game(&existing, draft.game_type, None, draft.replace_existing)?;

    let game = Game {
        id: Uuid::new_v4().to_string(),
        game_type: draft.game_type,
        title: draft.title,
        questions: draft.questions,
        pairs: draft.pairs,
        settings: draft.settings,
        has_reward: draft.has_reward,
        rewards: draft.rewards.map(RewardSet::List),
        is_completed: false,
        claimed_reward_id: None,
        reward_fulfilled: false,
        completed_at: None,
        created_at: Utc::now(),
        letter_id: draft.letter_id,
    };
    let row = GameRow::from_game(&user_id, &game)?;

    state
        .with_db(move |db| db.insert_game(&row, replace.as_deref()))
        .await
        .map_err(|e| match e {
            ApiError::Conflict(_) => type_conflict(game.game_type),
            other => other,
        })?;

    info!("{} created {} game {}", user_id, game.game_type, game.id);
    publish_games_changed(&state, &user_id).await;

    Ok((StatusCode::CREATED, Json(game)))
}

pub async fn update_game(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((user_id, game_id)): Path<(String, String)>,
    Json(mut draft): Json<GameDraft>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&claims, &user_id)?;

    let existing = load_games(&state, user_id.clone()).await?;
    let current = existing
        .iter()
        .find(|g| g.id == game_id)
        .cloned()
        .ok_or(ApiError::NotFound("Game"))?;
    let stored = current
        .rewards
        .as_ref()
        .filter(|_| current.game_type == draft.game_type);
    if let (Some(rewards), Some(stored)) = (draft.rewards.as_mut(), stored) {
        inherit_reward_ids(rewards, stored);
    }
    let draft = validate_draft(draft)?;
    let replace = same_type_game(&existing, draft.game_type, Some(&game_id), draft.replace_existing)?;

    // Completion columns are left to the database, which resets them on a type change
    let mut game = current;
    game.game_type = draft.game_type;
    game.title = draft.title;
    game.questions = draft.questions;
    game.pairs = draft.pairs;
    game.settings = draft.settings;
    game.has_reward = draft.has_reward;
    game.rewards = draft.rewards.map(RewardSet::List);
    game.letter_id = draft.letter_id;

    let row = GameRow::from_game(&user_id, &game)?;
    let game_type = game.game_type;
    let updated = state
        .with_db(move |db| db.update_game(&row, replace.as_deref()))
        .await
        .map_err(|e| match e {
            ApiError::Conflict(_) => type_conflict(game_type),
            other => other,
        })?;
    if !updated {
        return Err(ApiError::NotFound("Game"));
    }
    let game = load_game(&state, user_id.clone(), game_id).await?;

    info!("{} updated game {}", user_id, game.id);
    publish_games_changed(&state, &user_id).await;

    Ok(Json(game))
}

pub async fn delete_game(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((user_id, game_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&claims, &user_id)?;

    let uid = user_id.clone();
    let deleted = state
        .with_db(move |db| db.delete_game(&uid, &game_id))
        .await?;
    if !deleted {
        return Err(ApiError::NotFound("Game"));
    }

    publish_games_changed(&state, &user_id).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_completion(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((user_id, game_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner_or_receiver(&state, &claims, &user_id).await?;
    let game = load_game(&state, user_id, game_id).await?;
    Ok(Json(completion_response(&game)))
}

/// Mark a game as played. The claimed reward is stored as sent and
/// resolved through the matching rules when it is read back.
pub async fn complete_game(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((user_id, game_id)): Path<(String, String)>,
    Json(req): Json<CompleteGameRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner_or_receiver(&state, &claims, &user_id).await?;

    let mut game = load_game(&state, user_id.clone(), game_id).await?;
    if game.is_completed {
        return Err(already_completed());
    }

    let completed_at = Utc::now();
    let claimed = if game.has_reward {
        req.claimed_reward_id.filter(|id| !id.trim().is_empty())
    } else {
        None
    };

    let (owner, id, claim) = (user_id.clone(), game.id.clone(), claimed.clone());
    let stamp = completed_at.to_rfc3339();
    let won = state
        .with_db(move |db| db.complete_game(&owner, &id, claim.as_deref(), &stamp))
        .await?;
    // Another completion got there between the read and the write
    if !won {
        return Err(already_completed());
    }

    game.is_completed = true;
    game.completed_at = Some(completed_at);
    game.claimed_reward_id = claimed;

    let response = completion_response(&game);
    let reward_name = response.claimed_reward.as_ref().map(|r| r.name.clone());
    info!(
        "{} completed game {} (reward matched by {})",
        claims.sub, game.id, response.matched_by
    );

    notify(
        &state,
        &user_id,
        NotificationKind::GameCompleted {
            game_id: game.id.clone(),
            game_title: game.title.clone(),
            reward_name: reward_name.clone(),
        },
    )
    .await?;
    state.dispatcher.publish(
        &user_id,
        GatewayEvent::GameCompleted {
            game_id: game.id.clone(),
            game_type: game.game_type,
            claimed_reward_id: game.claimed_reward_id.clone(),
            reward_name,
        },
    );
    publish_games_changed(&state, &user_id).await;

    Ok(Json(response))
}

/// The sender marks the claimed reward as delivered; linked receivers are told.
pub async fn fulfill_reward(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((user_id, game_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&claims, &user_id)?;

    let mut game = load_game(&state, user_id.clone(), game_id).await?;
    if game.reward_fulfilled {
        return Ok(Json(game));
    }
    let reward_name = resolve_claimed_reward(&game)
        .reward()
        .map(|r| r.name.clone())
        .ok_or_else(|| ApiError::BadRequest("Game has no claimed reward to fulfill".into()))?;

    let (owner, id) = (user_id.clone(), game.id.clone());
    let first = state
        .with_db(move |db| db.mark_reward_fulfilled(&owner, &id))
        .await?;
    game.reward_fulfilled = true;
    if !first {
        return Ok(Json(game));
    }

    let sender = user_id.clone();
    let receivers = state
        .with_db(move |db| db.linked_receivers(&sender))
        .await?;
    for receiver in &receivers {
        notify(
            &state,
            receiver,
            NotificationKind::RewardFulfilled {
                game_id: game.id.clone(),
                reward_name: reward_name.clone(),
            },
        )
        .await?;
    }
    publish_games_changed(&state, &user_id).await;

    Ok(Json(game))
}

fn already_completed() -> ApiError {
    ApiError::Conflict("Game is already completed".into())
}

/// Check and tidy a create/update body.
fn validate_draft(mut draft: GameDraft) -> Result<GameDraft, ApiError> {
    match draft.game_type {
        GameType::Quiz => {
            let quiz = QuizSetup {
                title: draft.title.clone(),
                questions: draft.questions.take().unwrap_or_default(),
                settings: draft.settings.clone(),
            }
            .validate()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            draft.title = quiz.title;
            draft.questions = Some(quiz.questions);
            draft.pairs = None;
        }
        GameType::MemoryMatch => {
            draft.title = draft.title.trim().to_string();
            if draft.title.is_empty() {
                return Err(ApiError::BadRequest("Game title cannot be empty".into()));
            }
            draft.questions = None;
        }
    }

    if draft.settings.is_null() {
        draft.settings = serde_json::Value::Object(Default::default());
    }

    draft.rewards = if draft.has_reward {
        match draft.rewards.take() {
            Some(rewards) if rewards.len() == REWARD_SLOTS => Some(normalize_rewards(rewards)),
            Some(rewards) => {
                return Err(ApiError::BadRequest(format!(
                    "Games with rewards need exactly {} rewards, got {}",
                    REWARD_SLOTS,
                    rewards.len()
                )));
            }
            None => {
                return Err(ApiError::BadRequest("hasReward is set but rewards is null".into()));
            }
        }
    } else {
        None
    };

    Ok(draft)
}

/// Rewards sent without an id take the id of the stored reward in the same
/// slot, so an existing claim still resolves after an edit.
pub(crate) fn inherit_reward_ids(rewards: &mut [Reward], stored: &RewardSet) {
    for (position, reward) in rewards.iter_mut().enumerate() {
        if reward.id.as_deref().is_some_and(|id| !id.trim().is_empty()) {
            continue;
        }
        if let Some(previous) = stored.at(position) {
            reward.id = previous.id.clone();
            if reward.legacy_id.is_none() {
                reward.legacy_id = previous.legacy_id.clone();
            }
        }
    }
}

/// Give every reward a stable id and make `index` match its position.
pub(crate) fn normalize_rewards(rewards: Vec<Reward>) -> Vec<Reward> {
    rewards
        .into_iter()
        .enumerate()
        .map(|(position, mut reward)| {
            if reward.id.as_deref().is_none_or(|id| id.trim().is_empty()) {
                reward.id = Some(Uuid::new_v4().to_string());
            }
            reward.index = Some(RewardIndex::Position(position as u32));
            if reward.type_name.is_empty() {
                reward.type_name = reward.reward_type.type_name().to_string();
            }
            reward
        })
        .collect()
}

/// The id of another game of `game_type`, if replacing it was requested.
fn same_type_game(
    games: &[Game],
    game_type: GameType,
    except: Option<&str>,
    replace_existing: bool,
) -> Result<Option<String>, ApiError> {
    let Some(other) = games
        .iter()
        .find(|g| g.game_type == game_type && Some(g.id.as_str()) != except)
    else {
        return Ok(None);
    };

    if replace_existing {
        debug!("Replacing {} game {}", game_type, other.id);
        Ok(Some(other.id.clone()))
    } else {
        Err(type_conflict(game_type))
    }
}

fn type_conflict(game_type: GameType) -> ApiError {
    ApiError::Conflict(format!("A {} game already exists", game_type))
}

fn completion_response(game: &Game) -> CompletionResponse {
    let matched = resolve_claimed_reward(game);
    CompletionResponse {
        game_id: game.id.clone(),
        is_completed: game.is_completed,
        claimed_reward_id: game.claimed_reward_id.clone(),
        claimed_reward: matched.reward().cloned(),
        matched_by: matched.label().to_string(),
        reward_fulfilled: game.reward_fulfilled,
        completed_at: game.completed_at,
    }
}

async fn load_games(state: &AppState, owner_id: String) -> Result<Vec<Game>, ApiError> {
    state
        .with_db(move |db| {
            let mut games = Vec::new();
            for row in db.list_games(&owner_id)? {
                let id = row.id.clone();
                match row.into_game() {
                    Ok(game) => games.push(game),
                    Err(e) => warn!("Skipping unreadable game {}: {:#}", id, e),
                }
            }
            Ok(games)
        })
        .await
}

async fn load_game(state: &AppState, owner_id: String, game_id: String) -> Result<Game, ApiError> {
    state
        .with_db(move |db| db.get_game(&owner_id, &game_id)?.map(|row| row.into_game()).transpose())
        .await?
        .ok_or(ApiError::NotFound("Game"))
}

/// Tell the sender and every linked receiver that the game list changed.
async fn publish_games_changed(state: &AppState, owner_id: &str) {
    let event = GatewayEvent::GamesChanged {
        owner_id: owner_id.to_string(),
    };
    state.dispatcher.publish(owner_id, event.clone());

    let sender = owner_id.to_string();
    match state.with_db(move |db| db.linked_receivers(&sender)).await {
        Ok(receivers) => {
            for receiver in receivers {
                state.dispatcher.publish(&receiver, event.clone());
            }
        }
        Err(e) => warn!("Could not look up receivers of {}: {}", owner_id, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dearly_types::models::{QuizQuestion, RewardType};

    fn reward(name: &str, id: Option<&str>) -> Reward {
        Reward {
            id: id.map(str::to_string),
            legacy_id: None,
            reward_type: RewardType::FoodDrink,
            type_name: String::new(),
            name: name.into(),
            description: String::new(),
            is_physical: true,
            instructions: String::new(),
            index: Some(RewardIndex::Label("seven".into())),
        }
    }

    fn quiz_draft() -> GameDraft {
        GameDraft {
            game_type: GameType::Quiz,
            title: "  Our story  ".into(),
            questions: Some(vec![QuizQuestion {
                question: "Where did we meet?".into(),
                correct_answer: "Lisbon".into(),
                wrong_answers: vec!["Porto".into(), " ".into()],
            }]),
            pairs: None,
            settings: serde_json::Value::Null,
            has_reward: false,
            rewards: Some(vec![reward("ignored", None)]),
            letter_id: None,
            replace_existing: false,
        }
    }

    #[test]
    fn edited_rewards_inherit_stored_ids() {
        let stored = RewardSet::List(normalize_rewards(vec![
            reward("Dinner", Some("id-0")),
            reward("Picnic", Some("id-1")),
            reward("Poem", Some("id-2")),
        ]));
        let mut edited = vec![
            reward("Brunch", None),
            reward("Picnic", Some("  ")),
            reward("Song", Some("fresh")),
        ];
        inherit_reward_ids(&mut edited, &stored);
        let ids: Vec<_> = edited.iter().map(|r| r.id.as_deref()).collect();
        assert_eq!(ids, vec![Some("id-0"), Some("id-1"), Some("fresh")]);
    }

    #[test]
    fn normalize_assigns_ids_and_positions() {
        let rewards = normalize_rewards(vec![
            reward("Dinner", Some("keep-me")),
            reward("Picnic", None),
            reward("Poem", Some("  ")),
        ]);
        assert_eq!(rewards[0].id.as_deref(), Some("keep-me"));
        assert!(rewards[1].id.is_some());
        assert_ne!(rewards[2].id.as_deref(), Some("  "));
        let indexes: Vec<_> = rewards
            .iter()
            .map(|r| r.index.as_ref().and_then(RewardIndex::position))
            .collect();
        assert_eq!(indexes, vec![Some(0), Some(1), Some(2)]);
        assert_eq!(rewards[0].type_name, "Food & Drink");
    }

    #[test]
    fn quiz_draft_without_reward_drops_rewards() {
        let draft = validate_draft(quiz_draft()).unwrap();
        assert_eq!(draft.title, "Our story");
        assert!(draft.rewards.is_none());
        assert_eq!(draft.questions.unwrap()[0].wrong_answers, vec!["Porto".to_string()]);
        assert!(draft.settings.is_object());
    }

    #[test]
    fn reward_count_is_enforced() {
        let mut draft = quiz_draft();
        draft.has_reward = true;
        draft.rewards = Some(vec![reward("Only one", None)]);
        assert!(matches!(validate_draft(draft), Err(ApiError::BadRequest(_))));

        let mut draft = quiz_draft();
        draft.has_reward = true;
        draft.rewards = None;
        assert!(matches!(validate_draft(draft), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn quiz_needs_questions() {
        let mut draft = quiz_draft();
        draft.questions = None;
        assert!(matches!(validate_draft(draft), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn same_type_detection() {
        let draft = validate_draft(quiz_draft()).unwrap();
        let game = Game {
            id: "g1".into(),
            game_type: GameType::Quiz,
            title: draft.title,
            questions: draft.questions,
            pairs: None,
            settings: draft.settings,
            has_reward: false,
            rewards: None,
            is_completed: false,
            claimed_reward_id: None,
            reward_fulfilled: false,
            completed_at: None,
            created_at: Utc::now(),
            letter_id: None,
        };
        let games = vec![game];

        assert!(matches!(
            same_type_game(&games, GameType::Quiz, None, false),
            Err(ApiError::Conflict(_))
        ));
        assert_eq!(
            same_type_game(&games, GameType::Quiz, None, true).unwrap(),
            Some("g1".to_string())
        );
        assert_eq!(same_type_game(&games, GameType::Quiz, Some("g1"), false).unwrap(), None);
        assert_eq!(same_type_game(&games, GameType::MemoryMatch, None, false).unwrap(), None);
    }
}
