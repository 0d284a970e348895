//! Database row types. These map directly to SQLite rows; JSON columns are
//! kept as text until converted into `dearly-types` models.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use tracing::warn;

use dearly_types::models::{
    AuthProvider, Game, GameType, Notification, NotificationKind, Role, UserProfile,
};

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: Option<String>,
    pub display_name: String,
    pub role: String,
    pub provider: String,
    pub email_verified: bool,
    pub created_at: String,
}

impl UserRow {
    pub fn into_profile(self) -> UserProfile {
        UserProfile {
            role: Role::parse(&self.role).unwrap_or_else(|| {
                warn!("Unknown role '{}' on user '{}'", self.role, self.id);
                Role::Sender
            }),
            provider: AuthProvider::parse(&self.provider).unwrap_or(AuthProvider::Password),
            created_at: parse_timestamp(&self.created_at),
            id: self.id,
            email: self.email,
            display_name: self.display_name,
            email_verified: self.email_verified,
        }
    }
}

pub struct GameRow {
    pub id: String,
    pub owner_id: String,
    pub game_type: String,
    pub title: String,
    pub questions: Option<String>,
    pub pairs: Option<String>,
    pub settings: String,
    pub has_reward: bool,
    pub rewards: Option<String>,
    pub is_completed: bool,
    pub claimed_reward_id: Option<String>,
    pub reward_fulfilled: bool,
    pub completed_at: Option<String>,
    pub created_at: String,
    pub letter_id: Option<String>,
}

impl GameRow {
    /// Build a row from an API game, serialising the JSON columns.
    pub fn from_game(owner_id: &str, game: &Game) -> Result<Self> {
        Ok(Self {
            id: game.id.clone(),
            owner_id: owner_id.to_string(),
            game_type: game.game_type.as_str().to_string(),
            title: game.title.clone(),
            questions: game.questions.as_ref().map(serde_json::to_string).transpose()?,
            pairs: game.pairs.as_ref().map(serde_json::to_string).transpose()?,
            settings: serde_json::to_string(&game.settings)?,
            has_reward: game.has_reward,
            rewards: game.rewards.as_ref().map(serde_json::to_string).transpose()?,
            is_completed: game.is_completed,
            claimed_reward_id: game.claimed_reward_id.clone(),
            reward_fulfilled: game.reward_fulfilled,
            completed_at: game.completed_at.map(|t| t.to_rfc3339()),
            created_at: game.created_at.to_rfc3339(),
            letter_id: game.letter_id.clone(),
        })
    }

    pub fn into_game(self) -> Result<Game> {
        let game_type = GameType::parse(&self.game_type)
            .ok_or_else(|| anyhow!("Unknown game type '{}' on game '{}'", self.game_type, self.id))?;

        Ok(Game {
            game_type,
            questions: self.questions.as_deref().map(serde_json::from_str).transpose()?,
            pairs: self.pairs.as_deref().map(serde_json::from_str).transpose()?,
            settings: serde_json::from_str(&self.settings)?,
            rewards: self.rewards.as_deref().map(serde_json::from_str).transpose()?,
            completed_at: self.completed_at.as_deref().map(parse_timestamp),
            created_at: parse_timestamp(&self.created_at),
            id: self.id,
            title: self.title,
            has_reward: self.has_reward,
            is_completed: self.is_completed,
            claimed_reward_id: self.claimed_reward_id,
            reward_fulfilled: self.reward_fulfilled,
            letter_id: self.letter_id,
        })
    }
}

pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub message: String,
    pub read: bool,
    pub created_at: String,
}

impl NotificationRow {
    pub fn from_notification(user_id: &str, n: &Notification) -> Result<Self> {
        Ok(Self {
            id: n.id.clone(),
            user_id: user_id.to_string(),
            kind: serde_json::to_string(&n.kind)?,
            message: n.message.clone(),
            read: n.read,
            created_at: n.created_at.to_rfc3339(),
        })
    }

    pub fn into_notification(self) -> Result<Notification> {
        let kind: NotificationKind = serde_json::from_str(&self.kind)?;
        Ok(Notification {
            kind,
            created_at: parse_timestamp(&self.created_at),
            id: self.id,
            message: self.message,
            read: self.read,
        })
    }
}

pub struct ReceiverDataRow {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub updated_at: String,
}

pub struct ReceiverLinkRow {
    pub sender_id: String,
    pub receiver_id: String,
    pub linked_at: String,
}

/// Parse a stored timestamp. Rows written by this crate use RFC 3339;
/// SQLite's `datetime('now')` format is accepted as naive UTC.
pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}
