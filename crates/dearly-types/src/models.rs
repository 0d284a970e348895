use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// -- Games --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameType {
    Quiz,
    MemoryMatch,
}

impl GameType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quiz => "quiz",
            Self::MemoryMatch => "memory-match",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "quiz" => Some(Self::Quiz),
            "memory-match" => Some(Self::MemoryMatch),
            _ => None,
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub correct_answer: String,
    #[serde(default)]
    pub wrong_answers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryPair {
    pub id: String,
    pub front: String,
    pub back: String,
}

/// A game as stored by the backend and returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    #[serde(rename = "type")]
    pub game_type: GameType,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<QuizQuestion>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pairs: Option<Vec<MemoryPair>>,
    #[serde(default)]
    pub settings: serde_json::Value,
    #[serde(default)]
    pub has_reward: bool,
    #[serde(default)]
    pub rewards: Option<RewardSet>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default, deserialize_with = "lenient_string")]
    pub claimed_reward_id: Option<String>,
    #[serde(default)]
    pub reward_fulfilled: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letter_id: Option<String>,
}

// -- Rewards --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RewardType {
    FoodDrink,
    DateOuting,
    EmotionalDigital,
}

impl RewardType {
    pub const ALL: [RewardType; 3] = [Self::FoodDrink, Self::DateOuting, Self::EmotionalDigital];

    /// Display name shown next to the reward category.
    pub fn type_name(self) -> &'static str {
        match self {
            Self::FoodDrink => "Food & Drink",
            Self::DateOuting => "Date & Outing",
            Self::EmotionalDigital => "Emotional & Digital",
        }
    }

    /// Whether rewards of this category are usually delivered in person.
    pub fn is_physical_by_default(self) -> bool {
        !matches!(self, Self::EmotionalDigital)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(
        rename = "_id",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_string"
    )]
    pub legacy_id: Option<String>,
    #[serde(rename = "type")]
    pub reward_type: RewardType,
    #[serde(default)]
    pub type_name: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_physical: bool,
    #[serde(default)]
    pub instructions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<RewardIndex>,
}

/// The `index` property of a reward.
///
/// Written by current code as the array position. Older records sometimes
/// hold arbitrary text there, which is kept so it can still be matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewardIndex {
    Position(u32),
    Label(String),
}

impl RewardIndex {
    pub fn position(&self) -> Option<u32> {
        match self {
            Self::Position(n) => Some(*n),
            Self::Label(_) => None,
        }
    }
}

impl From<u32> for RewardIndex {
    fn from(n: u32) -> Self {
        Self::Position(n)
    }
}

impl fmt::Display for RewardIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position(n) => write!(f, "{n}"),
            Self::Label(s) => f.write_str(s),
        }
    }
}

impl Serialize for RewardIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Position(n) => serializer.serialize_u32(*n),
            Self::Label(s) => serializer.serialize_str(s),
        }
    }
}

/// Positions were written both as numbers and as numeric strings.
impl<'de> Deserialize<'de> for RewardIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = lenient_string(deserializer)?
            .ok_or_else(|| serde::de::Error::custom("reward index is null"))?;
        Ok(match raw.trim().parse() {
            Ok(n) => Self::Position(n),
            Err(_) => Self::Label(raw),
        })
    }
}

/// Rewards attached to a game.
///
/// Current data is always a list; older records stored rewards as an object
/// keyed by arbitrary strings, which is still accepted on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RewardSet {
    List(Vec<Reward>),
    Keyed(BTreeMap<String, Reward>),
}

impl RewardSet {
    pub fn len(&self) -> usize {
        match self {
            Self::List(v) => v.len(),
            Self::Keyed(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = &Reward> + '_> {
        match self {
            Self::List(v) => Box::new(v.iter()),
            Self::Keyed(m) => Box::new(m.values()),
        }
    }

    /// Position lookup. Map-shaped sets are addressed by the decimal key.
    pub fn at(&self, position: usize) -> Option<&Reward> {
        match self {
            Self::List(v) => v.get(position),
            Self::Keyed(m) => m.get(&position.to_string()),
        }
    }

    pub fn by_key(&self, key: &str) -> Option<&Reward> {
        match self {
            Self::List(_) => None,
            Self::Keyed(m) => m.get(key),
        }
    }

    pub fn into_vec(self) -> Vec<Reward> {
        match self {
            Self::List(v) => v,
            Self::Keyed(m) => m.into_values().collect(),
        }
    }
}

// -- Notifications --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum NotificationKind {
    GameCompleted {
        game_id: String,
        game_title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reward_name: Option<String>,
    },
    RewardFulfilled {
        game_id: String,
        reward_name: String,
    },
    ReceiverLinked {
        receiver_name: String,
    },
    LetterRead {
        letter_id: String,
    },
}

impl NotificationKind {
    pub fn type_str(&self) -> &'static str {
        match self {
            Self::GameCompleted { .. } => "game-completed",
            Self::RewardFulfilled { .. } => "reward-fulfilled",
            Self::ReceiverLinked { .. } => "receiver-linked",
            Self::LetterRead { .. } => "letter-read",
        }
    }

    /// Human-readable message stored alongside the notification.
    pub fn format_message(&self) -> String {
        match self {
            Self::GameCompleted {
                game_title,
                reward_name: Some(reward),
                ..
            } => format!("Your special someone finished \"{game_title}\" and won {reward}!"),
            Self::GameCompleted { game_title, .. } => {
                format!("Your special someone finished \"{game_title}\"!")
            }
            Self::RewardFulfilled { reward_name, .. } => {
                format!("Your reward \"{reward_name}\" has been fulfilled")
            }
            Self::ReceiverLinked { receiver_name } => {
                format!("{receiver_name} linked their account to yours")
            }
            Self::LetterRead { .. } => "Your letter was read".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(flatten)]
    pub kind: NotificationKind,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

// -- Accounts --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverData {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Sender,
    Receiver,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sender => "sender",
            Self::Receiver => "receiver",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sender" => Some(Self::Sender),
            "receiver" => Some(Self::Receiver),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Password,
    Google,
}

impl AuthProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::Google => "google",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "password" => Some(Self::Password),
            "google" => Some(Self::Google),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub provider: AuthProvider,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Accepts either a JSON string or number and keeps it as a string.
/// Historical records carry reward ids and indices in both shapes.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Float(f64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Str(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(f) => f.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reward_accepts_numeric_index_and_legacy_id() {
        let reward: Reward = serde_json::from_value(serde_json::json!({
            "_id": 17,
            "type": "date-outing",
            "name": "Picnic",
            "index": 1
        }))
        .unwrap();

        assert_eq!(reward.legacy_id.as_deref(), Some("17"));
        assert_eq!(reward.index, Some(RewardIndex::Position(1)));
        assert_eq!(reward.reward_type, RewardType::DateOuting);
        assert!(reward.id.is_none());
    }

    #[test]
    fn reward_keeps_non_numeric_index() {
        let reward: Reward = serde_json::from_value(serde_json::json!({
            "type": "food-drink",
            "name": "Cake",
            "index": "abc"
        }))
        .unwrap();
        assert_eq!(reward.index, Some(RewardIndex::Label("abc".into())));

        let quoted: Reward = serde_json::from_value(serde_json::json!({
            "type": "food-drink",
            "name": "Cake",
            "index": " 2"
        }))
        .unwrap();
        assert_eq!(quoted.index, Some(RewardIndex::Position(2)));

        let json = serde_json::to_value(&reward).unwrap();
        assert_eq!(json["index"], "abc");
        let json = serde_json::to_value(&quoted).unwrap();
        assert_eq!(json["index"], 2);
    }

    #[test]
    fn reward_set_accepts_map_shape() {
        let set: RewardSet = serde_json::from_value(serde_json::json!({
            "first": { "type": "food-drink", "name": "Cake" },
            "0": { "type": "emotional-digital", "name": "Playlist" }
        }))
        .unwrap();

        assert!(matches!(set, RewardSet::Keyed(_)));
        assert_eq!(set.by_key("first").map(|r| r.name.as_str()), Some("Cake"));
        assert_eq!(set.at(0).map(|r| r.name.as_str()), Some("Playlist"));
    }

    #[test]
    fn notification_flattens_kind_fields() {
        let kind = NotificationKind::GameCompleted {
            game_id: "g1".into(),
            game_title: "Our Quiz".into(),
            reward_name: Some("Dinner".into()),
        };
        let n = Notification {
            id: "n1".into(),
            message: kind.format_message(),
            kind,
            read: false,
            created_at: Utc::now(),
        };

        let value = serde_json::to_value(&n).unwrap();
        assert_eq!(value["type"], "game-completed");
        assert_eq!(value["gameId"], "g1");
        assert_eq!(value["gameTitle"], "Our Quiz");
        assert_eq!(value["read"], false);

        let back: Notification = serde_json::from_value(value).unwrap();
        assert_eq!(back, n);
    }

    #[test]
    fn game_type_uses_kebab_case() {
        assert_eq!(serde_json::to_value(GameType::MemoryMatch).unwrap(), "memory-match");
        assert_eq!(GameType::parse("quiz"), Some(GameType::Quiz));
        assert_eq!(GameType::parse("trivia"), None);
    }
}
