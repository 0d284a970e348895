use dearly_types::models::{Game, Reward, RewardSet};
use tracing::warn;

/// Outcome of resolving a game's `claimedRewardId` against its rewards.
///
/// Variants are listed in priority order; the first rule that finds a reward wins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RewardMatch<'a> {
    /// `id` or `_id` equals the claimed id.
    ById(&'a Reward),
    /// The reward's `index` property equals the claimed id (or its `_<n>` suffix).
    ByIndexProperty(&'a Reward),
    /// The claimed id parsed as a number and used as an array position.
    ByPosition(usize, &'a Reward),
    /// The claimed id used as a key into map-shaped rewards.
    ByKey(&'a Reward),
    Unmatched,
}

impl<'a> RewardMatch<'a> {
    pub fn reward(&self) -> Option<&'a Reward> {
        match *self {
            Self::ById(r) | Self::ByIndexProperty(r) | Self::ByPosition(_, r) | Self::ByKey(r) => {
                Some(r)
            }
            Self::Unmatched => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ById(_) => "id",
            Self::ByIndexProperty(_) => "index",
            Self::ByPosition(..) => "position",
            Self::ByKey(_) => "key",
            Self::Unmatched => "none",
        }
    }

    pub fn is_matched(&self) -> bool {
        !matches!(self, Self::Unmatched)
    }
}

/// Find the reward a completed game awarded.
///
/// Never fails: games without a claim or without rewards resolve to
/// [`RewardMatch::Unmatched`] silently, a claim that matches nothing logs a warning.
pub fn resolve_claimed_reward(game: &Game) -> RewardMatch<'_> {
    let claimed = match game.claimed_reward_id.as_deref() {
        Some(c) if !c.trim().is_empty() => c,
        _ => return RewardMatch::Unmatched,
    };
    let rewards = match game.rewards.as_ref() {
        Some(r) if !r.is_empty() => r,
        _ => return RewardMatch::Unmatched,
    };

    let result = match_reward(claimed, rewards);
    if !result.is_matched() {
        warn!(
            "Game {} claims reward '{}' but none of its {} rewards match",
            game.id,
            claimed,
            rewards.len()
        );
    }
    result
}

/// Run the matching rules for a single claimed id.
pub fn match_reward<'a>(claimed: &str, rewards: &'a RewardSet) -> RewardMatch<'a> {
    if let Some(r) = rewards
        .iter()
        .find(|r| r.id.as_deref() == Some(claimed) || r.legacy_id.as_deref() == Some(claimed))
    {
        return RewardMatch::ById(r);
    }

    let suffix = trailing_number(claimed);
    if let Some(r) = rewards.iter().find(|r| match &r.index {
        Some(idx) => {
            idx.to_string() == claimed
                || idx.position().is_some_and(|p| suffix == Some(p as usize))
        }
        None => false,
    }) {
        return RewardMatch::ByIndexProperty(r);
    }

    if let Some(pos) = leading_number(claimed).or(suffix) {
        if let Some(r) = rewards.at(pos) {
            return RewardMatch::ByPosition(pos, r);
        }
    }

    if let Some(r) = rewards.by_key(claimed) {
        return RewardMatch::ByKey(r);
    }

    RewardMatch::Unmatched
}

/// Leading non-negative integer, skipping whitespace and an optional `+`,
/// the way a lenient browser integer parse reads it (`"2abc"` is 2).
fn leading_number(s: &str) -> Option<usize> {
    let s = s.trim_start();
    let s = s.strip_prefix('+').unwrap_or(s);
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s[..end].parse().ok()
}

/// Digits after the last underscore, e.g. `reward_index_2` is 2.
fn trailing_number(s: &str) -> Option<usize> {
    let (_, digits) = s.rsplit_once('_')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dearly_types::models::{GameType, RewardIndex, RewardType};
    use std::collections::BTreeMap;

    fn reward(name: &str, id: Option<&str>, index: Option<u32>) -> Reward {
        Reward {
            id: id.map(str::to_string),
            legacy_id: None,
            reward_type: RewardType::FoodDrink,
            type_name: RewardType::FoodDrink.type_name().to_string(),
            name: name.to_string(),
            description: String::new(),
            is_physical: true,
            instructions: String::new(),
            index: index.map(RewardIndex::Position),
        }
    }

    fn game(claimed: Option<&str>, rewards: Option<RewardSet>) -> Game {
        Game {
            id: "game-1".into(),
            game_type: GameType::Quiz,
            title: "Quiz".into(),
            questions: None,
            pairs: None,
            settings: serde_json::Value::Null,
            has_reward: rewards.is_some(),
            rewards,
            is_completed: true,
            claimed_reward_id: claimed.map(str::to_string),
            reward_fulfilled: false,
            completed_at: Some(Utc::now()),
            created_at: Utc::now(),
            letter_id: None,
        }
    }

    #[test]
    fn exact_id_wins_over_everything() {
        // "1" is also a valid position and index; the id rule must take priority.
        let rewards = RewardSet::List(vec![
            reward("a", Some("x"), Some(1)),
            reward("b", Some("1"), Some(0)),
            reward("c", Some("z"), Some(2)),
        ]);
        let g = game(Some("1"), Some(rewards));
        let m = resolve_claimed_reward(&g);
        assert!(matches!(m, RewardMatch::ById(_)));
        assert_eq!(m.reward().unwrap().name, "b");
    }

    #[test]
    fn legacy_underscore_id_matches() {
        let mut r = reward("legacy", None, None);
        r.legacy_id = Some("abc123".into());
        let g = game(Some("abc123"), Some(RewardSet::List(vec![reward("a", None, None), r])));
        assert_eq!(resolve_claimed_reward(&g).reward().unwrap().name, "legacy");
    }

    #[test]
    fn index_property_beats_position() {
        // Rewards stored out of order: position 0 holds index 2.
        let rewards = RewardSet::List(vec![
            reward("third", None, Some(2)),
            reward("first", None, Some(0)),
            reward("second", None, Some(1)),
        ]);
        let g = game(Some("2"), Some(rewards));
        let m = resolve_claimed_reward(&g);
        assert!(matches!(m, RewardMatch::ByIndexProperty(_)));
        assert_eq!(m.reward().unwrap().name, "third");
    }

    #[test]
    fn text_index_matches_verbatim() {
        let mut labelled = reward("b", None, None);
        labelled.index = Some(RewardIndex::Label("abc".into()));
        let g = game(Some("abc"), Some(RewardSet::List(vec![reward("a", None, None), labelled])));
        let m = resolve_claimed_reward(&g);
        assert!(matches!(m, RewardMatch::ByIndexProperty(_)));
        assert_eq!(m.reward().unwrap().name, "b");
    }

    #[test]
    fn numeric_string_falls_back_to_position() {
        let rewards = RewardSet::List(vec![
            reward("a", Some("id-a"), None),
            reward("b", Some("id-b"), None),
            reward("c", Some("id-c"), None),
        ]);
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            let claimed = i.to_string();
            let g = game(Some(&claimed), Some(rewards.clone()));
            let m = resolve_claimed_reward(&g);
            assert_eq!(m, RewardMatch::ByPosition(i, m.reward().unwrap()));
            assert_eq!(m.reward().unwrap().name, *name);
        }
    }

    #[test]
    fn reward_index_suffix_resolves_third_reward() {
        let rewards = RewardSet::List(vec![
            reward("a", None, None),
            reward("b", None, None),
            reward("c", None, None),
        ]);
        let g = game(Some("reward_index_2"), Some(rewards));
        assert_eq!(resolve_claimed_reward(&g).reward().unwrap().name, "c");

        let indexed = RewardSet::List(vec![
            reward("a", None, Some(0)),
            reward("b", None, Some(1)),
            reward("c", None, Some(2)),
        ]);
        let g = game(Some("reward_index_2"), Some(indexed));
        let m = resolve_claimed_reward(&g);
        assert!(matches!(m, RewardMatch::ByIndexProperty(_)));
        assert_eq!(m.reward().unwrap().name, "c");
    }

    #[test]
    fn lenient_leading_number() {
        assert_eq!(leading_number(" 2abc"), Some(2));
        assert_eq!(leading_number("+1"), Some(1));
        assert_eq!(leading_number("-1"), None);
        assert_eq!(leading_number("abc"), None);
        assert_eq!(trailing_number("reward_10"), Some(10));
        assert_eq!(trailing_number("reward_"), None);
        assert_eq!(trailing_number("reward10"), None);
    }

    #[test]
    fn out_of_range_position_is_unmatched() {
        let rewards = RewardSet::List(vec![reward("a", None, None)]);
        let g = game(Some("5"), Some(rewards));
        assert_eq!(resolve_claimed_reward(&g), RewardMatch::Unmatched);
    }

    #[test]
    fn keyed_rewards_match_by_key() {
        let mut map = BTreeMap::new();
        map.insert("dinner".to_string(), reward("Dinner", None, None));
        map.insert("walk".to_string(), reward("Walk", None, None));
        let g = game(Some("walk"), Some(RewardSet::Keyed(map)));
        let m = resolve_claimed_reward(&g);
        assert!(matches!(m, RewardMatch::ByKey(_)));
        assert_eq!(m.label(), "key");
        assert_eq!(m.reward().unwrap().name, "Walk");
    }

    #[test]
    fn missing_claim_or_rewards_is_unmatched() {
        assert_eq!(resolve_claimed_reward(&game(None, None)), RewardMatch::Unmatched);
        assert_eq!(
            resolve_claimed_reward(&game(Some("0"), Some(RewardSet::List(vec![])))),
            RewardMatch::Unmatched
        );
        assert_eq!(
            resolve_claimed_reward(&game(Some("  "), Some(RewardSet::List(vec![reward("a", None, None)])))),
            RewardMatch::Unmatched
        );
    }

    #[test]
    fn unknown_claim_is_unmatched() {
        let rewards = RewardSet::List(vec![reward("a", Some("id-a"), Some(0))]);
        let g = game(Some("mystery"), Some(rewards));
        let m = resolve_claimed_reward(&g);
        assert_eq!(m, RewardMatch::Unmatched);
        assert_eq!(m.label(), "none");
        assert!(m.reward().is_none());
    }
}
