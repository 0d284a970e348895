use std::collections::BTreeSet;

use dearly_types::models::Game;

/// Identifier stored in the viewed-rewards set for one claimed reward.
pub fn viewed_reward_key(game_id: &str, reward_id: &str) -> String {
    format!("{game_id}_{reward_id}")
}

/// Keys of every reward that has been claimed across `games`.
pub fn claimed_reward_keys<'a, I>(games: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a Game>,
{
    games
        .into_iter()
        .filter(|g| g.is_completed && g.has_reward)
        .filter_map(|g| {
            g.claimed_reward_id
                .as_deref()
                .map(|rid| viewed_reward_key(&g.id, rid))
        })
        .collect()
}

/// Rewards the sender has already seen in the rewards panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewedRewardSet {
    keys: BTreeSet<String>,
}

impl ViewedRewardSet {
    pub fn new(keys: BTreeSet<String>) -> Self {
        Self { keys }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn keys(&self) -> &BTreeSet<String> {
        &self.keys
    }

    pub fn into_keys(self) -> BTreeSet<String> {
        self.keys
    }

    /// Claimed rewards not yet seen; this drives the badge count.
    pub fn unviewed<'a, I>(&self, games: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a Game>,
    {
        claimed_reward_keys(games)
            .into_iter()
            .filter(|k| !self.keys.contains(k))
            .collect()
    }

    /// Union every currently claimed reward into the set.
    /// Returns the number of keys that were new.
    pub fn mark_all_viewed<'a, I>(&mut self, games: I) -> usize
    where
        I: IntoIterator<Item = &'a Game>,
    {
        let before = self.keys.len();
        self.keys.extend(claimed_reward_keys(games));
        self.keys.len() - before
    }
}
