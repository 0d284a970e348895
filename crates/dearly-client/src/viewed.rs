use std::collections::BTreeSet;

use tracing::{debug, warn};

use dearly_games::viewed::ViewedRewardSet;
use dearly_types::models::Game;

use crate::api::ApiClient;
use crate::error::ClientError;

/// The sender's viewed-rewards set, mirrored locally and saved to the server.
#[derive(Debug, Clone)]
pub struct ViewedRewardsTracker {
    user_id: String,
    viewed: ViewedRewardSet,
}

impl ViewedRewardsTracker {
    /// Start from the server's copy of the set.
    pub async fn load(client: &ApiClient, user_id: &str) -> Result<Self, ClientError> {
        let keys = client.viewed_rewards(user_id).await?;
        debug!("Loaded {} viewed rewards for {}", keys.len(), user_id);
        Ok(Self {
            user_id: user_id.to_string(),
            viewed: ViewedRewardSet::new(keys),
        })
    }

    /// A tracker that has not talked to the server yet.
    pub fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            viewed: ViewedRewardSet::default(),
        }
    }

    pub fn keys(&self) -> &BTreeSet<String> {
        self.viewed.keys()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.viewed.contains(key)
    }

    /// Badge number: claimed rewards not yet seen.
    pub fn unviewed_count(&self, games: &[Game]) -> usize {
        self.viewed.unviewed(games).len()
    }

    /// Called when the rewards panel opens. The local set is updated first,
    /// then the whole set is written back; a failed save keeps the local
    /// update and is reported to the caller.
    pub async fn mark_all_viewed(
        &mut self,
        client: &ApiClient,
        games: &[Game],
    ) -> Result<usize, ClientError> {
        let added = self.viewed.mark_all_viewed(games);
        if added == 0 {
            return Ok(0);
        }

        if let Err(e) = client.save_viewed_rewards(&self.user_id, self.viewed.keys()).await {
            warn!("Saving viewed rewards for {} failed: {}", self.user_id, e);
            return Err(e);
        }
        Ok(added)
    }
}
