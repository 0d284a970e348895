use tracing::debug;

use dearly_types::api::Claims;

use crate::auth::AppState;
use crate::error::ApiError;

/// Who is acting on a user's resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Owner,
    /// A receiver linked to the owning sender.
    LinkedReceiver,
}

/// Only the user themselves.
pub fn require_owner(claims: &Claims, user_id: &str) -> Result<Access, ApiError> {
    if claims.sub == user_id {
        Ok(Access::Owner)
    } else {
        debug!("{} denied access to resources of {}", claims.sub, user_id);
        Err(ApiError::Forbidden)
    }
}

/// The user themselves, or a receiver they have linked.
pub async fn require_owner_or_receiver(
    state: &AppState,
    claims: &Claims,
    user_id: &str,
) -> Result<Access, ApiError> {
    if claims.sub == user_id {
        return Ok(Access::Owner);
    }

    let sender = user_id.to_string();
    let receiver = claims.sub.clone();
    if state
        .with_db(move |db| db.is_linked_receiver(&sender, &receiver))
        .await?
    {
        Ok(Access::LinkedReceiver)
    } else {
        debug!("{} is not a receiver of {}", claims.sub, user_id);
        Err(ApiError::Forbidden)
    }
}
