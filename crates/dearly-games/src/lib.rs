//! Game and reward rules shared by the backend and the client.
//!
//! Everything here is synchronous and free of I/O: reward resolution,
//! viewed-reward bookkeeping, the reward setup form, the game creation
//! wizard and the conversion guard.

pub mod conversion;
pub mod reward_matcher;
pub mod reward_setup;
pub mod viewed;
pub mod wizard;

pub use reward_matcher::{RewardMatch, resolve_claimed_reward};
