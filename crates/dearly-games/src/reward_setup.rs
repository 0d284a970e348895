use dearly_types::models::{Reward, RewardIndex, RewardType};
use thiserror::Error;

/// Every rewarded game carries exactly this many mystery rewards.
pub const REWARD_SLOTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("Please choose a type for all 3 rewards (slot {} is empty)", .0 + 1)]
    MissingType(usize),
    #[error("Please give all 3 rewards a name (reward {} has none)", .0 + 1)]
    MissingName(usize),
    #[error("There is no reward slot {0}")]
    NoSuchSlot(usize),
    #[error("This step is not available right now")]
    WrongPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupPhase {
    TypeSelection,
    Details,
}

/// Free-text fields of one reward slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewardDetails {
    pub name: String,
    pub description: String,
    pub instructions: String,
    /// `None` keeps the category default.
    pub is_physical: Option<bool>,
}

/// Identity of a reward loaded for editing, written back unchanged so
/// stored claims keep resolving.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct SlotIdentity {
    id: Option<String>,
    legacy_id: Option<String>,
}

/// Two-phase reward form: pick a category for each of the three slots,
/// then fill in names and descriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardSetupFlow {
    phase: SetupPhase,
    types: [Option<RewardType>; REWARD_SLOTS],
    details: [RewardDetails; REWARD_SLOTS],
    identities: [SlotIdentity; REWARD_SLOTS],
}

impl Default for RewardSetupFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl RewardSetupFlow {
    pub fn new() -> Self {
        Self {
            phase: SetupPhase::TypeSelection,
            types: [None; REWARD_SLOTS],
            details: Default::default(),
            identities: Default::default(),
        }
    }

    /// Prefill from existing rewards when editing a game. Extra rewards are ignored.
    pub fn from_rewards(rewards: &[Reward]) -> Self {
        let mut flow = Self::new();
        for (slot, reward) in rewards.iter().take(REWARD_SLOTS).enumerate() {
            flow.types[slot] = Some(reward.reward_type);
            flow.details[slot] = RewardDetails {
                name: reward.name.clone(),
                description: reward.description.clone(),
                instructions: reward.instructions.clone(),
                is_physical: Some(reward.is_physical),
            };
            flow.identities[slot] = SlotIdentity {
                id: reward.id.clone(),
                legacy_id: reward.legacy_id.clone(),
            };
        }
        flow
    }

    pub fn phase(&self) -> SetupPhase {
        self.phase
    }

    pub fn types(&self) -> &[Option<RewardType>; REWARD_SLOTS] {
        &self.types
    }

    pub fn details(&self, slot: usize) -> Option<&RewardDetails> {
        self.details.get(slot)
    }

    pub fn select_type(&mut self, slot: usize, reward_type: RewardType) -> Result<(), SetupError> {
        self.require(SetupPhase::TypeSelection)?;
        let entry = self.types.get_mut(slot).ok_or(SetupError::NoSuchSlot(slot))?;
        *entry = Some(reward_type);
        Ok(())
    }

    pub fn can_advance(&self) -> bool {
        self.types.iter().all(Option::is_some)
    }

    pub fn advance(&mut self) -> Result<(), SetupError> {
        self.require(SetupPhase::TypeSelection)?;
        if let Some(slot) = self.types.iter().position(Option::is_none) {
            return Err(SetupError::MissingType(slot));
        }
        self.phase = SetupPhase::Details;
        Ok(())
    }

    /// Go back to type selection. Returns false when already there.
    pub fn back(&mut self) -> bool {
        match self.phase {
            SetupPhase::Details => {
                self.phase = SetupPhase::TypeSelection;
                true
            }
            SetupPhase::TypeSelection => false,
        }
    }

    pub fn set_name(&mut self, slot: usize, name: impl Into<String>) -> Result<(), SetupError> {
        self.details_mut(slot)?.name = name.into();
        Ok(())
    }

    pub fn set_description(
        &mut self,
        slot: usize,
        description: impl Into<String>,
    ) -> Result<(), SetupError> {
        self.details_mut(slot)?.description = description.into();
        Ok(())
    }

    pub fn set_instructions(
        &mut self,
        slot: usize,
        instructions: impl Into<String>,
    ) -> Result<(), SetupError> {
        self.details_mut(slot)?.instructions = instructions.into();
        Ok(())
    }

    pub fn set_physical(&mut self, slot: usize, is_physical: bool) -> Result<(), SetupError> {
        self.details_mut(slot)?.is_physical = Some(is_physical);
        Ok(())
    }

    pub fn can_complete(&self) -> bool {
        self.phase == SetupPhase::Details
            && self.details.iter().all(|d| !d.name.trim().is_empty())
    }

    /// Build all three rewards at once. Nothing is produced unless every slot is valid.
    pub fn complete(&self) -> Result<[Reward; REWARD_SLOTS], SetupError> {
        self.require(SetupPhase::Details)?;
        if let Some(slot) = self.details.iter().position(|d| d.name.trim().is_empty()) {
            return Err(SetupError::MissingName(slot));
        }

        let mut rewards = Vec::with_capacity(REWARD_SLOTS);
        let slots = self.types.iter().zip(&self.details).zip(&self.identities);
        for (slot, ((reward_type, details), identity)) in slots.enumerate() {
            let reward_type = reward_type.ok_or(SetupError::MissingType(slot))?;
            rewards.push(Reward {
                id: identity.id.clone(),
                legacy_id: identity.legacy_id.clone(),
                reward_type,
                type_name: reward_type.type_name().to_string(),
                name: details.name.trim().to_string(),
                description: details.description.trim().to_string(),
                is_physical: details
                    .is_physical
                    .unwrap_or_else(|| reward_type.is_physical_by_default()),
                instructions: details.instructions.trim().to_string(),
                index: Some(RewardIndex::Position(slot as u32)),
            });
        }

        rewards
            .try_into()
            .map_err(|_| SetupError::WrongPhase)
    }

    fn require(&self, phase: SetupPhase) -> Result<(), SetupError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(SetupError::WrongPhase)
        }
    }

    fn details_mut(&mut self, slot: usize) -> Result<&mut RewardDetails, SetupError> {
        self.require(SetupPhase::Details)?;
        self.details.get_mut(slot).ok_or(SetupError::NoSuchSlot(slot))
    }
}
