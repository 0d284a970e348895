use dearly_types::models::{Game, GameType};
use thiserror::Error;
use tracing::debug;

use crate::wizard::{GameData, GameWizard, MEMORY_MATCH_TITLE, PersistRequest, PersistTarget, RewardChoice};

/// How a "change game type" request should proceed.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionPlan {
    /// The game already has the requested type.
    Unchanged,
    /// Collect quiz details first. `replaces` names the sender's other quiz
    /// that the save will replace.
    OpenQuizCreator {
        wizard: Box<GameWizard>,
        replaces: Option<String>,
    },
    /// No game of the target type exists: convert right away.
    AutoConvert(PersistRequest),
    /// Another game of the target type exists; saving replaces it, so the
    /// sender has to confirm first.
    ConfirmReplace {
        existing_game_id: String,
        request: PersistRequest,
    },
}

/// Decide how to turn `source` into a `target` game given all of the sender's games.
pub fn plan_conversion(source: &Game, target: GameType, sender_games: &[Game]) -> ConversionPlan {
    if source.game_type == target {
        return ConversionPlan::Unchanged;
    }

    let existing = sender_games
        .iter()
        .find(|g| g.game_type == target && g.id != source.id)
        .map(|g| g.id.clone());

    match target {
        GameType::Quiz => ConversionPlan::OpenQuizCreator {
            wizard: Box::new(GameWizard::convert_to_quiz(source, existing.is_some())),
            replaces: existing,
        },
        GameType::MemoryMatch => {
            let data = GameData {
                game_type: GameType::MemoryMatch,
                title: MEMORY_MATCH_TITLE.to_string(),
                questions: None,
                settings: serde_json::Value::Null,
                letter_id: source.letter_id.clone(),
                replace_existing: existing.is_some(),
            };
            let request = PersistRequest::new(
                PersistTarget::Update {
                    game_id: source.id.clone(),
                },
                data,
                RewardChoice::NoReward,
            );
            match existing {
                None => {
                    debug!("No {} game yet, converting {} without confirmation", target, source.id);
                    ConversionPlan::AutoConvert(request)
                }
                Some(existing_game_id) => ConversionPlan::ConfirmReplace {
                    existing_game_id,
                    request,
                },
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("A conversion of game {0} is already in progress")]
    AlreadyInFlight(String),
    #[error("No conversion is in progress")]
    NotInFlight,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConversionState {
    #[default]
    Idle,
    InFlight { game_id: String },
    Done { game_id: String },
    Failed { game_id: String, reason: String },
}

/// Allows at most one conversion request at a time, no matter how often
/// the caller retriggers it.
#[derive(Debug, Default)]
pub struct ConversionGuard {
    state: ConversionState,
}

impl ConversionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ConversionState {
        &self.state
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self.state, ConversionState::InFlight { .. })
    }

    pub fn begin(&mut self, game_id: &str) -> Result<(), ConversionError> {
        if let ConversionState::InFlight { game_id } = &self.state {
            return Err(ConversionError::AlreadyInFlight(game_id.clone()));
        }
        self.state = ConversionState::InFlight {
            game_id: game_id.to_string(),
        };
        Ok(())
    }

    pub fn succeed(&mut self) -> Result<(), ConversionError> {
        let game_id = self.take_in_flight()?;
        self.state = ConversionState::Done { game_id };
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), ConversionError> {
        let game_id = self.take_in_flight()?;
        self.state = ConversionState::Failed {
            game_id,
            reason: reason.into(),
        };
        Ok(())
    }

    fn take_in_flight(&mut self) -> Result<String, ConversionError> {
        match std::mem::take(&mut self.state) {
            ConversionState::InFlight { game_id } => Ok(game_id),
            other => {
                self.state = other;
                Err(ConversionError::NotInFlight)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::{QuizSetup, WizardMode, WizardStep};
    use chrono::Utc;
    use dearly_types::models::{QuizQuestion, RewardSet};

    fn game(id: &str, game_type: GameType) -> Game {
        Game {
            id: id.into(),
            game_type,
            title: "t".into(),
            questions: match game_type {
                GameType::Quiz => Some(vec![QuizQuestion {
                    question: "q".into(),
                    correct_answer: "a".into(),
                    wrong_answers: vec!["b".into()],
                }]),
                GameType::MemoryMatch => None,
            },
            pairs: None,
            settings: serde_json::json!({ "shuffle": true }),
            has_reward: true,
            rewards: Some(RewardSet::List(vec![])),
            is_completed: false,
            claimed_reward_id: None,
            reward_fulfilled: false,
            completed_at: None,
            created_at: Utc::now(),
            letter_id: Some("letter-1".into()),
        }
    }

    #[test]
    fn same_type_is_unchanged() {
        let q = game("q1", GameType::Quiz);
        assert_eq!(plan_conversion(&q, GameType::Quiz, &[q.clone()]), ConversionPlan::Unchanged);
    }

    #[test]
    fn auto_convert_strips_quiz_fields_and_rewards() {
        let q = game("q1", GameType::Quiz);
        let plan = plan_conversion(&q, GameType::MemoryMatch, &[q.clone()]);
        let ConversionPlan::AutoConvert(request) = plan else {
            panic!("expected automatic conversion");
        };
        assert_eq!(request.target, PersistTarget::Update { game_id: "q1".into() });
        let draft = request.draft();
        assert_eq!(draft.game_type, GameType::MemoryMatch);
        assert!(draft.questions.is_none());
        assert!(!draft.has_reward);
        assert!(draft.rewards.is_none());
        assert!(draft.settings.is_null());
        assert!(!draft.replace_existing);
        assert_eq!(draft.letter_id.as_deref(), Some("letter-1"));
    }

    #[test]
    fn existing_target_requires_confirmation() {
        let q = game("q1", GameType::Quiz);
        let m = game("m1", GameType::MemoryMatch);
        let plan = plan_conversion(&q, GameType::MemoryMatch, &[q.clone(), m]);
        let ConversionPlan::ConfirmReplace { existing_game_id, request } = plan else {
            panic!("expected confirmation");
        };
        assert_eq!(existing_game_id, "m1");
        assert!(request.draft().replace_existing);
    }

    #[test]
    fn converting_to_quiz_opens_creator() {
        let m = game("m1", GameType::MemoryMatch);
        let other_quiz = game("q9", GameType::Quiz);
        let plan = plan_conversion(&m, GameType::Quiz, &[m.clone(), other_quiz]);
        let ConversionPlan::OpenQuizCreator { mut wizard, replaces } = plan else {
            panic!("expected quiz creator");
        };
        assert_eq!(replaces.as_deref(), Some("q9"));
        assert_eq!(wizard.mode(), &WizardMode::Convert { game_id: "m1".into() });
        assert_eq!(wizard.step(), &WizardStep::GameSetup);

        wizard
            .submit_quiz(QuizSetup {
                title: "New quiz".into(),
                questions: vec![QuizQuestion {
                    question: "Favourite colour?".into(),
                    correct_answer: "Green".into(),
                    wrong_answers: vec!["Red".into()],
                }],
                settings: serde_json::Value::Null,
            })
            .unwrap();
        wizard.answer_reward_prompt(false).unwrap();
        let request = wizard.persist_request().unwrap();
        assert_eq!(request.target, PersistTarget::Update { game_id: "m1".into() });
        assert!(request.draft().replace_existing);
    }

    #[test]
    fn guard_rejects_duplicate_conversion() {
        let mut guard = ConversionGuard::new();
        guard.begin("g1").unwrap();
        assert_eq!(
            guard.begin("g1"),
            Err(ConversionError::AlreadyInFlight("g1".into()))
        );
        assert!(guard.is_in_flight());
        guard.succeed().unwrap();
        assert_eq!(guard.state(), &ConversionState::Done { game_id: "g1".into() });
        assert_eq!(guard.succeed(), Err(ConversionError::NotInFlight));
        assert_eq!(guard.state(), &ConversionState::Done { game_id: "g1".into() });

        guard.begin("g2").unwrap();
        guard.fail("Failed to convert game").unwrap();
        assert!(matches!(guard.state(), ConversionState::Failed { game_id, .. } if game_id == "g2"));
        guard.begin("g2").unwrap();
    }
}
