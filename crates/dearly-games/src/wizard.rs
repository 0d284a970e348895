use dearly_types::api::GameDraft;
use dearly_types::models::{Game, GameType, QuizQuestion, Reward};
use thiserror::Error;

use crate::reward_setup::{REWARD_SLOTS, RewardSetupFlow, SetupError};

/// Title given to every memory-match game; it has no other setup data.
pub const MEMORY_MATCH_TITLE: &str = "Memory Match";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    #[error("Please give your quiz a title")]
    EmptyTitle,
    #[error("Add at least one question")]
    NoQuestions,
    #[error("Question {} has no text", .0 + 1)]
    MissingQuestion(usize),
    #[error("Question {} needs a correct answer", .0 + 1)]
    MissingCorrectAnswer(usize),
    #[error("Question {} needs at least one wrong answer", .0 + 1)]
    MissingWrongAnswer(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("That action is not available at this step")]
    WrongStep,
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Rewards(#[from] SetupError),
}

/// What the wizard is doing to the sender's games.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardMode {
    Create,
    Edit { game_id: String },
    /// Change an existing game's type, keeping its id.
    Convert { game_id: String },
}

/// Quiz form contents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuizSetup {
    pub title: String,
    pub questions: Vec<QuizQuestion>,
    pub settings: serde_json::Value,
}

impl QuizSetup {
    /// Trim every field, drop blank wrong answers and check the quiz is playable.
    pub fn validate(&self) -> Result<QuizSetup, QuizError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(QuizError::EmptyTitle);
        }
        if self.questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }

        let mut questions = Vec::with_capacity(self.questions.len());
        for (i, q) in self.questions.iter().enumerate() {
            let question = q.question.trim();
            if question.is_empty() {
                return Err(QuizError::MissingQuestion(i));
            }
            let correct = q.correct_answer.trim();
            if correct.is_empty() {
                return Err(QuizError::MissingCorrectAnswer(i));
            }
            let wrong: Vec<String> = q
                .wrong_answers
                .iter()
                .map(|w| w.trim())
                .filter(|w| !w.is_empty())
                .map(str::to_string)
                .collect();
            if wrong.is_empty() {
                return Err(QuizError::MissingWrongAnswer(i));
            }
            questions.push(QuizQuestion {
                question: question.to_string(),
                correct_answer: correct.to_string(),
                wrong_answers: wrong,
            });
        }

        Ok(QuizSetup {
            title: title.to_string(),
            questions,
            settings: self.settings.clone(),
        })
    }
}

/// Either no rewards or exactly three.
#[derive(Debug, Clone, PartialEq)]
pub enum RewardChoice {
    NoReward,
    Mystery(Box<[Reward; REWARD_SLOTS]>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistTarget {
    /// `POST /api/games/:userId`
    Create,
    /// `PUT /api/games/:userId/:gameId`
    Update { game_id: String },
}

/// The single write the wizard ends with.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistRequest {
    pub target: PersistTarget,
    draft: GameDraft,
}

impl PersistRequest {
    pub(crate) fn new(target: PersistTarget, data: GameData, rewards: RewardChoice) -> Self {
        let (has_reward, rewards) = match rewards {
            RewardChoice::NoReward => (false, None),
            RewardChoice::Mystery(r) => (true, Some(Vec::from(*r))),
        };
        Self {
            target,
            draft: GameDraft {
                game_type: data.game_type,
                title: data.title,
                questions: data.questions,
                pairs: None,
                settings: data.settings,
                has_reward,
                rewards,
                letter_id: data.letter_id,
                replace_existing: data.replace_existing,
            },
        }
    }

    pub fn draft(&self) -> &GameDraft {
        &self.draft
    }

    pub fn into_draft(self) -> GameDraft {
        self.draft
    }
}

/// Game fields collected before the reward steps.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GameData {
    pub game_type: GameType,
    pub title: String,
    pub questions: Option<Vec<QuizQuestion>>,
    pub settings: serde_json::Value,
    pub letter_id: Option<String>,
    pub replace_existing: bool,
}

impl GameData {
    fn memory_match(letter_id: Option<String>) -> Self {
        Self {
            game_type: GameType::MemoryMatch,
            title: MEMORY_MATCH_TITLE.to_string(),
            questions: None,
            settings: serde_json::Value::Null,
            letter_id,
            replace_existing: false,
        }
    }

    fn quiz(setup: QuizSetup, letter_id: Option<String>) -> Self {
        Self {
            game_type: GameType::Quiz,
            title: setup.title,
            questions: Some(setup.questions),
            settings: setup.settings,
            letter_id,
            replace_existing: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WizardStep {
    GameType,
    /// Quiz details form. Memory-match never stops here.
    GameSetup,
    RewardPrompt,
    RewardSetup(RewardSetupFlow),
    Complete(PersistRequest),
}

/// Step-by-step game creation, editing and conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct GameWizard {
    mode: WizardMode,
    step: WizardStep,
    data: Option<GameData>,
    /// Quiz form contents, kept when navigating back.
    quiz: QuizSetup,
    /// Rewards the game already had, used to prefill the reward form.
    existing_rewards: Vec<Reward>,
    letter_id: Option<String>,
    replace_existing: bool,
}

impl GameWizard {
    pub fn create() -> Self {
        Self {
            mode: WizardMode::Create,
            step: WizardStep::GameType,
            data: None,
            quiz: QuizSetup::default(),
            existing_rewards: Vec::new(),
            letter_id: None,
            replace_existing: false,
        }
    }

    /// Attach the game to a letter.
    pub fn with_letter(mut self, letter_id: impl Into<String>) -> Self {
        self.letter_id = Some(letter_id.into());
        self
    }

    /// Edit an existing game in place. Quizzes open on the quiz form,
    /// memory-match games go straight to the reward prompt.
    pub fn edit(game: &Game) -> Self {
        let existing_rewards = game
            .rewards
            .clone()
            .map(|r| r.into_vec())
            .unwrap_or_default();
        let mut wizard = Self {
            mode: WizardMode::Edit {
                game_id: game.id.clone(),
            },
            step: WizardStep::GameSetup,
            data: None,
            quiz: QuizSetup::default(),
            existing_rewards,
            letter_id: game.letter_id.clone(),
            replace_existing: false,
        };

        match game.game_type {
            GameType::Quiz => {
                wizard.quiz = QuizSetup {
                    title: game.title.clone(),
                    questions: game.questions.clone().unwrap_or_default(),
                    settings: game.settings.clone(),
                };
            }
            GameType::MemoryMatch => {
                wizard.data = Some(GameData::memory_match(game.letter_id.clone()));
                wizard.step = WizardStep::RewardPrompt;
            }
        }
        wizard
    }

    /// Convert `game` into a quiz through the quiz form. Any reward data is
    /// dropped; the sender sets rewards up again.
    pub(crate) fn convert_to_quiz(game: &Game, replace_existing: bool) -> Self {
        Self {
            mode: WizardMode::Convert {
                game_id: game.id.clone(),
            },
            step: WizardStep::GameSetup,
            data: None,
            quiz: QuizSetup::default(),
            existing_rewards: Vec::new(),
            letter_id: game.letter_id.clone(),
            replace_existing,
        }
    }

    pub fn mode(&self) -> &WizardMode {
        &self.mode
    }

    pub fn step(&self) -> &WizardStep {
        &self.step
    }

    /// Current quiz form contents (prefilled when editing).
    pub fn quiz(&self) -> &QuizSetup {
        &self.quiz
    }

    pub fn choose_type(&mut self, game_type: GameType) -> Result<(), WizardError> {
        if self.step != WizardStep::GameType {
            return Err(WizardError::WrongStep);
        }
        match game_type {
            GameType::Quiz => {
                self.step = WizardStep::GameSetup;
            }
            GameType::MemoryMatch => {
                let mut data = GameData::memory_match(self.letter_id.clone());
                data.replace_existing = self.replace_existing;
                self.data = Some(data);
                self.step = WizardStep::RewardPrompt;
            }
        }
        Ok(())
    }

    /// Submit the quiz form. The form contents are kept even when invalid.
    pub fn submit_quiz(&mut self, setup: QuizSetup) -> Result<(), WizardError> {
        if self.step != WizardStep::GameSetup {
            return Err(WizardError::WrongStep);
        }
        self.quiz = setup;
        let valid = self.quiz.validate()?;
        let mut data = GameData::quiz(valid, self.letter_id.clone());
        data.replace_existing = self.replace_existing;
        self.data = Some(data);
        self.step = WizardStep::RewardPrompt;
        Ok(())
    }

    /// "Add mystery rewards?" Yes opens the reward form, no finishes the wizard.
    pub fn answer_reward_prompt(&mut self, add_rewards: bool) -> Result<(), WizardError> {
        if self.step != WizardStep::RewardPrompt {
            return Err(WizardError::WrongStep);
        }
        if add_rewards {
            self.step = WizardStep::RewardSetup(RewardSetupFlow::from_rewards(&self.existing_rewards));
        } else {
            self.finish(RewardChoice::NoReward)?;
        }
        Ok(())
    }

    pub fn reward_flow_mut(&mut self) -> Option<&mut RewardSetupFlow> {
        match &mut self.step {
            WizardStep::RewardSetup(flow) => Some(flow),
            _ => None,
        }
    }

    /// Complete the reward form and finish the wizard.
    pub fn finish_rewards(&mut self) -> Result<(), WizardError> {
        let rewards = match &self.step {
            WizardStep::RewardSetup(flow) => flow.complete()?,
            _ => return Err(WizardError::WrongStep),
        };
        self.finish(RewardChoice::Mystery(Box::new(rewards)))
    }

    /// Step back. Returns false when there is nowhere to go.
    pub fn back(&mut self) -> bool {
        let game_type = self.data.as_ref().map(|d| d.game_type);
        let previous = match &mut self.step {
            WizardStep::GameType | WizardStep::Complete(_) => return false,
            WizardStep::GameSetup => match self.mode {
                WizardMode::Create => WizardStep::GameType,
                _ => return false,
            },
            WizardStep::RewardPrompt => match (game_type, &self.mode) {
                (Some(GameType::Quiz), _) => WizardStep::GameSetup,
                (_, WizardMode::Create) => WizardStep::GameType,
                _ => return false,
            },
            WizardStep::RewardSetup(flow) => {
                if flow.back() {
                    return true;
                }
                WizardStep::RewardPrompt
            }
        };
        self.step = previous;
        true
    }

    pub fn persist_request(&self) -> Option<&PersistRequest> {
        match &self.step {
            WizardStep::Complete(request) => Some(request),
            _ => None,
        }
    }

    /// Reopen the reward prompt after a failed save so the sender can retry.
    pub fn reopen(&mut self) -> bool {
        if matches!(self.step, WizardStep::Complete(_)) {
            self.step = WizardStep::RewardPrompt;
            true
        } else {
            false
        }
    }

    fn finish(&mut self, rewards: RewardChoice) -> Result<(), WizardError> {
        let data = self.data.clone().ok_or(WizardError::WrongStep)?;
        let target = match &self.mode {
            WizardMode::Create => PersistTarget::Create,
            WizardMode::Edit { game_id } | WizardMode::Convert { game_id } => PersistTarget::Update {
                game_id: game_id.clone(),
            },
        };
        self.step = WizardStep::Complete(PersistRequest::new(target, data, rewards));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dearly_types::models::{RewardIndex, RewardSet, RewardType};

    fn one_question_quiz() -> QuizSetup {
        QuizSetup {
            title: "How well do you know me?".into(),
            questions: vec![QuizQuestion {
                question: "Where did we first meet?".into(),
                correct_answer: "The library".into(),
                wrong_answers: vec!["A cafe".into(), "The park".into()],
            }],
            settings: serde_json::Value::Null,
        }
    }

    #[test]
    fn quiz_without_reward_posts_null_rewards() {
        let mut w = GameWizard::create();
        w.choose_type(GameType::Quiz).unwrap();
        assert_eq!(w.step(), &WizardStep::GameSetup);
        w.submit_quiz(one_question_quiz()).unwrap();
        w.answer_reward_prompt(false).unwrap();

        let request = w.persist_request().unwrap();
        assert_eq!(request.target, PersistTarget::Create);
        let body = serde_json::to_value(request.draft()).unwrap();
        assert_eq!(body["hasReward"], false);
        assert!(body["rewards"].is_null());
        assert_eq!(body["type"], "quiz");
        assert_eq!(body["questions"][0]["wrongAnswers"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn memory_match_skips_setup() {
        let mut w = GameWizard::create();
        w.choose_type(GameType::MemoryMatch).unwrap();
        assert_eq!(w.step(), &WizardStep::RewardPrompt);
        assert_eq!(w.submit_quiz(one_question_quiz()), Err(WizardError::WrongStep));
        w.answer_reward_prompt(false).unwrap();
        let draft = w.persist_request().unwrap().draft();
        assert_eq!(draft.title, MEMORY_MATCH_TITLE);
        assert!(draft.questions.is_none());
    }

    #[test]
    fn rewarded_game_carries_three_rewards() {
        let mut w = GameWizard::create().with_letter("letter-9");
        w.choose_type(GameType::Quiz).unwrap();
        w.submit_quiz(one_question_quiz()).unwrap();
        w.answer_reward_prompt(true).unwrap();

        // Finishing before the form is complete is rejected and changes nothing.
        assert_eq!(
            w.finish_rewards(),
            Err(WizardError::Rewards(SetupError::WrongPhase))
        );

        let flow = w.reward_flow_mut().unwrap();
        flow.select_type(0, RewardType::FoodDrink).unwrap();
        flow.select_type(1, RewardType::FoodDrink).unwrap();
        flow.select_type(2, RewardType::EmotionalDigital).unwrap();
        flow.advance().unwrap();
        flow.set_name(0, "Pancakes").unwrap();
        flow.set_name(1, "Coffee date").unwrap();
        flow.set_name(2, "Love letter").unwrap();
        w.finish_rewards().unwrap();

        let draft = w.persist_request().unwrap().draft();
        assert!(draft.has_reward);
        let rewards = draft.rewards.as_ref().unwrap();
        assert_eq!(rewards.len(), 3);
        assert_eq!(rewards[2].reward_type, RewardType::EmotionalDigital);
        assert_eq!(draft.letter_id.as_deref(), Some("letter-9"));
    }

    #[test]
    fn invalid_quiz_stays_on_setup() {
        let mut w = GameWizard::create();
        w.choose_type(GameType::Quiz).unwrap();
        let mut quiz = one_question_quiz();
        quiz.questions[0].wrong_answers = vec!["  ".into()];
        assert_eq!(
            w.submit_quiz(quiz.clone()),
            Err(WizardError::Quiz(QuizError::MissingWrongAnswer(0)))
        );
        assert_eq!(w.step(), &WizardStep::GameSetup);
        assert_eq!(w.quiz(), &quiz);

        quiz.title = " ".into();
        assert_eq!(w.submit_quiz(quiz), Err(WizardError::Quiz(QuizError::EmptyTitle)));
    }

    #[test]
    fn back_walks_the_steps() {
        let mut w = GameWizard::create();
        assert!(!w.back());
        w.choose_type(GameType::Quiz).unwrap();
        w.submit_quiz(one_question_quiz()).unwrap();
        w.answer_reward_prompt(true).unwrap();
        {
            let flow = w.reward_flow_mut().unwrap();
            for slot in 0..3 {
                flow.select_type(slot, RewardType::DateOuting).unwrap();
            }
            flow.advance().unwrap();
        }
        assert!(w.back()); // details -> type selection
        assert!(matches!(w.step(), WizardStep::RewardSetup(_)));
        assert!(w.back()); // -> reward prompt
        assert_eq!(w.step(), &WizardStep::RewardPrompt);
        assert!(w.back()); // -> quiz form
        assert_eq!(w.step(), &WizardStep::GameSetup);
        assert_eq!(w.quiz().questions.len(), 1);
        assert!(w.back());
        assert_eq!(w.step(), &WizardStep::GameType);
    }

    #[test]
    fn edit_memory_match_prefills_rewards_and_updates() {
        let rewards: Vec<Reward> = (0..3)
            .map(|i| Reward {
                id: Some(format!("r{i}")),
                legacy_id: None,
                reward_type: RewardType::DateOuting,
                type_name: RewardType::DateOuting.type_name().into(),
                name: format!("Outing {i}"),
                description: String::new(),
                is_physical: true,
                instructions: String::new(),
                index: Some(RewardIndex::Position(i)),
            })
            .collect();
        let game = Game {
            id: "g-mm".into(),
            game_type: GameType::MemoryMatch,
            title: MEMORY_MATCH_TITLE.into(),
            questions: None,
            pairs: None,
            settings: serde_json::Value::Null,
            has_reward: true,
            rewards: Some(RewardSet::List(rewards)),
            is_completed: false,
            claimed_reward_id: None,
            reward_fulfilled: false,
            completed_at: None,
            created_at: Utc::now(),
            letter_id: None,
        };

        let mut w = GameWizard::edit(&game);
        assert_eq!(w.step(), &WizardStep::RewardPrompt);
        assert!(!w.back());
        w.answer_reward_prompt(true).unwrap();
        let flow = w.reward_flow_mut().unwrap();
        flow.advance().unwrap();
        flow.set_name(1, "Bowling").unwrap();
        w.finish_rewards().unwrap();

        let request = w.persist_request().unwrap();
        assert_eq!(
            request.target,
            PersistTarget::Update {
                game_id: "g-mm".into()
            }
        );
        let sent = request.draft().rewards.as_ref().unwrap();
        assert_eq!(sent[1].name, "Bowling");
        // Stored ids go back unchanged so an existing claim still resolves
        let ids: Vec<_> = sent.iter().map(|r| r.id.as_deref()).collect();
        assert_eq!(ids, vec![Some("r0"), Some("r1"), Some("r2")]);
    }

    #[test]
    fn reopen_after_failed_save() {
        let mut w = GameWizard::create();
        w.choose_type(GameType::MemoryMatch).unwrap();
        w.answer_reward_prompt(false).unwrap();
        assert!(w.reopen());
        assert_eq!(w.step(), &WizardStep::RewardPrompt);
        assert!(!w.reopen());
    }
}
