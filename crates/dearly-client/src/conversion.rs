use tokio::sync::Mutex;
use tracing::{info, warn};

use dearly_games::conversion::{ConversionError, ConversionGuard, ConversionPlan, ConversionState, plan_conversion};
use dearly_games::wizard::{GameWizard, PersistRequest};
use dearly_types::models::{Game, GameType};

use crate::api::ApiClient;
use crate::error::ClientError;

/// What the caller has to do after asking for a type change.
#[derive(Debug)]
pub enum ConversionOutcome {
    /// Nothing to do, the game already has that type.
    Unchanged,
    /// The game was converted and saved.
    Converted(Game),
    /// Show the quiz creator; the wizard saves through [`Converter::save_wizard`].
    OpenQuizCreator {
        wizard: Box<GameWizard>,
        replaces: Option<String>,
    },
    /// Ask before replacing `existing_game_id`, then call [`Converter::confirm`].
    NeedsConfirmation {
        existing_game_id: String,
        request: PersistRequest,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error(transparent)]
    Guard(#[from] ConversionError),
    #[error("The quiz creator has not finished yet")]
    WizardIncomplete,
    #[error("Failed to save game")]
    Save(#[source] ClientError),
}

/// Runs game-type conversions for one sender, never more than one at a time.
#[derive(Debug, Default)]
pub struct Converter {
    guard: Mutex<ConversionGuard>,
}

impl Converter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn state(&self) -> ConversionState {
        self.guard.lock().await.state().clone()
    }

    /// Plan a conversion of `source` to `target` and carry out the automatic case.
    pub async fn convert(
        &self,
        client: &ApiClient,
        user_id: &str,
        source: &Game,
        target: GameType,
        sender_games: &[Game],
    ) -> Result<ConversionOutcome, ConvertError> {
        match plan_conversion(source, target, sender_games) {
            ConversionPlan::Unchanged => Ok(ConversionOutcome::Unchanged),
            ConversionPlan::OpenQuizCreator { wizard, replaces } => {
                Ok(ConversionOutcome::OpenQuizCreator { wizard, replaces })
            }
            ConversionPlan::ConfirmReplace {
                existing_game_id,
                request,
            } => Ok(ConversionOutcome::NeedsConfirmation {
                existing_game_id,
                request,
            }),
            ConversionPlan::AutoConvert(request) => {
                let game = self.run(client, user_id, &source.id, &request).await?;
                Ok(ConversionOutcome::Converted(game))
            }
        }
    }

    /// Save a conversion the sender confirmed.
    pub async fn confirm(
        &self,
        client: &ApiClient,
        user_id: &str,
        game_id: &str,
        request: &PersistRequest,
    ) -> Result<Game, ConvertError> {
        self.run(client, user_id, game_id, request).await
    }

    /// Save a finished quiz-creator wizard opened for a conversion.
    pub async fn save_wizard(
        &self,
        client: &ApiClient,
        user_id: &str,
        game_id: &str,
        wizard: &GameWizard,
    ) -> Result<Game, ConvertError> {
        let request = wizard.persist_request().ok_or(ConvertError::WizardIncomplete)?;
        self.run(client, user_id, game_id, request).await
    }

    async fn run(
        &self,
        client: &ApiClient,
        user_id: &str,
        game_id: &str,
        request: &PersistRequest,
    ) -> Result<Game, ConvertError> {
        self.guard.lock().await.begin(game_id)?;

        let result = client.persist(user_id, request).await;

        let mut guard = self.guard.lock().await;
        match result {
            Ok(game) => {
                guard.succeed()?;
                info!("Converted game {} to {}", game_id, game.game_type);
                Ok(game)
            }
            Err(e) => {
                warn!("Converting game {} failed: {}", game_id, e);
                guard.fail(e.user_message("save game"))?;
                Err(ConvertError::Save(e))
            }
        }
    }
}
