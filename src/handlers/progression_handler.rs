//! Experience Grant Handler

use std::sync::Arc;

use crate::aggregate::{Aggregate, Character};
use crate::domain::CharacterEvent;
use crate::error::AppError;
use crate::pipeline::{CommandOutcome, PostCommandHook};
use crate::repository::AggregateRepository;

use super::{spawn_snapshot_check, GrantExperienceCommand, GrantExperienceResult};

/// Handler for granting experience points
pub struct GrantExperienceHandler {
    repository: Arc<AggregateRepository>,
    hook: Arc<PostCommandHook<CharacterEvent>>,
}

impl GrantExperienceHandler {
    pub fn new(
        repository: Arc<AggregateRepository>,
        hook: Arc<PostCommandHook<CharacterEvent>>,
    ) -> Self {
        Self { repository, hook }
    }

    /// Execute the grant experience command
    pub async fn execute(
        &self,
        command: GrantExperienceCommand,
        actor_id: Option<String>,
    ) -> Result<GrantExperienceResult, AppError> {
        let mut character: Character = self
            .repository
            .get_by_id(command.character_id)
            .await?
            .ok_or(AppError::CharacterNotFound(command.character_id))?;

        character.gain_experience(command.amount)?;

        let result = GrantExperienceResult {
            character_id: character.id(),
            amount: command.amount,
            total_experience: character.experience(),
            level: character.level(),
        };

        let receipt = self
            .hook
            .run(CommandOutcome::mutated(result, character), actor_id)
            .await?;

        if let Some(character) = receipt.aggregate {
            spawn_snapshot_check(self.repository.clone(), character);
        }

        Ok(receipt.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_grant_experience_command() {
        let id = Uuid::new_v4();
        let cmd = GrantExperienceCommand::new(id, 250);

        assert_eq!(cmd.character_id, id);
        assert_eq!(cmd.amount, 250);
    }
}
