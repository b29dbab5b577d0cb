//! Character Creation Handler

use std::sync::Arc;

use crate::aggregate::{Aggregate, Character};
use crate::domain::CharacterEvent;
use crate::error::AppError;
use crate::pipeline::{CommandOutcome, PostCommandHook};
use crate::repository::AggregateRepository;

use super::{spawn_snapshot_check, CreateCharacterCommand, CreateCharacterResult};

/// Handler for character creation
pub struct CreateCharacterHandler {
    repository: Arc<AggregateRepository>,
    hook: Arc<PostCommandHook<CharacterEvent>>,
}

impl CreateCharacterHandler {
    pub fn new(
        repository: Arc<AggregateRepository>,
        hook: Arc<PostCommandHook<CharacterEvent>>,
    ) -> Self {
        Self { repository, hook }
    }

    /// Execute the create character command
    pub async fn execute(
        &self,
        command: CreateCharacterCommand,
        actor_id: Option<String>,
    ) -> Result<CreateCharacterResult, AppError> {
        let existing: Option<Character> =
            self.repository.get_by_id(command.character_id).await?;
        if existing.is_some() {
            return Err(AppError::InvalidCommand(format!(
                "character {} already exists",
                command.character_id
            )));
        }

        let character = Character::create(command.character_id, command.name, command.class)?;

        let result = CreateCharacterResult {
            character_id: character.id(),
            name: character.name().to_string(),
            class: character.class(),
            level: character.level(),
            hit_points: character.hit_points(),
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
    use crate::domain::CharacterClass;
    use uuid::Uuid;

    #[test]
    fn test_create_character_command() {
        let id = Uuid::new_v4();
        let cmd = CreateCharacterCommand::new(id, "Aldric", CharacterClass::Knight);

        assert_eq!(cmd.character_id, id);
        assert_eq!(cmd.name, "Aldric");
        assert_eq!(cmd.class, CharacterClass::Knight);
    }
}
