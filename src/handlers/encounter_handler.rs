//! Encounter Resolution Handler
//!
//! Applies the result of a fought encounter to a character: damage first,
//! then rewards if the character is still standing. Everything lands in one
//! atomic batch.

use std::sync::Arc;

use crate::aggregate::{Aggregate, Character};
use crate::domain::CharacterEvent;
use crate::error::AppError;
use crate::pipeline::{CommandOutcome, PostCommandHook};
use crate::repository::AggregateRepository;

use super::{spawn_snapshot_check, EncounterResult, ResolveEncounterCommand};

/// Handler for encounter resolution
pub struct ResolveEncounterHandler {
    repository: Arc<AggregateRepository>,
    hook: Arc<PostCommandHook<CharacterEvent>>,
}

impl ResolveEncounterHandler {
    pub fn new(
        repository: Arc<AggregateRepository>,
        hook: Arc<PostCommandHook<CharacterEvent>>,
    ) -> Self {
        Self { repository, hook }
    }

    /// Execute the resolve encounter command
    pub async fn execute(
        &self,
        command: ResolveEncounterCommand,
        actor_id: Option<String>,
    ) -> Result<EncounterResult, AppError> {
        if command.damage_taken < 0 {
            return Err(AppError::InvalidCommand(
                "encounter damage must not be negative".to_string(),
            ));
        }
        if command.experience < 0 || command.gold_looted < 0 {
            return Err(AppError::InvalidCommand(
                "encounter rewards must not be negative".to_string(),
            ));
        }

        let mut character: Character = self
            .repository
            .get_by_id(command.character_id)
            .await?
            .ok_or(AppError::CharacterNotFound(command.character_id))?;

        if command.damage_taken > 0 {
            character.take_damage(command.damage_taken, &command.enemy_code)?;
        }
        let defeated = character.is_defeated();

        // A defeated character forfeits the rewards
        let mut experience_awarded = 0;
        let mut gold_looted = 0;
        if !defeated {
            if command.experience > 0 {
                character.gain_experience(command.experience)?;
                experience_awarded = command.experience;
            }
            if command.gold_looted > 0 {
                character.earn_gold(command.gold_looted)?;
                gold_looted = command.gold_looted;
            }
        }

        let result = EncounterResult {
            character_id: character.id(),
            remaining_hit_points: character.hit_points(),
            defeated,
            experience_awarded,
            gold_looted,
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
    fn test_resolve_encounter_command_builders() {
        let id = Uuid::new_v4();
        let cmd = ResolveEncounterCommand::new(id, "cave_troll")
            .with_damage(35)
            .with_rewards(120, 45);

        assert_eq!(cmd.character_id, id);
        assert_eq!(cmd.enemy_code, "cave_troll");
        assert_eq!(cmd.damage_taken, 35);
        assert_eq!(cmd.experience, 120);
        assert_eq!(cmd.gold_looted, 45);
    }
}
