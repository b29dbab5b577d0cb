//! Party Formation Handler

use std::sync::Arc;

use crate::aggregate::{Aggregate, Character, Party};
use crate::domain::PartyEvent;
use crate::error::AppError;
use crate::pipeline::{CommandOutcome, PostCommandHook};
use crate::repository::AggregateRepository;

use super::{spawn_snapshot_check, FormPartyCommand, FormPartyResult};

/// Handler for party formation
pub struct FormPartyHandler {
    repository: Arc<AggregateRepository>,
    hook: Arc<PostCommandHook<PartyEvent>>,
}

impl FormPartyHandler {
    pub fn new(
        repository: Arc<AggregateRepository>,
        hook: Arc<PostCommandHook<PartyEvent>>,
    ) -> Self {
        Self { repository, hook }
    }

    /// Execute the form party command
    pub async fn execute(
        &self,
        command: FormPartyCommand,
        actor_id: Option<String>,
    ) -> Result<FormPartyResult, AppError> {
        let existing: Option<Party> = self.repository.get_by_id(command.party_id).await?;
        if existing.is_some() {
            return Err(AppError::InvalidCommand(format!(
                "party {} already exists",
                command.party_id
            )));
        }

        // Founding members must be real characters
        for member in &command.founding_members {
            let character: Option<Character> = self.repository.get_by_id(*member).await?;
            if character.is_none() {
                return Err(AppError::CharacterNotFound(*member));
            }
        }

        let mut party = Party::form(command.party_id, command.name)?;
        for member in &command.founding_members {
            party.enroll(*member)?;
        }

        let result = FormPartyResult {
            party_id: party.id(),
            name: party.name().to_string(),
            member_count: party.members().len(),
        };

        let receipt = self
            .hook
            .run(CommandOutcome::mutated(result, party), actor_id)
            .await?;

        if let Some(party) = receipt.aggregate {
            spawn_snapshot_check(self.repository.clone(), party);
        }

        Ok(receipt.response)
    }
}
