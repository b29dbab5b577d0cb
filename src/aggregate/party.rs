//! Party Aggregate
//!
//! A party groups characters for shared adventures. Membership changes are
//! events like everything else.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{DomainError, PartyEvent};

use super::{Aggregate, EventJournal};

const MAX_NAME_LEN: usize = 40;
const MAX_PARTY_SIZE: usize = 5;

/// Party Aggregate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Party {
    id: Uuid,
    name: String,
    members: BTreeSet<Uuid>,
    disbanded: bool,
    formed_at: Option<DateTime<Utc>>,
    journal: EventJournal<PartyEvent>,
}

impl Party {
    /// Form a new party and record the founding event
    pub fn form(party_id: Uuid, name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidName("name must not be empty".to_string()));
        }
        if trimmed.len() > MAX_NAME_LEN {
            return Err(DomainError::InvalidName(format!(
                "name exceeds {} characters",
                MAX_NAME_LEN
            )));
        }

        let mut party = Self::default();
        party.record(PartyEvent::PartyFormed {
            party_id,
            name: trimmed.to_string(),
            formed_at: Utc::now(),
        });

        Ok(party)
    }

    /// Add a character to the roster
    pub fn enroll(&mut self, character_id: Uuid) -> Result<(), DomainError> {
        if self.disbanded {
            return Err(DomainError::PartyDisbanded);
        }
        if self.members.contains(&character_id) {
            return Err(DomainError::AlreadyMember(character_id));
        }
        if self.members.len() >= MAX_PARTY_SIZE {
            return Err(DomainError::PartyFull(MAX_PARTY_SIZE));
        }

        self.record(PartyEvent::MemberEnrolled {
            party_id: self.id,
            character_id,
            enrolled_at: Utc::now(),
        });

        Ok(())
    }

    /// Remove a character from the roster
    pub fn discharge(&mut self, character_id: Uuid) -> Result<(), DomainError> {
        if self.disbanded {
            return Err(DomainError::PartyDisbanded);
        }
        if !self.members.contains(&character_id) {
            return Err(DomainError::NotMember(character_id));
        }

        self.record(PartyEvent::MemberDischarged {
            party_id: self.id,
            character_id,
            discharged_at: Utc::now(),
        });

        Ok(())
    }

    /// Dissolve the party permanently
    pub fn disband(&mut self) -> Result<(), DomainError> {
        if self.disbanded {
            return Err(DomainError::PartyDisbanded);
        }

        self.record(PartyEvent::PartyDisbanded {
            party_id: self.id,
            disbanded_at: Utc::now(),
        });

        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &BTreeSet<Uuid> {
        &self.members
    }

    pub fn is_disbanded(&self) -> bool {
        self.disbanded
    }

    pub fn formed_at(&self) -> Option<DateTime<Utc>> {
        self.formed_at
    }
}

impl Aggregate for Party {
    type Event = PartyEvent;

    fn aggregate_type() -> &'static str {
        "Party"
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn journal(&self) -> &EventJournal<PartyEvent> {
        &self.journal
    }

    fn journal_mut(&mut self) -> &mut EventJournal<PartyEvent> {
        &mut self.journal
    }

    fn apply(&mut self, event: &PartyEvent) {
        match event {
            PartyEvent::PartyFormed {
                party_id,
                name,
                formed_at,
            } => {
                self.id = *party_id;
                self.name = name.clone();
                self.formed_at = Some(*formed_at);
            }

            PartyEvent::MemberEnrolled { character_id, .. } => {
                self.members.insert(*character_id);
            }

            PartyEvent::MemberDischarged { character_id, .. } => {
                self.members.remove(character_id);
            }

            PartyEvent::PartyDisbanded { .. } => {
                self.disbanded = true;
            }
        }
    }
}
