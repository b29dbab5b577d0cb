//! Command definitions
//!
//! Commands represent intentions to change the system state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::CharacterClass;

/// Command to create a new character
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCharacterCommand {
    pub character_id: Uuid,
    pub name: String,
    pub class: CharacterClass,
}

impl CreateCharacterCommand {
    pub fn new(character_id: Uuid, name: impl Into<String>, class: CharacterClass) -> Self {
        Self {
            character_id,
            name: name.into(),
            class,
        }
    }
}

/// Command to grant experience points
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantExperienceCommand {
    pub character_id: Uuid,
    pub amount: i64,
}

impl GrantExperienceCommand {
    pub fn new(character_id: Uuid, amount: i64) -> Self {
        Self {
            character_id,
            amount,
        }
    }
}

/// Command to resolve a fought encounter against a character.
///
/// One encounter can produce several events: damage, experience, loot and
/// any level advancements, committed as a single batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveEncounterCommand {
    pub character_id: Uuid,
    /// Code of the enemy faced, recorded as the damage source
    pub enemy_code: String,
    pub damage_taken: i32,
    pub experience: i64,
    pub gold_looted: i64,
}

impl ResolveEncounterCommand {
    pub fn new(character_id: Uuid, enemy_code: impl Into<String>) -> Self {
        Self {
            character_id,
            enemy_code: enemy_code.into(),
            damage_taken: 0,
            experience: 0,
            gold_looted: 0,
        }
    }

    pub fn with_damage(mut self, damage: i32) -> Self {
        self.damage_taken = damage;
        self
    }

    pub fn with_rewards(mut self, experience: i64, gold: i64) -> Self {
        self.experience = experience;
        self.gold_looted = gold;
        self
    }
}

/// Command to form a party with founding members
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormPartyCommand {
    pub party_id: Uuid,
    pub name: String,
    pub founding_members: Vec<Uuid>,
}

impl FormPartyCommand {
    pub fn new(party_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            party_id,
            name: name.into(),
            founding_members: Vec::new(),
        }
    }

    pub fn with_members(mut self, members: Vec<Uuid>) -> Self {
        self.founding_members = members;
        self
    }
}

/// Result of a successful character creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCharacterResult {
    pub character_id: Uuid,
    pub name: String,
    pub class: CharacterClass,
    pub level: u32,
    pub hit_points: i32,
}

/// Result of a successful experience grant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantExperienceResult {
    pub character_id: Uuid,
    pub amount: i64,
    pub total_experience: i64,
    pub level: u32,
}

/// Result of a resolved encounter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncounterResult {
    pub character_id: Uuid,
    pub remaining_hit_points: i32,
    pub defeated: bool,
    pub experience_awarded: i64,
    pub gold_looted: i64,
    pub level: u32,
}

/// Result of a successful party formation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormPartyResult {
    pub party_id: Uuid,
    pub name: String,
    pub member_count: usize,
}
