//! Character Aggregate
//!
//! Character is the core aggregate for the game backend.
//! It applies events to maintain current state and records events for commands.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{CharacterClass, CharacterEvent, DomainError, EquipmentSlot};

use super::{Aggregate, EventJournal};

/// Maximum length of a character name
const MAX_NAME_LEN: usize = 40;

/// Level ceiling for the progression curve
const MAX_LEVEL: u32 = 99;

/// Character Aggregate
///
/// Represents a playable character with progression, health, gold and
/// equipment. State is derived from events, never directly mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Unique character ID
    id: Uuid,

    /// Display name
    name: String,

    /// Character class, fixed at creation
    class: CharacterClass,

    /// Current level (starts at 1)
    level: u32,

    /// Lifetime experience points
    experience: i64,

    /// Current hit points
    hit_points: i32,

    /// Hit point ceiling
    max_hit_points: i32,

    /// Gold in the purse
    gold: i64,

    /// Equipped item codes by slot
    equipment: BTreeMap<EquipmentSlot, String>,

    /// When the character was created
    created_at: Option<DateTime<Utc>>,

    /// Stream position and uncommitted event buffer
    journal: EventJournal<CharacterEvent>,
}

impl Default for Character {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            name: String::new(),
            class: CharacterClass::Knight,
            level: 0,
            experience: 0,
            hit_points: 0,
            max_hit_points: 0,
            gold: 0,
            equipment: BTreeMap::new(),
            created_at: None,
            journal: EventJournal::default(),
        }
    }
}

impl Character {
    // =========================================================================
    // Creation
    // =========================================================================

    /// Create a new character and record the creation event
    pub fn create(
        character_id: Uuid,
        name: impl Into<String>,
        class: CharacterClass,
    ) -> Result<Self, DomainError> {
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

        let mut character = Self::default();
        character.record(CharacterEvent::CharacterCreated {
            character_id,
            name: trimmed.to_string(),
            class,
            max_hit_points: class.base_hit_points(),
            created_at: Utc::now(),
        });

        Ok(character)
    }

    // =========================================================================
    // Progression
    // =========================================================================

    /// Total experience required to reach the given level
    pub fn experience_required(level: u32) -> i64 {
        let step = i64::from(level.saturating_sub(1));
        step * step * 100
    }

    /// Grant experience points, recording a level advancement for every
    /// threshold the new total crosses
    pub fn gain_experience(&mut self, amount: i64) -> Result<(), DomainError> {
        if amount <= 0 {
            return Err(DomainError::invalid_amount(format!(
                "experience must be positive, got {}",
                amount
            )));
        }

        let total = self.experience + amount;
        self.record(CharacterEvent::ExperienceGained {
            character_id: self.id,
            amount,
            total_experience: total,
            gained_at: Utc::now(),
        });

        while self.level < MAX_LEVEL
            && self.experience >= Self::experience_required(self.level + 1)
        {
            self.record(CharacterEvent::LevelAdvanced {
                character_id: self.id,
                new_level: self.level + 1,
                advanced_at: Utc::now(),
            });
        }

        Ok(())
    }

    // =========================================================================
    // Health
    // =========================================================================

    /// Take damage from a named source; hit points floor at zero
    pub fn take_damage(&mut self, amount: i32, source: impl Into<String>) -> Result<(), DomainError> {
        if amount <= 0 {
            return Err(DomainError::invalid_amount(format!(
                "damage must be positive, got {}",
                amount
            )));
        }
        if self.is_defeated() {
            return Err(DomainError::CharacterDefeated);
        }

        let remaining = (self.hit_points - amount).max(0);
        self.record(CharacterEvent::DamageTaken {
            character_id: self.id,
            amount,
            remaining_hit_points: remaining,
            source: source.into(),
            taken_at: Utc::now(),
        });

        Ok(())
    }

    /// Restore hit points up to the ceiling
    pub fn heal(&mut self, amount: i32) -> Result<(), DomainError> {
        if amount <= 0 {
            return Err(DomainError::invalid_amount(format!(
                "healing must be positive, got {}",
                amount
            )));
        }
        if self.is_defeated() {
            return Err(DomainError::CharacterDefeated);
        }

        let remaining = (self.hit_points + amount).min(self.max_hit_points);
        self.record(CharacterEvent::HealthRestored {
            character_id: self.id,
            amount,
            remaining_hit_points: remaining,
            restored_at: Utc::now(),
        });

        Ok(())
    }

    // =========================================================================
    // Gold
    // =========================================================================

    /// Add gold to the purse
    pub fn earn_gold(&mut self, amount: i64) -> Result<(), DomainError> {
        if amount <= 0 {
            return Err(DomainError::invalid_amount(format!(
                "gold earned must be positive, got {}",
                amount
            )));
        }

        self.record(CharacterEvent::GoldEarned {
            character_id: self.id,
            amount,
            balance: self.gold + amount,
            earned_at: Utc::now(),
        });

        Ok(())
    }

    /// Spend gold from the purse
    pub fn spend_gold(&mut self, amount: i64) -> Result<(), DomainError> {
        if amount <= 0 {
            return Err(DomainError::invalid_amount(format!(
                "gold spent must be positive, got {}",
                amount
            )));
        }
        if self.gold < amount {
            return Err(DomainError::insufficient_gold(amount, self.gold));
        }

        self.record(CharacterEvent::GoldSpent {
            character_id: self.id,
            amount,
            balance: self.gold - amount,
            spent_at: Utc::now(),
        });

        Ok(())
    }

    // =========================================================================
    // Equipment
    // =========================================================================

    /// Equip an item into an empty slot
    pub fn equip_item(
        &mut self,
        slot: EquipmentSlot,
        item_code: impl Into<String>,
    ) -> Result<(), DomainError> {
        let item_code = item_code.into();
        if item_code.trim().is_empty() {
            return Err(DomainError::InvalidName(
                "item code must not be empty".to_string(),
            ));
        }
        if self.equipment.contains_key(&slot) {
            return Err(DomainError::SlotOccupied(slot));
        }

        self.record(CharacterEvent::ItemEquipped {
            character_id: self.id,
            slot,
            item_code,
            equipped_at: Utc::now(),
        });

        Ok(())
    }

    /// Remove the item from an occupied slot
    pub fn unequip_item(&mut self, slot: EquipmentSlot) -> Result<(), DomainError> {
        let item_code = match self.equipment.get(&slot) {
            Some(code) => code.clone(),
            None => return Err(DomainError::SlotEmpty(slot)),
        };

        self.record(CharacterEvent::ItemUnequipped {
            character_id: self.id,
            slot,
            item_code,
            unequipped_at: Utc::now(),
        });

        Ok(())
    }

    // =========================================================================
    // Getters
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> CharacterClass {
        self.class
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn experience(&self) -> i64 {
        self.experience
    }

    pub fn hit_points(&self) -> i32 {
        self.hit_points
    }

    pub fn max_hit_points(&self) -> i32 {
        self.max_hit_points
    }

    pub fn gold(&self) -> i64 {
        self.gold
    }

    pub fn equipment(&self) -> &BTreeMap<EquipmentSlot, String> {
        &self.equipment
    }

    pub fn is_defeated(&self) -> bool {
        self.level > 0 && self.hit_points == 0
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

impl Aggregate for Character {
    type Event = CharacterEvent;

    fn aggregate_type() -> &'static str {
        "Character"
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn journal(&self) -> &EventJournal<CharacterEvent> {
        &self.journal
    }

    fn journal_mut(&mut self) -> &mut EventJournal<CharacterEvent> {
        &mut self.journal
    }

    fn apply(&mut self, event: &CharacterEvent) {
        match event {
            CharacterEvent::CharacterCreated {
                character_id,
                name,
                class,
                max_hit_points,
                created_at,
            } => {
                self.id = *character_id;
                self.name = name.clone();
                self.class = *class;
                self.level = 1;
                self.experience = 0;
                self.hit_points = *max_hit_points;
                self.max_hit_points = *max_hit_points;
                self.gold = 0;
                self.created_at = Some(*created_at);
            }

            CharacterEvent::ExperienceGained {
                total_experience, ..
            } => {
                self.experience = *total_experience;
            }

            CharacterEvent::LevelAdvanced { new_level, .. } => {
                self.level = *new_level;
            }

            CharacterEvent::DamageTaken {
                remaining_hit_points,
                ..
            } => {
                self.hit_points = *remaining_hit_points;
            }

            CharacterEvent::HealthRestored {
                remaining_hit_points,
                ..
            } => {
                self.hit_points = *remaining_hit_points;
            }

            CharacterEvent::ItemEquipped {
                slot, item_code, ..
            } => {
                self.equipment.insert(*slot, item_code.clone());
            }

            CharacterEvent::ItemUnequipped { slot, .. } => {
                self.equipment.remove(slot);
            }

            CharacterEvent::GoldEarned { balance, .. } => {
                self.gold = *balance;
            }

            CharacterEvent::GoldSpent { balance, .. } => {
                self.gold = *balance;
            }
        }
    }

    /// Busy high-level characters snapshot more aggressively
    fn tier(&self) -> u32 {
        self.level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knight() -> Character {
        Character::create(Uuid::new_v4(), "Aldric", CharacterClass::Knight).unwrap()
    }

    #[test]
    fn test_character_create() {
        let id = Uuid::new_v4();
        let character = Character::create(id, "Aldric", CharacterClass::Knight).unwrap();

        assert_eq!(character.id(), id);
        assert_eq!(character.name(), "Aldric");
        assert_eq!(character.level(), 1);
        assert_eq!(character.hit_points(), 120);
        assert_eq!(character.max_hit_points(), 120);
        assert_eq!(character.gold(), 0);
        assert_eq!(character.version(), 1);
        assert_eq!(character.journal().uncommitted_events().len(), 1);
        assert_eq!(
            character.journal().uncommitted_events()[0].event_type(),
            "CharacterCreated"
        );
    }

    #[test]
    fn test_character_create_rejects_bad_names() {
        let result = Character::create(Uuid::new_v4(), "   ", CharacterClass::Mage);
        assert!(matches!(result, Err(DomainError::InvalidName(_))));

        let long = "x".repeat(MAX_NAME_LEN + 1);
        let result = Character::create(Uuid::new_v4(), long, CharacterClass::Mage);
        assert!(matches!(result, Err(DomainError::InvalidName(_))));
    }

    #[test]
    fn test_gain_experience_records_totals() {
        let mut character = knight();
        character.gain_experience(60).unwrap();

        assert_eq!(character.experience(), 60);
        assert_eq!(character.level(), 1);
        assert_eq!(character.version(), 2);
    }

    #[test]
    fn test_level_advancement_thresholds() {
        // 100 total XP reaches level 2, 400 reaches level 3
        let mut character = knight();
        character.gain_experience(100).unwrap();
        assert_eq!(character.level(), 2);

        character.gain_experience(299).unwrap();
        assert_eq!(character.level(), 2);

        character.gain_experience(1).unwrap();
        assert_eq!(character.level(), 3);
    }

    #[test]
    fn test_single_grant_can_cross_multiple_levels() {
        let mut character = knight();
        character.gain_experience(1000).unwrap();

        // 1000 XP passes the 100 and 400 and 900 thresholds
        assert_eq!(character.level(), 4);

        let kinds: Vec<&str> = character
            .journal()
            .uncommitted_events()
            .iter()
            .map(|e| e.event_type())
            .collect();
        assert_eq!(
            kinds,
            vec![
                "CharacterCreated",
                "ExperienceGained",
                "LevelAdvanced",
                "LevelAdvanced",
                "LevelAdvanced",
            ]
        );
    }

    #[test]
    fn test_gain_experience_rejects_non_positive() {
        let mut character = knight();
        assert!(matches!(
            character.gain_experience(0),
            Err(DomainError::InvalidAmount(_))
        ));
        assert!(matches!(
            character.gain_experience(-5),
            Err(DomainError::InvalidAmount(_))
        ));
        assert_eq!(character.version(), 1);
    }

    #[test]
    fn test_take_damage_floors_at_zero() {
        let mut character = knight();
        character.take_damage(500, "dragon").unwrap();

        assert_eq!(character.hit_points(), 0);
        assert!(character.is_defeated());
    }

    #[test]
    fn test_defeated_character_cannot_act() {
        let mut character = knight();
        character.take_damage(120, "dragon").unwrap();

        assert!(matches!(
            character.take_damage(10, "rat"),
            Err(DomainError::CharacterDefeated)
        ));
        assert!(matches!(
            character.heal(10),
            Err(DomainError::CharacterDefeated)
        ));
    }

    #[test]
    fn test_heal_clamps_to_max() {
        let mut character = knight();
        character.take_damage(50, "goblin").unwrap();
        character.heal(500).unwrap();

        assert_eq!(character.hit_points(), 120);
    }

    #[test]
    fn test_gold_earn_and_spend() {
        let mut character = knight();
        character.earn_gold(100).unwrap();
        character.spend_gold(30).unwrap();

        assert_eq!(character.gold(), 70);
        assert_eq!(character.version(), 3);
    }

    #[test]
    fn test_spend_gold_insufficient() {
        let mut character = knight();
        character.earn_gold(20).unwrap();

        let result = character.spend_gold(50);
        assert!(matches!(
            result,
            Err(DomainError::InsufficientGold {
                required: 50,
                balance: 20
            })
        ));
        assert_eq!(character.gold(), 20);
    }

    #[test]
    fn test_equip_and_unequip() {
        let mut character = knight();
        character
            .equip_item(EquipmentSlot::Weapon, "iron_sword")
            .unwrap();

        assert_eq!(
            character.equipment().get(&EquipmentSlot::Weapon),
            Some(&"iron_sword".to_string())
        );

        let result = character.equip_item(EquipmentSlot::Weapon, "steel_sword");
        assert!(matches!(
            result,
            Err(DomainError::SlotOccupied(EquipmentSlot::Weapon))
        ));

        character.unequip_item(EquipmentSlot::Weapon).unwrap();
        assert!(character.equipment().is_empty());

        let result = character.unequip_item(EquipmentSlot::Weapon);
        assert!(matches!(
            result,
            Err(DomainError::SlotEmpty(EquipmentSlot::Weapon))
        ));
    }

    #[test]
    fn test_replay_rebuilds_identical_state() {
        let mut character = knight();
        character.gain_experience(150).unwrap();
        character.take_damage(40, "goblin").unwrap();
        character.earn_gold(75).unwrap();
        character
            .equip_item(EquipmentSlot::Armor, "chainmail")
            .unwrap();

        let envelopes: Vec<_> = character.journal().uncommitted_events().to_vec();

        let mut replayed = Character::default();
        for envelope in &envelopes {
            replayed.replay(envelope);
        }

        assert_eq!(replayed.id(), character.id());
        assert_eq!(replayed.version(), character.version());
        assert_eq!(replayed.experience(), character.experience());
        assert_eq!(replayed.level(), character.level());
        assert_eq!(replayed.hit_points(), character.hit_points());
        assert_eq!(replayed.gold(), character.gold());
        assert_eq!(replayed.equipment(), character.equipment());
        assert!(!replayed.journal().has_uncommitted());
    }

    #[test]
    fn test_snapshot_serde_round_trip() {
        let mut character = knight();
        character.gain_experience(150).unwrap();
        character.earn_gold(40).unwrap();
        character.journal_mut().clear_uncommitted();

        let state = serde_json::to_value(&character).unwrap();
        let restored: Character = serde_json::from_value(state).unwrap();

        assert_eq!(restored, character);
        assert_eq!(restored.version(), character.version());
    }

    #[test]
    fn test_tier_tracks_level() {
        let mut character = knight();
        assert_eq!(character.tier(), 1);

        character.gain_experience(100).unwrap();
        assert_eq!(character.tier(), 2);
    }
}
