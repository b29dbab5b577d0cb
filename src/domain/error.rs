//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;

use crate::domain::events::EquipmentSlot;

/// Business rule violations raised by aggregates.
///
/// These errors are independent of the storage and dispatch layers; a command
/// that trips one leaves the aggregate unchanged and records no events.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Character name failed validation
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Amount was zero or negative
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Character has zero hit points and cannot act
    #[error("Character is defeated")]
    CharacterDefeated,

    /// Not enough gold for the purchase
    #[error("Insufficient gold: required {required}, balance {balance}")]
    InsufficientGold { required: i64, balance: i64 },

    /// Equipment slot already holds an item
    #[error("Slot {0} is already occupied")]
    SlotOccupied(EquipmentSlot),

    /// Equipment slot holds nothing to remove
    #[error("Slot {0} is empty")]
    SlotEmpty(EquipmentSlot),

    /// Party has been disbanded and accepts no further changes
    #[error("Party is disbanded")]
    PartyDisbanded,

    /// Character already belongs to the party
    #[error("Character {0} is already a member")]
    AlreadyMember(uuid::Uuid),

    /// Character does not belong to the party
    #[error("Character {0} is not a member")]
    NotMember(uuid::Uuid),

    /// Party cannot take more members
    #[error("Party is full: limit {0}")]
    PartyFull(usize),
}

impl DomainError {
    /// Create an invalid amount error
    pub fn invalid_amount(detail: impl Into<String>) -> Self {
        Self::InvalidAmount(detail.into())
    }

    /// Create an insufficient gold error
    pub fn insufficient_gold(required: i64, balance: i64) -> Self {
        Self::InsufficientGold { required, balance }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_gold_error() {
        let err = DomainError::insufficient_gold(100, 35);

        assert!(err.to_string().contains("100"));
        assert!(err.to_string().contains("35"));
    }

    #[test]
    fn test_slot_errors_name_the_slot() {
        let occupied = DomainError::SlotOccupied(EquipmentSlot::Weapon);
        let empty = DomainError::SlotEmpty(EquipmentSlot::Trinket);

        assert!(occupied.to_string().contains("weapon"));
        assert!(empty.to_string().contains("trinket"));
    }
}
