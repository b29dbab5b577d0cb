//! Domain module
//!
//! Core domain types and business logic.

pub mod error;
pub mod events;

pub use error::DomainError;
pub use events::{
    CharacterClass, CharacterEvent, DomainEvent, EquipmentSlot, EventEnvelope, PartyEvent,
};
