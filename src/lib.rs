//! questlog Library
//!
//! Re-exports modules for integration testing and external use.

pub mod aggregate;
pub mod dispatch;
pub mod domain;
pub mod event_store;
pub mod handlers;
pub mod jobs;
pub mod pipeline;
pub mod projection;
pub mod repository;
pub mod snapshot;

// Private modules (used only by main.rs binary)
pub mod config;
pub mod db;
mod error;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use domain::{CharacterClass, CharacterEvent, DomainError, EquipmentSlot, PartyEvent};
