//! Projection module
//!
//! Updates read-model tables (projections) from events.
//! Projections are event handlers like any other; they register on the
//! dispatcher and run after commit.

mod feed;
mod profile;

pub use feed::{ActivityFeedProjection, FeedEntry};
pub use profile::{CharacterProfile, CharacterProfileProjection};
