//! Domain Events
//!
//! Event definitions for Event Sourcing.
//! Events are immutable facts that have happened in the system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Behavior shared by every domain event family.
///
/// The serialized payload is keyed by the `type` tag, so the variant name
/// is the only type metadata that ever reaches storage.
pub trait DomainEvent: Clone + Send + Sync {
    /// Stable name of the concrete event, matching its serde tag
    fn event_type(&self) -> &'static str;

    /// ID of the aggregate this event belongs to
    fn aggregate_id(&self) -> Uuid;
}

/// Character-related events
///
/// Mutation events carry the resulting totals (experience, hit points, gold)
/// so that replay never has to re-derive them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CharacterEvent {
    /// Character was created
    CharacterCreated {
        character_id: Uuid,
        name: String,
        class: CharacterClass,
        max_hit_points: i32,
        created_at: DateTime<Utc>,
    },

    /// Experience points were gained
    ExperienceGained {
        character_id: Uuid,
        amount: i64,
        total_experience: i64,
        gained_at: DateTime<Utc>,
    },

    /// Character advanced to a new level
    LevelAdvanced {
        character_id: Uuid,
        new_level: u32,
        advanced_at: DateTime<Utc>,
    },

    /// Character took damage
    DamageTaken {
        character_id: Uuid,
        amount: i32,
        remaining_hit_points: i32,
        source: String,
        taken_at: DateTime<Utc>,
    },

    /// Character recovered hit points
    HealthRestored {
        character_id: Uuid,
        amount: i32,
        remaining_hit_points: i32,
        restored_at: DateTime<Utc>,
    },

    /// Item was equipped into a slot
    ItemEquipped {
        character_id: Uuid,
        slot: EquipmentSlot,
        item_code: String,
        equipped_at: DateTime<Utc>,
    },

    /// Item was removed from a slot
    ItemUnequipped {
        character_id: Uuid,
        slot: EquipmentSlot,
        item_code: String,
        unequipped_at: DateTime<Utc>,
    },

    /// Gold was added to the purse
    GoldEarned {
        character_id: Uuid,
        amount: i64,
        balance: i64,
        earned_at: DateTime<Utc>,
    },

    /// Gold was spent from the purse
    GoldSpent {
        character_id: Uuid,
        amount: i64,
        balance: i64,
        spent_at: DateTime<Utc>,
    },
}

impl CharacterEvent {
    /// Every event type in this family, in declaration order
    pub const KINDS: &'static [&'static str] = &[
        "CharacterCreated",
        "ExperienceGained",
        "LevelAdvanced",
        "DamageTaken",
        "HealthRestored",
        "ItemEquipped",
        "ItemUnequipped",
        "GoldEarned",
        "GoldSpent",
    ];

    /// Get the character ID this event relates to
    pub fn character_id(&self) -> Uuid {
        match self {
            CharacterEvent::CharacterCreated { character_id, .. } => *character_id,
            CharacterEvent::ExperienceGained { character_id, .. } => *character_id,
            CharacterEvent::LevelAdvanced { character_id, .. } => *character_id,
            CharacterEvent::DamageTaken { character_id, .. } => *character_id,
            CharacterEvent::HealthRestored { character_id, .. } => *character_id,
            CharacterEvent::ItemEquipped { character_id, .. } => *character_id,
            CharacterEvent::ItemUnequipped { character_id, .. } => *character_id,
            CharacterEvent::GoldEarned { character_id, .. } => *character_id,
            CharacterEvent::GoldSpent { character_id, .. } => *character_id,
        }
    }
}

impl DomainEvent for CharacterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CharacterEvent::CharacterCreated { .. } => "CharacterCreated",
            CharacterEvent::ExperienceGained { .. } => "ExperienceGained",
            CharacterEvent::LevelAdvanced { .. } => "LevelAdvanced",
            CharacterEvent::DamageTaken { .. } => "DamageTaken",
            CharacterEvent::HealthRestored { .. } => "HealthRestored",
            CharacterEvent::ItemEquipped { .. } => "ItemEquipped",
            CharacterEvent::ItemUnequipped { .. } => "ItemUnequipped",
            CharacterEvent::GoldEarned { .. } => "GoldEarned",
            CharacterEvent::GoldSpent { .. } => "GoldSpent",
        }
    }

    fn aggregate_id(&self) -> Uuid {
        self.character_id()
    }
}

/// Playable character classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterClass {
    Knight,
    Mage,
    Cleric,
}

impl CharacterClass {
    /// Base hit point pool granted at creation
    pub fn base_hit_points(&self) -> i32 {
        match self {
            CharacterClass::Knight => 120,
            CharacterClass::Mage => 80,
            CharacterClass::Cleric => 100,
        }
    }
}

impl std::fmt::Display for CharacterClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CharacterClass::Knight => write!(f, "knight"),
            CharacterClass::Mage => write!(f, "mage"),
            CharacterClass::Cleric => write!(f, "cleric"),
        }
    }
}

/// Equipment slots a character can fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentSlot {
    Weapon,
    Armor,
    Trinket,
}

impl std::fmt::Display for EquipmentSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EquipmentSlot::Weapon => write!(f, "weapon"),
            EquipmentSlot::Armor => write!(f, "armor"),
            EquipmentSlot::Trinket => write!(f, "trinket"),
        }
    }
}

/// Party-related events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PartyEvent {
    /// Party was formed
    PartyFormed {
        party_id: Uuid,
        name: String,
        formed_at: DateTime<Utc>,
    },

    /// Character joined the party
    MemberEnrolled {
        party_id: Uuid,
        character_id: Uuid,
        enrolled_at: DateTime<Utc>,
    },

    /// Character left the party
    MemberDischarged {
        party_id: Uuid,
        character_id: Uuid,
        discharged_at: DateTime<Utc>,
    },

    /// Party was dissolved
    PartyDisbanded {
        party_id: Uuid,
        disbanded_at: DateTime<Utc>,
    },
}

impl PartyEvent {
    /// Every event type in this family, in declaration order
    pub const KINDS: &'static [&'static str] = &[
        "PartyFormed",
        "MemberEnrolled",
        "MemberDischarged",
        "PartyDisbanded",
    ];

    /// Get the party ID this event relates to
    pub fn party_id(&self) -> Uuid {
        match self {
            PartyEvent::PartyFormed { party_id, .. } => *party_id,
            PartyEvent::MemberEnrolled { party_id, .. } => *party_id,
            PartyEvent::MemberDischarged { party_id, .. } => *party_id,
            PartyEvent::PartyDisbanded { party_id, .. } => *party_id,
        }
    }
}

impl DomainEvent for PartyEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PartyEvent::PartyFormed { .. } => "PartyFormed",
            PartyEvent::MemberEnrolled { .. } => "MemberEnrolled",
            PartyEvent::MemberDischarged { .. } => "MemberDischarged",
            PartyEvent::PartyDisbanded { .. } => "PartyDisbanded",
        }
    }

    fn aggregate_id(&self) -> Uuid {
        self.party_id()
    }
}

/// A domain event together with its stream position and identity.
///
/// Envelopes are what aggregates buffer and what handlers receive after
/// commit; the bare payload never travels alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    pub event_id: Uuid,
    pub aggregate_id: Uuid,
    pub version: i64,
    pub occurred_at: DateTime<Utc>,
    pub payload: E,
}

impl<E: DomainEvent> EventEnvelope<E> {
    /// Wrap a freshly recorded event at the given stream position
    pub fn new(aggregate_id: Uuid, version: i64, payload: E) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            aggregate_id,
            version,
            occurred_at: Utc::now(),
            payload,
        }
    }

    /// Stable name of the wrapped event
    pub fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }
}
