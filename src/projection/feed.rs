//! Activity Feed Projection
//!
//! Appends a human-readable line to `activity_feed` for every committed
//! event. The `event_id` unique constraint makes redelivery a no-op.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::dispatch::{EventHandler, HandlerError};
use crate::domain::{CharacterEvent, EventEnvelope, PartyEvent};

/// One line of the activity feed
#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub event_id: Uuid,
    pub aggregate_id: Uuid,
    pub version: i64,
    pub activity: String,
    pub detail: String,
    pub occurred_at: DateTime<Utc>,
}

/// Projects character and party events into `activity_feed`
#[derive(Debug, Clone)]
pub struct ActivityFeedProjection {
    pool: PgPool,
}

impl ActivityFeedProjection {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_entry(
        &self,
        event_id: Uuid,
        aggregate_id: Uuid,
        version: i64,
        activity: &str,
        detail: &str,
        occurred_at: DateTime<Utc>,
    ) -> Result<(), HandlerError> {
        sqlx::query(
            r#"
            INSERT INTO activity_feed (event_id, aggregate_id, version, activity, detail, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(aggregate_id)
        .bind(version)
        .bind(activity)
        .bind(detail)
        .bind(occurred_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Most recent feed entries for one aggregate, newest first
    pub async fn recent_for(
        &self,
        aggregate_id: Uuid,
        limit: i64,
    ) -> Result<Vec<FeedEntry>, sqlx::Error> {
        let rows: Vec<(Uuid, Uuid, i64, String, String, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT event_id, aggregate_id, version, activity, detail, occurred_at
            FROM activity_feed
            WHERE aggregate_id = $1
            ORDER BY version DESC
            LIMIT $2
            "#,
        )
        .bind(aggregate_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(event_id, aggregate_id, version, activity, detail, occurred_at)| FeedEntry {
                    event_id,
                    aggregate_id,
                    version,
                    activity,
                    detail,
                    occurred_at,
                },
            )
            .collect())
    }
}

/// Feed line for a character event: (activity tag, detail text)
fn describe_character(event: &CharacterEvent) -> (&'static str, String) {
    match event {
        CharacterEvent::CharacterCreated { name, class, .. } => (
            "created",
            format!("{} the {} enters the realm", name, class),
        ),

        CharacterEvent::ExperienceGained {
            amount,
            total_experience,
            ..
        } => (
            "experience",
            format!("gained {} XP ({} total)", amount, total_experience),
        ),

        CharacterEvent::LevelAdvanced { new_level, .. } => {
            ("level_up", format!("advanced to level {}", new_level))
        }

        CharacterEvent::DamageTaken {
            amount,
            remaining_hit_points,
            source,
            ..
        } => (
            "damage",
            format!(
                "took {} damage from {} ({} HP left)",
                amount, source, remaining_hit_points
            ),
        ),

        CharacterEvent::HealthRestored {
            amount,
            remaining_hit_points,
            ..
        } => (
            "heal",
            format!("recovered {} HP ({} now)", amount, remaining_hit_points),
        ),

        CharacterEvent::ItemEquipped {
            slot, item_code, ..
        } => (
            "equip",
            format!("equipped {} in the {} slot", item_code, slot),
        ),

        CharacterEvent::ItemUnequipped {
            slot, item_code, ..
        } => (
            "unequip",
            format!("removed {} from the {} slot", item_code, slot),
        ),

        CharacterEvent::GoldEarned {
            amount, balance, ..
        } => (
            "gold",
            format!("earned {} gold ({} in purse)", amount, balance),
        ),

        CharacterEvent::GoldSpent {
            amount, balance, ..
        } => (
            "gold",
            format!("spent {} gold ({} in purse)", amount, balance),
        ),
    }
}

/// Feed line for a party event: (activity tag, detail text)
fn describe_party(event: &PartyEvent) -> (&'static str, String) {
    match event {
        PartyEvent::PartyFormed { name, .. } => {
            ("party", format!("party \"{}\" was formed", name))
        }

        PartyEvent::MemberEnrolled { character_id, .. } => {
            ("party", format!("character {} joined the party", character_id))
        }

        PartyEvent::MemberDischarged { character_id, .. } => {
            ("party", format!("character {} left the party", character_id))
        }

        PartyEvent::PartyDisbanded { .. } => ("party", "the party disbanded".to_string()),
    }
}

#[async_trait]
impl EventHandler<CharacterEvent> for ActivityFeedProjection {
    fn name(&self) -> &'static str {
        "activity_feed"
    }

    async fn handle(&self, event: &EventEnvelope<CharacterEvent>) -> Result<(), HandlerError> {
        let (activity, detail) = describe_character(&event.payload);
        self.insert_entry(
            event.event_id,
            event.aggregate_id,
            event.version,
            activity,
            &detail,
            event.occurred_at,
        )
        .await
    }
}

#[async_trait]
impl EventHandler<PartyEvent> for ActivityFeedProjection {
    fn name(&self) -> &'static str {
        "activity_feed"
    }

    async fn handle(&self, event: &EventEnvelope<PartyEvent>) -> Result<(), HandlerError> {
        let (activity, detail) = describe_party(&event.payload);
        self.insert_entry(
            event.event_id,
            event.aggregate_id,
            event.version,
            activity,
            &detail,
            event.occurred_at,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CharacterClass, EquipmentSlot};

    #[test]
    fn test_character_feed_lines() {
        let id = Uuid::new_v4();

        let (activity, detail) = describe_character(&CharacterEvent::CharacterCreated {
            character_id: id,
            name: "Aldric".to_string(),
            class: CharacterClass::Knight,
            max_hit_points: 120,
            created_at: Utc::now(),
        });
        assert_eq!(activity, "created");
        assert_eq!(detail, "Aldric the knight enters the realm");

        let (activity, detail) = describe_character(&CharacterEvent::DamageTaken {
            character_id: id,
            amount: 30,
            remaining_hit_points: 90,
            source: "cave_troll".to_string(),
            taken_at: Utc::now(),
        });
        assert_eq!(activity, "damage");
        assert_eq!(detail, "took 30 damage from cave_troll (90 HP left)");

        let (activity, detail) = describe_character(&CharacterEvent::ItemEquipped {
            character_id: id,
            slot: EquipmentSlot::Weapon,
            item_code: "iron_sword".to_string(),
            equipped_at: Utc::now(),
        });
        assert_eq!(activity, "equip");
        assert_eq!(detail, "equipped iron_sword in the weapon slot");
    }

    #[test]
    fn test_party_feed_lines() {
        let (activity, detail) = describe_party(&PartyEvent::PartyFormed {
            party_id: Uuid::new_v4(),
            name: "Dawn Patrol".to_string(),
            formed_at: Utc::now(),
        });
        assert_eq!(activity, "party");
        assert_eq!(detail, "party \"Dawn Patrol\" was formed");

        let member = Uuid::new_v4();
        let (_, detail) = describe_party(&PartyEvent::MemberEnrolled {
            party_id: Uuid::new_v4(),
            character_id: member,
            enrolled_at: Utc::now(),
        });
        assert_eq!(detail, format!("character {} joined the party", member));
    }
}
