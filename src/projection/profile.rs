//! Character Profile Projection
//!
//! Maintains the `character_profiles` read model from committed events.
//! Each row guards itself with `last_event_version`, so redelivered or
//! out-of-order events degrade to no-ops.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::dispatch::{EventHandler, HandlerError};
use crate::domain::{CharacterClass, CharacterEvent, EquipmentSlot, EventEnvelope};

/// One row of the `character_profiles` read model
#[derive(Debug, Clone)]
pub struct CharacterProfile {
    pub character_id: Uuid,
    pub name: String,
    pub class: String,
    pub level: i64,
    pub experience: i64,
    pub hit_points: i32,
    pub max_hit_points: i32,
    pub gold: i64,
    pub equipment: serde_json::Value,
    pub defeated: bool,
    pub last_event_version: i64,
    pub updated_at: DateTime<Utc>,
}

/// Projects character events into `character_profiles`
#[derive(Debug, Clone)]
pub struct CharacterProfileProjection {
    pool: PgPool,
}

impl CharacterProfileProjection {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_profile(
        &self,
        event: &EventEnvelope<CharacterEvent>,
        name: &str,
        class: CharacterClass,
        max_hit_points: i32,
        created_at: DateTime<Utc>,
    ) -> Result<(), HandlerError> {
        sqlx::query(
            r#"
            INSERT INTO character_profiles (
                character_id, name, class, level, experience,
                hit_points, max_hit_points, gold, equipment, defeated,
                last_event_id, last_event_version, created_at, updated_at
            )
            VALUES ($1, $2, $3, 1, 0, $4, $4, 0, '{}'::jsonb, FALSE, $5, $6, $7, NOW())
            ON CONFLICT (character_id) DO NOTHING
            "#,
        )
        .bind(event.aggregate_id)
        .bind(name)
        .bind(class.to_string())
        .bind(max_hit_points)
        .bind(event.event_id)
        .bind(event.version)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_experience(
        &self,
        event: &EventEnvelope<CharacterEvent>,
        total_experience: i64,
    ) -> Result<(), HandlerError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE character_profiles
            SET
                experience = $2,
                last_event_id = $3,
                last_event_version = $4,
                updated_at = NOW()
            WHERE character_id = $1 AND last_event_version < $4
            "#,
        )
        .bind(event.aggregate_id)
        .bind(total_experience)
        .bind(event.event_id)
        .bind(event.version)
        .execute(&self.pool)
        .await?
        .rows_affected();

        self.note_skip(event, rows_affected);
        Ok(())
    }

    async fn update_level(
        &self,
        event: &EventEnvelope<CharacterEvent>,
        new_level: u32,
    ) -> Result<(), HandlerError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE character_profiles
            SET
                level = $2,
                last_event_id = $3,
                last_event_version = $4,
                updated_at = NOW()
            WHERE character_id = $1 AND last_event_version < $4
            "#,
        )
        .bind(event.aggregate_id)
        .bind(i64::from(new_level))
        .bind(event.event_id)
        .bind(event.version)
        .execute(&self.pool)
        .await?
        .rows_affected();

        self.note_skip(event, rows_affected);
        Ok(())
    }

    async fn update_hit_points(
        &self,
        event: &EventEnvelope<CharacterEvent>,
        remaining: i32,
    ) -> Result<(), HandlerError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE character_profiles
            SET
                hit_points = $2,
                defeated = ($2 = 0),
                last_event_id = $3,
                last_event_version = $4,
                updated_at = NOW()
            WHERE character_id = $1 AND last_event_version < $4
            "#,
        )
        .bind(event.aggregate_id)
        .bind(remaining)
        .bind(event.event_id)
        .bind(event.version)
        .execute(&self.pool)
        .await?
        .rows_affected();

        self.note_skip(event, rows_affected);
        Ok(())
    }

    async fn update_gold(
        &self,
        event: &EventEnvelope<CharacterEvent>,
        balance: i64,
    ) -> Result<(), HandlerError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE character_profiles
            SET
                gold = $2,
                last_event_id = $3,
                last_event_version = $4,
                updated_at = NOW()
            WHERE character_id = $1 AND last_event_version < $4
            "#,
        )
        .bind(event.aggregate_id)
        .bind(balance)
        .bind(event.event_id)
        .bind(event.version)
        .execute(&self.pool)
        .await?
        .rows_affected();

        self.note_skip(event, rows_affected);
        Ok(())
    }

    async fn equip(
        &self,
        event: &EventEnvelope<CharacterEvent>,
        slot: EquipmentSlot,
        item_code: &str,
    ) -> Result<(), HandlerError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE character_profiles
            SET
                equipment = equipment || jsonb_build_object($2::text, $3::text),
                last_event_id = $4,
                last_event_version = $5,
                updated_at = NOW()
            WHERE character_id = $1 AND last_event_version < $5
            "#,
        )
        .bind(event.aggregate_id)
        .bind(slot.to_string())
        .bind(item_code)
        .bind(event.event_id)
        .bind(event.version)
        .execute(&self.pool)
        .await?
        .rows_affected();

        self.note_skip(event, rows_affected);
        Ok(())
    }

    async fn unequip(
        &self,
        event: &EventEnvelope<CharacterEvent>,
        slot: EquipmentSlot,
    ) -> Result<(), HandlerError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE character_profiles
            SET
                equipment = equipment - $2::text,
                last_event_id = $3,
                last_event_version = $4,
                updated_at = NOW()
            WHERE character_id = $1 AND last_event_version < $4
            "#,
        )
        .bind(event.aggregate_id)
        .bind(slot.to_string())
        .bind(event.event_id)
        .bind(event.version)
        .execute(&self.pool)
        .await?
        .rows_affected();

        self.note_skip(event, rows_affected);
        Ok(())
    }

    fn note_skip(&self, event: &EventEnvelope<CharacterEvent>, rows_affected: u64) {
        if rows_affected == 0 {
            tracing::debug!(
                character_id = %event.aggregate_id,
                version = event.version,
                event_type = event.event_type(),
                "profile update skipped (row missing or already ahead)"
            );
        }
    }

    /// Fetch one profile row
    pub async fn fetch(&self, character_id: Uuid) -> Result<Option<CharacterProfile>, sqlx::Error> {
        let row: Option<(
            Uuid,
            String,
            String,
            i64,
            i64,
            i32,
            i32,
            i64,
            serde_json::Value,
            bool,
            i64,
            DateTime<Utc>,
        )> = sqlx::query_as(
            r#"
            SELECT character_id, name, class, level, experience,
                   hit_points, max_hit_points, gold, equipment, defeated,
                   last_event_version, updated_at
            FROM character_profiles
            WHERE character_id = $1
            "#,
        )
        .bind(character_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(
                character_id,
                name,
                class,
                level,
                experience,
                hit_points,
                max_hit_points,
                gold,
                equipment,
                defeated,
                last_event_version,
                updated_at,
            )| CharacterProfile {
                character_id,
                name,
                class,
                level,
                experience,
                hit_points,
                max_hit_points,
                gold,
                equipment,
                defeated,
                last_event_version,
                updated_at,
            },
        ))
    }
}

#[async_trait]
impl EventHandler<CharacterEvent> for CharacterProfileProjection {
    fn name(&self) -> &'static str {
        "character_profile"
    }

    async fn handle(&self, event: &EventEnvelope<CharacterEvent>) -> Result<(), HandlerError> {
        match &event.payload {
            CharacterEvent::CharacterCreated {
                name,
                class,
                max_hit_points,
                created_at,
                ..
            } => {
                self.insert_profile(event, name, *class, *max_hit_points, *created_at)
                    .await
            }

            CharacterEvent::ExperienceGained {
                total_experience, ..
            } => self.update_experience(event, *total_experience).await,

            CharacterEvent::LevelAdvanced { new_level, .. } => {
                self.update_level(event, *new_level).await
            }

            CharacterEvent::DamageTaken {
                remaining_hit_points,
                ..
            }
            | CharacterEvent::HealthRestored {
                remaining_hit_points,
                ..
            } => self.update_hit_points(event, *remaining_hit_points).await,

            CharacterEvent::ItemEquipped {
                slot, item_code, ..
            } => self.equip(event, *slot, item_code).await,

            CharacterEvent::ItemUnequipped { slot, .. } => self.unequip(event, *slot).await,

            CharacterEvent::GoldEarned { balance, .. }
            | CharacterEvent::GoldSpent { balance, .. } => {
                self.update_gold(event, *balance).await
            }
        }
    }
}
