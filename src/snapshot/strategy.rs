//! Snapshot Strategy
//!
//! Pure decision function for when an aggregate deserves a new snapshot.

use chrono::{DateTime, Duration, Utc};

use super::SnapshotMeta;

/// Static thresholds steering snapshot creation
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// Events an aggregate must accumulate before its first snapshot
    pub min_events_for_first_snapshot: i64,

    /// Events since the last snapshot that trigger the next one
    pub event_count_threshold: i64,

    /// A snapshot older than this is refreshed regardless of event counts
    pub max_snapshot_age: Duration,

    /// Floor between consecutive snapshots of one aggregate
    pub min_snapshot_interval: Duration,

    /// Tier at or above which the reduced event threshold applies
    pub high_tier_threshold: u32,

    /// Reduced event threshold for high-tier aggregates
    pub high_tier_event_threshold: i64,

    /// Snapshots kept per aggregate; older ones are pruned
    pub retain_per_aggregate: u32,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            min_events_for_first_snapshot: 100,
            event_count_threshold: 50,
            max_snapshot_age: Duration::days(30),
            min_snapshot_interval: Duration::minutes(10),
            high_tier_threshold: 50,
            high_tier_event_threshold: 20,
            retain_per_aggregate: 3,
        }
    }
}

/// Decides when snapshots are due.
///
/// The rules run in a fixed order; age staleness wins over every count rule,
/// and the rate limit is checked before the high-tier exception.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStrategy {
    config: SnapshotConfig,
}

impl SnapshotStrategy {
    pub fn new(config: SnapshotConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    /// Whether a new snapshot should be written now.
    ///
    /// `event_count` is the aggregate's current version (versions are gapless
    /// from 1, so version equals the number of stored events).
    pub fn should_snapshot(
        &self,
        tier: u32,
        event_count: i64,
        latest: Option<&SnapshotMeta>,
        now: DateTime<Utc>,
    ) -> bool {
        let latest = match latest {
            Some(meta) => meta,
            None => return event_count >= self.config.min_events_for_first_snapshot,
        };

        let age = now - latest.created_at;
        if age > self.config.max_snapshot_age {
            return true;
        }

        let since_snapshot = event_count - latest.version;
        if since_snapshot >= self.config.event_count_threshold {
            return true;
        }

        if age < self.config.min_snapshot_interval {
            return false;
        }

        if tier >= self.config.high_tier_threshold {
            return since_snapshot >= self.config.high_tier_event_threshold;
        }

        false
    }
}
