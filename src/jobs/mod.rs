//! Scheduled Jobs
//!
//! Background jobs for periodic maintenance tasks.
//! The snapshot sweep catches aggregates the opportunistic post-command
//! checks missed (idle streams, crashed processes), and the feed trim keeps
//! the activity feed from growing without bound.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::PgPool;
use tokio::time::interval;
use uuid::Uuid;

use crate::aggregate::{Aggregate, Character, Party};
use crate::repository::AggregateRepository;

// =========================================================================
// Snapshot Sweep
// =========================================================================

/// Counters from one sweep over one aggregate type
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepStats {
    /// Candidates pulled from the store
    pub examined: u64,
    /// Snapshots actually written
    pub written: u64,
    /// Aggregates that could not be rebuilt or snapshotted
    pub failed: u64,
}

/// Find aggregates whose snapshots lag behind their streams and snapshot
/// the ones that are due.
///
/// Candidates are streams with events past their newest snapshot, plus
/// streams whose newest snapshot has gone stale. The repository's strategy
/// still makes the final call per aggregate; this query only narrows the
/// field. A failing aggregate is logged and skipped, never aborts the sweep.
pub async fn sweep_snapshots<A>(
    pool: &PgPool,
    repository: &AggregateRepository,
    batch_size: i64,
) -> Result<SweepStats, JobError>
where
    A: Aggregate + Serialize + DeserializeOwned,
    A::Event: DeserializeOwned,
{
    let stale_before = Utc::now() - repository.strategy().config().max_snapshot_age;

    let candidates: Vec<(Uuid,)> = sqlx::query_as(
        r#"
        WITH heads AS (
            SELECT aggregate_id, MAX(version) AS head
            FROM events
            WHERE aggregate_type = $1
            GROUP BY aggregate_id
        ),
        latest AS (
            SELECT DISTINCT ON (aggregate_id) aggregate_id, version, created_at
            FROM event_snapshots
            WHERE aggregate_type = $1
            ORDER BY aggregate_id, version DESC
        )
        SELECT h.aggregate_id
        FROM heads h
        LEFT JOIN latest l ON l.aggregate_id = h.aggregate_id
        WHERE h.head > COALESCE(l.version, 0)
           OR l.created_at < $2
        ORDER BY h.head - COALESCE(l.version, 0) DESC
        LIMIT $3
        "#,
    )
    .bind(A::aggregate_type())
    .bind(stale_before)
    .bind(batch_size)
    .fetch_all(pool)
    .await?;

    let mut stats = SweepStats::default();

    for (aggregate_id,) in candidates {
        stats.examined += 1;

        let aggregate = match repository.get_by_id::<A>(aggregate_id).await {
            Ok(Some(aggregate)) => aggregate,
            Ok(None) => continue,
            Err(error) => {
                stats.failed += 1;
                tracing::error!(
                    aggregate_type = A::aggregate_type(),
                    aggregate_id = %aggregate_id,
                    %error,
                    "sweep could not rebuild aggregate"
                );
                continue;
            }
        };

        match repository.snapshot_if_due(&aggregate, Utc::now()).await {
            Ok(true) => stats.written += 1,
            Ok(false) => {}
            Err(error) => {
                stats.failed += 1;
                tracing::error!(
                    aggregate_type = A::aggregate_type(),
                    aggregate_id = %aggregate_id,
                    %error,
                    "sweep could not write snapshot"
                );
            }
        }
    }

    if stats.written > 0 || stats.failed > 0 {
        tracing::info!(
            aggregate_type = A::aggregate_type(),
            examined = stats.examined,
            written = stats.written,
            failed = stats.failed,
            "snapshot sweep finished"
        );
    }

    Ok(stats)
}

// =========================================================================
// Activity Feed Trim
// =========================================================================

/// Delete activity feed entries older than 90 days
pub async fn trim_activity_feed(pool: &PgPool) -> Result<u64, JobError> {
    let result = sqlx::query(
        r#"
        DELETE FROM activity_feed
        WHERE occurred_at < NOW() - INTERVAL '90 days'
        "#,
    )
    .execute(pool)
    .await?;

    let rows_deleted = result.rows_affected();

    if rows_deleted > 0 {
        tracing::info!(
            rows_deleted = rows_deleted,
            "Trimmed old activity feed entries"
        );
    }

    Ok(rows_deleted)
}

// =========================================================================
// Job Scheduler
// =========================================================================

/// Configuration for job scheduler
#[derive(Debug, Clone)]
pub struct JobSchedulerConfig {
    /// Interval for the snapshot sweep (default: 5 minutes)
    pub snapshot_sweep_interval: Duration,
    /// Interval for the activity feed trim (default: 1 hour)
    pub feed_trim_interval: Duration,
    /// Aggregates examined per sweep and type
    pub sweep_batch_size: i64,
}

impl Default for JobSchedulerConfig {
    fn default() -> Self {
        Self {
            snapshot_sweep_interval: Duration::from_secs(300),
            feed_trim_interval: Duration::from_secs(3600),
            sweep_batch_size: 100,
        }
    }
}

/// Job Scheduler - runs periodic maintenance tasks
pub struct JobScheduler {
    pool: PgPool,
    repository: Arc<AggregateRepository>,
    config: JobSchedulerConfig,
}

impl JobScheduler {
    /// Create a new job scheduler
    pub fn new(pool: PgPool, repository: Arc<AggregateRepository>) -> Self {
        Self {
            pool,
            repository,
            config: JobSchedulerConfig::default(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(
        pool: PgPool,
        repository: Arc<AggregateRepository>,
        config: JobSchedulerConfig,
    ) -> Self {
        Self {
            pool,
            repository,
            config,
        }
    }

    /// Start the job scheduler in the background
    /// Returns a handle that can be used to abort the scheduler
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the scheduler loop
    async fn run(&self) {
        tracing::info!("Job scheduler started");

        let mut sweep_interval = interval(self.config.snapshot_sweep_interval);
        let mut trim_interval = interval(self.config.feed_trim_interval);

        loop {
            tokio::select! {
                _ = sweep_interval.tick() => {
                    if let Err(e) = sweep_snapshots::<Character>(
                        &self.pool,
                        &self.repository,
                        self.config.sweep_batch_size,
                    )
                    .await
                    {
                        tracing::error!(error = %e, "Character snapshot sweep failed");
                    }
                    if let Err(e) = sweep_snapshots::<Party>(
                        &self.pool,
                        &self.repository,
                        self.config.sweep_batch_size,
                    )
                    .await
                    {
                        tracing::error!(error = %e, "Party snapshot sweep failed");
                    }
                }
                _ = trim_interval.tick() => {
                    if let Err(e) = trim_activity_feed(&self.pool).await {
                        tracing::error!(error = %e, "Activity feed trim failed");
                    }
                }
            }
        }
    }

    /// Run all maintenance jobs once (for manual trigger or testing)
    pub async fn run_all_once(&self) -> MaintenanceReport {
        let mut report = MaintenanceReport::default();

        match sweep_snapshots::<Character>(
            &self.pool,
            &self.repository,
            self.config.sweep_batch_size,
        )
        .await
        {
            Ok(stats) => report.character_sweep = stats,
            Err(e) => report.errors.push(format!("Character sweep: {}", e)),
        }

        match sweep_snapshots::<Party>(&self.pool, &self.repository, self.config.sweep_batch_size)
            .await
        {
            Ok(stats) => report.party_sweep = stats,
            Err(e) => report.errors.push(format!("Party sweep: {}", e)),
        }

        match trim_activity_feed(&self.pool).await {
            Ok(count) => report.feed_entries_trimmed = count,
            Err(e) => report.errors.push(format!("Feed trim: {}", e)),
        }

        report.completed_at = Utc::now();
        report
    }
}

/// Report from running maintenance jobs
#[derive(Debug, Clone, Default)]
pub struct MaintenanceReport {
    pub character_sweep: SweepStats,
    pub party_sweep: SweepStats,
    pub feed_entries_trimmed: u64,
    pub errors: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

/// Job execution errors
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_scheduler_config_default() {
        let config = JobSchedulerConfig::default();
        assert_eq!(config.snapshot_sweep_interval, Duration::from_secs(300));
        assert_eq!(config.feed_trim_interval, Duration::from_secs(3600));
        assert_eq!(config.sweep_batch_size, 100);
    }

    #[test]
    fn test_sweep_stats_default() {
        let stats = SweepStats::default();
        assert_eq!(stats.examined, 0);
        assert_eq!(stats.written, 0);
        assert_eq!(stats.failed, 0);
    }

    #[test]
    fn test_maintenance_report_default() {
        let report = MaintenanceReport::default();
        assert_eq!(report.character_sweep.written, 0);
        assert_eq!(report.feed_entries_trimmed, 0);
        assert_eq!(report.errors.len(), 0);
    }
}
