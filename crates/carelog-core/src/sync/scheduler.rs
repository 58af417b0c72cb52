//! Periodic background sync

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::SyncConfig;
use crate::sync::orchestrator::SyncOrchestrator;
use crate::sync::result::SyncResult;

/// Runs `sync_all` for one scope on a fixed cadence.
///
/// The first pass starts immediately. The task stops on its own after a
/// non-retryable failure, and is aborted when the scheduler is dropped.
pub struct SyncScheduler {
    handle: JoinHandle<()>,
}

impl SyncScheduler {
    pub fn spawn(
        orchestrator: Arc<SyncOrchestrator>,
        scope_id: impl Into<String>,
        interval: Duration,
    ) -> Self {
        let scope_id = scope_id.into();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let result = orchestrator.sync_all(&scope_id).await;
                if let SyncResult::Failure { error } = &result {
                    if !error.is_retryable() {
                        tracing::warn!(%scope_id, %error, "stopping background sync");
                        break;
                    }
                }
            }
        });
        Self { handle }
    }

    /// Spawn at the cadence configured in `config`, or return `None` when
    /// automatic sync is disabled.
    pub fn from_config(
        orchestrator: Arc<SyncOrchestrator>,
        scope_id: impl Into<String>,
        config: &SyncConfig,
    ) -> Option<Self> {
        let interval = config.auto_sync_interval()?;
        Some(Self::spawn(orchestrator, scope_id, interval))
    }

    /// Whether the background task has ended (stopped or aborted).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the background task. A pass in flight is cancelled.
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainError;
    use crate::models::EntityType;
    use crate::sync::memory::{MemorySyncMappingStore, MemoryWatermarkStore};
    use crate::sync::orchestrator::EntitySyncers;
    use crate::sync::testing::{ScriptedLogSyncer, ScriptedSyncer};

    fn orchestrator(medications: Arc<ScriptedSyncer>) -> Arc<SyncOrchestrator> {
        Arc::new(SyncOrchestrator::new(
            EntitySyncers {
                medications,
                notes: Arc::new(ScriptedSyncer::new(EntityType::Note)),
                health_records: Arc::new(ScriptedSyncer::new(EntityType::HealthRecord)),
                calendar_events: Arc::new(ScriptedSyncer::new(EntityType::CalendarEvent)),
                tasks: Arc::new(ScriptedSyncer::new(EntityType::Task)),
                medication_logs: Arc::new(ScriptedLogSyncer::new()),
            },
            Arc::new(MemorySyncMappingStore::new()),
            Arc::new(MemoryWatermarkStore::new()),
        ))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn runs_repeatedly_until_stopped() {
        let medications = Arc::new(ScriptedSyncer::new(EntityType::Medication));
        let scheduler = SyncScheduler::spawn(
            orchestrator(medications.clone()),
            "recipient-1",
            Duration::from_millis(10),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(medications.calls() >= 2);
        assert!(!scheduler.is_finished());

        scheduler.stop();
        let calls = medications.calls();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(medications.calls() <= calls + 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stops_after_non_retryable_failure() {
        let medications = Arc::new(ScriptedSyncer::returning(
            EntityType::Medication,
            SyncResult::failure(DomainError::Unauthorized("session expired".into())),
        ));
        let scheduler = SyncScheduler::spawn(
            orchestrator(medications.clone()),
            "recipient-1",
            Duration::from_millis(10),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(scheduler.is_finished());
        assert_eq!(medications.calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn config_without_auto_sync_spawns_nothing() {
        let medications = Arc::new(ScriptedSyncer::new(EntityType::Medication));
        let orchestrator = orchestrator(medications.clone());

        let disabled = SyncConfig::default().without_auto_sync();
        assert!(
            SyncScheduler::from_config(orchestrator.clone(), "recipient-1", &disabled).is_none()
        );

        let enabled = SyncConfig::default().with_sync_interval(Duration::from_secs(3_600));
        let scheduler =
            SyncScheduler::from_config(orchestrator, "recipient-1", &enabled).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(medications.calls(), 1);
        assert!(!scheduler.is_finished());
    }
}
