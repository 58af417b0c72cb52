//! Observable sync phase.
//!
//! One `SyncStateStream` lives inside the orchestrator. Subscribers get a
//! `watch::Receiver`, so a late subscriber reads the latest state
//! immediately without waiting for the next transition.
//!
//! Passes for different scopes may run side by side while the stream holds a
//! single value. The stream shows the pass that wrote last and remembers its
//! scope, and a pass only clears state it still owns.

use std::sync::{PoisonError, RwLock};

use tokio::sync::watch;

use crate::error::DomainError;

/// Current phase of synchronization, as shown to clients.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncState {
    Idle,
    Syncing {
        /// Fraction of the pass already completed, in `[0, 1]`
        progress: f32,
        entity_name: String,
    },
    Success {
        last_synced_at: i64,
    },
    Error {
        error: DomainError,
        is_retryable: bool,
    },
}

impl SyncState {
    pub const fn is_syncing(&self) -> bool {
        matches!(self, Self::Syncing { .. })
    }
}

/// Replay-latest holder of the process-wide [`SyncState`].
///
/// Only the orchestrator writes; everything else subscribes.
#[derive(Debug)]
pub struct SyncStateStream {
    tx: watch::Sender<SyncState>,
    owner: RwLock<Option<String>>,
}

impl Default for SyncStateStream {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncStateStream {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SyncState::Idle);
        Self {
            tx,
            owner: RwLock::new(None),
        }
    }

    /// Subscribe to state transitions. The current value is readable at once.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.tx.subscribe()
    }

    /// Snapshot of the current state.
    pub fn current(&self) -> SyncState {
        self.tx.borrow().clone()
    }

    /// Scope of the pass that last wrote the current state.
    pub fn scope(&self) -> Option<String> {
        self.owner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn write(&self, scope_id: &str, apply: impl FnOnce(&mut SyncState, bool)) {
        let mut owner = self.owner.write().unwrap_or_else(PoisonError::into_inner);
        let same_scope = owner.as_deref() == Some(scope_id);
        self.tx.send_modify(|state| apply(state, same_scope));
        *owner = Some(scope_id.to_string());
    }

    /// Report progress for the step about to run.
    ///
    /// Progress never moves backwards while a pass is running.
    pub(crate) fn progress(&self, scope_id: &str, progress: f32, entity_name: &str) {
        let progress = progress.clamp(0.0, 1.0);
        self.write(scope_id, |state, same_scope| {
            let progress = match state {
                SyncState::Syncing {
                    progress: previous, ..
                } if same_scope => progress.max(*previous),
                _ => progress,
            };
            *state = SyncState::Syncing {
                progress,
                entity_name: entity_name.to_string(),
            };
        });
    }

    /// Start a new pass from zero progress.
    pub(crate) fn begin(&self, scope_id: &str, entity_name: &str) {
        self.write(scope_id, |state, _| {
            *state = SyncState::Syncing {
                progress: 0.0,
                entity_name: entity_name.to_string(),
            };
        });
    }

    pub(crate) fn succeed(&self, scope_id: &str, last_synced_at: i64) {
        self.write(scope_id, |state, _| {
            *state = SyncState::Success { last_synced_at };
        });
    }

    pub(crate) fn fail(&self, scope_id: &str, error: DomainError) {
        let is_retryable = error.is_retryable();
        self.write(scope_id, |state, _| {
            *state = SyncState::Error {
                error,
                is_retryable,
            };
        });
    }

    /// Return to `Idle` unless another scope has written since.
    pub(crate) fn release(&self, scope_id: &str) {
        let owner = self.owner.read().unwrap_or_else(PoisonError::into_inner);
        if !matches!(owner.as_deref(), Some(other) if other != scope_id) {
            self.tx.send_replace(SyncState::Idle);
        }
    }
}
