//! Last-write-wins conflict resolution

use crate::config::{SyncConfig, TieBreak};
use crate::models::{ConflictWinner, SyncRecord};

/// Strategy label stored in the conflict log.
pub const LWW_STRATEGY: &str = "lww";

/// Decides which copy of a record survives when both sides changed.
///
/// Whole-record LWW on `updated_at`: the strictly later timestamp wins and the
/// loser is overwritten field by field. Exact ties follow [`TieBreak`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConflictResolver {
    tie_break: TieBreak,
}

impl ConflictResolver {
    pub const fn new(tie_break: TieBreak) -> Self {
        Self { tie_break }
    }

    pub const fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Pick the surviving side from the two modification timestamps.
    pub const fn resolve_timestamps(
        &self,
        local_updated_at: i64,
        remote_updated_at: i64,
    ) -> ConflictWinner {
        if local_updated_at > remote_updated_at {
            ConflictWinner::Local
        } else if remote_updated_at > local_updated_at {
            ConflictWinner::Remote
        } else {
            match self.tie_break {
                TieBreak::LocalWins => ConflictWinner::Local,
                TieBreak::RemoteWins => ConflictWinner::Remote,
            }
        }
    }

    /// Pick the surviving side for two copies of the same logical record.
    pub fn resolve<L: SyncRecord>(&self, local: &L, remote: &L) -> ConflictWinner {
        self.resolve_timestamps(local.updated_at(), remote.updated_at())
    }
}

impl From<&SyncConfig> for ConflictResolver {
    fn from(config: &SyncConfig) -> Self {
        Self::new(config.tie_break)
    }
}
