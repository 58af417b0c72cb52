//! Outcome of a sync step and its aggregation across steps

use crate::error::DomainError;

/// Result of reconciling one entity type (or a whole pass).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncResult {
    /// Every attempted record was reconciled
    Success {
        uploaded_count: usize,
        downloaded_count: usize,
        conflict_count: usize,
    },
    /// At least one record succeeded and at least one failed
    PartialSuccess {
        success_count: usize,
        failed_entities: Vec<i64>,
        errors: Vec<DomainError>,
    },
    /// The step could not run, or every attempted record failed
    Failure { error: DomainError },
}

impl SyncResult {
    /// A successful step that had nothing to do.
    pub const fn empty() -> Self {
        Self::Success {
            uploaded_count: 0,
            downloaded_count: 0,
            conflict_count: 0,
        }
    }

    pub const fn failure(error: DomainError) -> Self {
        Self::Failure { error }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// The first error carried by this result, if any.
    pub fn first_error(&self) -> Option<&DomainError> {
        match self {
            Self::Success { .. } => None,
            Self::PartialSuccess { errors, .. } => errors.first(),
            Self::Failure { error } => Some(error),
        }
    }
}

/// Running totals across the steps of a pass.
///
/// Counts are summed, failed ids and errors are concatenated in step order.
#[derive(Debug, Default)]
pub(crate) struct SyncTally {
    uploaded: usize,
    downloaded: usize,
    conflicts: usize,
    partial_successes: usize,
    failed_entities: Vec<i64>,
    errors: Vec<DomainError>,
}

impl SyncTally {
    /// Fold one non-failing step result into the totals.
    ///
    /// `Failure` is handled by the caller, which halts the pass instead.
    pub(crate) fn absorb(&mut self, result: SyncResult) {
        match result {
            SyncResult::Success {
                uploaded_count,
                downloaded_count,
                conflict_count,
            } => {
                self.uploaded += uploaded_count;
                self.downloaded += downloaded_count;
                self.conflicts += conflict_count;
            }
            SyncResult::PartialSuccess {
                success_count,
                failed_entities,
                errors,
            } => {
                self.partial_successes += success_count;
                self.failed_entities.extend(failed_entities);
                self.errors.extend(errors);
            }
            SyncResult::Failure { error } => self.errors.push(error),
        }
    }

    pub(crate) const fn uploaded(&self) -> usize {
        self.uploaded
    }

    pub(crate) const fn downloaded(&self) -> usize {
        self.downloaded
    }

    pub(crate) fn has_failures(&self) -> bool {
        !self.errors.is_empty() || !self.failed_entities.is_empty()
    }

    pub(crate) fn finish(self) -> SyncResult {
        if self.has_failures() {
            SyncResult::PartialSuccess {
                success_count: self.uploaded + self.downloaded + self.partial_successes,
                failed_entities: self.failed_entities,
                errors: self.errors,
            }
        } else {
            SyncResult::Success {
                uploaded_count: self.uploaded,
                downloaded_count: self.downloaded,
                conflict_count: self.conflicts,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tally_of_successes_sums_counts() {
        let mut tally = SyncTally::default();
        tally.absorb(SyncResult::Success {
            uploaded_count: 2,
            downloaded_count: 1,
            conflict_count: 1,
        });
        tally.absorb(SyncResult::Success {
            uploaded_count: 1,
            downloaded_count: 0,
            conflict_count: 0,
        });

        assert_eq!(
            tally.finish(),
            SyncResult::Success {
                uploaded_count: 3,
                downloaded_count: 1,
                conflict_count: 1,
            }
        );
    }

    #[test]
    fn tally_with_partial_concatenates_failures_in_order() {
        let mut tally = SyncTally::default();
        tally.absorb(SyncResult::Success {
            uploaded_count: 1,
            downloaded_count: 1,
            conflict_count: 0,
        });
        tally.absorb(SyncResult::PartialSuccess {
            success_count: 1,
            failed_entities: vec![5],
            errors: vec![DomainError::Validation("bad dose".into())],
        });
        tally.absorb(SyncResult::PartialSuccess {
            success_count: 2,
            failed_entities: vec![8],
            errors: vec![DomainError::Network("timeout".into())],
        });

        assert_eq!(
            tally.finish(),
            SyncResult::PartialSuccess {
                success_count: 5,
                failed_entities: vec![5, 8],
                errors: vec![
                    DomainError::Validation("bad dose".into()),
                    DomainError::Network("timeout".into()),
                ],
            }
        );
    }

    #[test]
    fn first_error_prefers_failure_payload() {
        let failure = SyncResult::failure(DomainError::Unauthorized("expired".into()));
        assert_eq!(
            failure.first_error(),
            Some(&DomainError::Unauthorized("expired".into()))
        );
        assert_eq!(SyncResult::empty().first_error(), None);
    }
}
