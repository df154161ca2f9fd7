//! In-memory tracking of processed UIDs for the `new-only` poll mode.

use log::{debug, warn};

/// Remembers the highest UID processed during this run.
///
/// Nothing is persisted: after a restart every message is new again.
#[derive(Debug, Default)]
pub struct UidTracker {
    uid_validity: Option<u32>,
    highest_processed: Option<u32>,
}

impl UidTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the folder's UIDVALIDITY, forgetting all processed UIDs when it changed.
    pub fn observe_uid_validity(&mut self, uid_validity: Option<u32>) {
        if self.uid_validity.is_some() && self.uid_validity != uid_validity {
            warn!(
                "UIDVALIDITY changed: {:?} -> {:?}. Forgetting processed UIDs.",
                self.uid_validity, uid_validity
            );
            self.highest_processed = None;
        }
        self.uid_validity = uid_validity;
    }

    /// Keeps only the UIDs above the highest processed one.
    pub fn filter_unprocessed(&self, uids: Vec<u32>) -> Vec<u32> {
        match self.highest_processed {
            Some(highest) => {
                let total = uids.len();
                let fresh: Vec<u32> = uids.into_iter().filter(|uid| *uid > highest).collect();
                debug!(
                    "{} of {} UIDs are above last processed UID {}",
                    fresh.len(),
                    total,
                    highest
                );
                fresh
            }
            None => uids,
        }
    }

    pub fn mark_processed(&mut self, uid: u32) {
        if self.highest_processed.map_or(true, |highest| uid > highest) {
            self.highest_processed = Some(uid);
        }
    }

    pub fn last_processed_uid(&self) -> Option<u32> {
        self.highest_processed
    }
}
