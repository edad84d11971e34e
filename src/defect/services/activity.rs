//! Append-only activity logger.
//!
//! The logger writes through the caller's open transaction and has no commit
//! boundary of its own, so an entry becomes visible exactly when the mutation
//! it describes does. Detail text arrives pre-rendered; the logger knows
//! nothing about users or contractors.

use crate::defect::{
    domain::{ActivityEntry, NewActivityEntry},
    ports::{StoreResult, StoreTransaction},
};

/// Appends activity entries inside an existing transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityLogger;

impl ActivityLogger {
    /// Creates a logger.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Appends exactly one entry.
    ///
    /// # Errors
    ///
    /// Returns the store error when the append fails; the caller's
    /// transaction is expected to roll back.
    pub fn record(
        self,
        tx: &mut dyn StoreTransaction,
        entry: &NewActivityEntry,
    ) -> StoreResult<ActivityEntry> {
        let stored = tx.append_activity(entry)?;
        tracing::debug!(
            entry_id = stored.id,
            defect_id = %stored.defect_id,
            actor_id = %stored.actor_id,
            action = %stored.action,
            "activity entry appended"
        );
        Ok(stored)
    }
}
