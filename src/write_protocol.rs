//! Transactional write (Section 4.4).
//!
//! WBCTL is write-back: the stripe lock is never acquired here, only at
//! commit time. A write only spins on a *currently* contended lock word
//! long enough to read a stable timestamp; it never blocks waiting for
//! the stripe to become free for acquisition.

use std::hint;

use tracing::warn;

use crate::engine::Stm;
use crate::error::{AbortReason, StmResult};
use crate::lock::LockState;
use crate::memory::Word;
use crate::transaction::TransactionContext;
use crate::write_set::WriteEntry;

impl Stm {
    /// Transactional buffered write of `value` into `addr` under `mask`.
    /// Returns a reference-by-address into the write set; callers can
    /// re-fetch it via [`TransactionContext::has_written`].
    pub fn write(
        &self,
        tx: &mut TransactionContext,
        addr: usize,
        value: Word,
        mask: Word,
    ) -> StmResult<()> {
        debug_assert!(tx.is_active());

        if tx.attr.read_only {
            self.rollback(tx, AbortReason::ReadOnlyViolation);
            return Err(AbortReason::ReadOnlyViolation);
        }

        // Merge into an existing entry without touching the lock or the
        // clock (Section 4.4 step 2).
        if let Some(existing) = tx.w_set.find_mut(addr) {
            existing.value = (existing.value & !mask) | (value & mask);
            existing.mask |= mask;
            return Ok(());
        }

        let stripe = self.lock_table.stripe_index(addr);
        let lock = self.lock_table.lock_at(stripe);

        let mut spins: u32 = 0;
        let version = loop {
            match lock.acquire_load() {
                LockState::Owned(_) => {
                    spins += 1;
                    if spins == self.config.spin_warn_threshold {
                        warn!(txn = tx.id(), addr, "write: spinning on contended stripe");
                    }
                    hint::spin_loop();
                    continue;
                }
                LockState::Unlocked(version) => break version,
            }
        };

        if version > tx.end {
            if tx.attr.no_extend {
                self.rollback(tx, AbortReason::ValWrite);
                return Err(AbortReason::ValWrite);
            }
            if tx.r_set.find(stripe).is_some() {
                // We read an older version of something on this stripe;
                // extension cannot safely revalidate it for a write.
                self.rollback(tx, AbortReason::ValWrite);
                return Err(AbortReason::ValWrite);
            }
        }

        tx.w_set.push(addr, value, mask, stripe, version);
        Ok(())
    }
}

/// Convenience accessor mirroring Section 6's `write(...) ->
/// write_entry_ref`.
pub fn write_entry<'a>(tx: &'a TransactionContext, addr: usize) -> Option<&'a WriteEntry> {
    tx.has_written(addr)
}
