//! Commit and rollback (Sections 4.5 / 4.6).

use std::hint;

use tracing::debug;

use crate::engine::Stm;
use crate::error::{AbortReason, StmResult};
use crate::lock::LockState;
use crate::transaction::TransactionContext;
use crate::validation::validate;
use crate::write_set::FULL_MASK;

impl Stm {
    /// Commit a transaction. On success the transaction's writes become
    /// visible and its buffers are discarded; on abort the transaction
    /// is rolled back before the error is returned (Section 6).
    pub fn commit(&self, tx: &mut TransactionContext) -> StmResult<()> {
        debug_assert!(tx.is_active());

        // read_only: commit is a no-op (Section 6 attribute table).
        if tx.attr.read_only {
            tx.mark_committed();
            tx.discard_buffers();
            return Ok(());
        }

        // Empty write set: always succeeds, never touches the clock
        // (Section 8).
        if tx.w_set.is_empty() {
            tx.mark_committed();
            tx.discard_buffers();
            return Ok(());
        }

        // Phase A: acquire locks in reverse write-set order.
        if let Err(reason) = self.acquire_write_locks(tx) {
            self.rollback(tx, reason);
            return Err(reason);
        }

        // Phase B: commit timestamp and validation.
        let cts = self.clock.fetch_increment();
        if !tx.attr.irrevocable && tx.end != cts - 1 && !validate(tx, &self.lock_table) {
            self.rollback(tx, AbortReason::ValCommit);
            return Err(AbortReason::ValCommit);
        }

        // Phase C: publish writes, release locks on stripe tails.
        for entry in tx.w_set.iter() {
            if entry.mask == FULL_MASK {
                self.memory.store(entry.addr, entry.value);
            } else if entry.mask != 0 {
                let current = self.memory.relaxed_load(entry.addr);
                let merged = (current & !entry.mask) | (entry.value & entry.mask);
                self.memory.store(entry.addr, merged);
            }
            if !entry.no_drop {
                self.lock_table.lock_at(entry.stripe).release_store(cts);
            }
        }

        tx.mark_committed();
        tx.discard_buffers();
        Ok(())
    }

    /// Phase A of commit: acquire every stripe touched by the write set,
    /// in reverse write-set order (Section 4.5 — "reverse order is
    /// mandatory").
    fn acquire_write_locks(&self, tx: &mut TransactionContext) -> Result<(), AbortReason> {
        let txn_id = tx.id();
        let len = tx.w_set.len();
        for i in (0..len).rev() {
            loop {
                let stripe = tx.w_set.entry_at(i).stripe;
                let lock = self.lock_table.lock_at(stripe);
                match lock.acquire_load() {
                    LockState::Owned(owner) => {
                        if owner == txn_id {
                            // An earlier-processed (higher-index) entry
                            // on this stripe already won the CAS; this
                            // duplicate keeps no_drop = true.
                            break;
                        }
                        if tx.attr.irrevocable {
                            // Minimal irrevocable guard (Section 4 / 9):
                            // spin instead of aborting.
                            hint::spin_loop();
                            continue;
                        }
                        return Err(AbortReason::WwConflict);
                    }
                    LockState::Unlocked(version) => {
                        if lock.try_acquire(version, txn_id) {
                            let entry = tx.w_set.entry_at_mut(i);
                            entry.version = version;
                            entry.no_drop = false;
                            tx.w_set.mark_acquired();
                            break;
                        }
                        // Lost the CAS race; re-read and retry.
                    }
                }
            }
        }
        Ok(())
    }

    /// Roll back a transaction: release any locks acquired during a
    /// failed commit attempt, then discard both buffers (Section 4.6).
    pub fn rollback(&self, tx: &mut TransactionContext, reason: AbortReason) {
        let mut remaining = tx.w_set.nb_acquired();
        if remaining > 0 {
            let mut it = tx.w_set.iter_mut_rev();
            while remaining > 0 {
                let entry = it
                    .next()
                    .expect("nb_acquired never exceeds the number of entries");
                if entry.no_drop {
                    continue;
                }
                remaining -= 1;
                let lock = self.lock_table.lock_at(entry.stripe);
                if remaining == 0 {
                    // The last release in the unwind must be ordered;
                    // earlier ones may be relaxed (Section 5).
                    lock.release_store(entry.version);
                } else {
                    lock.release_store_relaxed(entry.version);
                }
            }
        }

        debug!(
            txn = tx.id(),
            reason = ?reason,
            pending = ?tx.pending_operations(),
            "transaction rolled back"
        );

        tx.mark_aborted(reason);
        tx.discard_buffers();
    }
}
