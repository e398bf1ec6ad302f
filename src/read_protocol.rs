//! Transactional read (Section 4.3).
//!
//! The double-checked lock read sandwiches the address load between two
//! (in fact three — see `SPEC_FULL.md` Section 4) observations of the
//! lock word. If the lock word did not change across the sandwich, no
//! committing writer can have modified `addr` in between, because a
//! writer must own the lock across its publication window.

use std::hint;

use tracing::{trace, warn};

use crate::engine::Stm;
use crate::error::{AbortReason, StmResult};
use crate::lock::LockState;
use crate::memory::Word;
use crate::transaction::TransactionContext;
use crate::validation::extend;
use crate::write_set::FULL_MASK;

impl Stm {
    /// Transactional load of `addr`. See Section 4.3 for the full
    /// algorithm.
    pub fn read(&self, tx: &mut TransactionContext, addr: usize) -> StmResult<Word> {
        debug_assert!(tx.is_active());

        // Step 1: did we previously write the same address?
        if let Some(w) = tx.w_set.find(addr) {
            if w.mask == FULL_MASK {
                return Ok(w.value);
            }
        }

        let stripe = self.lock_table.stripe_index(addr);
        let lock = self.lock_table.lock_at(stripe);

        let mut spins: u32 = 0;
        let mut l1 = lock.acquire_load();
        let value = loop {
            match l1 {
                LockState::Owned(_) => {
                    spins += 1;
                    if spins == self.config.spin_warn_threshold {
                        warn!(txn = tx.id(), addr, "read: spinning on contended stripe");
                    }
                    hint::spin_loop();
                    l1 = lock.acquire_load();
                    continue;
                }
                LockState::Unlocked(version) => {
                    let l2 = lock.acquire_load();
                    if l2 != l1 {
                        l1 = l2;
                        continue;
                    }

                    if version > tx.end {
                        if tx.attr.read_only {
                            return self.abort_read(tx, AbortReason::ValRead);
                        }
                        if !extend(tx, &self.clock, &self.lock_table) {
                            return self.abort_read(tx, AbortReason::ValRead);
                        }
                    }

                    let raw_value = self.memory.acquire_load(addr);

                    let l3 = lock.acquire_load();
                    if l3 != l1 {
                        l1 = l3;
                        continue;
                    }

                    break raw_value;
                }
            }
        };

        let merged = match tx.w_set.find(addr) {
            Some(w) => (value & !w.mask) | (w.value & w.mask),
            None => value,
        };

        if !tx.attr.irrevocable {
            tx.r_set.push(stripe, l1.version().expect("l1 is unlocked by loop exit"));
        }

        trace!(txn = tx.id(), addr, "read committed to read set");
        Ok(merged)
    }

    fn abort_read(&self, tx: &mut TransactionContext, reason: AbortReason) -> StmResult<Word> {
        self.rollback(tx, reason);
        Err(reason)
    }
}
