//! Validation and extension (Section 4.7).

use tracing::trace;

use crate::clock::GlobalClock;
use crate::lock::{LockState, LockTable};
use crate::transaction::TransactionContext;

/// Re-validate every entry in `tx.r_set` against the current lock table.
///
/// For each `(stripe, version)`:
/// - If the stripe is unlocked, its current timestamp must equal
///   `version`.
/// - If the stripe is owned, the owner must be `tx` itself, and the
///   write-set entry `tx` holds for that stripe must have recorded the
///   same pre-acquire `version` (Section 4.7).
///
/// Returns `true` iff every entry passes.
pub fn validate(tx: &TransactionContext, lock_table: &LockTable) -> bool {
    for entry in tx.r_set.iter() {
        let lock = lock_table.lock_at(entry.stripe);
        match lock.acquire_load() {
            LockState::Owned(owner) => {
                if owner != tx.id {
                    trace!(txn = tx.id, stripe = entry.stripe, "validate: foreign owner");
                    return false;
                }
                // We own it: the entry that actually acquired the
                // stripe's lock (no_drop == false) must match what we
                // read, not just any duplicate entry sharing the stripe.
                match tx.w_set.find_owner_by_stripe(entry.stripe) {
                    Some(w) if w.version == entry.version => {}
                    _ => {
                        trace!(txn = tx.id, stripe = entry.stripe, "validate: self-owned version mismatch");
                        return false;
                    }
                }
            }
            LockState::Unlocked(version) => {
                if version != entry.version {
                    trace!(txn = tx.id, stripe = entry.stripe, "validate: stale timestamp");
                    return false;
                }
            }
        }
    }
    true
}

/// Try to slide `tx.end` forward to the current clock value by
/// revalidating the read set. Inhibited when `tx.attr.no_extend`
/// (Section 4.7).
pub fn extend(tx: &mut TransactionContext, clock: &GlobalClock, lock_table: &LockTable) -> bool {
    if tx.attr.no_extend {
        return false;
    }
    let now = clock.sample();
    if validate(tx, lock_table) {
        tx.end = now;
        true
    } else {
        false
    }
}
