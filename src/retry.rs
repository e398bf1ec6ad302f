//! A minimal retry-until-commit helper.
//!
//! The full retry policy (backoff strategy, retry caps, conflict-manager
//! hooks) is explicitly a facade concern (Section 1 / Section 7: "the
//! facade may impose retry caps"). This helper exists only so the
//! crate's own tests and benchmarks can drive realistic end-to-end
//! scenarios without each reimplementing a restart loop; it is
//! deliberately not configurable beyond the attribute set.

use crate::engine::Stm;
use crate::error::AbortReason;
use crate::transaction::{TransactionContext, TxnAttr};

/// Run `body` inside a transaction, restarting on any [`AbortReason`]
/// until it commits, and return the value `body` produced.
///
/// `body` must be safe to call more than once: it may run multiple times
/// before the transaction that observes it finally commits.
pub fn with_retry<T>(
    stm: &Stm,
    attr: TxnAttr,
    mut body: impl FnMut(&Stm, &mut TransactionContext) -> Result<T, AbortReason>,
) -> T {
    loop {
        let mut tx = stm.begin(attr);
        match body(stm, &mut tx) {
            Ok(value) => match stm.commit(&mut tx) {
                Ok(()) => return value,
                Err(_) => continue,
            },
            Err(_) => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_retry_eventually_commits_under_contention() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use std::thread;

        let stm = Arc::new(Stm::with_defaults(1));
        let attempts = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let stm = Arc::clone(&stm);
            let attempts = Arc::clone(&attempts);
            handles.push(thread::spawn(move || {
                with_retry(&stm, TxnAttr::new(), |stm, tx| {
                    attempts.fetch_add(1, Ordering::Relaxed);
                    let current = stm.read(tx, 0)?;
                    stm.write(tx, 0, current + 1, crate::write_set::FULL_MASK)?;
                    Ok(())
                });
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(stm.peek(0), 8);
        assert!(attempts.load(Ordering::Relaxed) >= 8);
    }
}
