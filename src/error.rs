//! Abort reasons for the core transactional protocol.
//!
//! Mirrors the single `thiserror`-derived enum convention used throughout
//! this codebase for error hierarchies (one variant per distinct failure
//! mode, `#[error("...")]` for the human-readable message). Every variant
//! here is transient per the protocol: the surrounding facade is free to
//! restart the transaction on any of them. There is no fatal error in the
//! core.

use thiserror::Error;

/// Result type for core STM operations that can abort.
pub type StmResult<T> = Result<T, AbortReason>;

/// Why a transaction was rolled back.
///
/// All reasons are transient (see spec Section 7 / `SPEC_FULL.md` Section
/// 3.1): the core performs the rollback itself before returning the
/// reason, so by the time a caller observes `AbortReason` the
/// transaction's buffers have already been discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AbortReason {
    /// Snapshot invalid on read: the observed version exceeded `tx.end`
    /// and extension was unavailable or failed.
    #[error("read validation failed: snapshot could not be extended")]
    ValRead,

    /// Snapshot invalid on write: a stripe's timestamp moved past
    /// `tx.end` after being entered into the read set.
    #[error("write validation failed: stripe advanced past snapshot")]
    ValWrite,

    /// Commit found a stripe owned by a different transaction.
    #[error("write-write conflict: stripe owned by another transaction")]
    WwConflict,

    /// Commit-time revalidation of the read set failed.
    #[error("commit validation failed: read set stale against commit timestamp")]
    ValCommit,

    /// A foreign transaction holds irrevocable status.
    #[error("another transaction is running irrevocably")]
    Irrevocable,

    /// `write` was called on a transaction opened with the `read_only`
    /// attribute (Section 6: "write calls are forbidden").
    #[error("write attempted on a read-only transaction")]
    ReadOnlyViolation,
}

impl AbortReason {
    /// All abort reasons are transient: the facade may always restart.
    pub fn is_transient(&self) -> bool {
        true
    }
}
