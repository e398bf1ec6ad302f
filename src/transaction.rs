//! Transaction context (Section 3 / Section 6).
//!
//! The per-transaction record carrying status, the snapshot window
//! `[start, end]`, the read and write buffers, and the transaction's
//! attributes. Created by [`crate::Stm::begin`], mutated by
//! [`crate::Stm::read`] / [`crate::Stm::write`], and destroyed by
//! [`crate::Stm::commit`] or [`crate::Stm::rollback`].

use crate::clock::Version;
use crate::error::AbortReason;
use crate::lock::TxnId;
use crate::read_set::ReadSet;
use crate::write_set::WriteSet;

/// Attributes recognized on `begin` (Section 6).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxnAttr {
    /// Commit is a no-op; extension is skipped on overflow (abort
    /// instead); write calls are forbidden.
    pub read_only: bool,
    /// Read (Section 4.3 step 5) and write (Section 4.4 step 3) abort
    /// instead of attempting extension.
    pub no_extend: bool,
    /// Commit skips the foreign-owner conflict check (spins instead);
    /// read skips read-set append.
    pub irrevocable: bool,
}

impl TxnAttr {
    /// The default attribute set: read-write, extending, revocable.
    pub fn new() -> Self {
        TxnAttr::default()
    }

    /// Builder-style: mark read-only.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Builder-style: disable extension.
    pub fn no_extend(mut self) -> Self {
        self.no_extend = true;
        self
    }

    /// Builder-style: mark irrevocable.
    pub fn irrevocable(mut self) -> Self {
        self.irrevocable = true;
        self
    }
}

/// Lifecycle status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Executing: may read and (unless `read_only`) write.
    Active,
    /// Committed successfully.
    Committed,
    /// Rolled back; carries the reason.
    Aborted(AbortReason),
}

/// A snapshot of pending-operation counts, useful for logging or
/// diagnostics before an abort discards the buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingOperations {
    /// Number of buffered writes.
    pub writes: usize,
    /// Number of recorded reads.
    pub reads: usize,
}

impl PendingOperations {
    /// Total pending operations.
    pub fn total(&self) -> usize {
        self.writes + self.reads
    }
}

/// The per-transaction record.
pub struct TransactionContext {
    pub(crate) id: TxnId,
    pub(crate) status: TransactionStatus,
    pub(crate) start: Version,
    pub(crate) end: Version,
    pub(crate) attr: TxnAttr,
    pub(crate) r_set: ReadSet,
    pub(crate) w_set: WriteSet,
}

impl TransactionContext {
    pub(crate) fn new(id: TxnId, start: Version, attr: TxnAttr, use_bloom: bool) -> Self {
        TransactionContext {
            id,
            status: TransactionStatus::Active,
            start,
            end: start,
            attr,
            r_set: ReadSet::new(),
            w_set: if use_bloom {
                WriteSet::with_bloom_filter()
            } else {
                WriteSet::new()
            },
        }
    }

    /// This transaction's id, stable for its whole lifetime.
    pub fn id(&self) -> TxnId {
        self.id
    }

    /// Current lifecycle status.
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// `true` while the transaction may still read/write.
    pub fn is_active(&self) -> bool {
        matches!(self.status, TransactionStatus::Active)
    }

    /// The snapshot's lower bound, fixed at `begin`.
    pub fn start(&self) -> Version {
        self.start
    }

    /// The snapshot's current upper bound; may advance via extension.
    pub fn end(&self) -> Version {
        self.end
    }

    /// The attributes this transaction was started with.
    pub fn attr(&self) -> TxnAttr {
        self.attr
    }

    /// Membership helper: the write-set entry for `addr`, if any
    /// (Section 6: `has_written`).
    pub fn has_written(&self, addr: usize) -> Option<&crate::write_set::WriteEntry> {
        self.w_set.find(addr)
    }

    /// Membership helper: the read-set entry for `stripe`, if any
    /// (Section 6: `has_read`).
    pub fn has_read(&self, stripe: usize) -> Option<&crate::read_set::ReadEntry> {
        self.r_set.find(stripe)
    }

    /// A snapshot of pending buffer sizes, for logging before a
    /// rollback.
    pub fn pending_operations(&self) -> PendingOperations {
        PendingOperations {
            writes: self.w_set.len(),
            reads: self.r_set.len(),
        }
    }

    pub(crate) fn mark_aborted(&mut self, reason: AbortReason) {
        self.status = TransactionStatus::Aborted(reason);
    }

    pub(crate) fn mark_committed(&mut self) {
        self.status = TransactionStatus::Committed;
    }

    pub(crate) fn discard_buffers(&mut self) {
        self.r_set.clear();
        self.w_set.clear();
    }
}
