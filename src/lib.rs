//! Word-based software transactional memory core.
//!
//! This crate implements the write-back, commit-time locking (WBCTL)
//! transactional read/write/commit protocol over a shared lock-word
//! array: the invariants linking logical versions to physical locks, the
//! validation/extension algorithm, the commit-time two-phase lock
//! acquisition, and the memory-ordering discipline that keeps readers
//! and writers consistent on weakly ordered hardware.
//!
//! # Scope
//!
//! This is the *core* of an STM engine, not the whole library. Thread
//! registration, quiescence/clock-reset policy, allocator/GC
//! integration, alternate conflict managers, statistics, and
//! per-transaction pooling are facade concerns layered on top of
//! [`Stm`]. See `SPEC_FULL.md` and `DESIGN.md` in the repository root
//! for the full design rationale.
//!
//! # Example
//!
//! ```
//! use wbctl_core::{Stm, TxnAttr};
//!
//! let stm = Stm::with_defaults(16);
//!
//! let mut tx = stm.begin(TxnAttr::new());
//! stm.write(&mut tx, 0, 0xFF, wbctl_core::FULL_MASK).unwrap();
//! stm.commit(&mut tx).unwrap();
//!
//! assert_eq!(stm.peek(0), 0xFF);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod clock;
mod commit;
mod config;
mod engine;
mod error;
mod lock;
mod memory;
mod read_protocol;
mod read_set;
mod retry;
mod transaction;
mod validation;
mod write_protocol;
mod write_set;

pub use clock::{GlobalClock, Version};
pub use config::StmConfig;
pub use engine::Stm;
pub use error::{AbortReason, StmResult};
pub use lock::{LockState, LockTable, LockWord, TxnId};
pub use memory::{SharedMemory, Word};
pub use read_set::{ReadEntry, ReadSet};
pub use retry::with_retry;
pub use transaction::{PendingOperations, TransactionContext, TransactionStatus, TxnAttr};
pub use write_set::{WriteEntry, WriteSet, FULL_MASK};
