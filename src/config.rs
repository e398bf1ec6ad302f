//! Tuning knobs for the lock table and spin loops.
//!
//! None of these are correctness-bearing (Section 4.2: "parameters (size,
//! shift) are tuning knobs, not correctness-bearing"); they are split out
//! of the engine constructor into a plain config struct, the same way
//! sizing and limits are kept separate from behavior elsewhere in this
//! codebase.

/// Configuration for a [`crate::Stm`] engine instance.
#[derive(Debug, Clone, Copy)]
pub struct StmConfig {
    /// Number of entries in the lock table. Must be a power of two; the
    /// engine rounds up if it is not.
    pub lock_table_size: usize,

    /// Right-shift applied to a word address before it is hashed into the
    /// lock table, i.e. how many low address bits are ignored when
    /// assigning addresses to stripes. `0` means every address maps to
    /// its own stripe (mod table size).
    pub stripe_shift: u32,

    /// Number of spin iterations a read or commit loop may take on a
    /// single contended lock word before it emits a `tracing::warn!`
    /// canary. Purely observational — spinning continues regardless.
    pub spin_warn_threshold: u32,
}

impl Default for StmConfig {
    fn default() -> Self {
        StmConfig {
            lock_table_size: 1 << 20,
            stripe_shift: 0,
            spin_warn_threshold: 10_000,
        }
    }
}

impl StmConfig {
    /// Round `lock_table_size` up to the next power of two and return the
    /// table's index mask (`size - 1`).
    pub(crate) fn table_size_and_mask(&self) -> (usize, usize) {
        let size = self.lock_table_size.next_power_of_two().max(1);
        (size, size - 1)
    }
}
