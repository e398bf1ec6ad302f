//! Per-transaction write set (Section 3 / 4.4 / 4.5).
//!
//! Ordered buffer of buffered writes. Membership by address is an exact
//! linear scan; Section 9 allows an optional Bloom filter to accelerate
//! the common "definitely not written" case, with false positives
//! degrading back to the linear scan. This crate makes that filter an
//! opt-in construction flag (`WriteSet::with_bloom_filter`) rather than a
//! compile-time feature, since it never changes observable behavior.

use crate::clock::Version;
use crate::memory::Word;

/// All bits set: a full-word write (Section 3: "mask == all-ones").
pub const FULL_MASK: Word = Word::MAX;

/// One write-set entry.
#[derive(Debug, Clone)]
pub struct WriteEntry {
    /// The word address written.
    pub addr: usize,
    /// The (possibly partial, possibly merged) value buffered for this
    /// address.
    pub value: Word,
    /// Bitmask of which bits of `value` the transaction wants to modify.
    pub mask: Word,
    /// Index into the engine's lock table for `addr`'s stripe.
    pub stripe: usize,
    /// The stripe's timestamp as observed when this entry was created
    /// (Section 4.4) or, after Phase A of commit, as observed
    /// immediately before the winning CAS (Section 4.5) — used by
    /// rollback to restore the prior timestamp and by validation to
    /// check self-owned stripes.
    pub version: Version,
    /// `true` unless this is the *last* entry (in iteration order) among
    /// all entries sharing `stripe` — exactly one entry per stripe has
    /// `no_drop = false` and is responsible for releasing the lock at
    /// commit or rollback time.
    pub no_drop: bool,
}

/// Per-transaction write-set buffer.
#[derive(Debug, Default)]
pub struct WriteSet {
    entries: Vec<WriteEntry>,
    /// Number of entries that have successfully acquired their stripe
    /// lock during the current commit attempt (Section 4.5 / 4.6).
    nb_acquired: usize,
    bloom: Option<u64>,
}

impl WriteSet {
    /// An empty write set.
    pub fn new() -> Self {
        WriteSet {
            entries: Vec::new(),
            nb_acquired: 0,
            bloom: None,
        }
    }

    /// An empty write set that also maintains a single-word Bloom filter
    /// over buffered addresses, for faster `find` misses on large write
    /// sets.
    pub fn with_bloom_filter() -> Self {
        WriteSet {
            entries: Vec::new(),
            nb_acquired: 0,
            bloom: Some(0),
        }
    }

    fn bloom_bit(addr: usize) -> u64 {
        // A cheap multiplicative hash folded into 6 bits, matching the
        // original's single-word `FILTER_BITS(addr)` filter.
        let h = (addr as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        1u64 << (h >> 58)
    }

    fn bloom_insert(&mut self, addr: usize) {
        if let Some(bits) = &mut self.bloom {
            *bits |= Self::bloom_bit(addr);
        }
    }

    /// `false` is a definite answer ("not written"); `true` means "maybe
    /// written, fall back to the exact scan." Always `true` when no
    /// filter is configured.
    fn bloom_might_contain(&self, addr: usize) -> bool {
        match self.bloom {
            Some(bits) => bits & Self::bloom_bit(addr) != 0,
            None => true,
        }
    }

    /// Exact membership test by address (Section 6: `has_written`).
    pub fn find(&self, addr: usize) -> Option<&WriteEntry> {
        if !self.bloom_might_contain(addr) {
            return None;
        }
        self.entries.iter().find(|e| e.addr == addr)
    }

    /// Mutable exact membership test by address.
    pub fn find_mut(&mut self, addr: usize) -> Option<&mut WriteEntry> {
        if !self.bloom_might_contain(addr) {
            return None;
        }
        self.entries.iter_mut().find(|e| e.addr == addr)
    }

    /// Find any existing entry covering `stripe`, regardless of which
    /// entry (if any) holds the stripe's lock. A hit only tells you the
    /// stripe is touched by this write set somewhere, not which entry
    /// acquired it; see [`WriteSet::find_owner_by_stripe`] for that.
    pub fn find_by_stripe(&self, stripe: usize) -> Option<&WriteEntry> {
        self.entries.iter().find(|e| e.stripe == stripe)
    }

    /// Find the entry that *acquired* `stripe`'s lock, i.e. the unique
    /// entry with `no_drop == false` (Section 4.5 Phase A). Duplicate
    /// entries sharing a self-owned stripe keep their original write-time
    /// `version` and are never updated, so only the acquiring entry's
    /// `version` (overwritten to the pre-acquire timestamp in Phase A)
    /// reflects what the lock was actually validated against. Used by
    /// validation's self-owned-stripe check (Section 4.7).
    pub fn find_owner_by_stripe(&self, stripe: usize) -> Option<&WriteEntry> {
        self.entries.iter().find(|e| e.stripe == stripe && !e.no_drop)
    }

    /// Indexed access used by commit's Phase A, which walks entries in
    /// reverse by index so it can re-inspect an entry's lock table state
    /// between a failed CAS and a retry without holding a live iterator.
    pub fn entry_at(&self, index: usize) -> &WriteEntry {
        &self.entries[index]
    }

    /// Mutable indexed access, see [`WriteSet::entry_at`].
    pub fn entry_at_mut(&mut self, index: usize) -> &mut WriteEntry {
        &mut self.entries[index]
    }

    /// Append a new write-set entry for a first-time write to `addr`.
    /// New entries default to `no_drop = true`; Phase A clears it on
    /// whichever entry wins the CAS for its stripe.
    pub fn push(&mut self, addr: usize, value: Word, mask: Word, stripe: usize, version: Version) {
        self.bloom_insert(addr);
        self.entries.push(WriteEntry {
            addr,
            value,
            mask,
            stripe,
            version,
            no_drop: true,
        });
    }

    /// Iterate entries in write order (Section 4.5 Phase C: "forward
    /// order").
    pub fn iter(&self) -> impl Iterator<Item = &WriteEntry> {
        self.entries.iter()
    }

    /// Iterate entries in reverse write order (Section 4.5 Phase A /
    /// Section 4.6 rollback: both walk in reverse).
    pub fn iter_rev(&self) -> impl DoubleEndedIterator<Item = &WriteEntry> {
        self.entries.iter().rev()
    }

    /// Mutable reverse iteration, used by commit Phase A to flip
    /// `no_drop` on the winning entry and by rollback to restore
    /// timestamps.
    pub fn iter_mut_rev(&mut self) -> impl DoubleEndedIterator<Item = &mut WriteEntry> {
        self.entries.iter_mut().rev()
    }

    /// Number of buffered writes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if nothing has been written yet (Section 8: "Commit with
    /// empty write set: always succeeds, does not touch the clock").
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// How many entries currently hold their stripe lock.
    pub fn nb_acquired(&self) -> usize {
        self.nb_acquired
    }

    /// Record that one more entry acquired its stripe lock.
    pub fn mark_acquired(&mut self) {
        self.nb_acquired += 1;
    }

    /// Record that one entry released its stripe lock (used by
    /// rollback's countdown).
    pub fn mark_released(&mut self) {
        self.nb_acquired -= 1;
    }

    /// Discard all entries and acquisition bookkeeping (Section 4.6:
    /// "discard both buffers").
    pub fn clear(&mut self) {
        self.entries.clear();
        self.nb_acquired = 0;
        self.bloom = None;
    }
}
