use std::time::Instant;

use fuller_core::hammerer::{Hammering, Never};
use fuller_core::memory::{AddressRange, AggressorPtr};
use fuller_core::util::WORD_SIZE;
use log::debug;

/// Total number of addresses per eviction set: the hammered target plus its
/// decoys.
pub const EVICTION_SET_SIZE: usize = 32;

/// Decoy addresses accompanying one target.
pub const DECOY_COUNT: usize = EVICTION_SET_SIZE - 1;

/// Decoy pairs touched per traversal.
const TRAVERSE_DEPTH: usize = 18;
/// Passes over each decoy pair per traversal.
const TRAVERSE_PASSES: usize = 5;

/// One hammered target with the decoy addresses that push it out of the
/// cache.
///
/// The decoys must map to the same cache sets as the target (the caller
/// derives them from the bank grouping); reading them between target
/// accesses evicts the target through set pressure, without any flush
/// instruction.
#[derive(Clone, Copy, Debug)]
pub struct EvictionSet {
    target: AggressorPtr,
    decoys: [AggressorPtr; DECOY_COUNT],
}

impl EvictionSet {
    /// Creates an eviction set for the base of `target`.
    ///
    /// # Panics
    ///
    /// Panics if a decoy address is not 8-byte aligned.
    pub fn new(target: AddressRange, decoys: [AggressorPtr; DECOY_COUNT]) -> Self {
        assert!(
            decoys
                .iter()
                .all(|decoy| (*decoy as usize).is_multiple_of(WORD_SIZE)),
            "decoy addresses must be 8-byte aligned"
        );
        Self {
            target: target.base,
            decoys,
        }
    }

    /// Returns the hammered target address.
    pub fn target(&self) -> AggressorPtr {
        self.target
    }
}

#[inline(always)]
unsafe fn load(addr: AggressorPtr) {
    std::hint::black_box(unsafe { std::ptr::read_volatile(addr as *const u64) });
}

/// Interleaved pressure walk over both decoy lists. Revisiting each pair of
/// neighbors several times keeps the replacement policy from retaining the
/// targets in any cache level.
#[inline(always)]
unsafe fn traverse(first: &[AggressorPtr; DECOY_COUNT], second: &[AggressorPtr; DECOY_COUNT]) {
    for pair in 0..TRAVERSE_DEPTH - 1 {
        for _ in 0..TRAVERSE_PASSES {
            unsafe {
                load(first[pair]);
                load(second[pair]);
                load(first[pair + 1]);
                load(second[pair + 1]);
            }
        }
    }
}

/// Eviction-based hammering kernel.
///
/// Per iteration, reads both targets and then traverses both decoy sets to
/// force the targets out of the cache. For setups where explicit flush
/// instructions are undesirable or unavailable; considerably slower per
/// iteration than the flush kernel.
pub struct EvictHammerer {
    first: EvictionSet,
    second: EvictionSet,
    reads: u64,
}

impl EvictHammerer {
    /// Creates a kernel hammering the two set targets for `reads`
    /// iterations.
    pub fn new(first: EvictionSet, second: EvictionSet, reads: u64) -> Self {
        Self {
            first,
            second,
            reads,
        }
    }
}

impl Hammering for EvictHammerer {
    type Error = Never;

    fn hammer(&self) -> Result<(), Self::Error> {
        let start = Instant::now();
        let mut remaining = self.reads;
        unsafe {
            while remaining > 0 {
                load(self.first.target);
                load(self.second.target);
                traverse(&self.first.decoys, &self.second.decoys);
                remaining -= 1;
            }
        }
        debug!(
            "hammered {} rounds with decoy eviction in {:?}",
            self.reads,
            start.elapsed()
        );
        Ok(())
    }
}
