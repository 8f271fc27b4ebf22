use std::arch::asm;
use std::arch::x86_64::{_mm_clflush, _mm_mfence};
use std::time::Instant;

use fuller_core::config::FencePolicy;
use fuller_core::hammerer::{Hammering, Never};
use fuller_core::memory::{AddressRange, AggressorPtr, DramProfile};
use log::debug;

/// Flush instruction used to evict the aggressor lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushInstruction {
    /// `clflush`: strictly ordered, available everywhere.
    Clflush,
    /// `clflushopt`: weaker ordering, higher throughput; Skylake onwards.
    ClflushOpt,
}

impl FlushInstruction {
    /// Picks the flush instruction for a profile: `clflushopt` where the
    /// microarchitecture supports it, unless disabled by configuration.
    pub fn for_profile(profile: DramProfile, disable_clflushopt: bool) -> Self {
        match profile {
            DramProfile::Skylake if !disable_clflushopt => FlushInstruction::ClflushOpt,
            _ => FlushInstruction::Clflush,
        }
    }
}

/// Explicit-flush hammering kernel.
///
/// Per iteration, reads the base of both address ranges and flushes both
/// lines so the next iteration is served from DRAM again. The loop performs
/// exactly the configured number of iterations; it does not allocate, log,
/// or take unpredictable branches while running.
pub struct FlushHammerer {
    first: AggressorPtr,
    second: AggressorPtr,
    reads: u64,
    instruction: FlushInstruction,
    fence: FencePolicy,
}

impl FlushHammerer {
    /// Creates a kernel hammering the bases of `first` and `second`.
    ///
    /// # Arguments
    ///
    /// * `first`, `second` - Aggressor ranges; only the bases are accessed
    /// * `reads` - Number of iterations (two reads and two flushes each)
    /// * `instruction` - Flush instruction to evict with
    /// * `fence` - Fence placement inside the loop body
    pub fn new(
        first: AddressRange,
        second: AddressRange,
        reads: u64,
        instruction: FlushInstruction,
        fence: FencePolicy,
    ) -> Self {
        Self {
            first: first.base,
            second: second.base,
            reads,
            instruction,
            fence,
        }
    }
}

/// Seam between the hammer loop and the hardware: the loop is generic over
/// the accessor and monomorphizes to plain loads and flushes, while tests
/// substitute a counting accessor to audit the access pattern.
trait Accessor {
    /// Reads one 64-bit word from `addr`.
    ///
    /// # Safety
    ///
    /// `addr` must be valid for an aligned 8-byte read.
    unsafe fn load(&mut self, addr: AggressorPtr);

    /// Evicts the cache line holding `addr`.
    ///
    /// # Safety
    ///
    /// `addr` must be a valid pointer.
    unsafe fn evict(&mut self, addr: AggressorPtr);

    /// Orders preceding memory operations.
    fn fence(&mut self);
}

struct Hardware {
    instruction: FlushInstruction,
}

impl Accessor for Hardware {
    #[inline(always)]
    unsafe fn load(&mut self, addr: AggressorPtr) {
        std::hint::black_box(unsafe { std::ptr::read_volatile(addr as *const u64) });
    }

    #[inline(always)]
    unsafe fn evict(&mut self, addr: AggressorPtr) {
        match self.instruction {
            FlushInstruction::Clflush => unsafe { _mm_clflush(addr) },
            FlushInstruction::ClflushOpt => unsafe {
                asm!("clflushopt [{}]", in(reg) addr);
            },
        }
    }

    #[inline(always)]
    fn fence(&mut self) {
        unsafe { _mm_mfence() }
    }
}

// with the latency feature the timed loop replaces this one outside of tests
#[cfg_attr(feature = "latency", allow(dead_code))]
unsafe fn hammer_rounds<A: Accessor>(
    accessor: &mut A,
    first: AggressorPtr,
    second: AggressorPtr,
    reads: u64,
    fence: FencePolicy,
) -> u64 {
    // reserved for a future checksum over the read values
    let sum = 0u64;
    let mut remaining = reads;
    while remaining > 0 {
        unsafe {
            accessor.load(first);
            accessor.load(second);
            accessor.evict(first);
            if fence == FencePolicy::BetweenFlushes {
                accessor.fence();
            }
            accessor.evict(second);
            if fence == FencePolicy::AfterFlushes {
                accessor.fence();
            }
        }
        remaining -= 1;
    }
    sum
}

#[cfg(feature = "latency")]
mod timed {
    use super::{Accessor, Hardware};
    use fuller_core::config::FencePolicy;
    use fuller_core::memory::{AggressorPtr, timestamp_begin, timestamp_end};
    use log::debug;

    const BUCKETS: usize = 100;
    const BUCKET_CYCLES: u64 = 5;

    fn record(hist: &mut [u64; BUCKETS], cycles: u64) {
        let bucket = ((cycles / BUCKET_CYCLES) as usize).min(BUCKETS - 1);
        hist[bucket] += 1;
    }

    /// Hammer loop with per-read latency buckets. The serialized timestamp
    /// reads slow the loop down considerably; only use this to verify that
    /// accesses actually miss the cache.
    pub(super) unsafe fn hammer_rounds_timed(
        accessor: &mut Hardware,
        first: AggressorPtr,
        second: AggressorPtr,
        reads: u64,
        fence: FencePolicy,
    ) -> u64 {
        let mut first_hist = [0u64; BUCKETS];
        let mut second_hist = [0u64; BUCKETS];
        let sum = 0u64;
        let mut remaining = reads;
        while remaining > 0 {
            unsafe {
                let start = timestamp_begin();
                accessor.load(first);
                record(&mut first_hist, timestamp_end() - start);
                let start = timestamp_begin();
                accessor.load(second);
                record(&mut second_hist, timestamp_end() - start);
                accessor.evict(first);
                if fence == FencePolicy::BetweenFlushes {
                    accessor.fence();
                }
                accessor.evict(second);
                if fence == FencePolicy::AfterFlushes {
                    accessor.fence();
                }
            }
            remaining -= 1;
        }
        for (bucket, count) in first_hist
            .iter()
            .zip(second_hist.iter())
            .map(|(first, second)| first + second)
            .enumerate()
        {
            if count > 0 {
                debug!("{:>4} cycles: {}", bucket as u64 * BUCKET_CYCLES, count);
            }
        }
        sum
    }
}

impl Hammering for FlushHammerer {
    type Error = Never;

    fn hammer(&self) -> Result<(), Self::Error> {
        let mut accessor = Hardware {
            instruction: self.instruction,
        };
        let start = Instant::now();
        #[cfg(feature = "latency")]
        let sum = unsafe {
            timed::hammer_rounds_timed(&mut accessor, self.first, self.second, self.reads, self.fence)
        };
        #[cfg(not(feature = "latency"))]
        let sum = unsafe {
            hammer_rounds(&mut accessor, self.first, self.second, self.reads, self.fence)
        };
        debug!(
            "hammered {} rounds in {:?} (checksum 0x{:02x})",
            self.reads,
            start.elapsed(),
            sum
        );
        Ok(())
    }
}
