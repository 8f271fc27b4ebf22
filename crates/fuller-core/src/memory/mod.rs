//! The `memory` module provides the memory-facing abstractions of the
//! toolkit: mappings, physical address resolution, DRAM geometry, address
//! arrangement, and the cache and timing primitives.
//!
//! The main abstractions are:
//! - `Memory`: a managed memory mapping, allocated with `MAP_POPULATE` so
//!   every page is resident before arrangement is attempted.
//! - `BytePointer`: a trait for bounds-checked byte access to a mapping.
//! - `LinuxPageMap` / `VirtToPhysResolver`: virtual to physical address
//!   resolution through `/proc/{pid}/pagemap`.
//! - `PfnResolver`: convenience physical lookups directly on raw pointers.
//! - `DramProfile` / `DramConfig` / `BankHash`: the DRAM geometry model
//!   mapping physical addresses to bank sets and rows.
//! - `RowGroups`: pages of a mapping grouped by (bank set, row).
//! - `flush_line` / `flush_page` / `write_and_flush`: cache maintenance for
//!   priming rows and evicting hammered lines.
//! - `timestamp_begin` / `timestamp_end`: serialized timestamp counter reads
//!   for timing single accesses.

mod cache;
mod dram_config;
mod memblock;
mod pfn_resolver;
mod row_groups;
mod timer;
mod virt_to_phys;

pub use self::cache::{flush_line, flush_page, write_and_flush};
pub use self::dram_config::{BankHash, DramConfig, DramProfile};
pub use self::memblock::Memory;
pub use self::pfn_resolver::PfnResolver;
pub use self::row_groups::RowGroups;
pub use self::timer::{timestamp_begin, timestamp_end};
pub use self::virt_to_phys::{LinuxPageMap, LinuxPageMapError, PhysAddr, VirtToPhysResolver};

use crate::util::WORD_SIZE;

/// Pointer type for aggressor row addresses.
///
/// Identifies memory locations that are hammered to induce bit flips in
/// adjacent victim rows.
pub type AggressorPtr = *const u8;

/// Trait for accessing memory as a byte pointer.
///
/// Provides low-level access to memory regions with byte-level addressing.
/// Offsets are bounds-checked against the region length.
#[allow(clippy::len_without_is_empty)]
pub trait BytePointer {
    /// Returns a mutable pointer to the byte at the given offset.
    ///
    /// # Safety
    ///
    /// The returned pointer is valid only while the memory region exists.
    /// Dereferencing requires unsafe code and proper synchronization.
    fn addr(&self, offset: usize) -> *mut u8;

    /// Returns a mutable pointer to the start of the memory region.
    fn ptr(&self) -> *mut u8;

    /// Returns the total length of the memory region in bytes.
    fn len(&self) -> usize;
}

/// A contiguous span of virtual memory handed to a hammering kernel.
///
/// Kernels dereference only the 8-byte-aligned base of a range once per
/// iteration; the length documents how much of the row the caller considers
/// owned by this aggressor.
#[derive(Clone, Copy, Debug)]
pub struct AddressRange {
    /// First address of the range; the word the kernel reads.
    pub base: AggressorPtr,
    /// Range length in bytes.
    pub len: usize,
}

impl AddressRange {
    /// Creates a new address range.
    ///
    /// # Panics
    ///
    /// Panics if `base` is not 8-byte aligned; kernels read the base as one
    /// 64-bit word.
    pub fn new(base: AggressorPtr, len: usize) -> Self {
        assert!(
            (base as usize).is_multiple_of(WORD_SIZE),
            "range base {:p} must be 8-byte aligned",
            base
        );
        AddressRange { base, len }
    }
}

impl From<&Memory> for AddressRange {
    fn from(mem: &Memory) -> Self {
        AddressRange::new(mem.ptr as AggressorPtr, mem.len)
    }
}
