use std::arch::x86_64::{_mm_clflush, _mm_mfence};

use crate::memory::BytePointer;
use crate::util::{PAGE_SIZE, WORD_SIZE, WORDS_PER_LINE, WORDS_PER_PAGE};

/// Flushes the cache line containing `addr` from all cache levels.
///
/// The flush is issued immediately; global visibility is subject to the
/// platform's ordering rules.
///
/// # Safety
///
/// `addr` must point into mapped memory.
pub unsafe fn flush_line(addr: *const u8) {
    unsafe { _mm_clflush(addr) }
}

/// Flushes one 4096-byte page of `mem` from the cache.
///
/// Issues one flush per 64-byte line by touching every 8th 64-bit word;
/// page bases are line aligned, so this covers each of the page's lines
/// exactly once.
///
/// # Panics
///
/// Panics if `page_offset` is not page aligned or the page exceeds the
/// mapping.
pub fn flush_page(mem: &dyn BytePointer, page_offset: usize) {
    assert!(
        page_offset.is_multiple_of(PAGE_SIZE),
        "page offset 0x{:x} must be page aligned",
        page_offset
    );
    for word in (WORDS_PER_LINE - 1..WORDS_PER_PAGE).step_by(WORDS_PER_LINE) {
        unsafe { flush_line(mem.addr(page_offset + word * WORD_SIZE)) };
    }
}

/// Writes `value` into every 64-bit word of one page, fences, then flushes
/// the page from the cache.
///
/// Used to prime victim and aggressor rows with a known bit pattern before
/// hammering, so induced flips are detectable afterwards. The stores are
/// fenced once as a whole; interleaving per-word stores with flushes has
/// unresolved ordering against `clflush`.
///
/// # Panics
///
/// Panics if `page_offset` is not page aligned or the page exceeds the
/// mapping.
pub fn write_and_flush(mem: &dyn BytePointer, page_offset: usize, value: u64) {
    assert!(
        page_offset.is_multiple_of(PAGE_SIZE),
        "page offset 0x{:x} must be page aligned",
        page_offset
    );
    for word in 0..WORDS_PER_PAGE {
        unsafe {
            std::ptr::write_volatile(mem.addr(page_offset + word * WORD_SIZE) as *mut u64, value)
        };
    }
    unsafe { _mm_mfence() };
    flush_page(mem, page_offset);
}
