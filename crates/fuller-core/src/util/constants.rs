/// Page shift value (12 bits) for 4KB pages
pub const PAGE_SHIFT: usize = 12;
/// Standard page size (4096 bytes)
pub const PAGE_SIZE: usize = 1 << PAGE_SHIFT;
/// Mask for extracting page offset
pub const PAGE_MASK: usize = PAGE_SIZE - 1;

/// Cache line size (64 bytes) for x86_64
pub const CL_SIZE: usize = 64;

/// Width of the 64-bit words the cache and hammering primitives operate on
pub const WORD_SIZE: usize = 8;
/// Number of 64-bit words per cache line
pub const WORDS_PER_LINE: usize = CL_SIZE / WORD_SIZE;
/// Number of 64-bit words per page
pub const WORDS_PER_PAGE: usize = PAGE_SIZE / WORD_SIZE;
