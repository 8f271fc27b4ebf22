//! Utility types and functions used throughout the Fuller toolkit.
//!
//! This module provides:
//! - [`Size`] - Memory size representation
//! - Constants for memory operations ([`PAGE_SIZE`], [`CL_SIZE`], etc.)
//! - Progress reporting utilities ([`NamedProgress`])
//! - [`total_physical_memory`] for sizing mappings against installed RAM

mod constants;
mod named_progress;
mod size;

pub use self::constants::*;
pub use self::named_progress::NamedProgress;
pub use self::size::Size;

/// Returns the total amount of installed physical memory in bytes.
///
/// Callers typically use this to bound the size of the mapping handed to the
/// address arranger.
pub fn total_physical_memory() -> u64 {
    let mut info = unsafe { std::mem::zeroed::<libc::sysinfo>() };
    let ret = unsafe { libc::sysinfo(&mut info) };
    assert_eq!(ret, 0, "sysinfo: {}", std::io::Error::last_os_error());
    info.totalram as u64 * info.mem_unit as u64
}

#[cfg(test)]
mod tests {
    use super::total_physical_memory;

    #[test]
    fn test_physical_memory_nonzero() {
        assert!(total_physical_memory() > 0);
    }
}
