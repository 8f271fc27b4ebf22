use std::fmt::{Debug, Formatter};
use std::ops::{Add, Sub};

use crate::util::PAGE_SHIFT;
use pagemap2::{PageMapError, VirtualMemoryArea};
use serde::Serialize;
use thiserror::Error;

#[repr(transparent)]
#[derive(Clone, Copy, Default, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Physical memory address.
///
/// A newtype wrapper around a physical address value. A `PhysAddr` uniquely
/// identifies a byte of installed RAM and is only ever produced by a
/// [`VirtToPhysResolver`] (or constructed explicitly in tests).
pub struct PhysAddr(usize);

impl Debug for PhysAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("PhysAddr(0x{:02x})", self.0))
    }
}

impl PhysAddr {
    /// Creates a new physical address.
    pub fn new(addr: usize) -> Self {
        PhysAddr(addr)
    }

    /// Returns the address as a usize.
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

/// Trait for resolving virtual addresses to physical addresses.
///
/// Implementors translate virtual memory addresses of the inspected process
/// to physical addresses, usually through `/proc/{pid}/pagemap`. The address
/// arranger is generic over this trait so that tests can substitute a stub
/// resolver with a synthetic physical layout.
pub trait VirtToPhysResolver {
    /// Errors that can occur during physical address resolution
    type Error;

    /// Translates a virtual address to a physical address.
    ///
    /// # Errors
    ///
    /// Returns an error if address translation fails or the page backing
    /// `virt` is not resident.
    fn get_phys(&mut self, virt: u64) -> Result<PhysAddr, Self::Error>;
}

/// Errors that can happen during pagemap lookups.
#[derive(Debug, Error)]
pub enum LinuxPageMapError {
    /// Reading or parsing the pagemap entry failed (including short reads).
    #[error(transparent)]
    PageMap(#[from] PageMapError),
    /// The pagemap reports PFN 0 for the page: it is either not resident or
    /// the process lacks the privilege to see frame numbers. Either way no
    /// meaningful physical address exists for the caller to hammer.
    #[error(
        "page at 0x{0:x} is not resident (pagemap reports PFN 0); \
         pre-fault the mapping with MAP_POPULATE and run with CAP_SYS_ADMIN"
    )]
    NotResident(u64),
}

/// Virtual to physical address translator using Linux pagemap.
///
/// Uses `/proc/{pid}/pagemap` to translate virtual to physical addresses.
/// Requires root privileges to see page frame numbers. The pagemap handle
/// stays open for the lifetime of the resolver, so resolving one page per
/// loop iteration does not churn file descriptors.
pub struct LinuxPageMap {
    pagemap_wrapper: pagemap2::PageMap,
}

impl LinuxPageMap {
    /// Creates a new pagemap resolver for the current process.
    ///
    /// # Errors
    ///
    /// Returns an error if opening `/proc/self/pagemap` fails.
    pub fn new() -> Result<LinuxPageMap, LinuxPageMapError> {
        Self::for_process(std::process::id())
    }

    /// Creates a new pagemap resolver for a specific process.
    ///
    /// # Arguments
    ///
    /// * `pid` - Process ID to open pagemap for
    ///
    /// # Errors
    ///
    /// Returns an error if opening the process pagemap fails.
    pub fn for_process(pid: u32) -> Result<LinuxPageMap, LinuxPageMapError> {
        let res = LinuxPageMap {
            pagemap_wrapper: pagemap2::PageMap::new(pid as u64)?,
        };
        Ok(res)
    }
}

impl VirtToPhysResolver for LinuxPageMap {
    type Error = LinuxPageMapError;

    fn get_phys(&mut self, virt: u64) -> Result<PhysAddr, Self::Error> {
        //calc virtual address of page containing virt
        let vaddr_start_page = virt & !0xFFF;
        let vaddr_end_page = vaddr_start_page + 4095;

        //query pagemap
        let memory_region = VirtualMemoryArea::from((vaddr_start_page, vaddr_end_page));
        let entry = self.pagemap_wrapper.pagemap_vma(&memory_region)?;
        assert_eq!(
            entry.len(),
            1,
            "Got {} pagemap entries for virtual address 0x{:x}, expected exactly one",
            entry.len(),
            virt
        );
        let pfn = entry[0].pfn()?;
        if pfn == 0 {
            return Err(LinuxPageMapError::NotResident(virt));
        }

        let phys_addr = ((pfn << PAGE_SHIFT) | (virt & 0xFFF)) as usize;

        Ok(PhysAddr(phys_addr))
    }
}

impl From<PhysAddr> for usize {
    fn from(addr: PhysAddr) -> usize {
        addr.0
    }
}

impl From<PhysAddr> for *const u8 {
    fn from(addr: PhysAddr) -> *const u8 {
        addr.0 as *const u8
    }
}

impl std::fmt::Pointer for PhysAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:p}", self.0 as *const u8)
    }
}

impl Add<usize> for PhysAddr {
    type Output = PhysAddr;

    fn add(self, rhs: usize) -> Self::Output {
        PhysAddr(self.0 + rhs)
    }
}

impl Sub<PhysAddr> for PhysAddr {
    type Output = PhysAddr;

    fn sub(self, rhs: PhysAddr) -> Self::Output {
        assert!(self.0 >= rhs.0);
        PhysAddr(self.0 - rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{BytePointer, Memory};
    use crate::util::{PAGE_MASK, PAGE_SHIFT, PAGE_SIZE};

    #[test]
    fn test_resolve_populated_page() {
        let mem = Memory::mmap(PAGE_SIZE).expect("mmap");
        let mut resolver = match LinuxPageMap::new() {
            Ok(resolver) => resolver,
            // pagemap may be unavailable in stripped-down environments
            Err(_) => return,
        };
        match resolver.get_phys(mem.addr(123) as u64) {
            Ok(phys) => {
                assert_eq!(phys.as_usize() & PAGE_MASK, 123);
                assert_ne!(phys.as_usize() >> PAGE_SHIFT, 0);
            }
            // without CAP_SYS_ADMIN the kernel masks all PFNs to 0; the
            // resolver must refuse rather than hand out a zero frame
            Err(LinuxPageMapError::NotResident(virt)) => {
                assert_eq!(virt, mem.addr(123) as u64);
            }
            Err(e) => panic!("unexpected resolver error: {}", e),
        }
        mem.dealloc();
    }

    #[test]
    fn test_phys_addr_arithmetic() {
        let base = PhysAddr::new(0x2000);
        assert_eq!((base + 0x40).as_usize(), 0x2040);
        assert_eq!((base - PhysAddr::new(0x1000)).as_usize(), 0x1000);
    }
}
