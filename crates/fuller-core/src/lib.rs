//! # Fuller Core
//!
//! `fuller-core` is the foundational library of the Fuller Rowhammer
//! toolkit. It maps the virtual pages of a memory mapping to their physical
//! DRAM coordinates and provides the low-level cache and timing primitives
//! needed to mount and measure hammering attacks.
//!
//! ## Architecture Overview
//!
//! The data flow through the core is:
//!
//! 1. The caller provides a resident memory mapping ([`memory::Memory`],
//!    allocated with `MAP_POPULATE`) and a [`config::AttackConfig`] naming
//!    the machine's [`memory::DramProfile`] and DIMM count.
//! 2. [`memory::RowGroups::populate`] walks the mapping page by page,
//!    resolving physical addresses through [`memory::LinuxPageMap`] and
//!    hashing them with [`memory::DramConfig`] into (bank set, row) buckets.
//! 3. The caller selects aggressor pages from two rows of one bank set,
//!    primes the rows with [`memory::write_and_flush`], and hands the
//!    addresses to a kernel implementing [`hammerer::Hammering`]
//!    (`fuller-flush` or `fuller-evict`).
//! 4. After hammering, the caller re-reads the victim rows to detect
//!    induced bit flips.
//!
//! ## Platform Support
//!
//! x86_64 Linux only: physical addresses come from `/proc/self/pagemap`
//! (root required to see frame numbers) and the primitives use `clflush`/
//! `clflushopt`/`rdtscp` directly. The cache operations must reach genuine
//! physical memory; running under an intercepting virtualization layer
//! defeats the attack. For meaningful timing, pin the process to one core
//! and disable competing background activity.

#![warn(missing_docs)]

pub mod config;
pub mod hammerer;
pub mod memory;
pub mod util;
