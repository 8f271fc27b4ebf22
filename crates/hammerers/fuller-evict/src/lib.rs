//! Eviction-based Rowhammer kernel.
//!
//! This crate provides a hammering kernel that evicts the aggressor lines by
//! traversing caller-supplied 32-entry decoy sets instead of issuing flush
//! instructions. Useful where `clflush` is unavailable to the attacker or
//! its use would be conspicuous.
//!
//! Implements the [`fuller_core::hammerer::Hammering`] trait.

#![warn(missing_docs)]

mod evict;

pub use evict::{DECOY_COUNT, EVICTION_SET_SIZE, EvictHammerer, EvictionSet};
