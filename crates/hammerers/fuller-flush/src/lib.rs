//! Explicit-flush Rowhammer kernel.
//!
//! This crate provides the default hammering kernel: it reads two aggressor
//! addresses per iteration and evicts both cache lines with an explicit
//! flush instruction (`clflush`, or `clflushopt` on microarchitectures that
//! support it). Fence placement inside the loop is configurable.
//!
//! Implements the [`fuller_core::hammerer::Hammering`] trait.
//!
//! # Features
//!
//! - `latency` - per-read latency histogram through serialized timestamp
//!   reads, reported via `log`. Verifies that accesses miss the cache, at a
//!   substantial cost in loop throughput.

#![warn(missing_docs)]

mod flush;

pub use flush::{FlushHammerer, FlushInstruction};
