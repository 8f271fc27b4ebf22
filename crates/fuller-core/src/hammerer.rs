//! Rowhammer hammering traits.
//!
//! This module defines the [`Hammering`] trait that all hammering kernels
//! implement to perform the memory access patterns that induce bit flips
//! through the Rowhammer effect.

use thiserror::Error;

/// Trait for implementing Rowhammer hammering techniques.
///
/// Implementors define how aggressor addresses are accessed and evicted:
/// explicit flush instructions (`fuller-flush`) or traversal of decoy
/// eviction sets (`fuller-evict`). The access pattern, eviction strategy and
/// iteration count are fixed when the kernel is constructed; `hammer` runs
/// the full iteration budget with no early exit.
///
/// Hammering timing depends on the absence of scheduler preemption: pin the
/// calling thread to one core and quiesce competing load before expecting
/// meaningful results.
pub trait Hammering {
    /// The error type returned by hammering operations.
    type Error: std::error::Error;

    /// Performs the hammering operation.
    ///
    /// Executes the kernel's access-and-evict loop for the configured number
    /// of iterations. The observable output is the side effect of disturbing
    /// nearby DRAM rows; callers detect success by re-checking victim rows
    /// they primed beforehand.
    ///
    /// # Errors
    ///
    /// Returns an error if the kernel cannot run; the bundled kernels are
    /// infallible and use [`Never`].
    fn hammer(&self) -> Result<(), Self::Error>;
}

/// Error type for hammering kernels that cannot fail.
#[derive(Debug, Error)]
pub enum Never {}
