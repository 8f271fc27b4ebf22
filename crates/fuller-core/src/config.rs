//! Runtime attack configuration.
//!
//! The original compile-time switches (microarchitecture, eviction strategy,
//! fence placement, read count) are a JSON-loaded value here, so one build
//! covers every supported machine.

use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

use crate::memory::{DramConfig, DramProfile};

/// Errors that can occur when loading an attack configuration.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum Error {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
}

/// Result type for AttackConfig constructors.
pub type Result<T> = std::result::Result<T, Error>;

/// How hammered lines are evicted between iterations.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EvictionStrategy {
    /// Explicit flush instruction per aggressor (`fuller-flush`).
    #[default]
    Flush,
    /// Traversal of caller-supplied decoy sets (`fuller-evict`), for setups
    /// where flush instructions are undesirable or unavailable.
    DecoySet,
}

/// Fence placement inside the flush kernel's iteration.
///
/// Whether a fence between the two flushes changes flip rates is an open
/// experimental question; keeping it configurable lets experiments toggle it
/// without rebuilding.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FencePolicy {
    /// No fence in the loop body.
    #[default]
    None,
    /// `mfence` between the two flushes.
    BetweenFlushes,
    /// `mfence` after both flushes.
    AfterFlushes,
}

/// Attack parameters loaded from a JSON file.
#[derive(Debug, Deserialize)]
pub struct AttackConfig {
    /// Microarchitecture profile of the attacked machine.
    pub profile: DramProfile,
    /// Number of installed DIMMs (1 or 2).
    pub dimms: usize,
    /// Eviction strategy for the hammering kernel.
    #[serde(default)]
    pub eviction: EvictionStrategy,
    /// Fence placement for the flush kernel.
    #[serde(default)]
    pub fence: FencePolicy,
    /// Number of hammering iterations per run.
    #[serde(default = "default_hammer_count")]
    pub hammer_count: u64,
    /// Forces `clflush` even on profiles where `clflushopt` is available.
    #[serde(default)]
    pub disable_clflushopt: bool,
}

fn default_hammer_count() -> u64 {
    1024 * 1024
}

impl AttackConfig {
    /// Loads configuration from a JSON file.
    ///
    /// # Arguments
    ///
    /// * `filepath` - Path to the JSON configuration file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn from_jsonfile(filepath: &str) -> Result<AttackConfig> {
        let mut file = File::open(Path::new(filepath))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let config: AttackConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Builds the DRAM geometry for this configuration.
    pub fn dram_config(&self) -> DramConfig {
        DramConfig::new(self.profile, self.dimms)
    }
}
