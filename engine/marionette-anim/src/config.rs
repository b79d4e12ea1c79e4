//! Engine configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::manifest::read_document;
use crate::pool::PoolConfig;

/// Crowd sizes below this are ticked on the calling thread
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 64;

/// Settings shared by every animator of a process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed for variant selection; `None` seeds from the OS
    pub rng_seed: Option<u64>,
    pub pool: PoolConfig,
    pub parallel_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rng_seed: None,
            pool: PoolConfig::default(),
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl EngineConfig {
    /// Load from a `.json`, `.yaml` or `.yml` file; missing keys take defaults
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        read_document(path.as_ref())
    }
}
