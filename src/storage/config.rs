//! Buffer pool configuration.

use crate::storage::buffer::clock::ClockReplacer;
use crate::storage::buffer::lru::LruReplacer;
use crate::storage::buffer::replacer::Replacer;
use crate::storage::error::{StorageError, StorageResult};
use std::fmt;
use std::str::FromStr;

/// Default number of frames in the buffer pool.
pub const DEFAULT_POOL_SIZE: usize = 64;

/// Which eviction policy the buffer pool uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplacerKind {
    #[default]
    Lru,
    Clock,
}

impl ReplacerKind {
    pub fn build(self, num_frames: usize) -> Box<dyn Replacer> {
        match self {
            ReplacerKind::Lru => Box::new(LruReplacer::new(num_frames)),
            ReplacerKind::Clock => Box::new(ClockReplacer::new(num_frames)),
        }
    }
}

impl FromStr for ReplacerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lru" => Ok(ReplacerKind::Lru),
            "clock" => Ok(ReplacerKind::Clock),
            other => Err(format!("unknown replacer '{}', expected lru or clock", other)),
        }
    }
}

impl fmt::Display for ReplacerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplacerKind::Lru => write!(f, "lru"),
            ReplacerKind::Clock => write!(f, "clock"),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Number of frames in the buffer pool.
    pub pool_size: usize,
    /// Eviction policy.
    pub replacer: ReplacerKind,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            pool_size: DEFAULT_POOL_SIZE,
            replacer: ReplacerKind::default(),
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> StorageResult<()> {
        if self.pool_size == 0 {
            return Err(StorageError::InvalidConfig(
                "pool_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
