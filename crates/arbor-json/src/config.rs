//! Parser limits and value pool sizing

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Slots in the first block a pool allocates
pub const DEFAULT_INITIAL_BLOCK_SIZE: usize = 128;

/// Block size ceiling; growth doubles until it reaches this
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 2048;

/// Default maximum nesting depth of arrays and objects
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// How the parser treats a key that already appears in the same object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKeyPolicy {
    /// Keep the first key's position and replace its value with the later one
    #[default]
    LastWins,
    /// Keep every entry in arrival order
    Retain,
    /// Fail the parse at the repeated key
    Reject,
}

/// Value pool sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Slots in the first block
    pub initial_block_size: usize,

    /// Largest block the pool will allocate
    pub max_block_size: usize,

    /// Optional cap on total slots across all blocks
    pub max_slots: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_block_size: DEFAULT_INITIAL_BLOCK_SIZE,
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
            max_slots: None,
        }
    }
}

impl PoolConfig {
    /// Configuration for small, memory-constrained processes
    pub fn low_memory() -> Self {
        Self {
            initial_block_size: 32,
            max_block_size: 256,
            max_slots: Some(1 << 20),
        }
    }

    /// Configuration for large documents parsed back to back
    pub fn high_throughput() -> Self {
        Self {
            initial_block_size: 1024,
            max_block_size: 16 * 1024,
            max_slots: None,
        }
    }

    /// Set a cap on total slots
    pub fn with_max_slots(mut self, max_slots: usize) -> Self {
        self.max_slots = Some(max_slots);
        self
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.initial_block_size == 0 {
            return Err(Error::config("initial_block_size must be greater than zero"));
        }
        if self.max_block_size < self.initial_block_size {
            return Err(Error::config(format!(
                "max_block_size {} is smaller than initial_block_size {}",
                self.max_block_size, self.initial_block_size
            )));
        }
        if u32::try_from(self.max_block_size).is_err() {
            return Err(Error::config("max_block_size must fit in 32 bits"));
        }
        Ok(())
    }
}

/// Parser limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Maximum nesting depth of arrays and objects
    pub max_depth: usize,

    /// Maximum input size in bytes
    pub max_input_size: usize,

    /// Maximum decoded string length in bytes
    pub max_string_length: usize,

    /// Maximum number of elements in one array
    pub max_array_length: usize,

    /// Maximum number of entries in one object
    pub max_object_keys: usize,

    /// Treatment of repeated object keys
    pub duplicate_keys: DuplicateKeyPolicy,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_input_size: 100 * 1024 * 1024,   // 100MB
            max_string_length: 10 * 1024 * 1024, // 10MB
            max_array_length: 1_000_000,
            max_object_keys: 10_000,
            duplicate_keys: DuplicateKeyPolicy::default(),
        }
    }
}

impl ParserConfig {
    /// Tight limits for untrusted input; duplicate keys are rejected
    pub fn strict() -> Self {
        Self {
            max_depth: 32,
            max_input_size: 10 * 1024 * 1024, // 10MB
            max_string_length: 1024 * 1024,   // 1MB
            max_array_length: 100_000,
            max_object_keys: 1_000,
            duplicate_keys: DuplicateKeyPolicy::Reject,
        }
    }

    /// Generous limits for trusted bulk data
    pub fn high_throughput() -> Self {
        Self {
            max_depth: 512,
            max_input_size: 1024 * 1024 * 1024,   // 1GB
            max_string_length: 100 * 1024 * 1024, // 100MB
            max_array_length: usize::MAX,
            max_object_keys: usize::MAX,
            duplicate_keys: DuplicateKeyPolicy::LastWins,
        }
    }

    /// Set the maximum nesting depth
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the duplicate key policy
    pub fn with_duplicate_keys(mut self, policy: DuplicateKeyPolicy) -> Self {
        self.duplicate_keys = policy;
        self
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(Error::config("max_depth must be greater than zero"));
        }
        if self.max_input_size == 0 {
            return Err(Error::config("max_input_size must be greater than zero"));
        }
        Ok(())
    }
}
