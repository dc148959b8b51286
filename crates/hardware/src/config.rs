//! Configuration system for the memory hierarchy simulator.
//!
//! This module defines the structures used to parameterize the simulator. It provides:
//! 1. **Defaults:** Baseline cache geometry, memory map and run limits.
//! 2. **Structures:** Hierarchical config for general settings, both caches and memory.
//! 3. **Validation:** Geometry and memory checks performed before anything is built.
//!
//! Configuration is supplied as JSON (`Config::from_json` / `Config::from_file`)
//! or taken from `Config::default()`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::{AddressLayout, ConfigError};

/// Default configuration constants for the simulator.
mod defaults {
    /// Lines per way.
    pub const CACHE_LINES: usize = 128;

    /// Words per line (32 bytes).
    pub const CACHE_WORDS: usize = 8;

    /// Ways per set.
    pub const CACHE_WAYS: usize = 2;

    /// First cacheable address.
    pub const CACHE_START: u64 = 0x8000_0000;

    /// End of the cacheable range (exclusive).
    pub const CACHE_END: u64 = 0xFFFF_FFFF;

    /// Base address of main RAM.
    pub const RAM_BASE: u32 = 0x8000_0000;

    /// Size of main RAM (1 MiB).
    pub const RAM_SIZE: usize = 1024 * 1024;

    /// Wait states before RAM acknowledges a strobed request.
    pub const RAM_LATENCY: u32 = 1;

    /// Cycle budget for one trace run.
    pub const MAX_CYCLES: u64 = 1_000_000;
}

/// Root configuration structure.
///
/// # Examples
///
/// ```
/// use rvmem_core::config::Config;
///
/// let json = r#"{
///     "dcache": { "nlines": 64, "nwords": 4, "nways": 1 },
///     "memory": { "latency": 3 }
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.dcache.nlines, 64);
/// assert_eq!(config.dcache.start_addr, 0x8000_0000);
/// assert_eq!(config.icache.nways, 2);
/// assert_eq!(config.memory.latency, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// General simulation settings
    #[serde(default)]
    pub general: GeneralConfig,
    /// Instruction cache geometry
    #[serde(default = "CacheConfig::default_icache")]
    pub icache: CacheConfig,
    /// Data cache geometry
    #[serde(default = "CacheConfig::default_dcache")]
    pub dcache: CacheConfig,
    /// Main memory model
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl Config {
    /// Parses and validates a JSON configuration.
    ///
    /// # Arguments
    ///
    /// * `json` - Configuration text; omitted sections and fields take their defaults.
    ///
    /// # Returns
    ///
    /// The validated configuration, or the parse or validation error.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Checks both cache geometries and the memory model.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let _ = self.icache.layout()?;
        let _ = self.dcache.layout()?;
        self.memory.validate()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            icache: CacheConfig::default_icache(),
            dcache: CacheConfig::default_dcache(),
            memory: MemoryConfig::default(),
        }
    }
}

/// General simulation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Cycles a trace run may take before it is abandoned
    #[serde(default = "GeneralConfig::default_max_cycles")]
    pub max_cycles: u64,
}

impl GeneralConfig {
    fn default_max_cycles() -> u64 {
        defaults::MAX_CYCLES
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { max_cycles: defaults::MAX_CYCLES }
    }
}

/// Geometry of one cache.
///
/// Immutable once a cache is built from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lines per way (power of two)
    #[serde(default = "CacheConfig::default_nlines")]
    pub nlines: usize,

    /// Words per line (4, 8 or 16)
    #[serde(default = "CacheConfig::default_nwords")]
    pub nwords: usize,

    /// Ways per set (1 or 2)
    #[serde(default = "CacheConfig::default_nways")]
    pub nways: usize,

    /// First cacheable address
    #[serde(default = "CacheConfig::default_start_addr")]
    pub start_addr: u64,

    /// End of the cacheable range (exclusive, at most 2^32)
    #[serde(default = "CacheConfig::default_end_addr")]
    pub end_addr: u64,

    /// Accept CPU stores into the data array (data cache)
    #[serde(default)]
    pub enable_write: bool,
}

impl CacheConfig {
    fn default_nlines() -> usize {
        defaults::CACHE_LINES
    }

    fn default_nwords() -> usize {
        defaults::CACHE_WORDS
    }

    fn default_nways() -> usize {
        defaults::CACHE_WAYS
    }

    fn default_start_addr() -> u64 {
        defaults::CACHE_START
    }

    fn default_end_addr() -> u64 {
        defaults::CACHE_END
    }

    /// Default instruction cache: read-only.
    pub fn default_icache() -> Self {
        Self::default()
    }

    /// Default data cache: write-enabled.
    pub fn default_dcache() -> Self {
        Self { enable_write: true, ..Self::default() }
    }

    /// Validates the geometry and derives its address layout.
    pub fn layout(&self) -> Result<AddressLayout, ConfigError> {
        if !matches!(self.nways, 1 | 2) {
            return Err(ConfigError::Ways(self.nways));
        }
        AddressLayout::from_geometry(self.nlines, self.nwords, self.start_addr, self.end_addr)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            nlines: defaults::CACHE_LINES,
            nwords: defaults::CACHE_WORDS,
            nways: defaults::CACHE_WAYS,
            start_addr: defaults::CACHE_START,
            end_addr: defaults::CACHE_END,
            enable_write: false,
        }
    }
}

/// An address window in which the memory model answers with a bus error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorWindow {
    /// First faulting address
    pub start: u32,
    /// End of the window (exclusive)
    pub end: u64,
}

impl ErrorWindow {
    /// Returns true if `addr` lies inside the window.
    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.start && u64::from(addr) < self.end
    }
}

/// Main memory model configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// RAM base address
    #[serde(default = "MemoryConfig::default_base")]
    pub base: u32,

    /// RAM size in bytes
    #[serde(default = "MemoryConfig::default_size_bytes")]
    pub size_bytes: usize,

    /// Wait states before each acknowledge
    #[serde(default = "MemoryConfig::default_latency")]
    pub latency: u32,

    /// Windows that respond with a bus error
    #[serde(default)]
    pub error_windows: Vec<ErrorWindow>,
}

impl MemoryConfig {
    fn default_base() -> u32 {
        defaults::RAM_BASE
    }

    fn default_size_bytes() -> usize {
        defaults::RAM_SIZE
    }

    fn default_latency() -> u32 {
        defaults::RAM_LATENCY
    }

    /// Checks that the RAM is word-sized and fits the address space.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size_bytes == 0 || self.size_bytes % 4 != 0 {
            return Err(ConfigError::MemorySize(self.size_bytes));
        }
        if u64::from(self.base) + self.size_bytes as u64 > 1 << 32 {
            return Err(ConfigError::MemoryRange { base: self.base, size: self.size_bytes });
        }
        Ok(())
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            base: defaults::RAM_BASE,
            size_bytes: defaults::RAM_SIZE,
            latency: defaults::RAM_LATENCY,
            error_windows: Vec::new(),
        }
    }
}
