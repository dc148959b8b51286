//! Main Memory Model.
//!
//! This module implements the RAM slave on the shared bus. It provides:
//! 1. **Storage:** Little-endian 32-bit words mapped at a base address.
//! 2. **Wait States:** Each strobed transfer waits `latency` cycles, then
//!    acknowledges for one cycle.
//! 3. **Byte Lanes:** Writes update only the lanes named by the byte select.
//! 4. **Faults:** Addresses outside the backing store or inside a configured
//!    error window answer with `err`.

use tracing::{trace, warn};

use crate::common::ConfigError;
use crate::config::{ErrorWindow, MemoryConfig};
use crate::soc::bus::{BusRequest, BusResponse};
use crate::soc::traits::BusSlave;

/// Word-addressed RAM with wait states and error windows.
#[derive(Clone, Debug)]
pub struct Memory {
    base: u32,
    words: Vec<u32>,
    latency: u32,
    error_windows: Vec<ErrorWindow>,
    /// Cycles the current transfer has waited.
    waited: u32,
}

impl Memory {
    /// Creates a zero-filled memory.
    ///
    /// # Arguments
    ///
    /// * `config` - Base, size, latency and error windows.
    ///
    /// # Returns
    ///
    /// The memory, or the validation error for `config`.
    pub fn new(config: &MemoryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            base: config.base,
            words: vec![0; config.size_bytes / 4],
            latency: config.latency,
            error_windows: config.error_windows.clone(),
            waited: 0,
        })
    }

    /// Base address.
    pub const fn base(&self) -> u32 {
        self.base
    }

    /// Size in bytes.
    pub fn size_bytes(&self) -> usize {
        self.words.len() * 4
    }

    fn index(&self, addr: u32) -> Option<usize> {
        if self.error_windows.iter().any(|w| w.contains(addr)) {
            return None;
        }
        let offset = addr.checked_sub(self.base)? as usize / 4;
        (offset < self.words.len()).then_some(offset)
    }

    /// Reads the word containing `addr` directly, ignoring wait states and error windows.
    pub fn peek(&self, addr: u32) -> Option<u32> {
        let offset = addr.checked_sub(self.base)? as usize / 4;
        self.words.get(offset).copied()
    }

    /// Writes the word containing `addr` directly. Returns false if out of range.
    pub fn poke(&mut self, addr: u32, value: u32) -> bool {
        let Some(offset) = addr.checked_sub(self.base).map(|o| o as usize / 4) else {
            return false;
        };
        match self.words.get_mut(offset) {
            Some(word) => {
                *word = value;
                true
            }
            None => false,
        }
    }

    /// Copies `words` into memory starting at `addr`.
    ///
    /// Words that fall outside the backing store are skipped and reported
    /// with a warning.
    ///
    /// # Returns
    ///
    /// The number of words stored.
    pub fn load(&mut self, addr: u32, words: &[u32]) -> usize {
        let stored = words
            .iter()
            .enumerate()
            .filter(|&(i, &w)| self.poke(addr.wrapping_add(4 * i as u32), w))
            .count();
        if stored < words.len() {
            warn!(
                addr = format_args!("{addr:#010x}"),
                skipped = words.len() - stored,
                "load outside backing store"
            );
        }
        stored
    }

    const fn ready(&self) -> bool {
        self.waited >= self.latency
    }
}

impl BusSlave for Memory {
    fn name(&self) -> &str {
        "RAM"
    }

    fn respond(&self, req: &BusRequest) -> BusResponse {
        if !req.is_strobed() || !self.ready() {
            return BusResponse::NONE;
        }
        match self.index(req.addr) {
            None => BusResponse::err(),
            Some(_) if req.we => BusResponse::ack(0),
            Some(i) => BusResponse::ack(self.words[i]),
        }
    }

    fn clock(&mut self, req: &BusRequest) {
        if !req.is_strobed() {
            self.waited = 0;
            return;
        }
        if !self.ready() {
            self.waited += 1;
            return;
        }
        self.waited = 0;
        if req.we
            && let Some(i) = self.index(req.addr)
        {
            let old = self.words[i];
            self.words[i] = req.sel.merge(old, req.dat_w);
            trace!(addr = format_args!("{:#010x}", req.addr), old, new = self.words[i], "ram write");
        }
    }
}
