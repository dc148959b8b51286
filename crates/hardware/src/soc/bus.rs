//! Memory Bus Signals.
//!
//! The bus carries a single outstanding transaction using a request/acknowledge
//! handshake. This module defines:
//! 1. **Requests:** The master-to-slave bundle (`cyc`, `stb`, `we`, address, data, byte select).
//! 2. **Responses:** The slave-to-master bundle (`ack`, `err`, read data).
//! 3. **Bursts:** Cycle-type and burst-wrap tags used by cache refills.
//! 4. **Snooping:** The observer bundle fed to cache snoop ports.

use crate::common::ByteSel;

/// Cycle-type tag of a bus beat.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CycleType {
    /// Single transfer.
    #[default]
    Classic,
    /// Burst at a constant address.
    ConstantBurst,
    /// Burst with an incrementing (wrapping) address.
    IncrementingBurst,
    /// Final beat of a burst.
    EndOfBurst,
}

impl CycleType {
    /// Encoded value on the `cti` lines.
    pub const fn encoding(self) -> u8 {
        match self {
            Self::Classic => 0b000,
            Self::ConstantBurst => 0b001,
            Self::IncrementingBurst => 0b010,
            Self::EndOfBurst => 0b111,
        }
    }
}

/// Address wrap boundary of an incrementing burst.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BurstWrap {
    /// No wrap.
    #[default]
    Linear,
    /// Wrap every 4 beats.
    Wrap4,
    /// Wrap every 8 beats.
    Wrap8,
    /// Wrap every 16 beats.
    Wrap16,
}

impl BurstWrap {
    /// Wrap matching a line of `nwords` words; other sizes burst linearly.
    pub const fn for_words(nwords: usize) -> Self {
        match nwords {
            4 => Self::Wrap4,
            8 => Self::Wrap8,
            16 => Self::Wrap16,
            _ => Self::Linear,
        }
    }

    /// Encoded value on the `bte` lines (`log2(words) - 1`).
    pub const fn encoding(self) -> u8 {
        match self {
            Self::Linear => 0,
            Self::Wrap4 => 1,
            Self::Wrap8 => 2,
            Self::Wrap16 => 3,
        }
    }
}

/// Master-to-slave signals for one cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BusRequest {
    /// Byte address.
    pub addr: u32,
    /// Write data.
    pub dat_w: u32,
    /// Byte lanes written.
    pub sel: ByteSel,
    /// Write enable.
    pub we: bool,
    /// Bus cycle in progress; held for the whole transaction.
    pub cyc: bool,
    /// Valid transfer this cycle.
    pub stb: bool,
    /// Cycle type.
    pub cti: CycleType,
    /// Burst wrap.
    pub bte: BurstWrap,
}

impl BusRequest {
    /// Bus with no transaction.
    pub const IDLE: Self = Self {
        addr: 0,
        dat_w: 0,
        sel: ByteSel::NONE,
        we: false,
        cyc: false,
        stb: false,
        cti: CycleType::Classic,
        bte: BurstWrap::Linear,
    };

    /// Single-word read of `addr`.
    pub const fn read(addr: u32) -> Self {
        Self { addr, sel: ByteSel::ALL, cyc: true, stb: true, ..Self::IDLE }
    }

    /// Single-word write of `data` to the lanes in `sel`.
    pub const fn write(addr: u32, data: u32, sel: ByteSel) -> Self {
        Self { addr, dat_w: data, sel, we: true, cyc: true, stb: true, ..Self::IDLE }
    }

    /// Returns true if a transfer is presented this cycle.
    #[inline]
    pub const fn is_strobed(&self) -> bool {
        self.cyc && self.stb
    }
}

/// Slave-to-master signals for one cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BusResponse {
    /// Read data, meaningful with `ack` on a read.
    pub dat_r: u32,
    /// Transfer completed.
    pub ack: bool,
    /// Transfer failed.
    pub err: bool,
}

impl BusResponse {
    /// No response this cycle.
    pub const NONE: Self = Self { dat_r: 0, ack: false, err: false };

    /// Successful completion carrying `data`.
    pub const fn ack(data: u32) -> Self {
        Self { dat_r: data, ack: true, err: false }
    }

    /// Error completion.
    pub const fn err() -> Self {
        Self { dat_r: 0, ack: false, err: true }
    }

    /// Returns true if the transfer ended this cycle, successfully or not.
    #[inline]
    pub const fn completes(&self) -> bool {
        self.ack || self.err
    }
}

/// What a cache snoop port sees of one bus cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SnoopPort {
    /// Address on the bus.
    pub addr: u32,
    /// Transfer is a write.
    pub we: bool,
    /// A bus cycle is in progress.
    pub valid: bool,
    /// The slave acknowledged this cycle.
    pub ack: bool,
}

impl SnoopPort {
    /// Nothing observed.
    pub const IDLE: Self = Self { addr: 0, we: false, valid: false, ack: false };

    /// Observes a request and its response.
    pub const fn observe(req: &BusRequest, resp: &BusResponse) -> Self {
        Self { addr: req.addr, we: req.we, valid: req.cyc, ack: resp.ack }
    }

    /// Returns true if a write was committed to memory this cycle.
    #[inline]
    pub const fn is_committed_write(&self) -> bool {
        self.we && self.valid && self.ack
    }
}
