//! Simulation statistics collection and reporting.
//!
//! This module tracks performance metrics for the memory hierarchy. It provides:
//! 1. **Cycles and Operations:** Total cycles and completed trace operations.
//! 2. **Caches:** Accesses, misses, refill outcomes and snoop activity per cache.
//! 3. **Bus:** Transactions, error responses and busy cycles on the shared bus.
//! 4. **Store Buffer:** Entries enqueued and drained.
//! 5. **Stalls:** Fetch-side and data-side stall cycles.

use serde::Serialize;

/// Counters kept by one cache controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Accesses entering the address phase.
    pub accesses: u64,
    /// Valid accesses that missed with no refill outstanding.
    pub misses: u64,
    /// CPU stores merged into a hit line.
    pub store_hits: u64,
    /// Refills started.
    pub refills_started: u64,
    /// Refills whose last beat was acknowledged.
    pub refills_completed: u64,
    /// Refills ended by a bus error.
    pub refill_errors: u64,
    /// Refills ended by flush, kill or a snooped write.
    pub refills_aborted: u64,
    /// Lines invalidated by snooped peer writes.
    pub snoop_invalidations: u64,
    /// Committed writes recognized as the cache's own.
    pub self_snoops_suppressed: u64,
}

impl CacheStats {
    /// Fraction of accesses that hit, or 0 with no accesses.
    pub fn hit_rate(&self) -> f64 {
        if self.accesses == 0 {
            return 0.0;
        }
        self.accesses.saturating_sub(self.misses) as f64 / self.accesses as f64
    }
}

/// Shared-bus counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BusStats {
    /// Transfers acknowledged.
    pub acks: u64,
    /// Transfers answered with an error.
    pub errors: u64,
    /// Cycles with a bus cycle in progress.
    pub busy_cycles: u64,
    /// Acknowledged transfers requested by the data port.
    pub data_port_transfers: u64,
    /// Acknowledged transfers requested by the instruction port.
    pub instruction_port_transfers: u64,
}

/// Store-buffer counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StoreBufferStats {
    /// Stores accepted into the buffer.
    pub enqueued: u64,
    /// Entries written to memory.
    pub drained: u64,
    /// Entries whose write ended in a bus error.
    pub drain_errors: u64,
}

/// Statistics of a whole run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct MemStats {
    /// Cycles simulated.
    pub cycles: u64,
    /// Trace operations completed.
    pub ops_completed: u64,
    /// Instruction cache counters.
    pub icache: CacheStats,
    /// Data cache counters.
    pub dcache: CacheStats,
    /// Shared-bus counters.
    pub bus: BusStats,
    /// Store-buffer counters.
    pub store_buffer: StoreBufferStats,
    /// Cycles the fetch stage was stalled.
    pub stalls_fetch: u64,
    /// Cycles the execute or memory stage was stalled.
    pub stalls_data: u64,
}

/// Section names for selective stats output.
///
/// Valid section identifiers: `"summary"`, `"cache"`, `"bus"`.
/// Pass an empty slice to `print_sections` to print all sections.
pub const STATS_SECTIONS: &[&str] = &["summary", "cache", "bus"];

impl MemStats {
    /// Prints only the requested statistics sections to stdout.
    ///
    /// # Arguments
    ///
    /// * `sections` - Slice of section names to print, or empty for all.
    pub fn print_sections(&self, sections: &[String]) {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);
        let cyc = self.cycles.max(1) as f64;

        println!("\n==========================================================");
        println!("MEMORY HIERARCHY SIMULATION STATISTICS");
        println!("==========================================================");
        if want("summary") {
            println!("sim_cycles               {}", self.cycles);
            println!("sim_ops                  {}", self.ops_completed);
            println!(
                "stall.fetch              {} ({:.2}%)",
                self.stalls_fetch,
                self.stalls_fetch as f64 / cyc * 100.0
            );
            println!(
                "stall.data               {} ({:.2}%)",
                self.stalls_data,
                self.stalls_data as f64 / cyc * 100.0
            );
            println!("----------------------------------------------------------");
        }
        if want("cache") {
            let print_cache = |name: &str, s: &CacheStats| {
                println!(
                    "  {:<6} accesses: {:<10} | misses: {:<10} | hit_rate: {:.2}%",
                    name,
                    s.accesses,
                    s.misses,
                    s.hit_rate() * 100.0
                );
                println!(
                    "         refills: {:<11} | errors: {:<10} | aborted: {}",
                    s.refills_completed, s.refill_errors, s.refills_aborted
                );
                println!(
                    "         snoop_inval: {:<7} | self_snoops: {:<5} | store_hits: {}",
                    s.snoop_invalidations, s.self_snoops_suppressed, s.store_hits
                );
            };
            println!("CACHES");
            print_cache("L1-I", &self.icache);
            print_cache("L1-D", &self.dcache);
            println!("----------------------------------------------------------");
        }
        if want("bus") {
            println!("BUS");
            println!("  bus.acks               {}", self.bus.acks);
            println!("  bus.errors             {}", self.bus.errors);
            println!(
                "  bus.busy               {} ({:.2}%)",
                self.bus.busy_cycles,
                self.bus.busy_cycles as f64 / cyc * 100.0
            );
            println!("  bus.dport              {}", self.bus.data_port_transfers);
            println!("  bus.iport              {}", self.bus.instruction_port_transfers);
            println!("  sb.enqueued            {}", self.store_buffer.enqueued);
            println!("  sb.drained             {}", self.store_buffer.drained);
            println!("  sb.errors              {}", self.store_buffer.drain_errors);
        }
        println!("==========================================================");
    }

    /// Prints all statistics sections to stdout.
    ///
    /// Equivalent to `print_sections(&[])`.
    pub fn print(&self) {
        self.print_sections(&[]);
    }
}
