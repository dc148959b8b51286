//! Fixed-Priority Bus Arbiter.
//!
//! Multiplexes several request ports onto one single-transaction bus. The
//! arbiter provides:
//! 1. **Registration:** Ports are added with a numeric priority (lower wins).
//! 2. **Grant Latch:** The winner is sampled only while the bus is idle and
//!    takes the bus the following cycle.
//! 3. **No Pre-emption:** The owner keeps the bus until it drops `cyc`, even if
//!    a higher-priority port starts requesting.
//! 4. **Routing:** Request signals of the owner are passed to the bus, and the
//!    response is returned to the owner only.

use tracing::debug;

use crate::common::{ArbiterError, first_match};
use crate::soc::bus::{BusRequest, BusResponse};

/// Handle of a registered port; indexes the request slice in registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortId(usize);

impl PortId {
    /// Position of the port's request in the slices passed to the arbiter.
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// The grant latch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Grant {
    /// No port owns the bus.
    #[default]
    Idle,
    /// The port owns the bus.
    Owner(PortId),
}

/// Computes the next grant from the current one and this cycle's requests.
///
/// # Arguments
///
/// * `grant` - Current latch value.
/// * `requests` - Port requests, indexed by [`PortId::index`].
/// * `order` - Ports sorted from highest to lowest priority.
///
/// # Returns
///
/// The current grant while its owner holds `cyc`, otherwise the
/// highest-priority port asserting `cyc`, or `Grant::Idle`.
pub fn transition(grant: Grant, requests: &[BusRequest], order: &[PortId]) -> Grant {
    let cyc = |port: PortId| requests.get(port.index()).is_some_and(|r| r.cyc);

    if let Grant::Owner(owner) = grant
        && cyc(owner)
    {
        return grant;
    }

    let rules: Vec<(bool, Grant)> = order.iter().map(|&p| (cyc(p), Grant::Owner(p))).collect();
    first_match(&rules, Grant::Idle)
}

/// Fixed-priority arbiter over N request ports.
#[derive(Clone, Debug, Default)]
pub struct Arbiter {
    priorities: Vec<u32>,
    order: Vec<PortId>,
    grant: Grant,
}

impl Arbiter {
    /// Creates an arbiter with no ports.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a port.
    ///
    /// # Arguments
    ///
    /// * `priority` - Arbitration priority; 0 is the highest.
    ///
    /// # Returns
    ///
    /// The port handle, or `ArbiterError::DuplicatePriority` if another port
    /// already uses `priority`.
    pub fn add_port(&mut self, priority: u32) -> Result<PortId, ArbiterError> {
        if self.priorities.contains(&priority) {
            return Err(ArbiterError::DuplicatePriority(priority));
        }
        let port = PortId(self.priorities.len());
        self.priorities.push(priority);
        self.order.push(port);
        let priorities = &self.priorities;
        self.order.sort_by_key(|p| priorities[p.index()]);
        Ok(port)
    }

    /// Number of registered ports.
    pub fn port_count(&self) -> usize {
        self.priorities.len()
    }

    /// Current grant latch.
    #[inline]
    pub const fn grant(&self) -> Grant {
        self.grant
    }

    /// Port that currently owns the bus.
    pub const fn owner(&self) -> Option<PortId> {
        match self.grant {
            Grant::Idle => None,
            Grant::Owner(port) => Some(port),
        }
    }

    /// Returns true if the bus is between transactions.
    pub fn is_idle(&self, requests: &[BusRequest]) -> bool {
        !self.bus_request(requests).cyc
    }

    /// The shared-bus request: the owner's signals, or an idle bus.
    pub fn bus_request(&self, requests: &[BusRequest]) -> BusRequest {
        self.owner()
            .and_then(|p| requests.get(p.index()).copied())
            .unwrap_or(BusRequest::IDLE)
    }

    /// The response seen by `port`: the bus response if it owns the bus, else nothing.
    pub fn response_for(&self, port: PortId, response: BusResponse) -> BusResponse {
        if self.owner() == Some(port) { response } else { BusResponse::NONE }
    }

    /// Grant for the next cycle.
    pub fn next_grant(&self, requests: &[BusRequest]) -> Grant {
        transition(self.grant, requests, &self.order)
    }

    /// Latches `grant` at the clock edge.
    pub fn commit(&mut self, grant: Grant) {
        if grant != self.grant {
            debug!(from = ?self.grant, to = ?grant, "arbiter grant changed");
        }
        self.grant = grant;
    }

    /// Advances one cycle and returns the next grant.
    pub fn tick(&mut self, requests: &[BusRequest]) -> Grant {
        let next = self.next_grant(requests);
        self.commit(next);
        next
    }
}
