//! Mock bus slave built with `mockall`.

use mockall::mock;
use rvmem_core::soc::bus::{BusRequest, BusResponse};
use rvmem_core::soc::traits::BusSlave;

mock! {
    pub Slave {}
    impl BusSlave for Slave {
        fn name(&self) -> &str;
        fn respond(&self, req: &BusRequest) -> BusResponse;
        fn clock(&mut self, req: &BusRequest);
    }
}

/// A slave that accepts any number of clock edges and answers through `respond`.
pub fn slave_with<F>(respond: F) -> MockSlave
where
    F: Fn(&BusRequest) -> BusResponse + Send + 'static,
{
    let mut slave = MockSlave::new();
    let _ = slave.expect_respond().returning(move |req| respond(req));
    let _ = slave.expect_clock().return_const(());
    slave
}
