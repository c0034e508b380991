pub mod hd44780;

/// Trait for querying whether the two-wire bus has finished the last transaction. Some HALs
/// queue I2C writes (DMA or interrupt driven) and return before the bytes are on the wire; for
/// those the driver must wait for the bus to go idle before the next HD44780 instruction.
pub trait BusStatusTrait {
    /// returns `true` once the prior transaction has completed
    fn is_ready(&mut self) -> bool;
}

/// Bus status for `embedded-hal` blocking I2C implementations. A blocking `write` has already
/// completed when it returns, so the bus is always reported ready.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct BlockingBus;

impl BusStatusTrait for BlockingBus {
    fn is_ready(&mut self) -> bool {
        true
    }
}

impl<F> BusStatusTrait for F
where
    F: FnMut() -> bool,
{
    fn is_ready(&mut self) -> bool {
        self()
    }
}
