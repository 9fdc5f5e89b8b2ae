/*++

Licensed under the Apache-2.0 license.

File Name:

    bus.rs

Abstract:

    File contains definition of the Bus trait.

--*/

use ks_emu_types::{AccessSize, BusAddr, BusData};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BusError {
    /// Load address misaligned
    LoadAddrMisaligned,

    /// Load access fault
    LoadAccessFault,

    /// Store address misaligned
    StoreAddrMisaligned,

    /// Store access fault
    StoreAccessFault,
}

/// Represents an abstract memory bus. Used to read and write peripheral
/// registers.
pub trait Bus {
    /// Read data of specified size from given address
    ///
    /// # Arguments
    ///
    /// * `size` - Size of the read
    /// * `addr` - Address to read from
    ///
    /// # Error
    ///
    /// * `BusError::LoadAccessFault` or `BusError::LoadAddrMisaligned`
    fn read(&mut self, size: AccessSize, addr: BusAddr) -> Result<BusData, BusError>;

    /// Write data of specified size to given address
    ///
    /// # Arguments
    ///
    /// * `size` - Size of the write
    /// * `addr` - Address to write
    /// * `val` - Data to write
    ///
    /// # Error
    ///
    /// * `BusError::StoreAccessFault` or `BusError::StoreAddrMisaligned`
    fn write(&mut self, size: AccessSize, addr: BusAddr, val: BusData) -> Result<(), BusError>;

    /// Called by the clock when a timer action scheduled with
    /// [`crate::Timer::schedule_poll_in`] fires.
    fn poll(&mut self) {
        // By default, do nothing
    }

    /// Called on a warm reset. Volatile state is lost.
    fn warm_reset(&mut self) {
        // By default, do nothing
    }
}

impl<TBus: Bus + ?Sized> Bus for Box<TBus> {
    #[inline(always)]
    fn read(&mut self, size: AccessSize, addr: BusAddr) -> Result<BusData, BusError> {
        TBus::read(self, size, addr)
    }

    #[inline(always)]
    fn write(&mut self, size: AccessSize, addr: BusAddr, val: BusData) -> Result<(), BusError> {
        TBus::write(self, size, addr, val)
    }

    #[inline(always)]
    fn poll(&mut self) {
        TBus::poll(self)
    }

    #[inline(always)]
    fn warm_reset(&mut self) {
        TBus::warm_reset(self)
    }
}
