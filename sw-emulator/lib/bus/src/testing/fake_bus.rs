/*++

Licensed under the Apache-2.0 license.

File Name:

    fake_bus.rs

Abstract:

    File contains a fake implementation of the Bus trait that records
    every call it receives.

--*/
use ks_emu_types::{AccessSize, BusAddr, BusData};

use crate::{testing::Log, Bus, BusError};
use std::fmt::Write;

/// A Bus implementation that logs all calls, and allows the user to override
/// the return value of reads and writes.
///
/// # Example
///
/// ```
/// use ks_emu_bus::{Bus, testing::FakeBus};
/// use ks_emu_types::AccessSize;
///
/// let mut fake_bus = FakeBus::new();
/// fake_bus.read_result = Ok(35);
/// assert_eq!(fake_bus.read(AccessSize::HalfWord, 0x4001_6008), Ok(35));
/// assert_eq!("read(AccessSize::HalfWord, 0x40016008)\n", fake_bus.log.take());
/// ```
pub struct FakeBus {
    pub log: Log,
    pub read_result: Result<BusData, BusError>,
    pub write_result: Result<(), BusError>,
}
impl FakeBus {
    pub fn new() -> Self {
        Self {
            log: Log::new(),
            read_result: Ok(0),
            write_result: Ok(()),
        }
    }
}
impl Default for FakeBus {
    fn default() -> Self {
        Self::new()
    }
}
impl Bus for FakeBus {
    fn read(&mut self, size: AccessSize, addr: BusAddr) -> Result<BusData, BusError> {
        let _ = writeln!(self.log.w(), "read(AccessSize::{size:?}, {addr:#x})");
        self.read_result
    }

    fn write(&mut self, size: AccessSize, addr: BusAddr, val: BusData) -> Result<(), BusError> {
        let _ = writeln!(self.log.w(), "write(AccessSize::{size:?}, {addr:#x}, {val:#x})");
        self.write_result
    }

    fn poll(&mut self) {
        let _ = writeln!(self.log.w(), "poll()");
    }

    fn warm_reset(&mut self) {
        let _ = writeln!(self.log.w(), "warm_reset()");
    }
}
