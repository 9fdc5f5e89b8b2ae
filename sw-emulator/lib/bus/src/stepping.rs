/*++

Licensed under the Apache-2.0 license.

File Name:

    stepping.rs

Abstract:

    File contains a Bus wrapper that advances a clock on every access.

--*/

use ks_emu_types::{AccessSize, BusAddr, BusData};

use crate::{Bus, BusError, Clock};

/// Wraps a peripheral so that each bus access costs `ticks_per_access`
/// clock cycles, and timer actions that fire are delivered to the
/// peripheral before the access is performed.
///
/// Driver code polling a status register through [`crate::BusMmio`] then
/// observes time passing the same way it would on a stepping CPU.
pub struct SteppingBus<TBus: Bus> {
    clock: Clock,
    bus: TBus,
    ticks_per_access: u64,
}

impl<TBus: Bus> SteppingBus<TBus> {
    pub fn new(clock: Clock, bus: TBus) -> Self {
        Self::with_ticks_per_access(clock, bus, 1)
    }

    pub fn with_ticks_per_access(clock: Clock, bus: TBus, ticks_per_access: u64) -> Self {
        Self {
            clock,
            bus,
            ticks_per_access,
        }
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn bus(&mut self) -> &mut TBus {
        &mut self.bus
    }

    /// Advances the clock without a bus access.
    pub fn step(&mut self, ticks: u64) {
        self.clock
            .increment_and_process_timer_actions(ticks, &mut self.bus);
    }
}

impl<TBus: Bus> Bus for SteppingBus<TBus> {
    fn read(&mut self, size: AccessSize, addr: BusAddr) -> Result<BusData, BusError> {
        self.step(self.ticks_per_access);
        self.bus.read(size, addr)
    }

    fn write(&mut self, size: AccessSize, addr: BusAddr, val: BusData) -> Result<(), BusError> {
        self.step(self.ticks_per_access);
        self.bus.write(size, addr, val)
    }

    fn poll(&mut self) {
        self.bus.poll()
    }

    fn warm_reset(&mut self) {
        self.bus.warm_reset()
    }
}
