// Licensed under the Apache-2.0 license

use std::cell::RefCell;

use ks_emu_types::AccessSize;

use crate::Bus;

const fn access_size<T>() -> AccessSize {
    match core::mem::size_of::<T>() {
        1 => AccessSize::Byte,
        2 => AccessSize::HalfWord,
        4 => AccessSize::Word,
        _other => panic!("Unsupported access size"),
    }
}

unsafe fn transmute_to_u32<T>(src: &T) -> u32 {
    match std::mem::size_of::<T>() {
        1 => std::mem::transmute_copy::<T, u8>(src).into(),
        2 => std::mem::transmute_copy::<T, u16>(src).into(),
        4 => std::mem::transmute_copy::<T, u32>(src),
        _ => panic!("Unsupported write size"),
    }
}

/// An MMIO implementation that forwards register accesses to a [`Bus`], so
/// that drivers written against `ureg` can run on the host against a
/// simulated peripheral.
pub struct BusMmio<TBus: Bus> {
    bus: RefCell<TBus>,
}
impl<TBus: Bus> BusMmio<TBus> {
    pub fn new(bus: TBus) -> Self {
        Self {
            bus: RefCell::new(bus),
        }
    }

    /// Runs `f` with exclusive access to the underlying bus.
    pub fn with_bus<R>(&self, f: impl FnOnce(&mut TBus) -> R) -> R {
        f(&mut self.bus.borrow_mut())
    }

    pub fn into_inner(self) -> TBus {
        self.bus.into_inner()
    }
}
impl<TBus: Bus> ureg::Mmio for BusMmio<TBus> {
    /// Loads from address `src` on the bus and returns the value.
    ///
    /// # Panics
    ///
    /// This function panics if the bus faults.
    ///
    /// # Safety
    ///
    /// The pointer is never dereferenced, only used as a bus address.
    unsafe fn read_volatile<T: Clone + Copy + Sized>(&self, src: *const T) -> T {
        let addr = src as usize as u32;
        let val_u32 = match self.bus.borrow_mut().read(access_size::<T>(), addr) {
            Ok(val) => val,
            Err(err) => panic!("Bus read of {addr:#x} faulted: {err:?}"),
        };
        match std::mem::size_of::<T>() {
            1 => std::mem::transmute_copy::<u8, T>(&(val_u32 as u8)),
            2 => std::mem::transmute_copy::<u16, T>(&(val_u32 as u16)),
            4 => std::mem::transmute_copy::<u32, T>(&val_u32),
            _ => panic!("Unsupported read size"),
        }
    }
}

impl<TBus: Bus> ureg::MmioMut for BusMmio<TBus> {
    /// Stores `src` to address `dst` on the bus.
    ///
    /// # Panics
    ///
    /// This function panics if the bus faults.
    ///
    /// # Safety
    ///
    /// The pointer is never dereferenced, only used as a bus address.
    unsafe fn write_volatile<T: Clone + Copy>(&self, dst: *mut T, src: T) {
        let addr = dst as usize as u32;
        if let Err(err) =
            self.bus
                .borrow_mut()
                .write(access_size::<T>(), addr, transmute_to_u32(&src))
        {
            panic!("Bus write of {addr:#x} faulted: {err:?}");
        }
    }
}
