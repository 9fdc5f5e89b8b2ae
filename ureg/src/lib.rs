// Licensed under the Apache-2.0 license

//! Minimal memory-mapped I/O access layer.
//!
//! Register blocks are generic over an [`Mmio`] implementation so the same
//! driver code can run against real hardware ([`RealMmio`] /
//! [`RealMmioMut`]) or against a simulated peripheral on the host.

#![no_std]

use core::marker::PhantomData;

/// Unsigned integer types that can be moved over the bus.
pub trait Uint: Clone + Copy + Default + Eq + PartialEq + Sized {
    const TYPE: UintType;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UintType {
    U8,
    U16,
    U32,
}

impl Uint for u8 {
    const TYPE: UintType = UintType::U8;
}
impl Uint for u16 {
    const TYPE: UintType = UintType::U16;
}
impl Uint for u32 {
    const TYPE: UintType = UintType::U32;
}

/// Read access to memory-mapped registers.
pub trait Mmio: Sized {
    /// Loads from address `src`.
    ///
    /// # Safety
    ///
    /// Implementations that dereference `src` require it to be valid for a
    /// volatile read of `T`.
    unsafe fn read_volatile<T: Clone + Copy + Sized>(&self, src: *const T) -> T;
}

/// Write access to memory-mapped registers.
pub trait MmioMut: Mmio {
    /// Stores `src` to address `dst`.
    ///
    /// # Safety
    ///
    /// Implementations that dereference `dst` require it to be valid for a
    /// volatile write of `T`.
    unsafe fn write_volatile<T: Clone + Copy>(&self, dst: *mut T, src: T);
}

impl<TMmio: Mmio> Mmio for &TMmio {
    #[inline(always)]
    unsafe fn read_volatile<T: Clone + Copy + Sized>(&self, src: *const T) -> T {
        (**self).read_volatile(src)
    }
}

impl<TMmio: MmioMut> MmioMut for &TMmio {
    #[inline(always)]
    unsafe fn write_volatile<T: Clone + Copy>(&self, dst: *mut T, src: T) {
        (**self).write_volatile(dst, src)
    }
}

/// Read-only access to real hardware.
#[derive(Clone, Copy, Default)]
pub struct RealMmio<'a>(PhantomData<&'a ()>);

impl Mmio for RealMmio<'_> {
    #[inline(always)]
    unsafe fn read_volatile<T: Clone + Copy + Sized>(&self, src: *const T) -> T {
        core::ptr::read_volatile(src)
    }
}

/// Read-write access to real hardware.
///
/// The lifetime ties the accessor to the exclusive borrow of whatever
/// token granted access to the peripheral.
#[derive(Default)]
pub struct RealMmioMut<'a>(PhantomData<&'a mut ()>);

impl Mmio for RealMmioMut<'_> {
    #[inline(always)]
    unsafe fn read_volatile<T: Clone + Copy + Sized>(&self, src: *const T) -> T {
        core::ptr::read_volatile(src)
    }
}

impl MmioMut for RealMmioMut<'_> {
    #[inline(always)]
    unsafe fn write_volatile<T: Clone + Copy>(&self, dst: *mut T, src: T) {
        core::ptr::write_volatile(dst, src)
    }
}

/// Copies `len` values from `src` into `dst` with volatile loads.
///
/// # Safety
///
/// `dst` must be valid for `len` writes and `src` for `len` reads through
/// `mmio`.
#[inline(always)]
pub unsafe fn read_volatile_slice<T: Uint, TMmio: Mmio>(
    mmio: &TMmio,
    dst: *mut T,
    src: *const T,
    len: usize,
) {
    for i in 0..len {
        dst.add(i).write(mmio.read_volatile(src.wrapping_add(i)));
    }
}

/// Copies the values of `src` into `dst` with volatile stores.
///
/// # Safety
///
/// `dst` must be valid for `src.len()` writes through `mmio`.
#[inline(always)]
pub unsafe fn write_volatile_slice<T: Uint, TMmio: MmioMut>(mmio: &TMmio, dst: *mut T, src: &[T]) {
    for (i, val) in src.iter().enumerate() {
        mmio.write_volatile(dst.wrapping_add(i), *val);
    }
}
