// Licensed under the Apache-2.0 license
//
#![no_std]

//! Register definitions for the key store peripheral.
//!
//! Field layouts are shared by the driver and the simulated peripheral.
//! Access goes through [`ks::RegisterBlock`], which is generic over a
//! [`ureg::Mmio`] implementation.

use core::marker::PhantomData;

use tock_registers::fields::FieldValue;
use tock_registers::{LocalRegisterCopy, RegisterLongName};
use ureg::{Mmio, MmioMut};

/// Reference to a single 32-bit register inside a register block.
pub struct RegRef<'a, R: RegisterLongName, TMmio> {
    ptr: *mut u32,
    mmio: &'a TMmio,
    reg: PhantomData<R>,
}

impl<'a, R: RegisterLongName, TMmio: Mmio> RegRef<'a, R, TMmio> {
    fn new(ptr: *mut u32, mmio: &'a TMmio) -> Self {
        Self {
            ptr,
            mmio,
            reg: PhantomData,
        }
    }

    /// Reads the register.
    #[inline(always)]
    pub fn read(&self) -> LocalRegisterCopy<u32, R> {
        LocalRegisterCopy::new(self.get())
    }

    /// Reads the raw register value.
    #[inline(always)]
    pub fn get(&self) -> u32 {
        unsafe { self.mmio.read_volatile(self.ptr) }
    }
}

impl<R: RegisterLongName, TMmio: MmioMut> RegRef<'_, R, TMmio> {
    /// Writes `val`; fields not named in `val` are written as zero.
    #[inline(always)]
    pub fn write(&self, val: FieldValue<u32, R>) {
        self.set(val.value)
    }

    /// Writes the raw register value.
    #[inline(always)]
    pub fn set(&self, raw: u32) {
        unsafe { self.mmio.write_volatile(self.ptr, raw) }
    }

    /// Read-modify-write of the fields named in `val`.
    #[inline(always)]
    pub fn modify(&self, val: FieldValue<u32, R>) {
        self.set(val.modify(self.get()))
    }
}

/// A contiguous array of untyped 32-bit registers.
pub struct RegArray<'a, TMmio, const LEN: usize> {
    ptr: *mut u32,
    mmio: &'a TMmio,
}

impl<'a, TMmio: Mmio, const LEN: usize> RegArray<'a, TMmio, LEN> {
    fn new(ptr: *mut u32, mmio: &'a TMmio) -> Self {
        Self { ptr, mmio }
    }

    /// Reads the first `dst.len()` registers into `dst`.
    ///
    /// # Panics
    ///
    /// Panics if `dst` is longer than the array.
    #[inline(always)]
    pub fn read_into(&self, dst: &mut [u32]) {
        assert!(dst.len() <= LEN);
        unsafe { ureg::read_volatile_slice(self.mmio, dst.as_mut_ptr(), self.ptr, dst.len()) }
    }
}

impl<TMmio: MmioMut, const LEN: usize> RegArray<'_, TMmio, LEN> {
    /// Writes `src` into the first `src.len()` registers.
    ///
    /// # Panics
    ///
    /// Panics if `src` is longer than the array.
    #[inline(always)]
    pub fn write_from(&self, src: &[u32]) {
        assert!(src.len() <= LEN);
        unsafe { ureg::write_volatile_slice(self.mmio, self.ptr, src) }
    }
}

pub mod ks {
    //! Key Store register block.

    use super::{RegArray, RegRef};
    use tock_registers::register_bitfields;
    use ureg::{Mmio, RealMmio, RealMmioMut};

    /// Base address of the key store on the reference part.
    pub const KS_BASE_ADDR: usize = 0x4001_6000;

    /// Number of 32-bit words in the key transfer window.
    pub const KEY_WINDOW_WORDS: usize = 8;

    /// Number of scramble key registers.
    pub const SCMBKEY_WORDS: usize = 4;

    /// Number of OTP key slots.
    pub const OTP_KEY_COUNT: u32 = 8;

    pub mod offsets {
        pub const CTL: u32 = 0x00;
        pub const METADATA: u32 = 0x04;
        pub const STS: u32 = 0x08;
        pub const REMAIN: u32 = 0x0c;
        pub const SCMBKEY: u32 = 0x10;
        pub const KEY: u32 = 0x20;
        pub const OTPSTS: u32 = 0x40;
        pub const REMKCNT: u32 = 0x44;
    }

    register_bitfields! [
        u32,

        /// Control Register Fields
        pub CTL [
            START OFFSET(0) NUMBITS(1) [],
            OPMODE OFFSET(1) NUMBITS(3) [
                READ = 0,
                WRITE = 1,
                ERASE = 2,
                ERASE_ALL = 3,
                REVOKE = 4,
                REMAN = 5,
                LOCK = 7,
            ],
            CONT OFFSET(7) NUMBITS(1) [],
            INIT OFFSET(8) NUMBITS(1) [],
            SILENT OFFSET(10) NUMBITS(1) [],
            SCMB OFFSET(11) NUMBITS(1) [],
            TCLR OFFSET(14) NUMBITS(1) [],
            IEN OFFSET(15) NUMBITS(1) [],
        ],

        /// Metadata Register Fields
        pub METADATA [
            SEC OFFSET(0) NUMBITS(1) [],
            PRIV OFFSET(1) NUMBITS(1) [],
            READABLE OFFSET(2) NUMBITS(1) [],
            RVK OFFSET(3) NUMBITS(1) [],
            BS OFFSET(4) NUMBITS(1) [],
            SIZE OFFSET(8) NUMBITS(5) [],
            OWNER OFFSET(16) NUMBITS(3) [
                AES = 0,
                HMAC = 1,
                RSA_EXP = 2,
                RSA_MID = 3,
                ECC = 4,
                CPU = 5,
            ],
            NUMBER OFFSET(20) NUMBITS(6) [],
            DST OFFSET(30) NUMBITS(2) [
                SRAM = 0,
                FLASH = 1,
                OTP = 2,
            ],
        ],

        /// Status Register Fields
        pub STS [
            IF OFFSET(0) NUMBITS(1) [],
            EIF OFFSET(1) NUMBITS(1) [],
            BUSY OFFSET(2) NUMBITS(1) [],
            SRAMFULL OFFSET(3) NUMBITS(1) [],
            FLASHFULL OFFSET(4) NUMBITS(1) [],
            INITDONE OFFSET(7) NUMBITS(1) [],
            RAMINV OFFSET(8) NUMBITS(1) [],
            KRVKF OFFSET(9) NUMBITS(1) [],
        ],

        /// Remaining Space Register Fields
        pub REMAIN [
            RRMNG OFFSET(0) NUMBITS(13) [],
            FRMNG OFFSET(16) NUMBITS(13) [],
        ],

        /// Remaining Key Count Register Fields
        pub REMKCNT [
            RRMKCNT OFFSET(0) NUMBITS(6) [],
            FRMKCNT OFFSET(16) NUMBITS(6) [],
        ],

        /// OTP Status Register Fields
        pub OTPSTS [
            KEY OFFSET(0) NUMBITS(8) [],
        ],
    ];

    /// Ownership token for the key store peripheral.
    pub struct KsReg {
        _priv: (),
    }

    impl KsReg {
        pub const PTR: *mut u32 = KS_BASE_ADDR as *mut u32;

        /// # Safety
        ///
        /// Caller must ensure that all concurrent use of this
        /// peripheral in the firmware is done so in a compatible
        /// way. The simplest way to enforce this is to only call
        /// this function once.
        pub unsafe fn new() -> Self {
            Self { _priv: () }
        }

        /// Returns a register block that can be used to read
        /// registers from this peripheral, but cannot write.
        pub fn regs(&self) -> RegisterBlock<RealMmio<'_>> {
            unsafe { RegisterBlock::new_with_mmio(Self::PTR, RealMmio::default()) }
        }

        /// Return a register block that can be used to read and
        /// write this peripheral's registers.
        pub fn regs_mut(&mut self) -> RegisterBlock<RealMmioMut<'_>> {
            unsafe { RegisterBlock::new_with_mmio(Self::PTR, RealMmioMut::default()) }
        }

        /// Consumes the token and returns a register block with
        /// write access for the remaining life of the firmware.
        pub fn into_regs(self) -> RegisterBlock<RealMmioMut<'static>> {
            unsafe { RegisterBlock::new_with_mmio(Self::PTR, RealMmioMut::default()) }
        }
    }

    /// Key Store register block
    pub struct RegisterBlock<TMmio> {
        ptr: *mut u32,
        mmio: TMmio,
    }

    impl<TMmio: Mmio> RegisterBlock<TMmio> {
        /// # Safety
        ///
        /// The caller is responsible for ensuring that `ptr` is valid for
        /// volatile reads and writes through `mmio` at each of the offsets in
        /// [`offsets`].
        pub unsafe fn new_with_mmio(ptr: *mut u32, mmio: TMmio) -> Self {
            Self { ptr, mmio }
        }

        /// Returns the MMIO implementation backing this block.
        pub fn mmio(&self) -> &TMmio {
            &self.mmio
        }

        /// Consumes the block and returns the MMIO implementation.
        pub fn into_mmio(self) -> TMmio {
            self.mmio
        }

        fn reg_ptr(&self, offset: u32) -> *mut u32 {
            (self.ptr as *mut u8).wrapping_add(offset as usize) as *mut u32
        }

        /// Control register
        pub fn ctl(&self) -> RegRef<'_, CTL::Register, TMmio> {
            RegRef::new(self.reg_ptr(offsets::CTL), &self.mmio)
        }

        /// Metadata register
        pub fn metadata(&self) -> RegRef<'_, METADATA::Register, TMmio> {
            RegRef::new(self.reg_ptr(offsets::METADATA), &self.mmio)
        }

        /// Status register. Interrupt and error flags are write-1-to-clear.
        pub fn sts(&self) -> RegRef<'_, STS::Register, TMmio> {
            RegRef::new(self.reg_ptr(offsets::STS), &self.mmio)
        }

        /// Remaining space register (read-only)
        pub fn remain(&self) -> RegRef<'_, REMAIN::Register, TMmio> {
            RegRef::new(self.reg_ptr(offsets::REMAIN), &self.mmio)
        }

        /// Key transfer window
        pub fn key(&self) -> RegArray<'_, TMmio, KEY_WINDOW_WORDS> {
            RegArray::new(self.reg_ptr(offsets::KEY), &self.mmio)
        }

        /// OTP key usage status (read-only)
        pub fn otpsts(&self) -> RegRef<'_, OTPSTS::Register, TMmio> {
            RegRef::new(self.reg_ptr(offsets::OTPSTS), &self.mmio)
        }

        /// Remaining key count register (read-only)
        pub fn remkcnt(&self) -> RegRef<'_, REMKCNT::Register, TMmio> {
            RegRef::new(self.reg_ptr(offsets::REMKCNT), &self.mmio)
        }
    }
}
