/*++

Licensed under the Apache-2.0 license.

File Name:

    key_store.rs

Abstract:

    File contains API for the Key Store: writing, reading, erasing, locking
    and revoking keys held by the key store hardware.

--*/

use crate::metadata::{KsMemType, KsMetadata, OtpKeyId, MAX_KEY_INDEX};
use crate::printer::HexWord;
use crate::wait::{self, SpinTimeout, TimeoutPolicy};
use crate::{cprintln, KsError, KsResult};
use ks_registers::ks::{self, KsReg, CTL, KEY_WINDOW_WORDS, METADATA, OTPSTS, REMAIN, REMKCNT, STS};
use tock_registers::fields::FieldValue;
use ureg::{MmioMut, RealMmioMut};

bitflags::bitflags! {
    /// Key store access mode bits, at their control register positions.
    pub struct KsMode: u32 {
        /// Keys are delivered to the crypto engines without passing
        /// through software-visible registers
        const SILENT = 1 << 10;

        /// Key storage is scrambled with the scramble key
        const SCRAMBLE = 1 << 11;
    }
}

/// Whether a transaction carries the configured mode bits.
#[derive(Clone, Copy, PartialEq, Eq)]
enum ModeBits {
    Preserve,
    Clear,
}

/// Direction of data through the key window for a chunked transfer.
enum ChunkIo<'a> {
    Read(&'a mut [u32]),
    Write(&'a [u32]),
}

impl ChunkIo<'_> {
    fn len(&self) -> usize {
        match self {
            ChunkIo::Read(dst) => dst.len(),
            ChunkIo::Write(src) => src.len(),
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "emu")] {
        fn trace_start(ctl: u32, meta: u32) {
            cprintln!("[ks] start CTL={} METADATA={}", HexWord(ctl), HexWord(meta));
        }
    } else {
        fn trace_start(_ctl: u32, _meta: u32) {}
    }
}

/// Key Store
pub struct KeyStore<TMmio: MmioMut = RealMmioMut<'static>, TPolicy: TimeoutPolicy = SpinTimeout> {
    regs: ks::RegisterBlock<TMmio>,
    timeout: TPolicy,
}

impl KeyStore {
    /// Create a key store driver for the peripheral at its fixed address
    ///
    /// # Arguments
    ///
    /// * `ks` - Key store peripheral token
    pub fn new(ks: KsReg) -> Self {
        Self::with_regs(ks.into_regs(), SpinTimeout::default())
    }
}

impl<TMmio: MmioMut, TPolicy: TimeoutPolicy> KeyStore<TMmio, TPolicy> {
    /// Create a key store driver over an arbitrary register block
    ///
    /// # Arguments
    ///
    /// * `regs` - Key store register block
    /// * `timeout` - Budget applied to every bounded wait
    pub fn with_regs(regs: ks::RegisterBlock<TMmio>, timeout: TPolicy) -> Self {
        Self { regs, timeout }
    }

    /// Register block backing this driver.
    pub fn regs(&self) -> &ks::RegisterBlock<TMmio> {
        &self.regs
    }

    /// Initialize the key store
    ///
    /// Starts the initialization sequence if the hardware has not completed
    /// it yet, then waits for the key store to become idle. Calling this on
    /// an initialized key store only waits for idle.
    pub fn open(&mut self) -> KsResult<()> {
        if !self.regs.sts().read().is_set(STS::INITDONE) {
            self.wait_idle(KsError::DRIVER_KS_READY_TIMEOUT)?;

            self.regs.ctl().write(CTL::INIT::SET + CTL::START::SET);

            let regs = &self.regs;
            if !wait::until(&mut self.timeout, || {
                regs.sts().read().is_set(STS::INITDONE)
            }) {
                cprintln!("[ks] Timed out waiting for init");
                Err(KsError::DRIVER_KS_INIT_TIMEOUT)?
            }
        }

        self.wait_idle(KsError::DRIVER_KS_READY_TIMEOUT)
    }

    /// Read a key
    ///
    /// # Arguments
    ///
    /// * `mem` - Memory holding the key
    /// * `index` - Key index
    /// * `key` - Destination; its length is the number of words read
    ///
    /// On a timeout or failure `key` may hold a partial copy.
    pub fn read(&mut self, mem: KsMemType, index: u32, key: &mut [u32]) -> KsResult<()> {
        self.ensure_idle()?;
        check_index(mem, index)?;
        if key.is_empty() {
            Err(KsError::DRIVER_KS_EMPTY_KEY_BUFFER)?
        }

        self.regs
            .metadata()
            .set(KsMetadata::address(mem, index).into());

        self.transfer(
            CTL::OPMODE::READ,
            ChunkIo::Read(key),
            KsError::DRIVER_KS_READ_FAILURE,
        )
    }

    /// Write a key
    ///
    /// # Arguments
    ///
    /// * `mem` - Memory to store the key in
    /// * `meta` - Key metadata; its size class sets the number of words written
    /// * `key` - Key words
    ///
    /// # Returns
    ///
    /// * `u32` - Index the key store assigned to the key
    pub fn write(&mut self, mem: KsMemType, meta: KsMetadata, key: &[u32]) -> KsResult<u32> {
        self.ensure_idle()?;

        let words = meta.word_count();
        if words == 0 {
            Err(KsError::DRIVER_KS_INVALID_KEY_SIZE)?
        }
        if mem == KsMemType::Otp {
            if words > KEY_WINDOW_WORDS {
                Err(KsError::DRIVER_KS_OTP_KEY_TOO_LARGE)?
            }
            OtpKeyId::try_from(meta.number())?;
        }
        let key = key
            .get(..words)
            .ok_or(KsError::DRIVER_KS_KEY_BUFFER_TOO_SMALL)?;

        self.regs.metadata().set(meta.with_mem_type(mem).into());

        self.transfer(
            CTL::OPMODE::WRITE,
            ChunkIo::Write(key),
            KsError::DRIVER_KS_WRITE_FAILURE,
        )?;

        Ok(self.regs.metadata().read().read(METADATA::NUMBER))
    }

    /// Write a key to OTP
    ///
    /// # Arguments
    ///
    /// * `id` - OTP slot
    /// * `meta` - Key metadata; keys above 256 bits are rejected
    /// * `key` - Key words
    ///
    /// # Returns
    ///
    /// * `u32` - Index of the written slot
    pub fn write_otp(&mut self, id: OtpKeyId, meta: KsMetadata, key: &[u32]) -> KsResult<u32> {
        self.ensure_idle()?;

        if !meta.size().is_some_and(|size| size.fits_otp()) {
            Err(KsError::DRIVER_KS_OTP_KEY_TOO_LARGE)?
        }
        let key = key
            .get(..meta.word_count())
            .ok_or(KsError::DRIVER_KS_KEY_BUFFER_TOO_SMALL)?;

        self.regs.metadata().set(
            meta.with_mem_type(KsMemType::Otp)
                .with_number(id.into())
                .into(),
        );

        self.transfer(
            CTL::OPMODE::WRITE,
            ChunkIo::Write(key),
            KsError::DRIVER_KS_OTP_WRITE_FAILURE,
        )?;

        Ok(id.into())
    }

    /// Erase an SRAM key
    ///
    /// # Arguments
    ///
    /// * `index` - Key index
    pub fn erase_key(&mut self, index: u32) -> KsResult<()> {
        check_index(KsMemType::Sram, index)?;
        self.single(
            KsMetadata::address(KsMemType::Sram, index),
            CTL::OPMODE::ERASE,
            ModeBits::Preserve,
            KsError::DRIVER_KS_ERASE_FAILURE,
        )
    }

    /// Erase an OTP key
    ///
    /// # Arguments
    ///
    /// * `id` - OTP slot
    pub fn erase_otp_key(&mut self, id: OtpKeyId) -> KsResult<()> {
        self.single(
            KsMetadata::address(KsMemType::Otp, id.into()),
            CTL::OPMODE::ERASE,
            ModeBits::Clear,
            KsError::DRIVER_KS_OTP_ERASE_FAILURE,
        )
    }

    /// Erase every key in `mem`
    ///
    /// # Arguments
    ///
    /// * `mem` - Memory to erase
    pub fn erase_all(&mut self, mem: KsMemType) -> KsResult<()> {
        self.single(
            KsMetadata::default().with_mem_type(mem),
            CTL::OPMODE::ERASE_ALL,
            ModeBits::Preserve,
            KsError::DRIVER_KS_ERASE_ALL_FAILURE,
        )
    }

    /// Lock an OTP key. Locking cannot be undone.
    ///
    /// # Arguments
    ///
    /// * `id` - OTP slot
    pub fn lock_otp_key(&mut self, id: OtpKeyId) -> KsResult<()> {
        self.single(
            KsMetadata::address(KsMemType::Otp, id.into()),
            CTL::OPMODE::LOCK,
            ModeBits::Clear,
            KsError::DRIVER_KS_OTP_LOCK_FAILURE,
        )
    }

    /// Revoke a key
    ///
    /// A revoked key can no longer be used, but keeps its storage until it
    /// is erased.
    ///
    /// # Arguments
    ///
    /// * `mem` - Memory holding the key
    /// * `index` - Key index
    pub fn revoke_key(&mut self, mem: KsMemType, index: u32) -> KsResult<()> {
        check_index(mem, index)?;
        self.single(
            KsMetadata::address(mem, index),
            CTL::OPMODE::REVOKE,
            ModeBits::Preserve,
            KsError::DRIVER_KS_REVOKE_FAILURE,
        )
    }

    /// Run the SRAM anti-remanence procedure, inverting the stored SRAM
    /// bits.
    ///
    /// # Returns
    ///
    /// * `bool` - True if SRAM is stored inverted after the toggle
    pub fn toggle_sram(&mut self) -> KsResult<bool> {
        self.single(
            KsMetadata::default().with_mem_type(KsMemType::Sram),
            CTL::OPMODE::REMAN,
            ModeBits::Preserve,
            KsError::DRIVER_KS_REMAN_FAILURE,
        )?;
        Ok(self.is_sram_inverted())
    }

    /// Remaining key storage of `mem`, in bytes
    pub fn remain_size(&self, mem: KsMemType) -> KsResult<u32> {
        let remain = self.regs.remain().read();
        match mem {
            KsMemType::Sram => Ok(remain.read(REMAIN::RRMNG)),
            KsMemType::Flash => Ok(remain.read(REMAIN::FRMNG)),
            KsMemType::Otp => Err(KsError::DRIVER_KS_INVALID_MEM_TYPE),
        }
    }

    /// Number of additional keys `mem` can hold
    pub fn remain_key_count(&self, mem: KsMemType) -> KsResult<u32> {
        let remkcnt = self.regs.remkcnt().read();
        match mem {
            KsMemType::Sram => Ok(remkcnt.read(REMKCNT::RRMKCNT)),
            KsMemType::Flash => Ok(remkcnt.read(REMKCNT::FRMKCNT)),
            KsMemType::Otp => Err(KsError::DRIVER_KS_INVALID_MEM_TYPE),
        }
    }

    /// Program the silent and scramble mode bits carried by subsequent
    /// SRAM and Flash transactions.
    pub fn set_mode(&mut self, mode: KsMode) -> KsResult<()> {
        self.ensure_idle()?;
        self.regs.ctl().modify(
            CTL::SILENT.val(mode.contains(KsMode::SILENT) as u32)
                + CTL::SCMB.val(mode.contains(KsMode::SCRAMBLE) as u32),
        );
        Ok(())
    }

    /// Mode bits currently programmed in the control register.
    pub fn mode(&self) -> KsMode {
        KsMode::from_bits_truncate(self.regs.ctl().get())
    }

    /// True if SRAM key storage is currently held inverted.
    pub fn is_sram_inverted(&self) -> bool {
        self.regs.sts().read().is_set(STS::RAMINV)
    }

    /// True if the OTP slot holds a key.
    pub fn otp_key_present(&self, id: OtpKeyId) -> bool {
        self.regs.otpsts().read().read(OTPSTS::KEY) & (1 << u32::from(id)) != 0
    }

    /// True while the key store is processing a transaction.
    pub fn is_busy(&self) -> bool {
        self.regs.sts().read().is_set(STS::BUSY)
    }

    fn ensure_idle(&self) -> KsResult<()> {
        if self.is_busy() {
            cprintln!("[ks] Key store busy");
            Err(KsError::DRIVER_KS_BUSY)?
        }
        Ok(())
    }

    fn wait_idle(&mut self, err: KsError) -> KsResult<()> {
        let regs = &self.regs;
        if !wait::until(&mut self.timeout, || !regs.sts().read().is_set(STS::BUSY)) {
            cprintln!("[ks] Timed out waiting for busy to clear");
            Err(err)?
        }
        Ok(())
    }

    /// Clears the interrupt and error flags, starts `op` and waits for the
    /// hardware to finish it.
    fn transact(&mut self, op: FieldValue<u32, CTL::Register>, mode: ModeBits) -> KsResult<()> {
        self.regs.sts().write(STS::IF::SET + STS::EIF::SET);

        let mode_bits = match mode {
            ModeBits::Preserve => self.regs.ctl().get() & KsMode::all().bits(),
            ModeBits::Clear => 0,
        };
        let ctl = (CTL::START::SET + op).value | mode_bits;
        trace_start(ctl, self.regs.metadata().get());
        self.regs.ctl().set(ctl);

        self.wait_idle(KsError::DRIVER_KS_TIMEOUT)
    }

    fn check_error(&self, err: KsError) -> KsResult<()> {
        let sts = self.regs.sts().read();
        if sts.is_set(STS::EIF) {
            if sts.is_set(STS::KRVKF) {
                cprintln!("[ks] Key has been revoked");
            }
            cprintln!(
                "[ks] Operation failed, err = {}, STS = {}",
                HexWord(err.into()),
                HexWord(sts.get())
            );
            Err(err)?
        }
        Ok(())
    }

    /// Runs a single transaction against the key addressed by `meta`.
    fn single(
        &mut self,
        meta: KsMetadata,
        op: FieldValue<u32, CTL::Register>,
        mode: ModeBits,
        err: KsError,
    ) -> KsResult<()> {
        self.ensure_idle()?;
        self.regs.metadata().set(meta.into());
        self.transact(op, mode)?;
        self.check_error(err)
    }

    /// Moves `io` through the key window in chunks of up to eight words.
    /// The first chunk starts a new transfer; the rest continue it.
    fn transfer(
        &mut self,
        op: FieldValue<u32, CTL::Register>,
        mut io: ChunkIo,
        err: KsError,
    ) -> KsResult<()> {
        let words = io.len();
        let mut offset = 0;
        while offset < words {
            let end = (offset + KEY_WINDOW_WORDS).min(words);

            if let ChunkIo::Write(src) = &io {
                self.regs.key().write_from(&src[offset..end]);
            }

            self.transact(op + CTL::CONT.val((offset != 0) as u32), ModeBits::Preserve)?;

            if let ChunkIo::Read(dst) = &mut io {
                self.regs.key().read_into(&mut dst[offset..end]);
            }

            offset = end;
        }

        self.check_error(err)
    }
}

fn check_index(mem: KsMemType, index: u32) -> KsResult<()> {
    match mem {
        KsMemType::Otp => OtpKeyId::try_from(index).map(|_| ()),
        _ if index > MAX_KEY_INDEX => Err(KsError::DRIVER_KS_INVALID_KEY_INDEX),
        _ => Ok(()),
    }
}
