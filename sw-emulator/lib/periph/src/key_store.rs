/*++

Licensed under the Apache-2.0 license.

File Name:

    key_store.rs

Abstract:

    File contains the Key Store peripheral implementation.

--*/

use ks_emu_bus::{ActionHandle, Bus, BusError, Clock, Timer};
use ks_emu_types::{AccessSize, BusAddr, BusData};
use ks_registers::ks::{
    offsets, CTL, KEY_WINDOW_WORDS, METADATA, OTP_KEY_COUNT, REMAIN, REMKCNT, SCMBKEY_WORDS, STS,
};
use std::cell::RefCell;
use std::fmt::Write;
use std::rc::Rc;
use tock_registers::LocalRegisterCopy;

/// Word count of each metadata size class. Classes past the end of the
/// table are reserved.
const SIZE_CLASS_WORDS: [usize; 21] = [
    4, 6, 6, 7, 8, 8, 8, 9, 12, 13, 16, 17, 18, 0, 0, 0, 32, 48, 64, 96, 128,
];

/// Smallest key the store accepts, in bytes.
const MIN_KEY_BYTES: u32 = 16;

/// Largest values the REMAIN and REMKCNT fields can report.
const MAX_BANK_BYTES: u32 = 0x1fff;
const MAX_BANK_KEYS: u32 = 0x3f;

const SCMBKEY_END: BusAddr = offsets::SCMBKEY + (SCMBKEY_WORDS as BusAddr - 1) * 4;
const KEY_END: BusAddr = offsets::KEY + (KEY_WINDOW_WORDS as BusAddr - 1) * 4;

fn size_class_words(size: u32) -> usize {
    SIZE_CLASS_WORDS.get(size as usize).copied().unwrap_or(0)
}

/// Memory a key lives in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyMem {
    Sram,
    Flash,
    Otp,
}

/// Construction parameters for [`KeyStore`].
#[derive(Clone, Copy, Debug)]
pub struct KeyStoreArgs {
    /// SRAM key storage, in bytes
    pub sram_bytes: u32,

    /// Maximum number of SRAM keys
    pub sram_keys: u32,

    /// Flash key storage, in bytes
    pub flash_bytes: u32,

    /// Maximum number of Flash keys
    pub flash_keys: u32,

    /// Clock cycles a started operation stays busy
    pub op_ticks: u64,

    /// Clock cycles the initialization sequence takes
    pub init_ticks: u64,
}

impl Default for KeyStoreArgs {
    fn default() -> Self {
        Self {
            sram_bytes: 1024,
            sram_keys: 32,
            flash_bytes: 4096,
            flash_keys: 32,
            op_ticks: 20,
            init_ticks: 100,
        }
    }
}

#[derive(Clone)]
struct StoredKey {
    meta: LocalRegisterCopy<u32, METADATA::Register>,
    words: Vec<u32>,
    revoked: bool,
}

impl StoredKey {
    fn bytes(&self) -> u32 {
        self.words.len() as u32 * 4
    }
}

struct KeyBank {
    slots: Vec<Option<StoredKey>>,
    capacity_bytes: u32,
}

impl KeyBank {
    fn new(capacity_bytes: u32, max_keys: u32) -> Self {
        Self {
            slots: vec![None; max_keys.min(MAX_BANK_KEYS) as usize],
            capacity_bytes: capacity_bytes.min(MAX_BANK_BYTES),
        }
    }

    fn remaining_bytes(&self) -> u32 {
        let used: u32 = self.slots.iter().flatten().map(StoredKey::bytes).sum();
        self.capacity_bytes.saturating_sub(used)
    }

    fn remaining_keys(&self) -> u32 {
        self.slots.iter().filter(|slot| slot.is_none()).count() as u32
    }

    fn is_full(&self) -> bool {
        self.remaining_keys() == 0 || self.remaining_bytes() < MIN_KEY_BYTES
    }

    /// Stores `key` in the first free slot and returns its index.
    fn insert(&mut self, mut key: StoredKey) -> Option<u32> {
        if key.bytes() > self.remaining_bytes() {
            return None;
        }
        let index = self.slots.iter().position(Option::is_none)?;
        key.meta.modify(METADATA::NUMBER.val(index as u32));
        self.slots[index] = Some(key);
        Some(index as u32)
    }

    fn get(&self, index: u32) -> Option<&StoredKey> {
        self.slots.get(index as usize)?.as_ref()
    }

    fn get_mut(&mut self, index: u32) -> Option<&mut StoredKey> {
        self.slots.get_mut(index as usize)?.as_mut()
    }

    fn remove(&mut self, index: u32) -> Option<StoredKey> {
        self.slots.get_mut(index as usize)?.take()
    }

    fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }
}

#[derive(Clone, Default)]
struct OtpSlot {
    key: Option<StoredKey>,
    locked: bool,
}

/// Progress of a multi-chunk transfer.
enum Transfer {
    Idle,
    Reading {
        mem: KeyMem,
        index: u32,
        cursor: usize,
    },
    Writing {
        meta: LocalRegisterCopy<u32, METADATA::Register>,
        words: Vec<u32>,
        total: usize,
    },
}

/// Why an operation completed with the error flag set.
enum OpFault {
    Rejected,
    Revoked,
}

type OpResult = Result<(), OpFault>;

fn reject(reason: &str) -> OpFault {
    let _ = writeln!(crate::output(), "[key-store] operation rejected: {reason}");
    OpFault::Rejected
}

fn key_mem(meta: LocalRegisterCopy<u32, METADATA::Register>) -> Result<KeyMem, OpFault> {
    match meta.read_as_enum(METADATA::DST) {
        Some(METADATA::DST::Value::SRAM) => Ok(KeyMem::Sram),
        Some(METADATA::DST::Value::FLASH) => Ok(KeyMem::Flash),
        Some(METADATA::DST::Value::OTP) => Ok(KeyMem::Otp),
        None => Err(reject("invalid destination memory")),
    }
}

struct KeyStoreRegs {
    /// Control register
    ctl: LocalRegisterCopy<u32, CTL::Register>,

    /// Metadata register
    metadata: LocalRegisterCopy<u32, METADATA::Register>,

    /// Status flags held by the peripheral. The full flags are derived
    /// from the key banks when the register is read.
    sts: LocalRegisterCopy<u32, STS::Register>,

    /// Scramble key registers
    scmbkey: [u32; SCMBKEY_WORDS],

    /// Key transfer window
    key: [u32; KEY_WINDOW_WORDS],

    sram: KeyBank,
    flash: KeyBank,
    otp: Vec<OtpSlot>,

    transfer: Transfer,

    /// Control value latched when the running operation was started
    pending: Option<LocalRegisterCopy<u32, CTL::Register>>,

    /// Timer
    timer: Timer,

    /// Operation Complete Action
    op_complete_action: Option<ActionHandle>,

    args: KeyStoreArgs,

    /// Started operations never complete while set
    stuck_busy: bool,

    /// Number of operations that still start normally before `stuck_busy`
    /// engages
    stuck_after: Option<usize>,

    /// BUSY reads as set while this is set
    forced_busy: bool,

    /// The next operation completes with the error flag set
    inject_error: bool,

    /// Every control value written with START set
    start_log: Vec<u32>,

    /// Writes to the control, metadata, scramble key and key window
    /// registers
    register_writes: usize,
}

impl KeyStoreRegs {
    fn new(clock: &Clock, args: KeyStoreArgs) -> Self {
        Self {
            ctl: LocalRegisterCopy::new(0),
            metadata: LocalRegisterCopy::new(0),
            sts: LocalRegisterCopy::new(0),
            scmbkey: [0; SCMBKEY_WORDS],
            key: [0; KEY_WINDOW_WORDS],
            sram: KeyBank::new(args.sram_bytes, args.sram_keys),
            flash: KeyBank::new(args.flash_bytes, args.flash_keys),
            otp: vec![OtpSlot::default(); OTP_KEY_COUNT as usize],
            transfer: Transfer::Idle,
            pending: None,
            timer: Timer::new(clock),
            op_complete_action: None,
            args,
            stuck_busy: false,
            stuck_after: None,
            forced_busy: false,
            inject_error: false,
            start_log: Vec::new(),
            register_writes: 0,
        }
    }

    fn is_busy(&self) -> bool {
        self.forced_busy || self.sts.is_set(STS::BUSY)
    }

    fn status(&self) -> LocalRegisterCopy<u32, STS::Register> {
        let mut sts = self.sts;
        if self.forced_busy {
            sts.modify(STS::BUSY::SET);
        }
        if self.sram.is_full() {
            sts.modify(STS::SRAMFULL::SET);
        }
        if self.flash.is_full() {
            sts.modify(STS::FLASHFULL::SET);
        }
        sts
    }

    fn remain(&self) -> u32 {
        (REMAIN::RRMNG.val(self.sram.remaining_bytes())
            + REMAIN::FRMNG.val(self.flash.remaining_bytes()))
        .value
    }

    fn remkcnt(&self) -> u32 {
        (REMKCNT::RRMKCNT.val(self.sram.remaining_keys())
            + REMKCNT::FRMKCNT.val(self.flash.remaining_keys()))
        .value
    }

    fn otpsts(&self) -> u32 {
        self.otp
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.key.is_some())
            .fold(0, |acc, (i, _)| acc | (1 << i))
    }

    fn bank(&self, mem: KeyMem) -> Option<&KeyBank> {
        match mem {
            KeyMem::Sram => Some(&self.sram),
            KeyMem::Flash => Some(&self.flash),
            KeyMem::Otp => None,
        }
    }

    fn bank_mut(&mut self, mem: KeyMem) -> Option<&mut KeyBank> {
        match mem {
            KeyMem::Sram => Some(&mut self.sram),
            KeyMem::Flash => Some(&mut self.flash),
            KeyMem::Otp => None,
        }
    }

    fn lookup(&self, mem: KeyMem, index: u32) -> Option<&StoredKey> {
        match self.bank(mem) {
            Some(bank) => bank.get(index),
            None => self.otp.get(index as usize)?.key.as_ref(),
        }
    }

    fn lookup_mut(&mut self, mem: KeyMem, index: u32) -> Option<&mut StoredKey> {
        match mem {
            KeyMem::Otp => self.otp.get_mut(index as usize)?.key.as_mut(),
            _ => self.bank_mut(mem)?.get_mut(index),
        }
    }

    /// On Write callback for the control register
    fn on_write_ctl(&mut self, val: u32) {
        if self.is_busy() {
            let _ = writeln!(
                crate::output(),
                "[key-store] CTL write {val:#x} ignored while busy"
            );
            return;
        }
        self.ctl.set(val);
        if !self.ctl.is_set(CTL::START) {
            return;
        }
        self.start_log.push(val);
        self.sts.modify(STS::BUSY::SET);
        match self.stuck_after {
            Some(0) => {
                self.stuck_after = None;
                self.stuck_busy = true;
            }
            Some(n) => self.stuck_after = Some(n - 1),
            None => {}
        }
        if self.stuck_busy {
            return;
        }
        let ticks = if self.ctl.is_set(CTL::INIT) {
            self.args.init_ticks
        } else {
            self.args.op_ticks
        };
        self.pending = Some(self.ctl);
        self.op_complete_action = Some(self.timer.schedule_poll_in(ticks));
    }

    fn on_write_sts(&mut self, val: u32) {
        let w1c = (STS::IF::SET + STS::EIF::SET + STS::KRVKF::SET).value;
        self.sts.set(self.sts.get() & !(val & w1c));
    }

    /// Called by Bus::poll() to indicate that time has passed
    fn poll(&mut self) {
        if self.timer.fired(&mut self.op_complete_action) {
            if let Some(ctl) = self.pending.take() {
                self.complete(ctl);
            }
        }
    }

    fn complete(&mut self, ctl: LocalRegisterCopy<u32, CTL::Register>) {
        self.ctl.modify(CTL::START::CLEAR);
        self.sts.modify(STS::BUSY::CLEAR);

        if ctl.is_set(CTL::INIT) {
            self.sts.modify(STS::INITDONE::SET);
            return;
        }

        let result = if !self.sts.is_set(STS::INITDONE) {
            Err(reject("key store not initialized"))
        } else if self.inject_error {
            self.inject_error = false;
            Err(reject("injected error"))
        } else {
            self.execute(ctl)
        };

        match result {
            Ok(()) => self.sts.modify(STS::IF::SET),
            Err(OpFault::Rejected) => self.sts.modify(STS::IF::SET + STS::EIF::SET),
            Err(OpFault::Revoked) => {
                let _ = writeln!(crate::output(), "[key-store] access to revoked key");
                self.sts
                    .modify(STS::IF::SET + STS::EIF::SET + STS::KRVKF::SET)
            }
        }
    }

    fn execute(&mut self, ctl: LocalRegisterCopy<u32, CTL::Register>) -> OpResult {
        let meta = self.metadata;
        let cont = ctl.is_set(CTL::CONT);
        match ctl.read_as_enum(CTL::OPMODE) {
            Some(CTL::OPMODE::Value::READ) => self.read_key(meta, cont),
            Some(CTL::OPMODE::Value::WRITE) => self.write_key(meta, cont),
            Some(CTL::OPMODE::Value::ERASE) => self.erase_key(meta),
            Some(CTL::OPMODE::Value::ERASE_ALL) => self.erase_all(meta),
            Some(CTL::OPMODE::Value::REVOKE) => self.revoke_key(meta),
            Some(CTL::OPMODE::Value::REMAN) => self.toggle_sram(meta),
            Some(CTL::OPMODE::Value::LOCK) => self.lock_otp_key(meta),
            None => Err(reject("unsupported operation")),
        }
    }

    fn read_key(&mut self, meta: LocalRegisterCopy<u32, METADATA::Register>, cont: bool) -> OpResult {
        let mem = key_mem(meta)?;
        let index = meta.read(METADATA::NUMBER);
        let cursor = if cont {
            match self.transfer {
                Transfer::Reading {
                    mem: m,
                    index: i,
                    cursor,
                } if m == mem && i == index => cursor,
                _ => {
                    self.transfer = Transfer::Idle;
                    Err(reject("continued read without a read in progress"))?
                }
            }
        } else {
            0
        };

        let key = self
            .lookup(mem, index)
            .ok_or_else(|| reject("read of empty key slot"))?;
        if key.revoked {
            Err(OpFault::Revoked)?
        }
        if !key.meta.is_set(METADATA::READABLE) {
            Err(reject("key is not readable"))?
        }

        let len = key.words.len();
        let end = (cursor + KEY_WINDOW_WORDS).min(len);
        let chunk = key.words.get(cursor..end).unwrap_or(&[]);
        let mut window = [0u32; KEY_WINDOW_WORDS];
        window[..chunk.len()].copy_from_slice(chunk);

        self.key = window;
        self.transfer = if end < len {
            Transfer::Reading {
                mem,
                index,
                cursor: end,
            }
        } else {
            Transfer::Idle
        };
        Ok(())
    }

    fn write_key(&mut self, meta: LocalRegisterCopy<u32, METADATA::Register>, cont: bool) -> OpResult {
        let window = self.key;
        if !cont && key_mem(meta)? == KeyMem::Otp {
            return self.write_otp_key(meta, &window);
        }

        let (meta, mut words, total) =
            match (cont, std::mem::replace(&mut self.transfer, Transfer::Idle)) {
                (false, _) => {
                    let total = size_class_words(meta.read(METADATA::SIZE));
                    if total == 0 {
                        Err(reject("reserved key size"))?
                    }
                    (meta, Vec::with_capacity(total), total)
                }
                (true, Transfer::Writing { meta, words, total }) => (meta, words, total),
                (true, _) => Err(reject("continued write without a write in progress"))?,
            };

        let take = (total - words.len()).min(KEY_WINDOW_WORDS);
        words.extend_from_slice(&window[..take]);
        if words.len() < total {
            self.transfer = Transfer::Writing { meta, words, total };
            return Ok(());
        }

        let mem = key_mem(meta)?;
        let bank = self
            .bank_mut(mem)
            .ok_or_else(|| reject("multi-chunk write to OTP"))?;
        let index = bank
            .insert(StoredKey {
                meta,
                words,
                revoked: false,
            })
            .ok_or_else(|| reject("key storage full"))?;
        self.metadata.modify(METADATA::NUMBER.val(index));
        Ok(())
    }

    fn write_otp_key(
        &mut self,
        meta: LocalRegisterCopy<u32, METADATA::Register>,
        window: &[u32; KEY_WINDOW_WORDS],
    ) -> OpResult {
        let words = size_class_words(meta.read(METADATA::SIZE));
        if words == 0 || words > KEY_WINDOW_WORDS {
            Err(reject("OTP keys are limited to 256 bits"))?
        }
        let slot = self
            .otp
            .get_mut(meta.read(METADATA::NUMBER) as usize)
            .ok_or_else(|| reject("OTP index out of range"))?;
        if slot.locked {
            Err(reject("OTP key is locked"))?
        }
        if slot.key.is_some() {
            Err(reject("OTP key already programmed"))?
        }
        slot.key = Some(StoredKey {
            meta,
            words: window[..words].to_vec(),
            revoked: false,
        });
        Ok(())
    }

    fn erase_key(&mut self, meta: LocalRegisterCopy<u32, METADATA::Register>) -> OpResult {
        let mem = key_mem(meta)?;
        let index = meta.read(METADATA::NUMBER);
        self.transfer = Transfer::Idle;
        match mem {
            KeyMem::Otp => {
                let slot = self
                    .otp
                    .get_mut(index as usize)
                    .ok_or_else(|| reject("OTP index out of range"))?;
                if slot.locked {
                    Err(reject("OTP key is locked"))?
                }
                slot.key
                    .take()
                    .ok_or_else(|| reject("erase of empty OTP slot"))?;
            }
            _ => {
                self.bank_mut(mem)
                    .and_then(|bank| bank.remove(index))
                    .ok_or_else(|| reject("erase of empty key slot"))?;
            }
        }
        Ok(())
    }

    fn erase_all(&mut self, meta: LocalRegisterCopy<u32, METADATA::Register>) -> OpResult {
        let mem = key_mem(meta)?;
        self.transfer = Transfer::Idle;
        self.bank_mut(mem)
            .ok_or_else(|| reject("OTP keys cannot be erased in bulk"))?
            .clear();
        Ok(())
    }

    fn revoke_key(&mut self, meta: LocalRegisterCopy<u32, METADATA::Register>) -> OpResult {
        let mem = key_mem(meta)?;
        let key = self
            .lookup_mut(mem, meta.read(METADATA::NUMBER))
            .ok_or_else(|| reject("revoke of empty key slot"))?;
        key.revoked = true;
        Ok(())
    }

    fn toggle_sram(&mut self, meta: LocalRegisterCopy<u32, METADATA::Register>) -> OpResult {
        if key_mem(meta)? != KeyMem::Sram {
            Err(reject("anti-remanence applies to SRAM only"))?
        }
        if self.sts.is_set(STS::RAMINV) {
            self.sts.modify(STS::RAMINV::CLEAR);
        } else {
            self.sts.modify(STS::RAMINV::SET);
        }
        Ok(())
    }

    fn lock_otp_key(&mut self, meta: LocalRegisterCopy<u32, METADATA::Register>) -> OpResult {
        if key_mem(meta)? != KeyMem::Otp {
            Err(reject("only OTP keys can be locked"))?
        }
        self.otp
            .get_mut(meta.read(METADATA::NUMBER) as usize)
            .ok_or_else(|| reject("OTP index out of range"))?
            .locked = true;
        Ok(())
    }

    /// Called by Bus::warm_reset() to indicate a warm reset
    fn warm_reset(&mut self) {
        if let Some(action) = self.op_complete_action.take() {
            self.timer.cancel(action);
        }
        self.pending = None;
        self.ctl.set(0);
        self.metadata.set(0);
        self.sts.set(0);
        self.scmbkey = [0; SCMBKEY_WORDS];
        self.key = [0; KEY_WINDOW_WORDS];
        self.sram.clear();
        self.transfer = Transfer::Idle;
        self.stuck_busy = false;
        self.stuck_after = None;
        self.forced_busy = false;
        self.inject_error = false;
    }
}

/// Simulated key store.
///
/// Clones share the same peripheral, so a test can keep a handle for
/// inspection and fault injection while another clone sits on the bus.
#[derive(Clone)]
pub struct KeyStore {
    regs: Rc<RefCell<KeyStoreRegs>>,
}

impl KeyStore {
    /// Create new instance of the key store
    ///
    /// # Arguments
    ///
    /// * `clock` - Clock driving operation latency
    /// * `args` - Capacities and latencies
    pub fn new(clock: &Clock, args: KeyStoreArgs) -> Self {
        Self {
            regs: Rc::new(RefCell::new(KeyStoreRegs::new(clock, args))),
        }
    }

    /// Current control register value
    pub fn ctl(&self) -> u32 {
        self.regs.borrow().ctl.get()
    }

    /// Current metadata register value
    pub fn metadata(&self) -> u32 {
        self.regs.borrow().metadata.get()
    }

    /// Status register value as the driver would read it
    pub fn status(&self) -> u32 {
        self.regs.borrow().status().get()
    }

    /// Contents of the key transfer window
    pub fn key_window(&self) -> [u32; KEY_WINDOW_WORDS] {
        self.regs.borrow().key
    }

    /// Returns every control value written with START set since the last
    /// call.
    pub fn take_start_log(&self) -> Vec<u32> {
        std::mem::take(&mut self.regs.borrow_mut().start_log)
    }

    /// Number of writes to the control, metadata, scramble key and key
    /// window registers.
    pub fn register_writes(&self) -> usize {
        self.regs.borrow().register_writes
    }

    /// Words of the key stored at `index`, if any.
    pub fn stored_key(&self, mem: KeyMem, index: u32) -> Option<Vec<u32>> {
        self.regs
            .borrow()
            .lookup(mem, index)
            .map(|key| key.words.clone())
    }

    /// Returns true if the key at `index` exists and has been revoked.
    pub fn is_revoked(&self, mem: KeyMem, index: u32) -> bool {
        self.regs
            .borrow()
            .lookup(mem, index)
            .is_some_and(|key| key.revoked)
    }

    /// Returns true if OTP slot `index` has been locked.
    pub fn is_otp_locked(&self, index: u32) -> bool {
        self.regs
            .borrow()
            .otp
            .get(index as usize)
            .is_some_and(|slot| slot.locked)
    }

    /// While set, started operations raise BUSY and never complete.
    /// Clearing it abandons the operation and drops BUSY.
    pub fn set_stuck_busy(&self, stuck: bool) {
        let mut regs = self.regs.borrow_mut();
        regs.stuck_busy = stuck;
        if !stuck && regs.op_complete_action.is_none() {
            regs.sts.modify(STS::BUSY::CLEAR);
        }
    }

    /// Lets the next `starts` operations complete, then behaves as
    /// [`Self::set_stuck_busy`] for the one after.
    pub fn set_stuck_after(&self, starts: usize) {
        self.regs.borrow_mut().stuck_after = Some(starts);
    }

    /// Holds BUSY set regardless of operation state.
    pub fn force_busy(&self, busy: bool) {
        self.regs.borrow_mut().forced_busy = busy;
    }

    /// The next operation started completes with the error flag set.
    pub fn inject_error(&self) {
        self.regs.borrow_mut().inject_error = true;
    }
}

impl Bus for KeyStore {
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
    fn read(&mut self, size: AccessSize, addr: BusAddr) -> Result<BusData, BusError> {
        if size != AccessSize::Word {
            Err(BusError::LoadAccessFault)?
        }
        if addr & 3 != 0 {
            Err(BusError::LoadAddrMisaligned)?
        }
        let regs = self.regs.borrow();
        match addr {
            offsets::CTL => Ok(regs.ctl.get()),
            offsets::METADATA => Ok(regs.metadata.get()),
            offsets::STS => Ok(regs.status().get()),
            offsets::REMAIN => Ok(regs.remain()),
            offsets::SCMBKEY..=SCMBKEY_END => {
                Ok(regs.scmbkey[((addr - offsets::SCMBKEY) / 4) as usize])
            }
            offsets::KEY..=KEY_END => Ok(regs.key[((addr - offsets::KEY) / 4) as usize]),
            offsets::OTPSTS => Ok(regs.otpsts()),
            offsets::REMKCNT => Ok(regs.remkcnt()),
            _ => Err(BusError::LoadAccessFault),
        }
    }

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
    fn write(&mut self, size: AccessSize, addr: BusAddr, val: BusData) -> Result<(), BusError> {
        if size != AccessSize::Word {
            Err(BusError::StoreAccessFault)?
        }
        if addr & 3 != 0 {
            Err(BusError::StoreAddrMisaligned)?
        }
        let mut regs = self.regs.borrow_mut();
        match addr {
            offsets::CTL => {
                regs.register_writes += 1;
                regs.on_write_ctl(val);
            }
            offsets::STS => regs.on_write_sts(val),
            offsets::METADATA | offsets::SCMBKEY..=SCMBKEY_END | offsets::KEY..=KEY_END => {
                regs.register_writes += 1;
                if regs.is_busy() {
                    let _ = writeln!(
                        crate::output(),
                        "[key-store] write to {addr:#x} ignored while busy"
                    );
                    return Ok(());
                }
                match addr {
                    offsets::METADATA => regs.metadata.set(val),
                    offsets::SCMBKEY..=SCMBKEY_END => {
                        regs.scmbkey[((addr - offsets::SCMBKEY) / 4) as usize] = val
                    }
                    _ => regs.key[((addr - offsets::KEY) / 4) as usize] = val,
                }
            }
            _ => Err(BusError::StoreAccessFault)?,
        }
        Ok(())
    }

    fn poll(&mut self) {
        self.regs.borrow_mut().poll();
    }

    fn warm_reset(&mut self) {
        self.regs.borrow_mut().warm_reset();
    }
}
