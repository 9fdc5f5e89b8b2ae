// Licensed under the Apache-2.0 license

use ks_drivers::{
    key_word_count, KeyAttrs, KeyOwner, KeySize, KeyStore, KsError, KsErrorKind, KsMemType,
    KsMetadata, KsMode, OtpKeyId, SpinTimeout, TickTimeout, TimeoutPolicy,
};
use ks_emu_bus::{Bus, BusMmio, Clock, SteppingBus};
use ks_emu_periph::{KeyMem, KeyStore as KeyStorePeriph, KeyStoreArgs};
use ks_registers::ks::{RegisterBlock, CTL};

type TestMmio = BusMmio<SteppingBus<KeyStorePeriph>>;

struct Harness<P: TimeoutPolicy> {
    ks: KeyStore<TestMmio, P>,
    periph: KeyStorePeriph,
}

fn harness_with<P: TimeoutPolicy>(clock: Clock, args: KeyStoreArgs, timeout: P) -> Harness<P> {
    let periph = KeyStorePeriph::new(&clock, args);
    let mmio = BusMmio::new(SteppingBus::new(clock, periph.clone()));
    let regs = unsafe { RegisterBlock::new_with_mmio(core::ptr::null_mut(), mmio) };
    Harness {
        ks: KeyStore::with_regs(regs, timeout),
        periph,
    }
}

fn harness() -> Harness<SpinTimeout> {
    let mut h = harness_with(
        Clock::new(),
        KeyStoreArgs::default(),
        SpinTimeout::new(10_000),
    );
    h.ks.open().unwrap();
    h.periph.take_start_log();
    h
}

fn meta(size: KeySize) -> KsMetadata {
    KsMetadata::new(size, KeyOwner::Cpu, KeyAttrs::READABLE)
}

fn key_words(len: usize, seed: u32) -> Vec<u32> {
    (0..len as u32)
        .map(|i| seed.wrapping_mul(0x0100_0193) ^ i.wrapping_mul(0x9e37_79b9))
        .collect()
}

fn start_op(op: tock_registers::fields::FieldValue<u32, CTL::Register>, cont: bool) -> u32 {
    (CTL::START::SET + op + CTL::CONT.val(cont as u32)).value
}

#[test]
fn test_open() {
    let mut h = harness_with(
        Clock::new(),
        KeyStoreArgs::default(),
        SpinTimeout::new(10_000),
    );
    assert_eq!(h.periph.status() & (1 << 7), 0);
    h.ks.open().unwrap();
    assert_ne!(h.periph.status() & (1 << 7), 0);
    assert_eq!(
        h.periph.take_start_log(),
        [(CTL::INIT::SET + CTL::START::SET).value]
    );

    // Already initialized: only waits for idle
    h.ks.open().unwrap();
    assert!(h.periph.take_start_log().is_empty());
}

#[test]
fn test_open_timeout() {
    let mut h = harness_with(Clock::new(), KeyStoreArgs::default(), SpinTimeout::new(50));
    h.periph.set_stuck_busy(true);
    assert_eq!(h.ks.open(), Err(KsError::DRIVER_KS_INIT_TIMEOUT));
    assert_eq!(KsError::DRIVER_KS_INIT_TIMEOUT.kind(), KsErrorKind::Timeout);
}

#[test]
fn test_open_waits_for_idle_before_init() {
    let mut h = harness_with(Clock::new(), KeyStoreArgs::default(), SpinTimeout::new(50));
    h.periph.force_busy(true);
    assert_eq!(h.ks.open(), Err(KsError::DRIVER_KS_READY_TIMEOUT));
    assert!(h.periph.take_start_log().is_empty());
}

#[test]
fn test_write_read_single_chunk() {
    let mut h = harness();
    for (seed, size) in [
        KeySize::Bits128,
        KeySize::Bits192,
        KeySize::Bits224,
        KeySize::Bits256,
    ]
    .into_iter()
    .enumerate()
    {
        let key = key_words(size.word_count(), seed as u32);
        let index = h.ks.write(KsMemType::Sram, meta(size), &key).unwrap();
        assert_eq!(index, seed as u32);
        assert_eq!(
            h.periph.take_start_log(),
            [start_op(CTL::OPMODE::WRITE, false)]
        );

        let mut out = vec![0u32; key.len()];
        h.ks.read(KsMemType::Sram, index, &mut out).unwrap();
        assert_eq!(out, key);
        assert_eq!(
            h.periph.take_start_log(),
            [start_op(CTL::OPMODE::READ, false)]
        );
    }
}

#[test]
fn test_read_partial_lengths() {
    let mut h = harness();
    let key = key_words(8, 7);
    let index = h.ks.write(KsMemType::Flash, meta(KeySize::Bits256), &key).unwrap();
    for len in 1..=8 {
        let mut out = vec![0u32; len];
        h.ks.read(KsMemType::Flash, index, &mut out).unwrap();
        assert_eq!(out, key[..len]);
    }
}

#[test]
fn test_write_read_multi_chunk() {
    let mut h = harness();
    let key = key_words(13, 0x55);
    assert_eq!(key_word_count(meta(KeySize::Bits409)), 13);

    let index = h.ks.write(KsMemType::Sram, meta(KeySize::Bits409), &key).unwrap();
    assert_eq!(
        h.periph.take_start_log(),
        [
            start_op(CTL::OPMODE::WRITE, false),
            start_op(CTL::OPMODE::WRITE, true)
        ]
    );
    assert_eq!(h.periph.stored_key(KeyMem::Sram, index), Some(key.clone()));

    let mut out = vec![0u32; 13];
    h.ks.read(KsMemType::Sram, index, &mut out).unwrap();
    assert_eq!(out, key);
    assert_eq!(
        h.periph.take_start_log(),
        [
            start_op(CTL::OPMODE::READ, false),
            start_op(CTL::OPMODE::READ, true)
        ]
    );
}

#[test]
fn test_write_read_4096_bit_key() {
    let mut h = harness();
    let key = key_words(128, 0xabc);
    let index = h.ks.write(KsMemType::Flash, meta(KeySize::Bits4096), &key).unwrap();

    let log = h.periph.take_start_log();
    assert_eq!(log.len(), 16);
    assert_eq!(log[0], start_op(CTL::OPMODE::WRITE, false));
    assert!(log[1..]
        .iter()
        .all(|&ctl| ctl == start_op(CTL::OPMODE::WRITE, true)));

    let mut out = vec![0u32; 128];
    h.ks.read(KsMemType::Flash, index, &mut out).unwrap();
    assert_eq!(out, key);
    assert_eq!(h.ks.remain_size(KsMemType::Flash), Ok(4096 - 512));
}

#[test]
fn test_write_longer_buffer_uses_size_class() {
    let mut h = harness();
    let key = key_words(10, 1);
    let index = h.ks.write(KsMemType::Sram, meta(KeySize::Bits128), &key).unwrap();
    assert_eq!(h.periph.stored_key(KeyMem::Sram, index), Some(key[..4].to_vec()));
}

#[test]
fn test_write_index_allocation() {
    let mut h = harness();
    let key = key_words(4, 3);
    for expected in 0..4 {
        assert_eq!(
            h.ks.write(KsMemType::Sram, meta(KeySize::Bits128), &key),
            Ok(expected)
        );
    }
    h.ks.erase_key(1).unwrap();
    assert_eq!(h.periph.stored_key(KeyMem::Sram, 1), None);
    assert_eq!(
        h.ks.write(KsMemType::Sram, meta(KeySize::Bits128), &key),
        Ok(1)
    );
}

#[test]
fn test_busy_at_entry() {
    let mut h = harness();
    let key = key_words(8, 9);
    h.ks.write(KsMemType::Sram, meta(KeySize::Bits256), &key).unwrap();

    h.periph.force_busy(true);
    let writes = h.periph.register_writes();
    let ctl = h.periph.ctl();
    let metadata = h.periph.metadata();
    let window = h.periph.key_window();

    let mut out = [0u32; 8];
    let busy = Err(KsError::DRIVER_KS_BUSY);
    assert_eq!(h.ks.read(KsMemType::Sram, 0, &mut out), busy);
    assert_eq!(
        h.ks.write(KsMemType::Sram, meta(KeySize::Bits256), &key),
        Err(KsError::DRIVER_KS_BUSY)
    );
    assert_eq!(
        h.ks.write_otp(OtpKeyId::Key1, meta(KeySize::Bits256), &key),
        Err(KsError::DRIVER_KS_BUSY)
    );
    assert_eq!(h.ks.erase_key(0), busy);
    assert_eq!(h.ks.erase_otp_key(OtpKeyId::Key1), busy);
    assert_eq!(h.ks.erase_all(KsMemType::Sram), busy);
    assert_eq!(h.ks.lock_otp_key(OtpKeyId::Key1), busy);
    assert_eq!(h.ks.revoke_key(KsMemType::Sram, 0), busy);
    assert_eq!(h.ks.toggle_sram(), Err(KsError::DRIVER_KS_BUSY));
    assert_eq!(h.ks.set_mode(KsMode::SILENT), busy);

    assert_eq!(h.periph.register_writes(), writes);
    assert_eq!(h.periph.ctl(), ctl);
    assert_eq!(h.periph.metadata(), metadata);
    assert_eq!(h.periph.key_window(), window);
    assert_eq!(out, [0; 8]);
    assert_eq!(KsError::DRIVER_KS_BUSY.status(), -4);

    h.periph.force_busy(false);
    h.ks.read(KsMemType::Sram, 0, &mut out).unwrap();
    assert_eq!(out[..], key[..]);
}

#[test]
fn test_stuck_busy_times_out() {
    let mut h = harness();
    h.periph.set_stuck_busy(true);
    let key = key_words(4, 2);
    let result = h.ks.write(KsMemType::Sram, meta(KeySize::Bits128), &key);
    assert_eq!(result, Err(KsError::DRIVER_KS_TIMEOUT));
    assert_eq!(KsError::DRIVER_KS_TIMEOUT.status(), -2);

    // The key store stays busy until the fault clears
    assert_eq!(h.ks.erase_all(KsMemType::Sram), Err(KsError::DRIVER_KS_BUSY));
    h.periph.set_stuck_busy(false);
    assert_eq!(h.ks.erase_all(KsMemType::Sram), Ok(()));
}

#[test]
fn test_read_timeout() {
    let mut h = harness();
    let key = key_words(13, 0x5a);
    let index = h.ks.write(KsMemType::Sram, meta(KeySize::Bits409), &key).unwrap();
    h.periph.take_start_log();

    h.periph.set_stuck_busy(true);
    let mut out = [0u32; 13];
    let err = h.ks.read(KsMemType::Sram, index, &mut out).unwrap_err();
    assert_eq!(err, KsError::DRIVER_KS_TIMEOUT);
    assert_eq!(err.kind(), KsErrorKind::Timeout);
    assert_eq!(out, [0; 13]);
    assert_eq!(h.periph.take_start_log().len(), 1);
}

#[test]
fn test_read_timeout_keeps_copied_chunks() {
    let mut h = harness();
    let key = key_words(13, 0x6b);
    let index = h.ks.write(KsMemType::Sram, meta(KeySize::Bits409), &key).unwrap();
    h.periph.take_start_log();

    h.periph.set_stuck_after(1);
    let mut out = [0u32; 13];
    assert_eq!(
        h.ks.read(KsMemType::Sram, index, &mut out),
        Err(KsError::DRIVER_KS_TIMEOUT)
    );
    assert_eq!(out[..8], key[..8]);
    assert_eq!(out[8..], [0; 5]);
    assert_eq!(
        h.periph.take_start_log(),
        [
            start_op(CTL::OPMODE::READ, false),
            start_op(CTL::OPMODE::READ, true)
        ]
    );
}

#[test]
fn test_tick_timeout_policy() {
    let clock = Clock::new();
    let timer = clock.timer();
    let mut h = harness_with(
        clock,
        KeyStoreArgs::default(),
        TickTimeout::new(500, move || timer.now()),
    );
    h.ks.open().unwrap();
    h.ks.erase_all(KsMemType::Sram).unwrap();

    h.periph.set_stuck_busy(true);
    assert_eq!(
        h.ks.erase_all(KsMemType::Flash),
        Err(KsError::DRIVER_KS_TIMEOUT)
    );
}

#[test]
fn test_hardware_error_is_fail() {
    let mut h = harness();
    h.periph.inject_error();
    let key = key_words(4, 4);
    let err = h
        .ks
        .write(KsMemType::Sram, meta(KeySize::Bits128), &key)
        .unwrap_err();
    assert_eq!(err, KsError::DRIVER_KS_WRITE_FAILURE);
    assert_eq!(err.kind(), KsErrorKind::Fail);
    assert_eq!(err.status(), -1);
}

#[test]
fn test_error_checked_after_last_chunk() {
    let mut h = harness();
    let mut out = [0u32; 13];
    // Reading an empty slot fails on the first chunk; the second chunk is
    // still issued and the failure reported at the end.
    assert_eq!(
        h.ks.read(KsMemType::Sram, 5, &mut out),
        Err(KsError::DRIVER_KS_READ_FAILURE)
    );
    assert_eq!(h.periph.take_start_log().len(), 2);
}

#[test]
fn test_parameter_errors() {
    let mut h = harness();
    let writes = h.periph.register_writes();
    let key = key_words(8, 5);

    let mut reserved = meta(KeySize::Bits128);
    reserved.set_size_class(14);
    assert_eq!(
        h.ks.write(KsMemType::Sram, reserved, &key),
        Err(KsError::DRIVER_KS_INVALID_KEY_SIZE)
    );
    assert_eq!(
        h.ks.write(KsMemType::Otp, meta(KeySize::Bits384), &key),
        Err(KsError::DRIVER_KS_OTP_KEY_TOO_LARGE)
    );
    assert_eq!(
        h.ks.write(KsMemType::Sram, meta(KeySize::Bits283), &key),
        Err(KsError::DRIVER_KS_KEY_BUFFER_TOO_SMALL)
    );
    assert_eq!(
        h.ks.read(KsMemType::Sram, 0, &mut []),
        Err(KsError::DRIVER_KS_EMPTY_KEY_BUFFER)
    );
    assert_eq!(
        h.ks.read(KsMemType::Flash, 64, &mut [0; 4]),
        Err(KsError::DRIVER_KS_INVALID_KEY_INDEX)
    );
    assert_eq!(
        h.ks.read(KsMemType::Otp, 8, &mut [0; 4]),
        Err(KsError::DRIVER_KS_INVALID_KEY_INDEX)
    );
    assert_eq!(
        h.ks.remain_size(KsMemType::Otp),
        Err(KsError::DRIVER_KS_INVALID_MEM_TYPE)
    );
    assert_eq!(
        h.ks.remain_key_count(KsMemType::Otp),
        Err(KsError::DRIVER_KS_INVALID_MEM_TYPE)
    );
    assert_eq!(KsError::DRIVER_KS_INVALID_MEM_TYPE.status(), -5);

    assert_eq!(h.periph.register_writes(), writes);
}

#[test]
fn test_write_otp_rejects_large_keys_without_hardware_access() {
    let mut h = harness();
    let writes = h.periph.register_writes();
    let key = key_words(128, 6);
    for size in [KeySize::Bits283, KeySize::Bits571, KeySize::Bits4096] {
        let err = h.ks.write_otp(OtpKeyId::Key2, meta(size), &key).unwrap_err();
        assert_eq!(err, KsError::DRIVER_KS_OTP_KEY_TOO_LARGE);
        assert_eq!(err.kind(), KsErrorKind::Parameter);
    }
    let mut reserved = meta(KeySize::Bits128);
    reserved.set_size_class(13);
    assert_eq!(
        h.ks.write_otp(OtpKeyId::Key2, reserved, &key),
        Err(KsError::DRIVER_KS_OTP_KEY_TOO_LARGE)
    );
    assert_eq!(h.periph.register_writes(), writes);
    assert!(h.periph.take_start_log().is_empty());
}

#[test]
fn test_write_otp() {
    let mut h = harness();
    let key = key_words(8, 0x0f);
    assert!(!h.ks.otp_key_present(OtpKeyId::Key3));
    assert_eq!(
        h.ks.write_otp(OtpKeyId::Key3, meta(KeySize::Bits256), &key),
        Ok(3)
    );
    assert!(h.ks.otp_key_present(OtpKeyId::Key3));
    assert_eq!(h.periph.stored_key(KeyMem::Otp, 3), Some(key.clone()));

    let mut out = [0u32; 8];
    h.ks.read(KsMemType::Otp, 3, &mut out).unwrap();
    assert_eq!(out[..], key[..]);

    // Write-once until erased
    assert_eq!(
        h.ks.write_otp(OtpKeyId::Key3, meta(KeySize::Bits256), &key),
        Err(KsError::DRIVER_KS_OTP_WRITE_FAILURE)
    );
    h.ks.erase_otp_key(OtpKeyId::Key3).unwrap();
    assert!(!h.ks.otp_key_present(OtpKeyId::Key3));
    assert_eq!(
        h.ks.write_otp(OtpKeyId::Key3, meta(KeySize::Bits256), &key),
        Ok(3)
    );
}

#[test]
fn test_write_to_otp_through_write() {
    let mut h = harness();
    let key = key_words(4, 0x21);
    let index = h
        .ks
        .write(KsMemType::Otp, meta(KeySize::Bits128).with_number(2), &key)
        .unwrap();
    assert_eq!(index, 2);
    assert!(h.ks.otp_key_present(OtpKeyId::Key2));
}

#[test]
fn test_write_to_otp_rejects_bad_index() {
    let mut h = harness();
    let writes = h.periph.register_writes();
    let key = key_words(4, 0x22);
    for index in [8, 9, 63] {
        let otp_meta = meta(KeySize::Bits128).with_number(index);
        assert_eq!(
            h.ks.write(KsMemType::Otp, otp_meta, &key),
            Err(KsError::DRIVER_KS_INVALID_KEY_INDEX)
        );
    }
    assert_eq!(h.periph.register_writes(), writes);
    assert!(h.periph.take_start_log().is_empty());
}

#[test]
fn test_lock_otp_key() {
    let mut h = harness();
    let key = key_words(4, 0x33);
    h.ks.write_otp(OtpKeyId::Key1, meta(KeySize::Bits128), &key)
        .unwrap();
    h.ks.lock_otp_key(OtpKeyId::Key1).unwrap();
    assert!(h.periph.is_otp_locked(1));

    let err = h
        .ks
        .write_otp(OtpKeyId::Key1, meta(KeySize::Bits128), &key)
        .unwrap_err();
    assert_eq!(err, KsError::DRIVER_KS_OTP_WRITE_FAILURE);
    assert_eq!(err.kind(), KsErrorKind::Fail);
    assert_eq!(
        h.ks.erase_otp_key(OtpKeyId::Key1),
        Err(KsError::DRIVER_KS_OTP_ERASE_FAILURE)
    );
    assert_eq!(h.periph.stored_key(KeyMem::Otp, 1), Some(key.clone()));

    // Locked keys stay readable
    let mut out = [0u32; 4];
    h.ks.read(KsMemType::Otp, 1, &mut out).unwrap();
    assert_eq!(out[..], key[..]);
}

#[test]
fn test_erase_all_restores_capacity() {
    let mut h = harness();
    let full_count = h.ks.remain_key_count(KsMemType::Sram).unwrap();
    let full_size = h.ks.remain_size(KsMemType::Sram).unwrap();
    assert_eq!((full_count, full_size), (32, 1024));

    let key = key_words(12, 8);
    for _ in 0..3 {
        h.ks.write(KsMemType::Sram, meta(KeySize::Bits384), &key)
            .unwrap();
    }
    assert_eq!(h.ks.remain_key_count(KsMemType::Sram), Ok(29));
    assert_eq!(h.ks.remain_size(KsMemType::Sram), Ok(1024 - 3 * 48));
    assert_eq!(h.ks.remain_key_count(KsMemType::Flash), Ok(32));

    h.ks.erase_all(KsMemType::Sram).unwrap();
    assert_eq!(h.ks.remain_key_count(KsMemType::Sram), Ok(full_count));
    assert_eq!(h.ks.remain_size(KsMemType::Sram), Ok(full_size));
}

#[test]
fn test_erase_all_otp_fails() {
    let mut h = harness();
    assert_eq!(
        h.ks.erase_all(KsMemType::Otp),
        Err(KsError::DRIVER_KS_ERASE_ALL_FAILURE)
    );
}

#[test]
fn test_storage_full() {
    let mut h = harness_with(
        Clock::new(),
        KeyStoreArgs {
            sram_keys: 2,
            ..Default::default()
        },
        SpinTimeout::new(10_000),
    );
    h.ks.open().unwrap();
    let key = key_words(4, 1);
    h.ks.write(KsMemType::Sram, meta(KeySize::Bits128), &key)
        .unwrap();
    h.ks.write(KsMemType::Sram, meta(KeySize::Bits128), &key)
        .unwrap();
    assert_eq!(h.ks.remain_key_count(KsMemType::Sram), Ok(0));
    assert_ne!(h.periph.status() & (1 << 3), 0);
    assert_eq!(
        h.ks.write(KsMemType::Sram, meta(KeySize::Bits128), &key),
        Err(KsError::DRIVER_KS_WRITE_FAILURE)
    );
}

#[test]
fn test_toggle_sram() {
    let mut h = harness();
    assert!(!h.ks.is_sram_inverted());
    let first = h.ks.toggle_sram().unwrap();
    let second = h.ks.toggle_sram().unwrap();
    assert_ne!(first, second);
    assert!(first);
    assert_eq!(h.ks.is_sram_inverted(), second);
}

#[test]
fn test_revoke_key() {
    let mut h = harness();
    let key = key_words(8, 0x77);
    let index = h.ks.write(KsMemType::Flash, meta(KeySize::Bits256), &key).unwrap();
    h.ks.revoke_key(KsMemType::Flash, index).unwrap();
    assert!(h.periph.is_revoked(KeyMem::Flash, index));

    // Revoked keys keep their storage
    assert_eq!(h.ks.remain_key_count(KsMemType::Flash), Ok(31));

    let mut out = [0u32; 8];
    assert_eq!(
        h.ks.read(KsMemType::Flash, index, &mut out),
        Err(KsError::DRIVER_KS_READ_FAILURE)
    );
    assert_ne!(h.periph.status() & (1 << 9), 0);

    assert_eq!(
        h.ks.revoke_key(KsMemType::Flash, 9),
        Err(KsError::DRIVER_KS_REVOKE_FAILURE)
    );
}

#[test]
fn test_unreadable_key() {
    let mut h = harness();
    let key = key_words(4, 0x10);
    let index = h
        .ks
        .write(
            KsMemType::Sram,
            KsMetadata::new(KeySize::Bits128, KeyOwner::Aes, KeyAttrs::SECURE),
            &key,
        )
        .unwrap();
    let mut out = [0u32; 4];
    assert_eq!(
        h.ks.read(KsMemType::Sram, index, &mut out),
        Err(KsError::DRIVER_KS_READ_FAILURE)
    );
}

#[test]
fn test_mode_bits() {
    let mut h = harness();
    let mode = KsMode::SILENT | KsMode::SCRAMBLE;
    h.ks.set_mode(mode).unwrap();
    assert_eq!(h.ks.mode(), mode);

    let key = key_words(13, 0x99);
    let index = h.ks.write(KsMemType::Flash, meta(KeySize::Bits409), &key).unwrap();
    h.ks.revoke_key(KsMemType::Flash, index).unwrap();
    h.ks.erase_all(KsMemType::Sram).unwrap();
    let log = h.periph.take_start_log();
    assert_eq!(log.len(), 4);
    assert!(log.iter().all(|&ctl| ctl & mode.bits() == mode.bits()));

    h.ks.write_otp(OtpKeyId::Key4, meta(KeySize::Bits128), &key)
        .unwrap();
    h.ks.lock_otp_key(OtpKeyId::Key4).unwrap();
    assert_eq!(
        h.periph.take_start_log(),
        [
            start_op(CTL::OPMODE::WRITE, false) | mode.bits(),
            start_op(CTL::OPMODE::LOCK, false),
        ]
    );

    // OTP lock and erase leave the mode bits cleared
    assert_eq!(h.ks.mode(), KsMode::empty());
    h.ks.write_otp(OtpKeyId::Key5, meta(KeySize::Bits128), &key)
        .unwrap();
    assert_eq!(
        h.periph.take_start_log(),
        [start_op(CTL::OPMODE::WRITE, false)]
    );

    h.ks.set_mode(KsMode::SCRAMBLE).unwrap();
    h.ks.erase_otp_key(OtpKeyId::Key5).unwrap();
    assert_eq!(
        h.periph.take_start_log(),
        [start_op(CTL::OPMODE::ERASE, false)]
    );
    assert_eq!(h.ks.mode(), KsMode::empty());
}

#[test]
fn test_warm_reset_loses_sram_keys() {
    let mut h = harness();
    let key = key_words(8, 0x44);
    let sram = h.ks.write(KsMemType::Sram, meta(KeySize::Bits256), &key).unwrap();
    let flash = h.ks.write(KsMemType::Flash, meta(KeySize::Bits256), &key).unwrap();
    h.ks.write_otp(OtpKeyId::Key6, meta(KeySize::Bits256), &key)
        .unwrap();

    let mut periph = h.periph.clone();
    periph.warm_reset();
    h.ks.open().unwrap();

    let mut out = [0u32; 8];
    assert_eq!(
        h.ks.read(KsMemType::Sram, sram, &mut out),
        Err(KsError::DRIVER_KS_READ_FAILURE)
    );
    h.ks.read(KsMemType::Flash, flash, &mut out).unwrap();
    assert_eq!(out[..], key[..]);
    assert!(h.ks.otp_key_present(OtpKeyId::Key6));
    assert_eq!(h.ks.remain_key_count(KsMemType::Sram), Ok(32));
}
