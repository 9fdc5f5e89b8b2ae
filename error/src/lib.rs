/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains API and macros used by the key store for error handling

--*/
#![cfg_attr(not(feature = "std"), no_std)]
use core::convert::From;
use core::num::{NonZeroU32, TryFromIntError};

/// Key Store Error Type
/// Derives debug, copy, clone, eq, and partial eq
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct KsError(pub NonZeroU32);

/// Coarse classification of a [`KsError`].
///
/// Every error constant lives in the code range of exactly one kind; the
/// kind is stored in the upper half-word of the code.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KsErrorKind {
    /// Hardware reported its error flag after a completed transaction
    Fail = 1,

    /// A bounded polling loop ran out of budget
    Timeout = 2,

    /// Peripheral was mid-transaction when the call was made
    Busy = 4,

    /// Argument rejected before any hardware access
    Parameter = 5,
}

impl KsErrorKind {
    /// Negative status value for this kind, as used by C callers.
    pub const fn status(self) -> i32 {
        -(self as i32)
    }
}

/// Macro to define error constants ensuring uniqueness
///
/// This macro takes a list of (name, value, doc) tuples and generates
/// constant definitions for each error code.
#[macro_export]
macro_rules! define_error_constants {
    ($(($name:ident, $value:expr, $doc:expr)),* $(,)?) => {
        $(
            #[doc = $doc]
            pub const $name: KsError = KsError::new_const($value);
        )*

        #[cfg(test)]
        /// Returns a vector of all defined error constants for testing uniqueness
        pub fn all_constants() -> Vec<(& 'static str, u32)> {
            vec![
                $(
                    (stringify!($name), $value),
                )*
            ]
        }
    };
}

impl KsError {
    /// Create a key store error; intended to only be used from const contexts, as we don't want
    /// runtime panics if val is zero. The preferred way to get a KsError from a u32 is to
    /// use `KsError::try_from()` from the `TryFrom` trait impl.
    const fn new_const(val: u32) -> Self {
        match NonZeroU32::new(val) {
            Some(val) => Self(val),
            None => panic!("KsError cannot be 0"),
        }
    }

    define_error_constants![
        (
            DRIVER_KS_READ_FAILURE,
            0x0001_0002,
            "Key store rejected the key read"
        ),
        (
            DRIVER_KS_WRITE_FAILURE,
            0x0001_0003,
            "Key store rejected the key write"
        ),
        (
            DRIVER_KS_OTP_WRITE_FAILURE,
            0x0001_0004,
            "Key store rejected the OTP key write"
        ),
        (
            DRIVER_KS_ERASE_FAILURE,
            0x0001_0005,
            "Key store rejected the key erase"
        ),
        (
            DRIVER_KS_OTP_ERASE_FAILURE,
            0x0001_0006,
            "Key store rejected the OTP key erase"
        ),
        (
            DRIVER_KS_ERASE_ALL_FAILURE,
            0x0001_0007,
            "Key store rejected the erase of a whole memory"
        ),
        (
            DRIVER_KS_OTP_LOCK_FAILURE,
            0x0001_0008,
            "Key store rejected the OTP key lock"
        ),
        (
            DRIVER_KS_REVOKE_FAILURE,
            0x0001_0009,
            "Key store rejected the key revocation"
        ),
        (
            DRIVER_KS_REMAN_FAILURE,
            0x0001_000a,
            "Key store rejected the SRAM anti-remanence toggle"
        ),
        (
            DRIVER_KS_TIMEOUT,
            0x0002_0001,
            "Timed out waiting for a key store transaction to complete"
        ),
        (
            DRIVER_KS_READY_TIMEOUT,
            0x0002_0002,
            "Timed out waiting for the key store to become idle"
        ),
        (
            DRIVER_KS_INIT_TIMEOUT,
            0x0002_0003,
            "Timed out waiting for key store initialization"
        ),
        (
            DRIVER_KS_BUSY,
            0x0004_0001,
            "Key store is busy with another transaction"
        ),
        (
            DRIVER_KS_INVALID_KEY_SIZE,
            0x0005_0001,
            "Metadata size class maps to zero words"
        ),
        (
            DRIVER_KS_OTP_KEY_TOO_LARGE,
            0x0005_0002,
            "OTP keys are limited to 256 bits"
        ),
        (
            DRIVER_KS_INVALID_MEM_TYPE,
            0x0005_0003,
            "Memory type not supported by this operation"
        ),
        (
            DRIVER_KS_INVALID_KEY_INDEX,
            0x0005_0004,
            "Key index out of range for the memory type"
        ),
        (
            DRIVER_KS_KEY_BUFFER_TOO_SMALL,
            0x0005_0005,
            "Key buffer holds fewer words than the size class requires"
        ),
        (
            DRIVER_KS_EMPTY_KEY_BUFFER,
            0x0005_0006,
            "Key buffer is empty"
        ),
    ];

    /// Kind of this error, taken from the upper half-word of the code.
    ///
    /// Codes that do not carry a known kind are reported as `Fail`.
    pub fn kind(&self) -> KsErrorKind {
        match self.0.get() >> 16 {
            2 => KsErrorKind::Timeout,
            4 => KsErrorKind::Busy,
            5 => KsErrorKind::Parameter,
            _ => KsErrorKind::Fail,
        }
    }

    /// Negative status value of this error.
    pub fn status(&self) -> i32 {
        self.kind().status()
    }
}

impl From<core::num::NonZeroU32> for crate::KsError {
    fn from(val: core::num::NonZeroU32) -> Self {
        crate::KsError(val)
    }
}

impl From<KsError> for core::num::NonZeroU32 {
    fn from(val: KsError) -> Self {
        val.0
    }
}

impl From<KsError> for u32 {
    fn from(val: KsError) -> Self {
        core::num::NonZeroU32::from(val).get()
    }
}

impl TryFrom<u32> for KsError {
    type Error = TryFromIntError;
    fn try_from(val: u32) -> Result<Self, TryFromIntError> {
        match NonZeroU32::try_from(val) {
            Ok(val) => Ok(KsError(val)),
            Err(err) => Err(err),
        }
    }
}

pub type KsResult<T> = Result<T, KsError>;
