/*++

Licensed under the Apache-2.0 license.

File Name:

    metadata.rs

Abstract:

    File contains types describing key store keys: memory type, size class,
    owner and attribute flags, and the metadata register encoding.

--*/

use bitfield::bitfield;
use ks_error::{KsError, KsResult};
use ks_registers::ks::OTP_KEY_COUNT;

/// Word count of each metadata size class. Classes past the end of the
/// table are reserved and map to zero.
const KEY_WORD_COUNTS: [u8; 21] = [
    4, 6, 6, 7, 8, 8, 8, 9, 12, 13, 16, 17, 18, 0, 0, 0, 32, 48, 64, 96, 128,
];

/// Largest key index the metadata register can carry.
pub const MAX_KEY_INDEX: u32 = 63;

/// Memory a key is stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KsMemType {
    /// Volatile key storage, lost on reset
    Sram = 0,

    /// Non-volatile key storage
    Flash = 1,

    /// Write-once key storage, at most 256-bit keys
    Otp = 2,
}

impl From<KsMemType> for u32 {
    /// Converts to this type from the input type.
    fn from(mem: KsMemType) -> Self {
        mem as Self
    }
}

/// Key length classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySize {
    Bits128 = 0,
    Bits163 = 1,
    Bits192 = 2,
    Bits224 = 3,
    Bits233 = 4,
    Bits255 = 5,
    Bits256 = 6,
    Bits283 = 7,
    Bits384 = 8,
    Bits409 = 9,
    Bits512 = 10,
    Bits521 = 11,
    Bits571 = 12,
    Bits1024 = 16,
    Bits1536 = 17,
    Bits2048 = 18,
    Bits3072 = 19,
    Bits4096 = 20,
}

impl KeySize {
    /// Number of 32-bit words a key of this size occupies.
    pub fn word_count(self) -> usize {
        size_class_word_count(self as u32)
    }

    /// True if keys of this size can be stored in OTP.
    pub fn fits_otp(self) -> bool {
        self as u32 <= KeySize::Bits256 as u32
    }
}

/// Engine allowed to use a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOwner {
    Aes = 0,
    Hmac = 1,
    RsaExp = 2,
    RsaMid = 3,
    Ecc = 4,
    Cpu = 5,
}

bitflags::bitflags! {
    /// Key attribute bits, at their metadata register positions.
    pub struct KeyAttrs: u32 {
        /// Key belongs to the secure world
        const SECURE = 1 << 0;

        /// Key can only be used by privileged code
        const PRIVILEGED = 1 << 1;

        /// Key can be read back by the CPU
        const READABLE = 1 << 2;

        /// Key is used during boot
        const BOOT = 1 << 4;
    }
}

bitfield! {
    /// Key Store metadata register encoding
    #[derive(Default, PartialEq, Eq, Clone, Copy)]
    pub struct KsMetadata(u32);

    /// Flag indicating the key belongs to the secure world
    pub secure, set_secure: 0;

    /// Flag indicating the key is restricted to privileged code
    pub privileged, set_privileged: 1;

    /// Flag indicating the CPU may read the key back
    pub readable, set_readable: 2;

    /// Flag indicating the key has been revoked
    pub revoked, _: 3;

    /// Flag indicating a boot key
    pub boot_key, set_boot_key: 4;

    /// Size class
    pub u32, size_class, set_size_class: 12, 8;

    /// Owner engine
    pub u32, owner_bits, set_owner_bits: 18, 16;

    /// Key index
    pub u32, number, set_number: 25, 20;

    /// Destination memory
    pub u32, dst_bits, set_dst_bits: 31, 30;
}

impl KsMetadata {
    /// Metadata for a key of `size` used by `owner`, with `attrs` set.
    pub fn new(size: KeySize, owner: KeyOwner, attrs: KeyAttrs) -> Self {
        let mut meta = Self(attrs.bits());
        meta.set_size_class(size as u32);
        meta.set_owner_bits(owner as u32);
        meta
    }

    /// Attribute flags carried by this metadata.
    pub fn attrs(&self) -> KeyAttrs {
        KeyAttrs::from_bits_truncate(self.0)
    }

    /// Size class, or `None` for a reserved class.
    pub fn size(&self) -> Option<KeySize> {
        let size = match self.size_class() {
            0 => KeySize::Bits128,
            1 => KeySize::Bits163,
            2 => KeySize::Bits192,
            3 => KeySize::Bits224,
            4 => KeySize::Bits233,
            5 => KeySize::Bits255,
            6 => KeySize::Bits256,
            7 => KeySize::Bits283,
            8 => KeySize::Bits384,
            9 => KeySize::Bits409,
            10 => KeySize::Bits512,
            11 => KeySize::Bits521,
            12 => KeySize::Bits571,
            16 => KeySize::Bits1024,
            17 => KeySize::Bits1536,
            18 => KeySize::Bits2048,
            19 => KeySize::Bits3072,
            20 => KeySize::Bits4096,
            _ => return None,
        };
        Some(size)
    }

    /// Owner engine, or `None` for an unassigned encoding.
    pub fn owner(&self) -> Option<KeyOwner> {
        let owner = match self.owner_bits() {
            0 => KeyOwner::Aes,
            1 => KeyOwner::Hmac,
            2 => KeyOwner::RsaExp,
            3 => KeyOwner::RsaMid,
            4 => KeyOwner::Ecc,
            5 => KeyOwner::Cpu,
            _ => return None,
        };
        Some(owner)
    }

    /// Destination memory, or `None` for the reserved encoding.
    pub fn mem_type(&self) -> Option<KsMemType> {
        match self.dst_bits() {
            0 => Some(KsMemType::Sram),
            1 => Some(KsMemType::Flash),
            2 => Some(KsMemType::Otp),
            _ => None,
        }
    }

    /// Word count of the size class; zero for reserved classes.
    pub fn word_count(&self) -> usize {
        size_class_word_count(self.size_class())
    }

    /// Returns a copy with the destination memory set.
    pub fn with_mem_type(mut self, mem: KsMemType) -> Self {
        self.set_dst_bits(mem.into());
        self
    }

    /// Returns a copy with the key index set.
    pub fn with_number(mut self, index: u32) -> Self {
        self.set_number(index);
        self
    }

    /// Metadata addressing key `index` in `mem`, with no other fields set.
    pub(crate) fn address(mem: KsMemType, index: u32) -> Self {
        Self::default().with_mem_type(mem).with_number(index)
    }
}

impl From<u32> for KsMetadata {
    /// Converts to this type from the input type.
    fn from(val: u32) -> Self {
        Self(val)
    }
}

impl From<KsMetadata> for u32 {
    /// Converts to this type from the input type.
    fn from(meta: KsMetadata) -> Self {
        meta.0
    }
}

impl core::fmt::Debug for KsMetadata {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KsMetadata")
            .field("mem_type", &self.mem_type())
            .field("size", &self.size())
            .field("owner", &self.owner())
            .field("attrs", &self.attrs())
            .field("revoked", &self.revoked())
            .field("number", &self.number())
            .finish()
    }
}

fn size_class_word_count(size_class: u32) -> usize {
    KEY_WORD_COUNTS
        .get(size_class as usize)
        .map_or(0, |&count| count as usize)
}

/// Number of 32-bit words of a key described by `meta`.
///
/// Reserved size classes yield zero.
pub fn key_word_count(meta: KsMetadata) -> usize {
    meta.word_count()
}

/// OTP key slot
///
/// Slot 0 is reserved by convention for the root-of-trust public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpKeyId {
    Key0 = 0,
    Key1 = 1,
    Key2 = 2,
    Key3 = 3,
    Key4 = 4,
    Key5 = 5,
    Key6 = 6,
    Key7 = 7,
}

impl OtpKeyId {
    /// All OTP slots in index order.
    pub const ALL: [OtpKeyId; OTP_KEY_COUNT as usize] = [
        OtpKeyId::Key0,
        OtpKeyId::Key1,
        OtpKeyId::Key2,
        OtpKeyId::Key3,
        OtpKeyId::Key4,
        OtpKeyId::Key5,
        OtpKeyId::Key6,
        OtpKeyId::Key7,
    ];
}

impl From<OtpKeyId> for u32 {
    /// Converts to this type from the input type.
    fn from(id: OtpKeyId) -> Self {
        id as Self
    }
}

impl TryFrom<u32> for OtpKeyId {
    type Error = KsError;

    fn try_from(val: u32) -> KsResult<Self> {
        Self::ALL
            .get(val as usize)
            .copied()
            .ok_or(KsError::DRIVER_KS_INVALID_KEY_INDEX)
    }
}
