/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the Key Store driver library.

--*/

#![cfg_attr(not(feature = "std"), no_std)]

mod key_store;
mod metadata;
pub mod printer;
mod wait;

pub use key_store::{KeyStore, KsMode};
pub use ks_error::{KsError, KsErrorKind, KsResult};
pub use metadata::{
    key_word_count, KeyAttrs, KeyOwner, KeySize, KsMemType, KsMetadata, OtpKeyId, MAX_KEY_INDEX,
};
pub use wait::{until, SpinTimeout, TickTimeout, TimeoutPolicy, KS_TIMEOUT};
