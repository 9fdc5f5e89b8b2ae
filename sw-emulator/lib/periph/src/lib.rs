/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the Key Store Emulator Peripheral library.

--*/
mod key_store;

pub use key_store::{KeyMem, KeyStore, KeyStoreArgs};

use std::fmt::Write;
use std::sync::Arc;
use std::sync::RwLock;

use lazy_static::lazy_static;

lazy_static! {
    /// Text logged by the simulated peripherals.
    pub static ref GLOBAL_OUTPUT: Arc<RwLock<Vec<u8>>> = Arc::new(RwLock::new(Vec::new()));
}

pub struct OutputWriter {}

impl Write for OutputWriter {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        let mut output = GLOBAL_OUTPUT.write().map_err(|_| std::fmt::Error)?;
        output.extend_from_slice(s.as_bytes());
        Ok(())
    }
}

pub fn output() -> OutputWriter {
    OutputWriter {}
}

/// Returns the logged text collected so far.
pub fn output_contents() -> String {
    GLOBAL_OUTPUT
        .read()
        .map(|output| String::from_utf8_lossy(&output).into_owned())
        .unwrap_or_default()
}
