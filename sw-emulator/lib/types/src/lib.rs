/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the Key Store Emulator Types library.

--*/

mod macros;

/// Bus data width
pub type BusData = u32;

/// Bus address width
pub type BusAddr = u32;

emu_enum!(
    /// Bus access size
    #[derive(Debug, Eq, PartialEq, Copy, Clone)]
    pub AccessSize;
    usize;
    {
        Byte = 1,
        HalfWord = 2,
        Word = 4,
    };
    Invalid
);
