//! Cyclic Redundancy Check (CRC) unit

use super::{instance, register, Reg};

instance!(
    /// The CRC unit
    Crc = 0x4003_2000
);

/// CRC register block
#[repr(C)]
pub struct RegisterBlock {
    /// Data register. Written with data or (when `CTRL[WAS]` is set) seed,
    /// read for the checksum.
    pub data: Reg<u32>,
    /// Generator polynomial
    pub gpoly: Reg<u32>,
    /// Control register
    pub ctrl: Reg<Ctrl>,
}

const _: () = assert!(core::mem::offset_of!(RegisterBlock, gpoly) == 0x4);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, ctrl) == 0x8);

impl RegisterBlock {
    /// Lowest byte lane of `DATA` (`DATALL`), used for 8-bit data writes.
    pub fn data_ll(&self) -> &Reg<u8> {
        // Safety: `Reg` is transparent over the value and the byte lane is the
        // first byte of the little-endian 32-bit register.
        unsafe { &*(self.data.as_ptr() as *const Reg<u8>) }
    }
}

register! {
    /// CRC control register
    Ctrl(u32);
    /// Width of the CRC protocol; 0 = 16 bits, 1 = 32 bits
    pub tcrc, set_tcrc: 24;
    /// Write as seed
    pub was, set_was: 25;
    /// Complement read of the data register
    pub fxor, set_fxor: 26;
    /// Type of transpose for read
    pub u8, totr, set_totr: 29, 28;
    /// Type of transpose for writes
    pub u8, tot, set_tot: 31, 30;
}
