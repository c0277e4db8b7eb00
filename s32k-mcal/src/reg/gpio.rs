//! General purpose input/output (GPIO)

use super::{instance, Reg};

instance!(
    /// Port A data
    PtA = 0x400F_F000
);
instance!(
    /// Port B data
    PtB = 0x400F_F040
);
instance!(
    /// Port C data
    PtC = 0x400F_F080
);
instance!(
    /// Port D data
    PtD = 0x400F_F0C0
);
instance!(
    /// Port E data
    PtE = 0x400F_F100
);

/// GPIO register block; bit `n` of every register refers to pin `n`
#[repr(C)]
pub struct RegisterBlock {
    /// Port data output
    pub pdor: Reg<u32>,
    /// Port set output, write only
    pub psor: Reg<u32>,
    /// Port clear output, write only
    pub pcor: Reg<u32>,
    /// Port toggle output, write only
    pub ptor: Reg<u32>,
    /// Port data input
    pub pdir: Reg<u32>,
    /// Port data direction; 1 = output
    pub pddr: Reg<u32>,
    /// Port input disable
    pub pidr: Reg<u32>,
}

const _: () = assert!(core::mem::offset_of!(RegisterBlock, pdir) == 0x10);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, pidr) == 0x18);
