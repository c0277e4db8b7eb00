//! Port control and interrupts (PORT)

use super::{instance, register, Reg};

instance!(
    /// Port A pin control
    PortA = 0x4004_9000
);
instance!(
    /// Port B pin control
    PortB = 0x4004_A000
);
instance!(
    /// Port C pin control
    PortC = 0x4004_B000
);
instance!(
    /// Port D pin control
    PortD = 0x4004_C000
);
instance!(
    /// Port E pin control
    PortE = 0x4004_D000
);

/// Number of pins of every port
pub const PINS: usize = 32;

/// PORT register block
#[repr(C)]
pub struct RegisterBlock {
    /// Pin control register of each pin
    pub pcr: [Reg<Pcr>; PINS],
    /// Global pin control low
    pub gpclr: Reg<u32>,
    /// Global pin control high
    pub gpchr: Reg<u32>,
    /// Global interrupt control low
    pub giclr: Reg<u32>,
    /// Global interrupt control high
    pub gichr: Reg<u32>,
    _reserved0: [u32; 4],
    /// Interrupt status flags, write 1 to clear
    pub isfr: Reg<u32>,
    _reserved1: [u32; 7],
    /// Digital filter enable
    pub dfer: Reg<u32>,
    /// Digital filter clock
    pub dfcr: Reg<u32>,
    /// Digital filter width
    pub dfwr: Reg<u32>,
}

const _: () = assert!(core::mem::offset_of!(RegisterBlock, gpclr) == 0x80);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, isfr) == 0xA0);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, dfer) == 0xC0);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, dfwr) == 0xC8);

register! {
    /// Pin control
    Pcr(u32);
    /// Pull select; 0 = pulldown, 1 = pullup
    pub ps, set_ps: 0;
    /// Pull enable
    pub pe, set_pe: 1;
    /// Passive filter enable
    pub pfe, set_pfe: 4;
    /// Drive strength enable
    pub dse, set_dse: 6;
    /// Pin mux control
    pub u8, mux, set_mux: 10, 8;
    /// Lock register; PCR bits 15:0 are read only until next reset
    pub lk, set_lk: 15;
    /// Interrupt configuration
    pub u8, irqc, set_irqc: 19, 16;
    /// Interrupt status flag
    pub isf, set_isf: 24;
}

/// `PCR[IRQC]` values used for interrupt generation
pub mod irqc {
    /// Interrupt/DMA request disabled
    pub const DISABLED: u8 = 0x0;
    /// Interrupt on rising edge
    pub const RISING: u8 = 0x9;
    /// Interrupt on falling edge
    pub const FALLING: u8 = 0xA;
    /// Interrupt on either edge
    pub const EITHER: u8 = 0xB;
}
