//! Low Power Interrupt Timer (LPIT)

use super::{instance, register, Reg};

instance!(
    /// The LPIT instance
    Lpit0 = 0x4003_7000
);

/// Number of timer channels
pub const CHANNELS: usize = 4;

/// LPIT register block
#[repr(C)]
pub struct RegisterBlock {
    /// Version ID
    pub verid: Reg<u32>,
    /// Parameter
    pub param: Reg<u32>,
    /// Module control
    pub mcr: Reg<Mcr>,
    /// Module status; `TIFn` flags, write 1 to clear
    pub msr: Reg<u32>,
    /// Module interrupt enable; `TIEn` bits
    pub mier: Reg<u32>,
    /// Set timer enable
    pub setten: Reg<u32>,
    /// Clear timer enable
    pub clrten: Reg<u32>,
    _reserved0: u32,
    /// Timer channels
    pub channel: [Channel; CHANNELS],
}

/// Timer channel `n` registers
#[repr(C)]
pub struct Channel {
    /// Timer value; in input capture mode holds the inverse of the counter at
    /// the last trigger
    pub tval: Reg<u32>,
    /// Current timer value
    pub cval: Reg<u32>,
    /// Timer control
    pub tctrl: Reg<Tctrl>,
    _reserved: u32,
}

const _: () = assert!(core::mem::offset_of!(RegisterBlock, mier) == 0x10);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, channel) == 0x20);
const _: () = assert!(core::mem::size_of::<Channel>() == 0x10);

register! {
    /// Module control
    Mcr(u32);
    /// Module clock enable
    pub m_cen, set_m_cen: 0;
    /// Software reset
    pub sw_rst, set_sw_rst: 1;
    /// Keep running in doze mode
    pub doze_en, set_doze_en: 2;
    /// Keep running in debug mode
    pub dbg_en, set_dbg_en: 3;
}

/// `TCTRL[MODE]` value for trigger input capture
pub const MODE_INPUT_CAPTURE: u8 = 3;

register! {
    /// Timer control
    Tctrl(u32);
    /// Timer enable
    pub t_en, set_t_en: 0;
    /// Chain channel
    pub chain, set_chain: 1;
    /// Timer operation mode
    pub u8, mode, set_mode: 3, 2;
    /// Timer start on trigger
    pub tsot, set_tsot: 16;
    /// Timer stop on interrupt
    pub tsoi, set_tsoi: 17;
    /// Timer reload on trigger
    pub trot, set_trot: 18;
    /// Trigger source; 0 = external (TRGMUX), 1 = internal
    pub trg_src, set_trg_src: 23;
    /// Trigger select
    pub u8, trg_sel, set_trg_sel: 27, 24;
}
