//! FlexTimer Module (FTM)

use super::{instance, register, Reg};

instance!(
    /// FlexTimer 0
    Ftm0 = 0x4003_8000
);
instance!(
    /// FlexTimer 1
    Ftm1 = 0x4003_9000
);
instance!(
    /// FlexTimer 2
    Ftm2 = 0x4003_A000
);
instance!(
    /// FlexTimer 3
    Ftm3 = 0x4002_6000
);

/// Number of channels of every FTM instance
pub const CHANNELS: usize = 8;

/// FTM register block
#[repr(C)]
pub struct RegisterBlock {
    /// Status and control
    pub sc: Reg<Sc>,
    /// Counter
    pub cnt: Reg<u32>,
    /// Modulo
    pub modulo: Reg<u32>,
    /// Channel status/control and value pairs
    pub channel: [Channel; CHANNELS],
    /// Counter initial value
    pub cntin: Reg<u32>,
    /// Capture and compare status (mirror of `CnSC[CHF]`)
    pub status: Reg<u32>,
    /// Features mode selection
    pub mode: Reg<u32>,
    _reserved0: [u32; 3],
    /// Function for linked channels
    pub combine: Reg<u32>,
    _reserved1: [u32; 4],
    /// Input capture filter control
    pub filter: Reg<Filter>,
}

/// Channel `n` registers
#[repr(C)]
pub struct Channel {
    /// Channel status and control
    pub csc: Reg<Csc>,
    /// Channel value; holds the captured counter in input capture mode
    pub cv: Reg<u32>,
}

const _: () = assert!(core::mem::offset_of!(RegisterBlock, channel) == 0x0C);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, cntin) == 0x4C);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, status) == 0x50);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, combine) == 0x64);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, filter) == 0x78);

register! {
    /// Status and control
    Sc(u32);
    /// Prescale factor selection, divides the clock by `2^ps`
    pub u8, ps, set_ps: 2, 0;
    /// Clock source selection; 0 = counter disabled, 1 = FTM input clock
    pub u8, clks, set_clks: 4, 3;
    /// Center-aligned PWM select
    pub cpwms, set_cpwms: 5;
    /// Timer overflow interrupt enable
    pub toie, set_toie: 8;
    /// Timer overflow flag
    pub tof, set_tof: 9;
}

register! {
    /// Channel status and control
    Csc(u32);
    /// DMA enable
    pub dma, set_dma: 0;
    /// Edge or level select A
    pub elsa, set_elsa: 2;
    /// Edge or level select B
    pub elsb, set_elsb: 3;
    /// Channel mode select A
    pub msa, set_msa: 4;
    /// Channel mode select B
    pub msb, set_msb: 5;
    /// Channel interrupt enable
    pub chie, set_chie: 6;
    /// Channel flag
    pub chf, set_chf: 7;
    /// Channel input state, value of the channel input after the filter
    pub chis, set_chis: 9;
}

register! {
    /// Input capture filter values for channels 0 to 3
    Filter(u32);
    pub u8, ch0fval, set_ch0fval: 3, 0;
    pub u8, ch1fval, set_ch1fval: 7, 4;
    pub u8, ch2fval, set_ch2fval: 11, 8;
    pub u8, ch3fval, set_ch3fval: 15, 12;
}

impl Filter {
    /// Filter value of `channel`; channels 4 to 7 have no input filter.
    pub fn value(&self, channel: usize) -> Option<u8> {
        match channel {
            0 => Some(self.ch0fval()),
            1 => Some(self.ch1fval()),
            2 => Some(self.ch2fval()),
            3 => Some(self.ch3fval()),
            _ => None,
        }
    }

    /// Sets the filter value of `channel`; ignored for channels without filter.
    pub fn set_value(&mut self, channel: usize, value: u8) {
        match channel {
            0 => self.set_ch0fval(value),
            1 => self.set_ch1fval(value),
            2 => self.set_ch2fval(value),
            3 => self.set_ch3fval(value),
            _ => {}
        }
    }
}
