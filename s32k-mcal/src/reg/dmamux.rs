//! DMA channel multiplexer (DMAMUX)

use super::{edma, instance, register, Reg};

instance!(
    /// The DMA channel multiplexer
    Dmamux = 0x4002_1000
);

/// DMAMUX register block
#[repr(C)]
pub struct RegisterBlock {
    /// Channel configuration, one register per eDMA channel
    pub chcfg: [Reg<Chcfg>; edma::CHANNELS],
}

register! {
    /// Channel configuration
    Chcfg(u8);
    /// DMA request source slot
    pub u8, source, set_source: 5, 0;
    /// DMA channel trigger enable (periodic trigger through LPIT)
    pub trig, set_trig: 6;
    /// DMA channel enable
    pub enbl, set_enbl: 7;
}
