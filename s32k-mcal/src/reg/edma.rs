//! Enhanced direct memory access controller (eDMA)

use super::{instance, register, Reg};
use core::ops::Index;

instance!(
    /// The eDMA controller
    Edma = 0x4000_8000
);

/// Number of DMA channels on S32K14x
pub const CHANNELS: usize = 16;

/// eDMA register block
#[repr(C)]
pub struct RegisterBlock {
    /// Control
    pub cr: Reg<Cr>,
    /// Error status
    pub es: Reg<Es>,
    _reserved0: u32,
    /// Enable request
    pub erq: Reg<u32>,
    _reserved1: u32,
    /// Enable error interrupt
    pub eei: Reg<u32>,
    /// Clear enable error interrupt
    pub ceei: Reg<u8>,
    /// Set enable error interrupt
    pub seei: Reg<u8>,
    /// Clear enable request
    pub cerq: Reg<u8>,
    /// Set enable request
    pub serq: Reg<u8>,
    /// Clear DONE status bit
    pub cdne: Reg<u8>,
    /// Set START bit
    pub ssrt: Reg<u8>,
    /// Clear error
    pub cerr: Reg<u8>,
    /// Clear interrupt request
    pub cint: Reg<u8>,
    _reserved2: u32,
    /// Interrupt request
    pub int: Reg<u32>,
    _reserved3: u32,
    /// Error
    pub err: Reg<u32>,
    _reserved4: u32,
    /// Hardware request status
    pub hrs: Reg<u32>,
    _reserved5: [u32; 3],
    /// Enable asynchronous request in stop
    pub ears: Reg<u32>,
    _reserved6: [u32; 46],
    /// Channel priority
    pub dchpri: ChannelPriorityRegisters,
    _reserved7: [u32; 956],
    /// Transfer control descriptors
    pub tcd: [Tcd; CHANNELS],
}

const _: () = assert!(core::mem::offset_of!(RegisterBlock, ceei) == 0x18);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, cint) == 0x1F);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, int) == 0x24);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, err) == 0x2C);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, ears) == 0x44);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, dchpri) == 0x100);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, tcd) == 0x1000);

/// Channel priority registers, indexed by channel number.
///
/// `DCHPRIn` registers are laid out big-endian within each word:
///
///   3, 2, 1, 0, 7, 6, 5, 4, 11, 10, 9, 8, ...
#[repr(transparent)]
pub struct ChannelPriorityRegisters([Reg<Dchpri>; CHANNELS]);

impl Index<usize> for ChannelPriorityRegisters {
    type Output = Reg<Dchpri>;
    fn index(&self, channel: usize) -> &Reg<Dchpri> {
        &self.0[4 * (channel / 4) + (3 - (channel % 4))]
    }
}

/// Transfer control descriptor
#[repr(C)]
pub struct Tcd {
    /// Source address
    pub saddr: Reg<u32>,
    /// Signed source address offset
    pub soff: Reg<i16>,
    /// Transfer attributes
    pub attr: Reg<Attr>,
    /// Minor byte count
    pub nbytes: Reg<u32>,
    /// Last source address adjustment
    pub slast: Reg<i32>,
    /// Destination address
    pub daddr: Reg<u32>,
    /// Signed destination address offset
    pub doff: Reg<i16>,
    /// Current major iteration count
    pub citer: Reg<u16>,
    /// Last destination address adjustment / scatter gather address
    pub dlast_sga: Reg<i32>,
    /// Control and status
    pub csr: Reg<TcdCsr>,
    /// Beginning major iteration count
    pub biter: Reg<u16>,
}

const _: () = assert!(core::mem::size_of::<Tcd>() == 0x20);

register! {
    /// Control
    Cr(u32);
    /// Enable debug; stall new channel starts while in debug mode
    pub edbg, set_edbg: 1;
    /// Enable round robin channel arbitration
    pub erca, set_erca: 2;
    /// Halt on error
    pub hoe, set_hoe: 4;
    /// Halt DMA operations
    pub halt, set_halt: 5;
    /// Continuous link mode
    pub clm, set_clm: 6;
    /// Enable minor loop mapping
    pub emlm, set_emlm: 7;
    /// Error cancel transfer
    pub ecx, set_ecx: 16;
    /// Cancel transfer
    pub cx, set_cx: 17;
    /// DMA active status
    pub active, _: 31;
}

register! {
    /// Error status
    Es(u32);
    /// Destination bus error
    pub dbe, _: 0;
    /// Source bus error
    pub sbe, _: 1;
    /// Scatter/gather configuration error
    pub sge, _: 2;
    /// NBYTES/CITER configuration error
    pub nce, _: 3;
    /// Destination offset error
    pub doe, _: 4;
    /// Destination address error
    pub dae, _: 5;
    /// Source offset error
    pub soe, _: 6;
    /// Source address error
    pub sae, _: 7;
    /// Channel that generated the last error
    pub u8, errchn, _: 11, 8;
    /// Channel priority error
    pub cpe, _: 14;
    /// Transfer canceled
    pub ecx, _: 16;
    /// Logical OR of all ERR status bits
    pub vld, _: 31;
}

register! {
    /// Channel priority
    Dchpri(u8);
    /// Channel arbitration priority
    pub u8, chpri, set_chpri: 3, 0;
    /// Disable preempt ability
    pub dpa, set_dpa: 6;
    /// Enable channel preemption
    pub ecp, set_ecp: 7;
}

register! {
    /// Transfer attributes
    Attr(u16);
    /// Destination data transfer size
    pub u8, dsize, set_dsize: 2, 0;
    /// Destination address modulo
    pub u8, dmod, set_dmod: 7, 3;
    /// Source data transfer size
    pub u8, ssize, set_ssize: 10, 8;
    /// Source address modulo
    pub u8, smod, set_smod: 15, 11;
}

register! {
    /// TCD control and status
    TcdCsr(u16);
    /// Channel start
    pub start, set_start: 0;
    /// Interrupt when major iteration count completes
    pub intmajor, set_intmajor: 1;
    /// Interrupt when major counter is half complete
    pub inthalf, set_inthalf: 2;
    /// Disable request when major iteration count completes
    pub dreq, set_dreq: 3;
    /// Enable scatter/gather processing
    pub esg, set_esg: 4;
    /// Enable channel-to-channel linking on major loop complete
    pub majorelink, set_majorelink: 5;
    /// Channel active
    pub active, set_active: 6;
    /// Channel done
    pub done, set_done: 7;
    /// Major loop link channel number
    pub u8, majorlinkch, set_majorlinkch: 11, 8;
    /// Bandwidth control
    pub u8, bwc, set_bwc: 15, 14;
}
