//! eDMA and DMAMUX driver
//!
//! Channels are addressed by their index in [`DmaConfig::channels`]; each one
//! is bound to an eDMA channel and a DMAMUX request source at construction. A
//! transfer is described by a [`TransferConfig`] written into the channel's
//! transfer control descriptor (TCD) with [`Dma::configure`], then started
//! either by software ([`Dma::start`]) or by the peripheral
//! ([`Dma::enable_hardware_request`]).
//!
//! Completion can be polled with [`Dma::wait`] or reported from the channel
//! interrupt through [`Dma::handle_interrupt`]. All methods take `&self`;
//! the busy state of each channel is claimed inside a critical section.

mod config;

pub use config::{
    Arbitration, Bandwidth, DmaChannelConfig, DmaConfig, TransferConfig, TransferSize,
};

use crate::log;
use crate::reg::{self, dmamux, edma};
use crate::state::{ChannelState, StateCell};
use s32k_mcal_core::Dependencies;

/// Decoded contents of the eDMA error status register
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ErrorStatus {
    /// Bus error on a destination write
    pub destination_bus: bool,
    /// Bus error on a source read
    pub source_bus: bool,
    /// Invalid scatter/gather address
    pub scatter_gather: bool,
    /// Minor loop byte count or major iteration counts inconsistent
    pub nbytes_citer: bool,
    /// Destination offset not aligned to the destination size
    pub destination_offset: bool,
    /// Destination address not aligned to the destination size
    pub destination_address: bool,
    /// Source offset not aligned to the source size
    pub source_offset: bool,
    /// Source address not aligned to the source size
    pub source_address: bool,
    /// Channel priorities are not unique
    pub priority: bool,
    /// The transfer was canceled
    pub canceled: bool,
}

impl From<edma::Es> for ErrorStatus {
    fn from(es: edma::Es) -> Self {
        Self {
            destination_bus: es.dbe(),
            source_bus: es.sbe(),
            scatter_gather: es.sge(),
            nbytes_citer: es.nce(),
            destination_offset: es.doe(),
            destination_address: es.dae(),
            source_offset: es.soe(),
            source_address: es.sae(),
            priority: es.cpe(),
            canceled: es.ecx(),
        }
    }
}

/// Errors reported by the DMA driver
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Channel index not part of the configuration, or eDMA channel out of
    /// range
    InvalidChannel,
    /// Two channels use the same eDMA channel
    DuplicateChannel,
    /// Priority out of range, or not unique with fixed arbitration
    InvalidPriority,
    /// DMAMUX source out of range, or periodic trigger on a channel without
    /// one
    InvalidSource,
    /// A transfer is in progress on the channel
    Busy,
    /// The transfer description is inconsistent
    InvalidTransfer,
    /// The engine reported an error for the channel
    Transfer(ErrorStatus),
}

impl From<crate::state::Busy> for Error {
    fn from(_: crate::state::Busy) -> Self {
        Self::Busy
    }
}

/// Notification sent from the DMA interrupts
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// All major iterations are done
    TransferComplete,
    /// Half of the major iterations are done
    HalfComplete,
    /// The transfer was aborted by an error
    TransferError(ErrorStatus),
}

/// Receiver of DMA notifications
pub trait Notify {
    /// `event` happened on `channel`.
    fn notify(&mut self, channel: usize, event: Event);
}

impl<F: FnMut(usize, Event)> Notify for F {
    fn notify(&mut self, channel: usize, event: Event) {
        self(channel, event)
    }
}

/// Snapshot of a channel
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelStatus {
    /// Driver state
    pub state: ChannelState,
    /// The engine is executing the channel
    pub active: bool,
    /// The major loop completed
    pub done: bool,
    /// An error is pending
    pub error: bool,
    /// Hardware requests are enabled
    pub request_enabled: bool,
    /// Remaining major iterations
    pub remaining_iterations: u16,
}

/// eDMA driver
pub struct Dma<'a> {
    edma: &'a edma::RegisterBlock,
    dmamux: &'a dmamux::RegisterBlock,
    config: DmaConfig<'a>,
    logical: [Option<usize>; edma::CHANNELS],
    state: [StateCell; edma::CHANNELS],
}

// Safety: channel registers are only written by the holder of the channel's
// busy claim or through the atomic set/clear registers of the controller.
unsafe impl Sync for Dma<'_> {}

impl<'a> Dma<'a> {
    /// Creates the driver for the eDMA controller and its multiplexer.
    pub fn new<D>(dependencies: &'a mut D, config: DmaConfig<'a>) -> Result<Self, Error>
    where
        D: Dependencies<edma::Edma> + Dependencies<dmamux::Dmamux>,
    {
        let _ = dependencies;
        // Safety: the exclusive borrow of `dependencies` implies ownership of both
        // register blocks for `'a`.
        unsafe {
            Self::from_registers(
                reg::register_block::<edma::Edma, _>(),
                reg::register_block::<dmamux::Dmamux, _>(),
                config,
            )
        }
    }

    /// Creates the driver on top of arbitrary register blocks.
    ///
    /// # Safety
    /// `edma` and `dmamux` must be the eDMA and DMAMUX register blocks (or
    /// memory standing in for them) and must not be accessed by anything
    /// else while the driver exists.
    pub unsafe fn from_registers(
        edma: &'a edma::RegisterBlock,
        dmamux: &'a dmamux::RegisterBlock,
        config: DmaConfig<'a>,
    ) -> Result<Self, Error> {
        let mut logical = [None; edma::CHANNELS];
        for (n, channel) in config.channels.iter().enumerate() {
            let slot = logical
                .get_mut(usize::from(channel.channel))
                .ok_or(Error::InvalidChannel)?;
            if slot.replace(n).is_some() {
                return Err(Error::DuplicateChannel);
            }
            if channel.source > 63 || (channel.periodic_trigger && channel.channel > 3) {
                return Err(Error::InvalidSource);
            }
            if channel.priority > 15 {
                return Err(Error::InvalidPriority);
            }
            if config.arbitration == Arbitration::FixedPriority
                && config.channels[..n]
                    .iter()
                    .any(|other| other.priority == channel.priority)
            {
                return Err(Error::InvalidPriority);
            }
        }

        let mut cr = edma::Cr::default();
        cr.set_erca(config.arbitration == Arbitration::RoundRobin);
        cr.set_hoe(config.halt_on_error);
        cr.set_edbg(config.debug_halt);
        edma.cr.write(cr);

        for channel in config.channels {
            let ch = channel.channel;
            edma.cerq.write(ch);
            edma.cerr.write(ch);
            edma.cint.write(ch);
            edma.cdne.write(ch);
            if channel.error_interrupt {
                edma.seei.write(ch);
            } else {
                edma.ceei.write(ch);
            }

            let mut dchpri = edma::Dchpri::default();
            dchpri.set_chpri(channel.priority);
            dchpri.set_ecp(channel.preemptible);
            dchpri.set_dpa(!channel.can_preempt);
            edma.dchpri[usize::from(ch)].write(dchpri);

            // The source may only change while the channel is disabled
            let chcfg = &dmamux.chcfg[usize::from(ch)];
            chcfg.write(dmamux::Chcfg::default());
            if channel.source != 0 {
                let mut cfg = dmamux::Chcfg::default();
                cfg.set_source(channel.source);
                cfg.set_trig(channel.periodic_trigger);
                cfg.set_enbl(true);
                chcfg.write(cfg);
            }
        }

        Ok(Self {
            edma,
            dmamux,
            config,
            logical,
            state: core::array::from_fn(|_| StateCell::new()),
        })
    }

    /// eDMA channel of `channel`
    fn hardware(&self, channel: usize) -> Result<u8, Error> {
        self.config
            .channels
            .get(channel)
            .map(|config| config.channel)
            .ok_or(Error::InvalidChannel)
    }

    /// Number of configured channels
    pub fn channels(&self) -> usize {
        self.config.channels.len()
    }

    /// Writes `transfer` into the TCD of `channel`.
    pub fn configure(&self, channel: usize, transfer: &TransferConfig) -> Result<(), Error> {
        let ch = self.hardware(channel)?;
        transfer.check()?;
        let state = &self.state[usize::from(ch)];
        // Holding the claim keeps a start from interleaving with the TCD writes
        state.try_acquire()?;

        let tcd = &self.edma.tcd[usize::from(ch)];
        tcd.csr.write(edma::TcdCsr::default());
        tcd.saddr.write(transfer.source);
        tcd.soff.write(transfer.source_offset);
        let mut attr = edma::Attr::default();
        attr.set_ssize(transfer.source_size.into());
        attr.set_dsize(transfer.destination_size.into());
        tcd.attr.write(attr);
        tcd.nbytes.write(transfer.minor_loop_bytes);
        tcd.slast.write(transfer.source_last_adjust);
        tcd.daddr.write(transfer.destination);
        tcd.doff.write(transfer.destination_offset);
        tcd.citer.write(transfer.major_iterations);
        tcd.biter.write(transfer.major_iterations);
        tcd.dlast_sga.write(transfer.destination_last_adjust);

        let mut csr = edma::TcdCsr::default();
        csr.set_intmajor(transfer.interrupt_on_major);
        csr.set_inthalf(transfer.interrupt_on_half);
        csr.set_dreq(transfer.disable_request_on_completion);
        if let Some(link) = transfer.major_link {
            csr.set_majorelink(true);
            csr.set_majorlinkch(link);
        }
        csr.set_bwc(transfer.bandwidth.into());
        tcd.csr.write(csr);

        state.release();
        log::trace!("DMA channel {=u8} configured", ch);
        Ok(())
    }

    /// Starts the transfer of `channel` by software.
    pub fn start(&self, channel: usize) -> Result<(), Error> {
        let ch = self.hardware(channel)?;
        self.state[usize::from(ch)].try_acquire()?;
        self.edma.ssrt.write(ch);
        Ok(())
    }

    /// Lets the DMAMUX source of `channel` start the transfer.
    pub fn enable_hardware_request(&self, channel: usize) -> Result<(), Error> {
        let ch = self.hardware(channel)?;
        self.state[usize::from(ch)].try_acquire()?;
        self.edma.serq.write(ch);
        Ok(())
    }

    /// Stops hardware requests of `channel` and returns it to idle.
    pub fn disable_hardware_request(&self, channel: usize) -> Result<(), Error> {
        let ch = self.hardware(channel)?;
        self.edma.cerq.write(ch);
        self.state[usize::from(ch)].release();
        Ok(())
    }

    /// Current status of `channel`.
    pub fn status(&self, channel: usize) -> Result<ChannelStatus, Error> {
        let ch = self.hardware(channel)?;
        let tcd = &self.edma.tcd[usize::from(ch)];
        let csr = tcd.csr.read();
        let mask = 1 << ch;
        Ok(ChannelStatus {
            state: self.state[usize::from(ch)].get(),
            active: csr.active(),
            done: csr.done(),
            error: self.edma.err.read() & mask != 0,
            request_enabled: self.edma.erq.read() & mask != 0,
            remaining_iterations: tcd.citer.read() & TransferConfig::MAX_MAJOR_ITERATIONS,
        })
    }

    /// Polls `channel` for the end of its transfer.
    ///
    /// Completion is acknowledged and the channel returns to idle. An idle
    /// channel is complete.
    pub fn wait(&self, channel: usize) -> nb::Result<(), Error> {
        let ch = self.hardware(channel)?;
        let state = &self.state[usize::from(ch)];
        if state.get() == ChannelState::Idle {
            return Ok(());
        }
        if self.edma.err.read() & 1 << ch != 0 {
            let status = self.error_status(ch);
            self.edma.cerr.write(ch);
            state.release();
            return Err(nb::Error::Other(Error::Transfer(status)));
        }
        if !self.edma.tcd[usize::from(ch)].csr.read().done() {
            return Err(nb::Error::WouldBlock);
        }
        self.edma.cdne.write(ch);
        state.release();
        Ok(())
    }

    /// Handles the interrupt of eDMA channel `hardware_channel`.
    pub fn handle_interrupt<N: Notify>(&self, hardware_channel: u8, notify: &mut N) {
        let ch = usize::from(hardware_channel);
        let Some(channel) = self.logical.get(ch).copied().flatten() else {
            return;
        };
        if self.edma.int.read() & 1 << ch == 0 {
            return;
        }
        self.edma.cint.write(hardware_channel);
        if self.edma.tcd[ch].csr.read().done() {
            self.edma.cdne.write(hardware_channel);
            self.state[ch].release();
            notify.notify(channel, Event::TransferComplete);
        } else {
            notify.notify(channel, Event::HalfComplete);
        }
    }

    /// Handles the shared error interrupt.
    pub fn handle_error_interrupt<N: Notify>(&self, notify: &mut N) {
        let pending = self.edma.err.read();
        if pending == 0 {
            return;
        }
        for (ch, channel) in self.logical.iter().enumerate() {
            let Some(channel) = *channel else {
                continue;
            };
            if pending & 1 << ch == 0 {
                continue;
            }
            log::warning!("DMA error on channel {=usize}", ch);
            // Channel numbers are below 16
            let status = self.error_status(ch as u8);
            self.edma.cerr.write(ch as u8);
            self.edma.cerq.write(ch as u8);
            self.state[ch].release();
            notify.notify(channel, Event::TransferError(status));
        }
    }

    /// Error details of hardware channel `ch`. ES only describes the last
    /// recorded error, so other channels with a pending error get no details.
    fn error_status(&self, ch: u8) -> ErrorStatus {
        let es = self.edma.es.read();
        if es.errchn() == ch {
            ErrorStatus::from(es)
        } else {
            ErrorStatus::default()
        }
    }

    /// Disables all configured channels and returns the register blocks.
    pub fn release(self) -> (&'a edma::RegisterBlock, &'a dmamux::RegisterBlock) {
        for channel in self.config.channels {
            self.edma.cerq.write(channel.channel);
            self.dmamux.chcfg[usize::from(channel.channel)].write(dmamux::Chcfg::default());
        }
        (self.edma, self.dmamux)
    }
}
