//! LPIT trigger input capture backend
//!
//! A channel in input capture mode counts down from `0xFFFF_FFFF` and stores
//! the inverse of the counter into `TVAL` on every trigger. The counter is not
//! reloaded by the trigger, so `TVAL` reads as a free running timestamp.

use super::config::{LpitModuleConfig, LpitTrigger};
use super::measurement::Capture;
use crate::reg::{self, lpit};
use fugit::HertzU32;
use s32k_mcal_core::Dependencies;

/// The LPIT used for input capture
#[derive(Copy, Clone)]
pub struct LpitCapture<'a> {
    regs: &'a lpit::RegisterBlock,
    tick_rate: HertzU32,
}

impl<'a> LpitCapture<'a> {
    /// Enables the LPIT module clock.
    pub fn new<D: Dependencies<lpit::Lpit0>>(
        dependencies: &'a mut D,
        config: LpitModuleConfig,
    ) -> Self {
        let clock = dependencies.functional_clock();
        // Safety: the exclusive borrow of `dependencies` implies ownership of the
        // register block for `'a`.
        unsafe { Self::from_registers(reg::register_block::<lpit::Lpit0, _>(), clock, config) }
    }

    /// Enables the module clock of the LPIT at `registers`, clocked by `clock`.
    ///
    /// # Safety
    /// `registers` must be an LPIT register block (or memory standing in for
    /// it) that nothing else accesses while the capture exists.
    pub unsafe fn from_registers(
        registers: &'a lpit::RegisterBlock,
        clock: HertzU32,
        config: LpitModuleConfig,
    ) -> Self {
        let mut mcr = lpit::Mcr::default();
        mcr.set_m_cen(true);
        mcr.set_dbg_en(config.run_in_debug);
        mcr.set_doze_en(config.run_in_doze);
        registers.mcr.write(mcr);
        Self {
            regs: registers,
            tick_rate: clock,
        }
    }

    /// Frequency the channel counters run at
    pub fn tick_rate(&self) -> HertzU32 {
        self.tick_rate
    }

    /// Puts `channel` into trigger input capture mode, fed by `trigger`.
    pub(super) fn configure(&self, channel: usize, trigger: LpitTrigger) {
        let (internal, select) = match trigger {
            LpitTrigger::External(n) => (false, n),
            LpitTrigger::Internal(n) => (true, n),
        };
        let mut tctrl = lpit::Tctrl::default();
        tctrl.set_mode(lpit::MODE_INPUT_CAPTURE);
        tctrl.set_trg_src(internal);
        tctrl.set_trg_sel(select);
        self.regs.channel[channel].tctrl.write(tctrl);
    }

    /// Starts the counter of `channel` and enables its interrupt.
    pub(super) fn enable(&self, channel: usize) {
        let mask = 1 << channel;
        self.regs.msr.write(mask);
        self.regs.channel[channel].tctrl.modify(|t| t.set_t_en(true));
        // MIER is shared with channels used as plain timers
        critical_section::with(|_| self.regs.mier.modify(|mier| *mier |= mask));
    }

    /// Stops the counter of `channel` and disables its interrupt.
    pub(super) fn disable(&self, channel: usize) {
        let mask = 1 << channel;
        critical_section::with(|_| self.regs.mier.modify(|mier| *mier &= !mask));
        self.regs.channel[channel].tctrl.modify(|t| t.set_t_en(false));
        self.regs.msr.write(mask);
    }

    /// Channels with a pending trigger flag and an enabled interrupt.
    pub(super) fn flagged(&self) -> u32 {
        self.regs.msr.read() & self.regs.mier.read() & ((1 << lpit::CHANNELS) - 1)
    }

    /// Clears the flag of `channel` and returns the captured trigger.
    pub(super) fn take_capture(&self, channel: usize) -> Capture {
        self.regs.msr.write(1 << channel);
        Capture {
            value: self.regs.channel[channel].tval.read(),
            level: None,
            modulo: u32::MAX,
        }
    }
}
