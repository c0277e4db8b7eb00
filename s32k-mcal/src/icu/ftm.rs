//! FlexTimer input capture backend

use super::config::{ActivationEdge, FtmModuleConfig};
use super::measurement::{Capture, Level};
use crate::reg::{self, ftm};
use fugit::HertzU32;
use s32k_mcal_core::Dependencies;

mod private {
    /// Super trait used to mark traits with an exhaustive set of
    /// implementations
    pub trait Sealed {}
}

/// Identities of the FlexTimer instances
pub trait FtmId: private::Sealed + s32k_mcal_core::PeripheralId {}

impl private::Sealed for ftm::Ftm0 {}
impl private::Sealed for ftm::Ftm1 {}
impl private::Sealed for ftm::Ftm2 {}
impl private::Sealed for ftm::Ftm3 {}
impl FtmId for ftm::Ftm0 {}
impl FtmId for ftm::Ftm1 {}
impl FtmId for ftm::Ftm2 {}
impl FtmId for ftm::Ftm3 {}

/// A FlexTimer counting for input capture
///
/// The counter runs freely from 0 to the configured modulo. Channels are
/// switched to input capture mode by the ICU driver as they are used.
#[derive(Copy, Clone)]
pub struct FtmCapture<'a> {
    regs: &'a ftm::RegisterBlock,
    tick_rate: HertzU32,
    modulo: u16,
}

impl<'a> FtmCapture<'a> {
    /// Starts the counter of FlexTimer `Id`.
    pub fn new<Id: FtmId, D: Dependencies<Id>>(
        dependencies: &'a mut D,
        config: FtmModuleConfig,
    ) -> Self {
        let clock = dependencies.functional_clock();
        // Safety: the exclusive borrow of `dependencies` implies ownership of the
        // register block for `'a`.
        unsafe { Self::from_registers(reg::register_block::<Id, _>(), clock, config) }
    }

    /// Starts the counter of the FlexTimer at `registers`, clocked by `clock`.
    ///
    /// # Safety
    /// `registers` must be a FlexTimer register block (or memory standing in
    /// for it) that nothing else accesses while the capture exists.
    pub unsafe fn from_registers(
        registers: &'a ftm::RegisterBlock,
        clock: HertzU32,
        config: FtmModuleConfig,
    ) -> Self {
        let prescaler = config.prescaler.min(7);
        let regs = registers;
        // Counter must be stopped while its range is changed
        regs.sc.write(ftm::Sc::default());
        regs.cntin.write(0);
        regs.modulo.write(config.modulo.into());
        regs.cnt.write(0);
        regs.combine.write(0);
        for channel in regs.channel.iter() {
            channel.csc.write(ftm::Csc::default());
        }
        regs.sc.modify(|sc| {
            sc.set_ps(prescaler);
            sc.set_clks(1);
        });
        Self {
            regs,
            tick_rate: clock / (1u32 << prescaler),
            modulo: config.modulo,
        }
    }

    /// Frequency the counter runs at
    pub fn tick_rate(&self) -> HertzU32 {
        self.tick_rate
    }

    /// Programs `channel` for input capture on `edge` with the input filter
    /// `filter`. Capturing is disabled when `edge` is `None`.
    pub(super) fn configure(&self, channel: usize, edge: Option<ActivationEdge>, filter: u8) {
        let (elsb, elsa) = match edge {
            None => (false, false),
            Some(ActivationEdge::Rising) => (false, true),
            Some(ActivationEdge::Falling) => (true, false),
            Some(ActivationEdge::Both) => (true, true),
        };
        self.regs.channel[channel].csc.modify(|csc| {
            csc.set_msa(false);
            csc.set_msb(false);
            csc.set_elsa(elsa);
            csc.set_elsb(elsb);
            csc.set_chf(false);
        });
        if channel < 4 {
            // FILTER is shared with channels driven by other modules
            critical_section::with(|_| {
                self.regs
                    .filter
                    .modify(|f| f.set_value(channel, filter))
            });
        }
    }

    /// Clears a stale flag of `channel` and enables its interrupt.
    pub(super) fn enable(&self, channel: usize) {
        self.regs.channel[channel].csc.modify(|csc| {
            csc.set_chf(false);
            csc.set_chie(true);
        });
    }

    /// Disables the interrupt and the capture of `channel`.
    pub(super) fn disable(&self, channel: usize) {
        self.regs.channel[channel].csc.modify(|csc| {
            csc.set_chie(false);
            csc.set_elsa(false);
            csc.set_elsb(false);
            csc.set_chf(false);
        });
    }

    /// Channels with a pending capture flag and an enabled interrupt.
    pub(super) fn flagged(&self) -> u8 {
        self.regs
            .channel
            .iter()
            .enumerate()
            .filter(|(_, channel)| {
                let csc = channel.csc.read();
                csc.chf() && csc.chie()
            })
            .fold(0, |mask, (n, _)| mask | 1 << n)
    }

    /// Clears the capture flag of `channel` and returns the captured edge.
    pub(super) fn take_capture(&self, channel: usize) -> Capture {
        let regs = &self.regs.channel[channel];
        // CHF is cleared by reading CnSC and then writing 0 to the flag. CnV
        // is read first so that an edge arriving in between raises a new flag
        // for a new value.
        let csc = regs.csc.read();
        let value = regs.cv.read() & 0xFFFF;
        let mut cleared = csc;
        cleared.set_chf(false);
        regs.csc.write(cleared);
        Capture {
            value,
            level: Some(if csc.chis() { Level::High } else { Level::Low }),
            modulo: self.modulo.into(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reg::test::zeroed;
    use fugit::RateExtU32;

    #[test]
    fn module_setup_starts_free_running_counter() {
        let regs = zeroed::<ftm::RegisterBlock>();
        let ftm = unsafe {
            FtmCapture::from_registers(
                &regs,
                48.MHz(),
                FtmModuleConfig {
                    prescaler: 4,
                    modulo: 0x7FFF,
                },
            )
        };
        let sc = regs.sc.read();
        assert_eq!(sc.clks(), 1);
        assert_eq!(sc.ps(), 4);
        assert_eq!(regs.modulo.read(), 0x7FFF);
        assert_eq!(ftm.tick_rate(), 3.MHz::<1, 1>());
    }

    #[test]
    fn configure_selects_edges_and_filter() {
        let regs = zeroed::<ftm::RegisterBlock>();
        let ftm = unsafe { FtmCapture::from_registers(&regs, 8.MHz(), Default::default()) };

        ftm.configure(2, Some(ActivationEdge::Both), 5);
        let csc = regs.channel[2].csc.read();
        assert!(csc.elsa() && csc.elsb());
        assert!(!csc.msa() && !csc.msb());
        assert_eq!(regs.filter.read().ch2fval(), 5);

        ftm.configure(6, Some(ActivationEdge::Falling), 5);
        let csc = regs.channel[6].csc.read();
        assert!(!csc.elsa() && csc.elsb());
    }

    #[test]
    fn capture_clears_flag_and_reports_level() {
        let regs = zeroed::<ftm::RegisterBlock>();
        let ftm = unsafe { FtmCapture::from_registers(&regs, 8.MHz(), Default::default()) };
        ftm.configure(1, Some(ActivationEdge::Both), 0);
        ftm.enable(1);
        ftm.enable(7);
        regs.channel[1].cv.write(0x1234);
        regs.channel[1].csc.modify(|csc| {
            csc.set_chf(true);
            csc.set_chis(true);
        });
        // Flag without enabled interrupt is not reported
        regs.channel[3].csc.modify(|csc| csc.set_chf(true));

        assert_eq!(ftm.flagged(), 0b0000_0010);
        let capture = ftm.take_capture(1);
        assert_eq!(capture.value, 0x1234);
        assert_eq!(capture.level, Some(Level::High));
        assert_eq!(capture.modulo, 0xFFFF);
        assert_eq!(ftm.flagged(), 0);
        let csc = regs.channel[1].csc.read();
        assert!(!csc.chf() && csc.chie() && csc.chis());
    }
}
