//! CRC calculation unit driver
//!
//! The S32K14x has a single CRC unit. The driver exposes it as a set of
//! logical channels, each one a full CRC parameter set
//! ([`ChannelConfig`]). A calculation claims the unit for its whole
//! duration: claiming happens inside a critical section, so a calculation
//! started from an interrupt while another one is in flight fails with
//! [`Error::Busy`] instead of corrupting the running checksum.
//!
//! ```no_run
//! # use s32k_mcal::crcu::{ChannelConfig, Crcu, CrcuConfig};
//! # use s32k_mcal::reg::crc::Crc;
//! # struct CrcDependencies;
//! # unsafe impl s32k_mcal_core::Dependencies<Crc> for CrcDependencies {
//! #     fn functional_clock(&self) -> fugit::HertzU32 { unreachable!() }
//! # }
//! # let mut dependencies = CrcDependencies;
//! static CHANNELS: [ChannelConfig; 2] = [
//!     ChannelConfig::crc32_ethernet(),
//!     ChannelConfig::crc16_ccitt_false(),
//! ];
//!
//! let crcu = Crcu::new(&mut dependencies, CrcuConfig { channels: &CHANNELS }).unwrap();
//! let checksum = crcu.calculate(0, b"123456789").unwrap();
//!
//! // Data can also be fed in pieces while the unit stays claimed
//! let mut calculation = crcu.begin(1).unwrap();
//! calculation.feed(b"1234");
//! calculation.feed(b"56789");
//! let checksum = calculation.finish();
//! ```

mod config;

pub use config::{ChannelConfig, CrcuConfig, Transpose, Width};

use crate::log;
use crate::reg::{self, crc};
use crate::state::{ChannelState, StateCell};
use s32k_mcal_core::Dependencies;

/// Errors reported by the CRC driver
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The channel index is not part of the configuration
    InvalidChannel,
    /// The CRC unit is used by another calculation
    Busy,
    /// The configuration contains no channels
    EmptyConfiguration,
    /// A polynomial is zero or a 16-bit channel uses values wider than 16
    /// bits
    InvalidPolynomial,
}

impl From<crate::state::Busy> for Error {
    fn from(_: crate::state::Busy) -> Self {
        Self::Busy
    }
}

/// CRC unit driver
pub struct Crcu<'a> {
    regs: &'a crc::RegisterBlock,
    config: CrcuConfig<'a>,
    state: StateCell,
}

// Safety: registers are only touched by the `Calculation` that holds the busy
// claim, and claiming is serialized by a critical section.
unsafe impl Sync for Crcu<'_> {}

impl<'a> Crcu<'a> {
    /// Creates the driver for the CRC unit.
    ///
    /// `dependencies` stays borrowed for the lifetime of the driver, which
    /// keeps the clock gate enabled and prevents a second driver instance.
    pub fn new<D: Dependencies<crc::Crc>>(
        dependencies: &'a mut D,
        config: CrcuConfig<'a>,
    ) -> Result<Self, Error> {
        let _ = dependencies;
        // Safety: the exclusive borrow of `dependencies` implies ownership of the
        // CRC register block for `'a`.
        unsafe { Self::from_registers(reg::register_block::<crc::Crc, _>(), config) }
    }

    /// Creates the driver on top of an arbitrary register block.
    ///
    /// # Safety
    /// `registers` must be the CRC register block (or memory standing in for
    /// it) and must not be accessed by anything else while the driver exists.
    pub unsafe fn from_registers(
        registers: &'a crc::RegisterBlock,
        config: CrcuConfig<'a>,
    ) -> Result<Self, Error> {
        if config.channels.is_empty() {
            return Err(Error::EmptyConfiguration);
        }
        config
            .channels
            .iter()
            .try_for_each(ChannelConfig::check)?;
        Ok(Self {
            regs: registers,
            config,
            state: StateCell::new(),
        })
    }

    /// State of the CRC unit
    pub fn state(&self) -> ChannelState {
        self.state.get()
    }

    /// Number of logical channels
    pub fn channels(&self) -> usize {
        self.config.channels.len()
    }

    /// Claims the CRC unit and programs it with the parameters of `channel`.
    ///
    /// The unit stays claimed until the returned [`Calculation`] is finished
    /// or dropped.
    pub fn begin(&self, channel: usize) -> Result<Calculation<'_, 'a>, Error> {
        let config = *self
            .config
            .channels
            .get(channel)
            .ok_or(Error::InvalidChannel)?;
        if let Err(e) = self.state.try_acquire() {
            log::warning!("CRC unit busy, channel {=usize} rejected", channel);
            return Err(e.into());
        }
        log::trace!("CRC channel {=usize} started", channel);

        let mut ctrl = crc::Ctrl::default();
        ctrl.set_tcrc(config.width == Width::Bits32);
        ctrl.set_tot(config.write_transpose.into());
        ctrl.set_totr(config.read_transpose.into());
        ctrl.set_fxor(config.final_xor);
        self.regs.ctrl.write(ctrl);
        self.regs.gpoly.write(config.polynomial);

        self.regs.ctrl.modify(|c| c.set_was(true));
        self.regs.data.write(config.seed);
        self.regs.ctrl.modify(|c| c.set_was(false));

        Ok(Calculation { crcu: self, config })
    }

    /// Computes the checksum of `data` with the parameters of `channel`.
    pub fn calculate(&self, channel: usize, data: &[u8]) -> Result<u32, Error> {
        let mut calculation = self.begin(channel)?;
        calculation.feed(data);
        Ok(calculation.finish())
    }
}

/// A calculation in progress; owns the CRC unit until finished or dropped.
pub struct Calculation<'c, 'a> {
    crcu: &'c Crcu<'a>,
    config: ChannelConfig,
}

impl Calculation<'_, '_> {
    /// Feeds `data` into the checksum.
    ///
    /// Whole 4-byte groups are written as big-endian words, the remaining
    /// bytes through the lowest byte lane.
    pub fn feed(&mut self, data: &[u8]) {
        let regs = self.crcu.regs;
        let mut words = data.chunks_exact(4);
        for word in &mut words {
            regs.data
                .write(u32::from_be_bytes([word[0], word[1], word[2], word[3]]));
        }
        for &byte in words.remainder() {
            regs.data_ll().write(byte);
        }
    }

    /// Current checksum of the data fed so far.
    pub fn checksum(&self) -> u32 {
        let data = self.crcu.regs.data.read();
        match self.config.width {
            Width::Bits32 => data,
            // 16-bit results move to the upper half when the read transposes bytes
            Width::Bits16 if self.config.read_transpose.swaps_bytes() => data >> 16,
            Width::Bits16 => data & 0xFFFF,
        }
    }

    /// Returns the checksum and releases the CRC unit.
    pub fn finish(self) -> u32 {
        self.checksum()
    }
}

impl Drop for Calculation<'_, '_> {
    fn drop(&mut self) {
        self.crcu.state.release();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reg::test::zeroed;

    static CHANNELS: [ChannelConfig; 3] = [
        ChannelConfig::crc32_ethernet(),
        ChannelConfig::crc16_ccitt_false(),
        ChannelConfig {
            read_transpose: Transpose::Bytes,
            ..ChannelConfig::crc16_ccitt_false()
        },
    ];

    fn crcu(regs: &crc::RegisterBlock) -> Crcu<'_> {
        unsafe { Crcu::from_registers(regs, CrcuConfig { channels: &CHANNELS }) }.unwrap()
    }

    #[test]
    fn rejects_invalid_configuration() {
        let regs = zeroed::<crc::RegisterBlock>();
        let empty = unsafe { Crcu::from_registers(&regs, CrcuConfig { channels: &[] }) };
        assert_eq!(empty.err(), Some(Error::EmptyConfiguration));

        let wide = [ChannelConfig {
            polynomial: 0x1_1021,
            ..ChannelConfig::crc16_ccitt_false()
        }];
        let wide = unsafe { Crcu::from_registers(&regs, CrcuConfig { channels: &wide }) };
        assert_eq!(wide.err(), Some(Error::InvalidPolynomial));
    }

    #[test]
    fn begin_programs_channel_parameters() {
        let regs = zeroed::<crc::RegisterBlock>();
        let crcu = crcu(&regs);
        let calculation = crcu.begin(0).unwrap();

        let ctrl = regs.ctrl.read();
        assert!(ctrl.tcrc());
        assert_eq!(ctrl.tot(), 1);
        assert_eq!(ctrl.totr(), 2);
        assert!(ctrl.fxor());
        assert!(!ctrl.was());
        assert_eq!(regs.gpoly.read(), 0x04C1_1DB7);
        assert_eq!(regs.data.read(), 0xFFFF_FFFF);
        drop(calculation);
    }

    #[test]
    fn mpeg2_runs_without_transposition_or_final_xor() {
        let regs = zeroed::<crc::RegisterBlock>();
        let channels = [ChannelConfig::crc32_mpeg2()];
        let crcu = unsafe { Crcu::from_registers(&regs, CrcuConfig { channels: &channels }) }
            .unwrap();
        let calculation = crcu.begin(0).unwrap();

        let ctrl = regs.ctrl.read();
        assert!(ctrl.tcrc());
        assert_eq!(ctrl.tot(), 0);
        assert_eq!(ctrl.totr(), 0);
        assert!(!ctrl.fxor());
        assert_eq!(regs.gpoly.read(), 0x04C1_1DB7);
        assert_eq!(calculation.finish(), 0xFFFF_FFFF);
    }

    #[test]
    fn feed_writes_words_then_bytes() {
        let regs = zeroed::<crc::RegisterBlock>();
        let crcu = crcu(&regs);
        // Memory keeps the last written word with the trailing byte in lane 0
        assert_eq!(crcu.calculate(0, b"123456789"), Ok(0x3536_3739));
    }

    #[test]
    fn sixteen_bit_result_lane_follows_read_transpose() {
        let regs = zeroed::<crc::RegisterBlock>();
        let crcu = crcu(&regs);
        assert_eq!(crcu.calculate(1, &[0xAB, 0xCD, 0x12, 0x34]), Ok(0x1234));
        assert_eq!(crcu.calculate(2, &[0xAB, 0xCD, 0x12, 0x34]), Ok(0xABCD));
    }

    #[test]
    fn unit_is_busy_while_calculation_is_alive() {
        let regs = zeroed::<crc::RegisterBlock>();
        let crcu = crcu(&regs);
        let mut calculation = crcu.begin(1).unwrap();
        assert_eq!(crcu.state(), ChannelState::Busy);
        assert_eq!(crcu.calculate(0, b"1").err(), Some(Error::Busy));
        calculation.feed(b"1");
        let _ = calculation.finish();
        assert_eq!(crcu.state(), ChannelState::Idle);
        assert!(crcu.calculate(0, b"1").is_ok());
    }

    #[test]
    fn invalid_channel_does_not_claim_unit() {
        let regs = zeroed::<crc::RegisterBlock>();
        let crcu = crcu(&regs);
        assert_eq!(crcu.begin(3).err(), Some(Error::InvalidChannel));
        assert_eq!(crcu.state(), ChannelState::Idle);
    }
}
