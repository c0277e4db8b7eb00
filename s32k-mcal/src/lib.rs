#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
//! # S32K MCAL
//!
//! ## Overview
//! This crate provides drivers for a subset of the NXP S32K14x peripherals,
//! shaped after the AUTOSAR microcontroller abstraction layer:
//!
//! - [`crcu`]: CRC calculation unit with any number of logical channels
//!   (parameter sets) sharing the single CRC unit
//! - [`icu`]: input capture unit on FlexTimer channels, LPIT trigger capture
//!   and PORT pin interrupts; edge detection, timestamping, signal
//!   measurement and edge counting
//! - [`port`]: pin multiplexing, electrical configuration and GPIO pins
//!   implementing the `embedded-hal` digital traits
//! - [`dma`]: eDMA channels with their DMAMUX request sources
//!
//! Every driver channel is either idle or busy. Starting an activity claims
//! the channel, interrupt handlers release it when the activity ends.
//!
//! ## Integration
//!
//! Peripherals are like all other MCU resources owned by the board HAL. The
//! drivers take a reference to a [`Dependencies`] implementation proving
//! that the clock gate of the peripheral is enabled and hold onto it for
//! their whole lifetime. See [`s32k_mcal_core`] for the safety requirements.
//!
//! Every driver also offers an `unsafe from_registers` constructor taking
//! register blocks directly, which is how the tests of this crate run the
//! drivers against plain memory.
//!
//! ```no_run
//! # use fugit::HertzU32;
//! # use s32k_mcal::reg::{ftm::Ftm0, lpit::Lpit0};
//! # struct Clocks;
//! # unsafe impl s32k_mcal::core::Dependencies<Ftm0> for Clocks {
//! #     fn functional_clock(&self) -> HertzU32 { unreachable!() }
//! # }
//! # unsafe impl s32k_mcal::core::Dependencies<Lpit0> for Clocks {
//! #     fn functional_clock(&self) -> HertzU32 { unreachable!() }
//! # }
//! # let (mut ftm0_dependencies, mut lpit_dependencies) = (Clocks, Clocks);
//! use s32k_mcal::icu::*;
//!
//! static CHANNELS: [ChannelConfig; 2] = [
//!     ChannelConfig {
//!         signal_property: SignalProperty::DutyCycle,
//!         ..ChannelConfig::new(
//!             Backend::Ftm { module: FtmModule::Ftm0, channel: 3 },
//!             MeasurementMode::SignalMeasurement,
//!         )
//!     },
//!     ChannelConfig::new(
//!         Backend::Lpit { channel: 0, trigger: LpitTrigger::External(0) },
//!         MeasurementMode::EdgeCounter,
//!     ),
//! ];
//!
//! let ftm0 = FtmCapture::new::<Ftm0, _>(&mut ftm0_dependencies, FtmModuleConfig::default());
//! let lpit = LpitCapture::new(&mut lpit_dependencies, LpitModuleConfig::default());
//! let hardware = IcuHardware::default()
//!     .with_ftm(FtmModule::Ftm0, ftm0)
//!     .with_lpit(lpit);
//!
//! let mut icu = Icu::new(hardware, &CHANNELS, |channel: usize, event: Event| {
//!     // Runs in interrupt context
//!     let _ = (channel, event);
//! })
//! .unwrap();
//! icu.start_signal_measurement(0).unwrap();
//! icu.enable_edge_count(1).unwrap();
//!
//! // In the FTM0 channel interrupt handler
//! icu.on_ftm_interrupt(FtmModule::Ftm0);
//! ```
//!
//! [`Dependencies`]: s32k_mcal_core::Dependencies

pub mod crcu;
pub mod dma;
pub mod icu;
mod log;
pub mod port;
pub mod prelude;
pub mod reg;
pub mod state;

pub use s32k_mcal_core as core;
