//! Input Capture Unit driver
//!
//! An ICU channel measures a digital input signal with one of three kinds of
//! hardware:
//!
//! - a FlexTimer channel in input capture mode ([`FtmCapture`]): all
//!   measurement modes, 16-bit time base, input level known at each edge;
//! - an LPIT channel in trigger input capture mode ([`LpitCapture`]): 32-bit
//!   time base, but no input level, so only edge detection, timestamps, edge
//!   counting and period measurement are possible;
//! - a PORT pin interrupt ([`PortCapture`]): edge detection and edge counting
//!   only.
//!
//! Every channel is either idle or busy with the activity of its
//! [`MeasurementMode`]. The interrupt entry points ([`Icu::on_ftm_interrupt`],
//! [`Icu::on_lpit_interrupt`], [`Icu::on_port_interrupt`]) collect the
//! pending captures of a hardware instance, clear them and run the routine of
//! the owning channel's measurement mode. Results are reported through
//! [`Notify`].
//!
//! The driver takes `&mut self` in thread and interrupt context alike; it is
//! meant to be shared through whatever the application uses for that (an RTIC
//! resource, a `critical_section::Mutex<RefCell<_>>`, ...).

mod config;
mod ftm;
mod lpit;
mod measurement;
mod port_ci;

pub use config::{
    ActivationEdge, Backend, ChannelConfig, FtmModule, FtmModuleConfig, LpitModuleConfig,
    LpitTrigger, MeasurementMode, SignalProperty, TimestampBuffer,
};
pub use ftm::{FtmCapture, FtmId};
pub use lpit::LpitCapture;
pub use port_ci::PortCapture;

use crate::log;
use crate::port::PortId;
use crate::reg::{ftm as ftm_reg, lpit as lpit_reg, port as port_reg};
use crate::state::ChannelState;
use fugit::MicrosDurationU64;
use measurement::{Capture, Reaction, Runtime, Signal, Timestamps};

/// State of the input signal since it was last read
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputState {
    /// An activation edge or a completed measurement has been seen
    Active,
    /// Nothing happened
    Idle,
}

/// Operation mode of the driver
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// All busy channels capture
    #[default]
    Normal,
    /// Only channels with wakeup enabled capture
    Sleep,
}

/// Result of a duty cycle measurement, in timer ticks
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DutyCycleValues {
    /// High time
    pub active_time: u32,
    /// Period the high time belongs to
    pub period_time: u32,
}

/// Notification sent to the application
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// An edge detection channel saw its activation edge
    SignalEdge,
    /// The configured number of timestamps has been stored
    TimestampNotification,
    /// A linear timestamp buffer is full; capturing stopped
    TimestampBufferFull,
    /// A signal measurement completed
    SignalMeasured,
    /// A wakeup channel saw an edge while the driver was in [`Mode::Sleep`]
    Wakeup,
}

/// Receiver of ICU notifications
///
/// Called from interrupt context.
pub trait Notify {
    /// `event` happened on logical `channel`.
    fn notify(&mut self, channel: usize, event: Event);
}

impl<F: FnMut(usize, Event)> Notify for F {
    fn notify(&mut self, channel: usize, event: Event) {
        self(channel, event)
    }
}

/// [`Notify`] implementation that drops all notifications
#[derive(Debug, Default, Copy, Clone)]
pub struct NoNotification;

impl Notify for NoNotification {
    fn notify(&mut self, _: usize, _: Event) {}
}

/// Errors reported by the ICU driver
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Logical channel, hardware channel, pin or trigger number out of range
    InvalidChannel,
    /// The operation does not apply to the measurement mode or signal
    /// property of the channel
    WrongMode,
    /// The channel activity is already running
    Busy,
    /// The channel activity is not running
    NotStarted,
    /// Empty timestamp buffer
    InvalidBuffer,
    /// The hardware of a configured channel was not provided
    MissingHardware,
    /// The backend cannot perform the measurement
    UnsupportedMode,
    /// Two channels use the same hardware channel
    DuplicateChannel,
    /// The channel is not configured as wakeup capable
    NotWakeupCapable,
    /// The backend has no time base
    NoTimebase,
    /// The activation edge is not programmable on the backend
    UnsupportedActivation,
    /// Input filter value above 15, or a filter on a channel without one
    InvalidFilter,
}

/// Capture hardware available to the ICU driver
#[derive(Default)]
pub struct IcuHardware<'a> {
    /// FlexTimers, indexed by [`FtmModule::index`]
    pub ftm: [Option<FtmCapture<'a>>; FtmModule::COUNT],
    /// The LPIT
    pub lpit: Option<LpitCapture<'a>>,
    /// Pin interrupts, indexed by [`PortId::index`]
    pub port: [Option<PortCapture<'a>>; PortId::COUNT],
}

impl<'a> IcuHardware<'a> {
    /// Adds a FlexTimer.
    pub fn with_ftm(mut self, module: FtmModule, ftm: FtmCapture<'a>) -> Self {
        self.ftm[module.index()] = Some(ftm);
        self
    }

    /// Adds the LPIT.
    pub fn with_lpit(mut self, lpit: LpitCapture<'a>) -> Self {
        self.lpit = Some(lpit);
        self
    }

    /// Adds the pin interrupts of a port.
    pub fn with_port(mut self, port: PortCapture<'a>) -> Self {
        self.port[port.port().index()] = Some(port);
        self
    }
}

/// ICU driver for `CHANNELS` logical channels
pub struct Icu<'a, N, const CHANNELS: usize> {
    hardware: IcuHardware<'a>,
    config: &'a [ChannelConfig; CHANNELS],
    runtime: [Runtime<'a>; CHANNELS],
    ftm_map: [[Option<usize>; ftm_reg::CHANNELS]; FtmModule::COUNT],
    lpit_map: [Option<usize>; lpit_reg::CHANNELS],
    port_map: [[Option<usize>; port_reg::PINS]; PortId::COUNT],
    mode: Mode,
    notify: N,
}

impl<'a, N: Notify, const CHANNELS: usize> Icu<'a, N, CHANNELS> {
    /// Validates `config` against `hardware` and sets every channel up
    /// idle, with notifications and wakeup disabled.
    pub fn new(
        hardware: IcuHardware<'a>,
        config: &'a [ChannelConfig; CHANNELS],
        notify: N,
    ) -> Result<Self, Error> {
        let mut ftm_map = [[None; ftm_reg::CHANNELS]; FtmModule::COUNT];
        let mut lpit_map = [None; lpit_reg::CHANNELS];
        let mut port_map = [[None; port_reg::PINS]; PortId::COUNT];

        for (n, channel) in config.iter().enumerate() {
            let slot = match channel.backend {
                Backend::Ftm { module, channel: ch } => {
                    if hardware.ftm[module.index()].is_none() {
                        return Err(Error::MissingHardware);
                    }
                    // Only channels 0 to 3 have a 4-bit input filter
                    if channel.filter > 0xF || (ch >= 4 && channel.filter != 0) {
                        return Err(Error::InvalidFilter);
                    }
                    ftm_map[module.index()].get_mut(usize::from(ch))
                }
                Backend::Lpit { channel: ch, trigger } => {
                    if hardware.lpit.is_none() {
                        return Err(Error::MissingHardware);
                    }
                    if channel.filter != 0 {
                        return Err(Error::InvalidFilter);
                    }
                    let (LpitTrigger::External(source) | LpitTrigger::Internal(source)) = trigger;
                    if source > 3 {
                        return Err(Error::InvalidChannel);
                    }
                    if channel.mode == MeasurementMode::SignalMeasurement
                        && channel.signal_property != SignalProperty::Period
                    {
                        return Err(Error::UnsupportedMode);
                    }
                    lpit_map.get_mut(usize::from(ch))
                }
                Backend::Port { pin } => {
                    if hardware.port[pin.port.index()].is_none() {
                        return Err(Error::MissingHardware);
                    }
                    if channel.filter != 0 {
                        return Err(Error::InvalidFilter);
                    }
                    if matches!(
                        channel.mode,
                        MeasurementMode::Timestamp | MeasurementMode::SignalMeasurement
                    ) {
                        return Err(Error::UnsupportedMode);
                    }
                    port_map[pin.port.index()].get_mut(usize::from(pin.index))
                }
            }
            .ok_or(Error::InvalidChannel)?;
            if slot.replace(n).is_some() {
                return Err(Error::DuplicateChannel);
            }
        }

        let icu = Self {
            hardware,
            config,
            runtime: core::array::from_fn(|n| Runtime::new(&config[n])),
            ftm_map,
            lpit_map,
            port_map,
            mode: Mode::Normal,
            notify,
        };
        for channel in 0..CHANNELS {
            icu.init_channel(channel);
        }
        Ok(icu)
    }

    /// Disarms all channels and returns the hardware and the notification
    /// receiver.
    pub fn release(self) -> (IcuHardware<'a>, N) {
        for channel in 0..CHANNELS {
            self.disarm(channel);
        }
        (self.hardware, self.notify)
    }

    /// Configuration of `channel`
    fn channel(&self, channel: usize) -> Result<&'a ChannelConfig, Error> {
        let config: &'a [ChannelConfig; CHANNELS] = self.config;
        config.get(channel).ok_or(Error::InvalidChannel)
    }

    /// Configuration of `channel`, which must measure in `mode`
    fn channel_in(&self, channel: usize, mode: MeasurementMode) -> Result<&'a ChannelConfig, Error> {
        let config = self.channel(channel)?;
        if config.mode != mode {
            return Err(Error::WrongMode);
        }
        Ok(config)
    }

    fn init_channel(&self, channel: usize) {
        let config = &self.config[channel];
        match config.backend {
            Backend::Ftm { module, channel: ch } => {
                if let Some(ftm) = self.hardware.ftm[module.index()] {
                    ftm.configure(ch.into(), None, config.filter);
                }
            }
            Backend::Lpit { channel: ch, trigger } => {
                if let Some(lpit) = self.hardware.lpit {
                    lpit.configure(ch.into(), trigger);
                    lpit.disable(ch.into());
                }
            }
            Backend::Port { pin } => {
                if let Some(port) = self.hardware.port[pin.port.index()] {
                    port.disable(pin.index.into());
                }
            }
        }
    }

    /// `true` if the hardware of `channel` has to capture in the current mode.
    fn armed(&self, channel: usize) -> bool {
        let runtime = &self.runtime[channel];
        match self.mode {
            Mode::Normal => runtime.state == ChannelState::Busy,
            Mode::Sleep => runtime.wakeup,
        }
    }

    /// Starts or stops the hardware of `channel` after its state changed.
    ///
    /// Edges seen before the hardware was stopped do not pair with edges
    /// seen after it restarts, so an unfinished measurement is dropped.
    fn apply(&mut self, channel: usize, was_armed: bool) {
        match (was_armed, self.armed(channel)) {
            (false, true) => {
                self.runtime[channel].signal.discard_pending();
                self.arm(channel)
            }
            (true, false) => self.disarm(channel),
            _ => {}
        }
    }

    fn arm(&self, channel: usize) {
        let config = &self.config[channel];
        let edge = self.runtime[channel].edge;
        match config.backend {
            Backend::Ftm { module, channel: ch } => {
                if let Some(ftm) = self.hardware.ftm[module.index()] {
                    // Level dependent measurements need both edges
                    let edge = match (config.mode, config.signal_property) {
                        (MeasurementMode::SignalMeasurement, SignalProperty::Period) => edge,
                        (MeasurementMode::SignalMeasurement, _) => ActivationEdge::Both,
                        _ => edge,
                    };
                    ftm.configure(ch.into(), Some(edge), config.filter);
                    ftm.enable(ch.into());
                }
            }
            Backend::Lpit { channel: ch, .. } => {
                if let Some(lpit) = self.hardware.lpit {
                    lpit.enable(ch.into());
                }
            }
            Backend::Port { pin } => {
                if let Some(port) = self.hardware.port[pin.port.index()] {
                    port.enable(pin.index.into(), edge);
                }
            }
        }
        log::trace!("ICU channel {=usize} armed", channel);
    }

    fn disarm(&self, channel: usize) {
        match self.config[channel].backend {
            Backend::Ftm { module, channel: ch } => {
                if let Some(ftm) = self.hardware.ftm[module.index()] {
                    ftm.disable(ch.into());
                }
            }
            Backend::Lpit { channel: ch, .. } => {
                if let Some(lpit) = self.hardware.lpit {
                    lpit.disable(ch.into());
                }
            }
            Backend::Port { pin } => {
                if let Some(port) = self.hardware.port[pin.port.index()] {
                    port.disable(pin.index.into());
                }
            }
        }
        log::trace!("ICU channel {=usize} disarmed", channel);
    }

    /// Moves `channel` from idle to busy.
    fn start(&mut self, channel: usize) -> Result<(), Error> {
        let was_armed = self.armed(channel);
        let runtime = &mut self.runtime[channel];
        if runtime.state == ChannelState::Busy {
            return Err(Error::Busy);
        }
        runtime.state = ChannelState::Busy;
        self.apply(channel, was_armed);
        Ok(())
    }

    /// Moves `channel` from busy to idle.
    fn stop(&mut self, channel: usize) -> Result<(), Error> {
        let was_armed = self.armed(channel);
        let runtime = &mut self.runtime[channel];
        if runtime.state == ChannelState::Idle {
            return Err(Error::NotStarted);
        }
        runtime.state = ChannelState::Idle;
        self.apply(channel, was_armed);
        Ok(())
    }

    /// Current operation mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switches between normal and sleep mode.
    ///
    /// In [`Mode::Sleep`] only channels with wakeup enabled capture, busy or
    /// not. Busy channels without wakeup resume when the driver returns to
    /// [`Mode::Normal`]; a signal measurement restarts with the next edge.
    pub fn set_mode(&mut self, mode: Mode) {
        let armed: [bool; CHANNELS] = core::array::from_fn(|n| self.armed(n));
        self.mode = mode;
        for (channel, was_armed) in armed.into_iter().enumerate() {
            self.apply(channel, was_armed);
        }
    }

    /// Allows `channel` to wake the system up in [`Mode::Sleep`].
    pub fn enable_wakeup(&mut self, channel: usize) -> Result<(), Error> {
        self.set_wakeup(channel, true)
    }

    /// Stops `channel` from waking the system up.
    pub fn disable_wakeup(&mut self, channel: usize) -> Result<(), Error> {
        self.set_wakeup(channel, false)
    }

    fn set_wakeup(&mut self, channel: usize, enabled: bool) -> Result<(), Error> {
        if !self.channel(channel)?.wakeup_capable {
            return Err(Error::NotWakeupCapable);
        }
        let was_armed = self.armed(channel);
        self.runtime[channel].wakeup = enabled;
        self.apply(channel, was_armed);
        Ok(())
    }

    /// `true` if `channel` saw a wakeup edge since the last call.
    pub fn check_wakeup(&mut self, channel: usize) -> Result<bool, Error> {
        if !self.channel(channel)?.wakeup_capable {
            return Err(Error::NotWakeupCapable);
        }
        Ok(core::mem::take(&mut self.runtime[channel].wakeup_event))
    }

    /// Changes the activation edge of `channel`. Takes effect immediately if
    /// the channel is capturing.
    pub fn set_activation_condition(
        &mut self,
        channel: usize,
        edge: ActivationEdge,
    ) -> Result<(), Error> {
        let config = self.channel(channel)?;
        if matches!(config.backend, Backend::Lpit { .. }) {
            return Err(Error::UnsupportedActivation);
        }
        if config.mode == MeasurementMode::SignalMeasurement {
            return Err(Error::WrongMode);
        }
        self.runtime[channel].edge = edge;
        if self.armed(channel) {
            self.arm(channel);
        }
        Ok(())
    }

    /// Enables notifications of `channel`.
    pub fn enable_notification(&mut self, channel: usize) -> Result<(), Error> {
        self.set_notification(channel, true)
    }

    /// Disables notifications of `channel`.
    pub fn disable_notification(&mut self, channel: usize) -> Result<(), Error> {
        self.set_notification(channel, false)
    }

    fn set_notification(&mut self, channel: usize, enabled: bool) -> Result<(), Error> {
        if self.channel(channel)?.mode == MeasurementMode::EdgeCounter {
            return Err(Error::WrongMode);
        }
        self.runtime[channel].notification = enabled;
        Ok(())
    }

    /// Input state of an edge detection or signal measurement channel.
    ///
    /// Reading an [`InputState::Active`] state resets it to
    /// [`InputState::Idle`].
    pub fn get_input_state(&mut self, channel: usize) -> Result<InputState, Error> {
        let config = self.channel(channel)?;
        if !matches!(
            config.mode,
            MeasurementMode::EdgeDetect | MeasurementMode::SignalMeasurement
        ) {
            return Err(Error::WrongMode);
        }
        Ok(core::mem::replace(
            &mut self.runtime[channel].input_state,
            InputState::Idle,
        ))
    }

    /// Starts storing the counter value of every activation edge into
    /// `buffer`. Every `notify_interval` stored values raise
    /// [`Event::TimestampNotification`]; 0 disables these notifications.
    pub fn start_timestamp(
        &mut self,
        channel: usize,
        buffer: &'a mut [u32],
        notify_interval: u16,
    ) -> Result<(), Error> {
        self.channel_in(channel, MeasurementMode::Timestamp)?;
        if buffer.is_empty() {
            return Err(Error::InvalidBuffer);
        }
        if self.runtime[channel].state == ChannelState::Busy {
            return Err(Error::Busy);
        }
        self.runtime[channel].timestamps = Some(Timestamps {
            buffer,
            index: 0,
            wrapped: false,
            notify_interval,
            since_notification: 0,
        });
        self.start(channel)
    }

    /// Stops timestamping and hands the buffer back.
    ///
    /// A linear buffer that stopped because it was full is returned as well.
    pub fn stop_timestamp(&mut self, channel: usize) -> Result<&'a mut [u32], Error> {
        self.channel_in(channel, MeasurementMode::Timestamp)?;
        let timestamps = self.runtime[channel]
            .timestamps
            .take()
            .ok_or(Error::NotStarted)?;
        if self.runtime[channel].state == ChannelState::Busy {
            self.stop(channel)?;
        }
        Ok(timestamps.buffer)
    }

    /// Index of the next timestamp to be written; 0 without a buffer.
    pub fn get_timestamp_index(&self, channel: usize) -> Result<usize, Error> {
        self.channel_in(channel, MeasurementMode::Timestamp)?;
        Ok(self.runtime[channel]
            .timestamps
            .as_ref()
            .map_or(0, |ts| ts.index))
    }

    /// The written part of the timestamp buffer. Once a circular buffer has
    /// wrapped this is the whole buffer.
    pub fn timestamps(&self, channel: usize) -> Result<&[u32], Error> {
        self.channel_in(channel, MeasurementMode::Timestamp)?;
        let ts = self.runtime[channel]
            .timestamps
            .as_ref()
            .ok_or(Error::NotStarted)?;
        let written = if ts.wrapped { ts.buffer.len() } else { ts.index };
        Ok(&ts.buffer[..written])
    }

    /// Sets the edge count of `channel` to 0.
    pub fn reset_edge_count(&mut self, channel: usize) -> Result<(), Error> {
        self.channel_in(channel, MeasurementMode::EdgeCounter)?;
        self.runtime[channel].edge_count = 0;
        Ok(())
    }

    /// Starts counting edges. The count continues from its current value.
    pub fn enable_edge_count(&mut self, channel: usize) -> Result<(), Error> {
        self.channel_in(channel, MeasurementMode::EdgeCounter)?;
        self.start(channel)
    }

    /// Stops counting edges; the count is kept.
    pub fn disable_edge_count(&mut self, channel: usize) -> Result<(), Error> {
        self.channel_in(channel, MeasurementMode::EdgeCounter)?;
        self.stop(channel)
    }

    /// Number of edges counted.
    pub fn get_edge_numbers(&self, channel: usize) -> Result<u32, Error> {
        self.channel_in(channel, MeasurementMode::EdgeCounter)?;
        Ok(self.runtime[channel].edge_count)
    }

    /// Starts reporting activation edges.
    pub fn enable_edge_detection(&mut self, channel: usize) -> Result<(), Error> {
        self.channel_in(channel, MeasurementMode::EdgeDetect)?;
        self.start(channel)
    }

    /// Stops reporting activation edges.
    pub fn disable_edge_detection(&mut self, channel: usize) -> Result<(), Error> {
        self.channel_in(channel, MeasurementMode::EdgeDetect)?;
        self.stop(channel)
    }

    /// Starts measuring; results of a previous measurement are discarded.
    pub fn start_signal_measurement(&mut self, channel: usize) -> Result<(), Error> {
        self.channel_in(channel, MeasurementMode::SignalMeasurement)?;
        if self.runtime[channel].state == ChannelState::Busy {
            return Err(Error::Busy);
        }
        self.runtime[channel].signal = Signal::default();
        self.start(channel)
    }

    /// Stops measuring; the last completed result stays readable.
    pub fn stop_signal_measurement(&mut self, channel: usize) -> Result<(), Error> {
        self.channel_in(channel, MeasurementMode::SignalMeasurement)?;
        self.stop(channel)
    }

    /// Last measured high time, low time or period in ticks; 0 if none
    /// completed since the last call.
    pub fn get_time_elapsed(&mut self, channel: usize) -> Result<u32, Error> {
        let config = self.channel_in(channel, MeasurementMode::SignalMeasurement)?;
        if config.signal_property == SignalProperty::DutyCycle {
            return Err(Error::WrongMode);
        }
        Ok(self.runtime[channel].signal.elapsed.take().unwrap_or(0))
    }

    /// Last measured duty cycle; zero if none completed since the last call.
    pub fn get_duty_cycle_values(&mut self, channel: usize) -> Result<DutyCycleValues, Error> {
        let config = self.channel_in(channel, MeasurementMode::SignalMeasurement)?;
        if config.signal_property != SignalProperty::DutyCycle {
            return Err(Error::WrongMode);
        }
        Ok(self.runtime[channel]
            .signal
            .duty_cycle
            .take()
            .unwrap_or_default())
    }

    /// Converts a tick count of `channel`'s time base into a duration.
    pub fn ticks_to_duration(&self, channel: usize, ticks: u32) -> Result<MicrosDurationU64, Error> {
        let rate = match self.channel(channel)?.backend {
            Backend::Ftm { module, .. } => self.hardware.ftm[module.index()].map(|f| f.tick_rate()),
            Backend::Lpit { .. } => self.hardware.lpit.map(|l| l.tick_rate()),
            Backend::Port { .. } => None,
        }
        .ok_or(Error::NoTimebase)?;
        let hz = u64::from(rate.raw());
        if hz == 0 {
            return Err(Error::NoTimebase);
        }
        Ok(MicrosDurationU64::from_ticks(
            u64::from(ticks) * 1_000_000 / hz,
        ))
    }

    /// Handles the interrupt of FlexTimer `module`.
    pub fn on_ftm_interrupt(&mut self, module: FtmModule) {
        let Some(ftm) = self.hardware.ftm[module.index()] else {
            return;
        };
        let map = self.ftm_map[module.index()];
        for ch in set_bits(u32::from(ftm.flagged()) & mapped(&map)) {
            let capture = ftm.take_capture(ch);
            if let Some(channel) = map[ch] {
                self.dispatch(channel, capture);
            }
        }
    }

    /// Handles the LPIT interrupts.
    pub fn on_lpit_interrupt(&mut self) {
        let Some(lpit) = self.hardware.lpit else {
            return;
        };
        let map = self.lpit_map;
        for ch in set_bits(lpit.flagged() & mapped(&map)) {
            let capture = lpit.take_capture(ch);
            if let Some(channel) = map[ch] {
                self.dispatch(channel, capture);
            }
        }
    }

    /// Handles the pin interrupt of `port`. Flags of pins that are not ICU
    /// channels are left pending.
    pub fn on_port_interrupt(&mut self, port: PortId) {
        let Some(pins) = self.hardware.port[port.index()] else {
            return;
        };
        let map = self.port_map[port.index()];
        let pending = pins.flagged(mapped(&map));
        pins.acknowledge(pending);
        for pin in set_bits(pending) {
            if let Some(channel) = map[pin] {
                self.dispatch(channel, pins.capture());
            }
        }
    }

    fn dispatch(&mut self, channel: usize, capture: Capture) {
        let configs = self.config;
        let config = &configs[channel];
        let was_armed = self.armed(channel);
        let runtime = &mut self.runtime[channel];
        if self.mode == Mode::Sleep && runtime.wakeup {
            runtime.wakeup_event = true;
            self.notify.notify(channel, Event::Wakeup);
        }
        if runtime.state != ChannelState::Busy {
            log::trace!("capture on idle ICU channel {=usize} ignored", channel);
            return;
        }
        if runtime.process(channel, config, capture, &mut self.notify) == Reaction::Stop {
            self.apply(channel, was_armed);
        }
    }
}

/// Bit mask of the hardware channels mapped to a logical channel
fn mapped(map: &[Option<usize>]) -> u32 {
    map.iter()
        .enumerate()
        .filter(|(_, channel)| channel.is_some())
        .fold(0, |mask, (n, _)| mask | 1 << n)
}

/// Indices of the bits set in `mask`, lowest first
fn set_bits(mut mask: u32) -> impl Iterator<Item = usize> {
    core::iter::from_fn(move || {
        (mask != 0).then(|| {
            let n = mask.trailing_zeros() as usize;
            mask &= mask - 1;
            n
        })
    })
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::port::{PinId, PortRegisters};
    use crate::reg::{gpio, port::irqc, test::zeroed};
    use fugit::RateExtU32;
    use std::boxed::Box;
    use std::vec::Vec;

    /// Records all notifications
    #[derive(Default)]
    pub struct Recorder(pub Vec<(usize, Event)>);

    impl Notify for Recorder {
        fn notify(&mut self, channel: usize, event: Event) {
            self.0.push((channel, event));
        }
    }

    impl Recorder {
        pub fn events(&self) -> Vec<Event> {
            self.0.iter().map(|&(_, event)| event).collect()
        }
    }

    const fn ftm0(channel: u8) -> Backend {
        Backend::Ftm {
            module: FtmModule::Ftm0,
            channel,
        }
    }

    const BUTTON: PinId = PinId::new(PortId::C, 5);

    static CHANNELS: [ChannelConfig; 5] = [
        ChannelConfig {
            wakeup_capable: true,
            ..ChannelConfig::new(ftm0(0), MeasurementMode::EdgeDetect)
        },
        ChannelConfig::new(ftm0(1), MeasurementMode::Timestamp),
        ChannelConfig {
            signal_property: SignalProperty::DutyCycle,
            ..ChannelConfig::new(ftm0(2), MeasurementMode::SignalMeasurement)
        },
        ChannelConfig::new(
            Backend::Lpit {
                channel: 0,
                trigger: LpitTrigger::External(2),
            },
            MeasurementMode::SignalMeasurement,
        ),
        ChannelConfig {
            edge: ActivationEdge::Both,
            ..ChannelConfig::new(Backend::Port { pin: BUTTON }, MeasurementMode::EdgeCounter)
        },
    ];

    struct Hardware {
        ftm: Box<ftm_reg::RegisterBlock>,
        lpit: Box<lpit_reg::RegisterBlock>,
        control: Box<port_reg::RegisterBlock>,
        data: Box<gpio::RegisterBlock>,
    }

    impl Hardware {
        fn new() -> Self {
            Self {
                ftm: zeroed(),
                lpit: zeroed(),
                control: zeroed(),
                data: zeroed(),
            }
        }

        fn icu(&self) -> IcuHardware<'_> {
            let ftm =
                unsafe { FtmCapture::from_registers(&self.ftm, 8.MHz(), FtmModuleConfig::default()) };
            let lpit =
                unsafe { LpitCapture::from_registers(&self.lpit, 40.MHz(), Default::default()) };
            let port = PortCapture::new(unsafe {
                PortRegisters::from_registers(PortId::C, &self.control, &self.data)
            });
            IcuHardware::default()
                .with_ftm(FtmModule::Ftm0, ftm)
                .with_lpit(lpit)
                .with_port(port)
        }

        fn ftm_edge(&self, channel: usize, value: u32, high: bool) {
            let regs = &self.ftm.channel[channel];
            regs.cv.write(value);
            regs.csc.modify(|csc| {
                csc.set_chf(true);
                csc.set_chis(high);
            });
        }

        fn lpit_trigger(&self, channel: usize, value: u32) {
            self.lpit.channel[channel].tval.write(value);
            self.lpit.msr.write(1 << channel);
        }
    }

    fn icu(hw: &Hardware) -> Icu<'_, Recorder, 5> {
        Icu::new(hw.icu(), &CHANNELS, Recorder::default()).unwrap()
    }

    #[test]
    fn rejects_invalid_configuration() {
        let hw = Hardware::new();
        let check = |config: &[ChannelConfig; 2]| {
            Icu::new(hw.icu(), config, NoNotification).err()
        };

        let duplicate = [
            ChannelConfig::new(ftm0(3), MeasurementMode::EdgeDetect),
            ChannelConfig::new(ftm0(3), MeasurementMode::EdgeCounter),
        ];
        assert_eq!(check(&duplicate), Some(Error::DuplicateChannel));

        let out_of_range = [
            ChannelConfig::new(ftm0(3), MeasurementMode::EdgeDetect),
            ChannelConfig::new(ftm0(8), MeasurementMode::EdgeDetect),
        ];
        assert_eq!(check(&out_of_range), Some(Error::InvalidChannel));

        let missing = [
            ChannelConfig::new(ftm0(3), MeasurementMode::EdgeDetect),
            ChannelConfig::new(
                Backend::Ftm {
                    module: FtmModule::Ftm2,
                    channel: 0,
                },
                MeasurementMode::EdgeDetect,
            ),
        ];
        assert_eq!(check(&missing), Some(Error::MissingHardware));

        let lpit_high_time = [
            ChannelConfig::new(ftm0(3), MeasurementMode::EdgeDetect),
            ChannelConfig {
                signal_property: SignalProperty::HighTime,
                ..CHANNELS[3]
            },
        ];
        assert_eq!(check(&lpit_high_time), Some(Error::UnsupportedMode));

        let pin_timestamp = [
            ChannelConfig::new(ftm0(3), MeasurementMode::EdgeDetect),
            ChannelConfig::new(Backend::Port { pin: BUTTON }, MeasurementMode::Timestamp),
        ];
        assert_eq!(check(&pin_timestamp), Some(Error::UnsupportedMode));

        let unfiltered_channel = [
            ChannelConfig::new(ftm0(3), MeasurementMode::EdgeDetect),
            ChannelConfig {
                filter: 1,
                ..ChannelConfig::new(ftm0(5), MeasurementMode::EdgeDetect)
            },
        ];
        assert_eq!(check(&unfiltered_channel), Some(Error::InvalidFilter));

        let wide_filter = [
            ChannelConfig::new(ftm0(3), MeasurementMode::EdgeDetect),
            ChannelConfig {
                filter: 16,
                ..ChannelConfig::new(ftm0(1), MeasurementMode::EdgeDetect)
            },
        ];
        assert_eq!(check(&wide_filter), Some(Error::InvalidFilter));

        let lpit_filter = [
            ChannelConfig::new(ftm0(3), MeasurementMode::EdgeDetect),
            ChannelConfig {
                filter: 2,
                ..CHANNELS[3]
            },
        ];
        assert_eq!(check(&lpit_filter), Some(Error::InvalidFilter));

        let filtered = [
            ChannelConfig {
                filter: 15,
                ..ChannelConfig::new(ftm0(3), MeasurementMode::EdgeDetect)
            },
            ChannelConfig::new(ftm0(4), MeasurementMode::EdgeDetect),
        ];
        assert_eq!(check(&filtered), None);
        assert_eq!(hw.ftm.filter.read().value(3), Some(15));
    }

    #[test]
    fn channels_start_idle_and_disarmed() {
        let hw = Hardware::new();
        let mut icu = icu(&hw);
        assert_eq!(icu.mode(), Mode::Normal);
        assert!(!hw.ftm.channel[0].csc.read().chie());
        assert_eq!(hw.lpit.mier.read(), 0);
        assert_eq!(hw.control.pcr[5].read().irqc(), irqc::DISABLED);
        assert_eq!(hw.lpit.channel[0].tctrl.read().trg_sel(), 2);

        assert_eq!(icu.disable_edge_detection(0), Err(Error::NotStarted));
        assert_eq!(icu.stop_timestamp(1).err(), Some(Error::NotStarted));
        assert_eq!(icu.enable_edge_count(0), Err(Error::WrongMode));
        assert_eq!(icu.enable_edge_detection(5), Err(Error::InvalidChannel));
    }

    #[test]
    fn edge_detection_notifies_and_reports_input_state() {
        let hw = Hardware::new();
        let mut icu = icu(&hw);
        icu.enable_notification(0).unwrap();
        icu.enable_edge_detection(0).unwrap();
        assert_eq!(icu.enable_edge_detection(0), Err(Error::Busy));
        let csc = hw.ftm.channel[0].csc.read();
        assert!(csc.chie() && csc.elsa() && !csc.elsb());

        hw.ftm_edge(0, 10, true);
        icu.on_ftm_interrupt(FtmModule::Ftm0);
        assert_eq!(icu.notify.0, [(0, Event::SignalEdge)]);
        assert_eq!(icu.get_input_state(0), Ok(InputState::Active));
        assert_eq!(icu.get_input_state(0), Ok(InputState::Idle));

        icu.set_activation_condition(0, ActivationEdge::Falling)
            .unwrap();
        let csc = hw.ftm.channel[0].csc.read();
        assert!(!csc.elsa() && csc.elsb());

        icu.disable_edge_detection(0).unwrap();
        assert!(!hw.ftm.channel[0].csc.read().chie());
    }

    #[test]
    fn pin_activation_edge_follows_running_channel() {
        let hw = Hardware::new();
        let mut icu = icu(&hw);
        icu.set_activation_condition(4, ActivationEdge::Falling)
            .unwrap();
        // Not counting yet
        assert_eq!(hw.control.pcr[5].read().irqc(), irqc::DISABLED);

        icu.enable_edge_count(4).unwrap();
        assert_eq!(hw.control.pcr[5].read().irqc(), irqc::FALLING);
        icu.set_activation_condition(4, ActivationEdge::Rising)
            .unwrap();
        assert_eq!(hw.control.pcr[5].read().irqc(), irqc::RISING);
        assert_eq!(
            icu.set_activation_condition(2, ActivationEdge::Rising),
            Err(Error::WrongMode)
        );
    }

    #[test]
    fn linear_timestamp_buffer_stops_capturing_when_full() {
        let mut buffer = [0u32; 2];
        let hw = Hardware::new();
        let mut icu = icu(&hw);
        icu.enable_notification(1).unwrap();
        icu.start_timestamp(1, &mut buffer, 1).unwrap();

        for value in [100, 200] {
            hw.ftm_edge(1, value, true);
            icu.on_ftm_interrupt(FtmModule::Ftm0);
        }
        assert_eq!(icu.get_timestamp_index(1), Ok(2));
        assert_eq!(icu.timestamps(1), Ok(&[100, 200][..]));
        assert_eq!(
            icu.notify.events(),
            [
                Event::TimestampNotification,
                Event::TimestampNotification,
                Event::TimestampBufferFull,
            ]
        );
        assert!(!hw.ftm.channel[1].csc.read().chie());

        let stored = icu.stop_timestamp(1).unwrap();
        assert_eq!(*stored, [100, 200]);
        assert_eq!(icu.get_timestamp_index(1), Ok(0));
    }

    #[test]
    fn duty_cycle_measurement_on_ftm() {
        let hw = Hardware::new();
        let mut icu = icu(&hw);
        icu.start_signal_measurement(2).unwrap();
        let csc = hw.ftm.channel[2].csc.read();
        assert!(csc.elsa() && csc.elsb());

        for (value, high) in [(100, true), (130, false), (200, true)] {
            hw.ftm_edge(2, value, high);
            icu.on_ftm_interrupt(FtmModule::Ftm0);
        }
        assert_eq!(
            icu.get_duty_cycle_values(2),
            Ok(DutyCycleValues {
                active_time: 30,
                period_time: 100,
            })
        );
        assert_eq!(icu.get_duty_cycle_values(2), Ok(DutyCycleValues::default()));
        assert_eq!(icu.get_time_elapsed(2), Err(Error::WrongMode));
        assert_eq!(icu.get_input_state(2), Ok(InputState::Active));

        icu.stop_signal_measurement(2).unwrap();
        assert_eq!(icu.stop_signal_measurement(2), Err(Error::NotStarted));
    }

    #[test]
    fn duty_cycle_restarts_after_sleep() {
        let hw = Hardware::new();
        let mut icu = icu(&hw);
        icu.start_signal_measurement(2).unwrap();
        hw.ftm_edge(2, 100, true);
        icu.on_ftm_interrupt(FtmModule::Ftm0);

        icu.set_mode(Mode::Sleep);
        assert!(!hw.ftm.channel[2].csc.read().chie());
        icu.set_mode(Mode::Normal);
        assert!(hw.ftm.channel[2].csc.read().chie());

        // The rising edge at 100 belongs to the period before sleep
        for (value, high) in [(130, false), (200, true)] {
            hw.ftm_edge(2, value, high);
            icu.on_ftm_interrupt(FtmModule::Ftm0);
        }
        assert_eq!(icu.get_duty_cycle_values(2), Ok(DutyCycleValues::default()));

        for (value, high) in [(220, false), (300, true)] {
            hw.ftm_edge(2, value, high);
            icu.on_ftm_interrupt(FtmModule::Ftm0);
        }
        assert_eq!(
            icu.get_duty_cycle_values(2),
            Ok(DutyCycleValues {
                active_time: 20,
                period_time: 100,
            })
        );
    }

    #[test]
    fn period_measurement_on_lpit() {
        let hw = Hardware::new();
        let mut icu = icu(&hw);
        icu.start_signal_measurement(3).unwrap();
        assert_eq!(hw.lpit.mier.read(), 1);

        for value in [1_000, 5_000] {
            hw.lpit_trigger(0, value);
            icu.on_lpit_interrupt();
        }
        assert_eq!(icu.get_time_elapsed(3), Ok(4_000));
        assert_eq!(icu.get_time_elapsed(3), Ok(0));
        assert_eq!(
            icu.ticks_to_duration(3, 4_000),
            Ok(MicrosDurationU64::from_ticks(100))
        );
        assert_eq!(
            icu.set_activation_condition(3, ActivationEdge::Falling),
            Err(Error::UnsupportedActivation)
        );
    }

    #[test]
    fn period_restarts_after_sleep_and_keeps_result() {
        let hw = Hardware::new();
        let mut icu = icu(&hw);
        icu.start_signal_measurement(3).unwrap();
        for value in [1_000, 5_000] {
            hw.lpit_trigger(0, value);
            icu.on_lpit_interrupt();
        }

        icu.set_mode(Mode::Sleep);
        assert_eq!(hw.lpit.mier.read(), 0);
        icu.set_mode(Mode::Normal);
        assert_eq!(hw.lpit.mier.read(), 1);
        assert_eq!(icu.get_time_elapsed(3), Ok(4_000));

        // Not paired with the trigger at 5000 seen before sleep
        hw.lpit_trigger(0, 500);
        icu.on_lpit_interrupt();
        assert_eq!(icu.get_time_elapsed(3), Ok(0));

        hw.lpit_trigger(0, 2_500);
        icu.on_lpit_interrupt();
        assert_eq!(icu.get_time_elapsed(3), Ok(2_000));
    }

    #[test]
    fn edge_counter_on_pin_interrupt() {
        let hw = Hardware::new();
        let mut icu = icu(&hw);
        icu.enable_edge_count(4).unwrap();
        assert_eq!(hw.control.pcr[5].read().irqc(), irqc::EITHER);

        for _ in 0..2 {
            hw.control.isfr.write(1 << 5 | 1 << 6);
            icu.on_port_interrupt(PortId::C);
        }
        assert_eq!(icu.get_edge_numbers(4), Ok(2));
        // Only the pin of the ICU channel is acknowledged
        assert_eq!(hw.control.isfr.read(), 1 << 5);
        assert_eq!(icu.ticks_to_duration(4, 1), Err(Error::NoTimebase));
        assert_eq!(icu.enable_notification(4), Err(Error::WrongMode));

        icu.disable_edge_count(4).unwrap();
        assert_eq!(icu.get_edge_numbers(4), Ok(2));
        icu.reset_edge_count(4).unwrap();
        assert_eq!(icu.get_edge_numbers(4), Ok(0));
    }

    #[test]
    fn sleep_mode_only_captures_wakeup_channels() {
        let hw = Hardware::new();
        let mut icu = icu(&hw);
        assert_eq!(icu.enable_wakeup(1), Err(Error::NotWakeupCapable));
        icu.enable_edge_count(4).unwrap();
        icu.enable_wakeup(0).unwrap();

        icu.set_mode(Mode::Sleep);
        assert_eq!(hw.control.pcr[5].read().irqc(), irqc::DISABLED);
        assert!(hw.ftm.channel[0].csc.read().chie());

        hw.ftm_edge(0, 10, true);
        icu.on_ftm_interrupt(FtmModule::Ftm0);
        assert_eq!(icu.notify.0, [(0, Event::Wakeup)]);
        assert_eq!(icu.check_wakeup(0), Ok(true));
        assert_eq!(icu.check_wakeup(0), Ok(false));
        // Edge detection itself was not started
        assert_eq!(icu.get_input_state(0), Ok(InputState::Idle));

        icu.set_mode(Mode::Normal);
        assert_eq!(hw.control.pcr[5].read().irqc(), irqc::EITHER);
        assert!(!hw.ftm.channel[0].csc.read().chie());
    }

    #[test]
    fn disabled_wakeup_disarms_in_sleep() {
        let hw = Hardware::new();
        let mut icu = icu(&hw);
        assert_eq!(icu.disable_wakeup(1), Err(Error::NotWakeupCapable));
        icu.enable_wakeup(0).unwrap();
        icu.set_mode(Mode::Sleep);
        assert!(hw.ftm.channel[0].csc.read().chie());

        icu.disable_wakeup(0).unwrap();
        assert!(!hw.ftm.channel[0].csc.read().chie());
        icu.set_mode(Mode::Normal);
        assert!(!hw.ftm.channel[0].csc.read().chie());
    }

    #[test]
    fn release_disarms_all_channels() {
        let hw = Hardware::new();
        let mut icu = icu(&hw);
        icu.enable_edge_detection(0).unwrap();
        icu.enable_edge_count(4).unwrap();
        let (_, notify) = icu.release();
        assert!(notify.0.is_empty());
        assert!(!hw.ftm.channel[0].csc.read().chie());
        assert_eq!(hw.control.pcr[5].read().irqc(), irqc::DISABLED);
    }

    #[test]
    fn bit_helpers() {
        assert_eq!(mapped(&[Some(3), None, Some(0)]), 0b101);
        let bits: Vec<_> = set_bits(0b1001_0010).collect();
        assert_eq!(bits, [1, 4, 7]);
    }
}
