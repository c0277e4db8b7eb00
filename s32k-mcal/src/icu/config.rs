//! ICU channel configuration

use crate::port::PinId;

/// What a channel measures
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MeasurementMode {
    /// Report edges through [`Event::SignalEdge`](super::Event::SignalEdge)
    /// and the input state
    EdgeDetect,
    /// Store the counter value of every edge into a user buffer
    Timestamp,
    /// Measure high time, low time, period or duty cycle
    SignalMeasurement,
    /// Count edges
    EdgeCounter,
}

/// Edge(s) a channel reacts to
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActivationEdge {
    /// Rising edge
    #[default]
    Rising,
    /// Falling edge
    Falling,
    /// Rising and falling edges
    Both,
}

/// Property obtained by a [`MeasurementMode::SignalMeasurement`] channel
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SignalProperty {
    /// Time from a rising to the next falling edge
    HighTime,
    /// Time from a falling to the next rising edge
    LowTime,
    /// Time between two consecutive activation edges
    #[default]
    Period,
    /// High time together with the period it belongs to
    DutyCycle,
}

/// Behavior of a timestamp buffer once it is full
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimestampBuffer {
    /// Capturing stops after the last element has been written
    #[default]
    Linear,
    /// Capturing wraps around to the first element
    Circular,
}

/// FlexTimer instance
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FtmModule {
    /// FTM0
    Ftm0,
    /// FTM1
    Ftm1,
    /// FTM2
    Ftm2,
    /// FTM3
    Ftm3,
}

impl FtmModule {
    /// Number of FlexTimer instances
    pub const COUNT: usize = 4;

    /// Index of the instance
    pub fn index(self) -> usize {
        self as usize
    }
}

/// LPIT trigger routed to a capture channel
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LpitTrigger {
    /// External trigger from TRGMUX output `n` (0..=3)
    External(u8),
    /// Internal trigger from the preceding LPIT channel `n` (0..=3)
    Internal(u8),
}

/// Hardware that performs the capture of an ICU channel
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Backend {
    /// FlexTimer input capture channel
    Ftm {
        /// Timer instance
        module: FtmModule,
        /// Channel of the instance (0..=7)
        channel: u8,
    },
    /// LPIT channel in trigger input capture mode
    ///
    /// The activation edge is a property of the trigger source, not of the
    /// timer.
    Lpit {
        /// Timer channel (0..=3)
        channel: u8,
        /// Trigger source
        trigger: LpitTrigger,
    },
    /// PORT pin interrupt; no time base
    Port {
        /// The pin
        pin: PinId,
    },
}

/// Static configuration of one ICU channel
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelConfig {
    /// Capturing hardware
    pub backend: Backend,
    /// Measurement mode
    pub mode: MeasurementMode,
    /// Default activation edge
    pub edge: ActivationEdge,
    /// Measured property for [`MeasurementMode::SignalMeasurement`]
    pub signal_property: SignalProperty,
    /// Buffer behavior for [`MeasurementMode::Timestamp`]
    pub timestamp_buffer: TimestampBuffer,
    /// The channel may wake the ECU up while the driver is in
    /// [`Mode::Sleep`](super::Mode::Sleep)
    pub wakeup_capable: bool,
    /// FTM input filter value (0..=15, channels 0 to 3 only), in units of 4
    /// timer clocks; must be 0 for other channels and backends
    pub filter: u8,
}

impl ChannelConfig {
    /// A channel of `mode` on `backend`, other settings default.
    pub const fn new(backend: Backend, mode: MeasurementMode) -> Self {
        Self {
            backend,
            mode,
            edge: ActivationEdge::Rising,
            signal_property: SignalProperty::Period,
            timestamp_buffer: TimestampBuffer::Linear,
            wakeup_capable: false,
            filter: 0,
        }
    }
}

/// FlexTimer counter configuration used for input capture
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FtmModuleConfig {
    /// Clock divider exponent; the counter runs at `clock / 2^prescaler`
    /// (0..=7)
    pub prescaler: u8,
    /// Last counter value before wrapping to 0
    pub modulo: u16,
}

impl Default for FtmModuleConfig {
    fn default() -> Self {
        Self {
            prescaler: 0,
            modulo: u16::MAX,
        }
    }
}

/// LPIT module configuration used for input capture
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LpitModuleConfig {
    /// Keep counting while the core is halted by a debugger
    pub run_in_debug: bool,
    /// Keep counting in doze mode
    pub run_in_doze: bool,
}
