//! Pin configuration

use super::{PinId, PortId};
use embedded_hal::digital::v2::PinState;

/// `PCR[MUX]` value selecting the GPIO function
pub const MUX_GPIO: u8 = 1;

/// Direction of a GPIO pin
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Input
    Input,
    /// Output
    Output,
}

/// Pull resistor selection
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    /// No pull resistor
    #[default]
    None,
    /// Pull-down
    Down,
    /// Pull-up
    Up,
}

/// Configuration of one pin
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PinConfig {
    /// The pin
    pub pin: PinId,
    /// Pin function (`PCR[MUX]`, 0..=7); [`MUX_GPIO`] for GPIO
    pub mux: u8,
    /// Pull resistor
    pub pull: Pull,
    /// High drive strength
    pub drive_strength: bool,
    /// Passive input filter
    pub passive_filter: bool,
    /// GPIO direction
    pub direction: Direction,
    /// Output level written before the pin becomes an output
    pub initial_level: PinState,
    /// The direction may be changed at run time
    pub direction_changeable: bool,
    /// The function may be changed at run time
    pub mode_changeable: bool,
    /// Lock the lower half of `PCR` until the next reset
    pub lock: bool,
}

impl PinConfig {
    /// A GPIO pin, other settings default.
    pub const fn gpio(pin: PinId, direction: Direction) -> Self {
        Self {
            pin,
            mux: MUX_GPIO,
            pull: Pull::None,
            drive_strength: false,
            passive_filter: false,
            direction,
            initial_level: PinState::Low,
            direction_changeable: false,
            mode_changeable: false,
            lock: false,
        }
    }

    /// A pin routed to peripheral function `mux`.
    pub const fn alternate(pin: PinId, mux: u8) -> Self {
        Self {
            mux,
            ..Self::gpio(pin, Direction::Input)
        }
    }
}

/// Clock of the digital input filters
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FilterClock {
    /// Bus clock
    #[default]
    Bus,
    /// 128 kHz low power oscillator
    Lpo,
}

/// Digital input filter of one port
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DigitalFilterConfig {
    /// The port
    pub port: PortId,
    /// Filter clock
    pub clock: FilterClock,
    /// Filter length in clock cycles (0..=31)
    pub width: u8,
    /// Filtered pins, bit `n` for pin `n`
    pub pins: u32,
}

/// Configuration of the PORT driver
#[derive(Debug, Default, Copy, Clone)]
pub struct PortConfig<'a> {
    /// Configured pins
    pub pins: &'a [PinConfig],
    /// Digital filters, at most one per port
    pub digital_filters: &'a [DigitalFilterConfig],
}
