//! Pin multiplexing, electrical configuration and GPIO
//!
//! The driver programs every configured pin once at construction and then
//! allows run time changes of direction and function for pins whose
//! configuration permits it. [`Port::gpio`] hands out pins implementing the
//! `embedded-hal` digital traits.

mod config;
mod gpio;

pub use config::{
    DigitalFilterConfig, Direction, FilterClock, PinConfig, PortConfig, Pull, MUX_GPIO,
};
pub use gpio::GpioPin;

use crate::log;
use crate::reg::{self, gpio as gpio_reg, port};
use embedded_hal::digital::v2::PinState;
use s32k_mcal_core::{Dependencies, PeripheralId};

/// Port instance
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PortId {
    /// PORTA / PTA
    A,
    /// PORTB / PTB
    B,
    /// PORTC / PTC
    C,
    /// PORTD / PTD
    D,
    /// PORTE / PTE
    E,
}

impl PortId {
    /// Number of ports
    pub const COUNT: usize = 5;

    /// Index of the port
    pub fn index(self) -> usize {
        self as usize
    }
}

/// A pin of a port
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinId {
    /// The port
    pub port: PortId,
    /// Pin number in the port (0..=31)
    pub index: u8,
}

impl PinId {
    /// Pin `index` of `port`
    pub const fn new(port: PortId, index: u8) -> Self {
        Self { port, index }
    }

    fn mask(self) -> u32 {
        1 << self.index
    }
}

mod private {
    /// Super trait used to mark traits with an exhaustive set of
    /// implementations
    pub trait Sealed {}
}

/// Identities of the PORT instances
pub trait PortInstance: private::Sealed + PeripheralId {
    /// The port
    const PORT: PortId;
    /// GPIO block of the port; shares the clock gate of the PORT instance
    type Gpio: PeripheralId;
}

macro_rules! port_instance {
    ($($control:ident, $data:ident => $id:ident;)*) => {
        $(
            impl private::Sealed for port::$control {}
            impl PortInstance for port::$control {
                const PORT: PortId = PortId::$id;
                type Gpio = gpio_reg::$data;
            }
        )*
    };
}

port_instance! {
    PortA, PtA => A;
    PortB, PtB => B;
    PortC, PtC => C;
    PortD, PtD => D;
    PortE, PtE => E;
}

/// Registers of one port: pin control and GPIO
///
/// The handle is `Copy` so that the PORT driver and the ICU pin interrupt
/// backend can share a port. Each user only touches the `PCR`s of its own
/// pins; shared registers are written inside critical sections.
#[derive(Copy, Clone)]
pub struct PortRegisters<'a> {
    pub(crate) port: PortId,
    pub(crate) control: &'a port::RegisterBlock,
    pub(crate) data: &'a gpio_reg::RegisterBlock,
}

impl<'a> PortRegisters<'a> {
    /// Registers of port `Id`.
    pub fn new<Id: PortInstance, D: Dependencies<Id>>(dependencies: &'a mut D) -> Self {
        let _ = dependencies;
        // Safety: the exclusive borrow of `dependencies` implies ownership of the
        // port for `'a`.
        unsafe {
            Self::from_registers(
                Id::PORT,
                reg::register_block::<Id, _>(),
                reg::register_block::<Id::Gpio, _>(),
            )
        }
    }

    /// Registers of `port` at arbitrary addresses.
    ///
    /// # Safety
    /// `control` and `data` must be the PORT and GPIO register blocks of
    /// `port` (or memory standing in for them), only accessed through copies
    /// of this handle while it exists.
    pub unsafe fn from_registers(
        port: PortId,
        control: &'a port::RegisterBlock,
        data: &'a gpio_reg::RegisterBlock,
    ) -> Self {
        Self {
            port,
            control,
            data,
        }
    }

    /// The port these registers belong to
    pub fn port(&self) -> PortId {
        self.port
    }
}

/// Hardware used by the PORT driver
#[derive(Default)]
pub struct PortHardware<'a> {
    /// Registers of each port, indexed by [`PortId::index`]
    pub ports: [Option<PortRegisters<'a>>; PortId::COUNT],
}

impl<'a> PortHardware<'a> {
    /// Adds the registers of a port.
    pub fn with(mut self, registers: PortRegisters<'a>) -> Self {
        self.ports[registers.port.index()] = Some(registers);
        self
    }
}

/// Errors reported by the PORT driver
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Pin number out of range or pin not part of the configuration
    InvalidPin,
    /// A pin is configured more than once
    DuplicatePin,
    /// Function number out of range
    InvalidMode,
    /// Filter width out of range or more than one filter for a port
    InvalidFilter,
    /// The registers of a configured port were not provided
    MissingHardware,
    /// The pin direction is fixed by configuration
    DirectionUnchangeable,
    /// The pin function is fixed by configuration
    ModeUnchangeable,
    /// The pin control register is locked
    Locked,
    /// The pin is not routed to GPIO
    NotGpio,
}

/// PORT driver
pub struct Port<'a> {
    hardware: PortHardware<'a>,
    config: PortConfig<'a>,
}

impl<'a> Port<'a> {
    /// Validates `config` and programs all configured pins and filters.
    pub fn new(hardware: PortHardware<'a>, config: PortConfig<'a>) -> Result<Self, Error> {
        for (n, pin) in config.pins.iter().enumerate() {
            if usize::from(pin.pin.index) >= port::PINS {
                return Err(Error::InvalidPin);
            }
            if pin.mux > 7 {
                return Err(Error::InvalidMode);
            }
            if hardware.ports[pin.pin.port.index()].is_none() {
                return Err(Error::MissingHardware);
            }
            if config.pins[..n].iter().any(|other| other.pin == pin.pin) {
                return Err(Error::DuplicatePin);
            }
        }
        for (n, filter) in config.digital_filters.iter().enumerate() {
            if filter.width > 31
                || config.digital_filters[..n]
                    .iter()
                    .any(|other| other.port == filter.port)
            {
                return Err(Error::InvalidFilter);
            }
            if hardware.ports[filter.port.index()].is_none() {
                return Err(Error::MissingHardware);
            }
        }

        let driver = Self { hardware, config };
        for pin in config.pins {
            driver.init_pin(pin);
        }
        for filter in config.digital_filters {
            driver.init_filter(filter);
        }
        Ok(driver)
    }

    fn registers(&self, port: PortId) -> Result<&PortRegisters<'a>, Error> {
        self.hardware.ports[port.index()]
            .as_ref()
            .ok_or(Error::MissingHardware)
    }

    fn pin_config(&self, pin: PinId) -> Result<(&PinConfig, &PortRegisters<'a>), Error> {
        let config = self
            .config
            .pins
            .iter()
            .find(|config| config.pin == pin)
            .ok_or(Error::InvalidPin)?;
        Ok((config, self.registers(pin.port)?))
    }

    fn init_pin(&self, config: &PinConfig) {
        let Ok(regs) = self.registers(config.pin.port) else {
            return;
        };
        let pin = config.pin;
        // The output latch is set before the driver is enabled to avoid a glitch
        if config.mux == MUX_GPIO && config.direction == Direction::Output {
            match config.initial_level {
                PinState::High => regs.data.psor.write(pin.mask()),
                PinState::Low => regs.data.pcor.write(pin.mask()),
            }
        }

        let mut pcr = port::Pcr::default();
        pcr.set_pe(config.pull != Pull::None);
        pcr.set_ps(config.pull == Pull::Up);
        pcr.set_dse(config.drive_strength);
        pcr.set_pfe(config.passive_filter);
        pcr.set_mux(config.mux);
        pcr.set_lk(config.lock);
        regs.control.pcr[usize::from(pin.index)].write(pcr);

        if config.mux == MUX_GPIO {
            write_direction(regs, pin, config.direction);
        }
        log::trace!("pin {=u8} of port {=usize} configured", pin.index, pin.port.index());
    }

    fn init_filter(&self, config: &DigitalFilterConfig) {
        let Ok(regs) = self.registers(config.port) else {
            return;
        };
        // Clock and width may only change while all filters of the port are off
        regs.control.dfer.write(0);
        regs.control
            .dfcr
            .write(matches!(config.clock, FilterClock::Lpo).into());
        regs.control.dfwr.write(config.width.into());
        regs.control.dfer.write(config.pins);
    }

    /// Changes the direction of a GPIO pin.
    pub fn set_pin_direction(&mut self, pin: PinId, direction: Direction) -> Result<(), Error> {
        let (config, regs) = self.pin_config(pin)?;
        if !config.direction_changeable {
            return Err(Error::DirectionUnchangeable);
        }
        if !routed_to_gpio(regs, pin) {
            return Err(Error::NotGpio);
        }
        write_direction(regs, pin, direction);
        Ok(())
    }

    /// Routes a pin to function `mux`.
    pub fn set_pin_mode(&mut self, pin: PinId, mux: u8) -> Result<(), Error> {
        let (config, regs) = self.pin_config(pin)?;
        if !config.mode_changeable {
            return Err(Error::ModeUnchangeable);
        }
        if mux > 7 {
            return Err(Error::InvalidMode);
        }
        let pcr = &regs.control.pcr[usize::from(pin.index)];
        if pcr.read().lk() {
            log::warning!("pin {=u8} is locked", pin.index);
            return Err(Error::Locked);
        }
        pcr.modify(|pcr| {
            pcr.set_mux(mux);
            // Writing the flag back would clear a pending pin interrupt
            pcr.set_isf(false);
        });
        Ok(())
    }

    /// Restores the configured direction of all pins whose direction is not
    /// changeable at run time and which are currently routed to GPIO.
    pub fn refresh_port_direction(&mut self) {
        for config in self.config.pins {
            if config.direction_changeable {
                continue;
            }
            if let Ok(regs) = self.registers(config.pin.port) {
                if routed_to_gpio(regs, config.pin) {
                    write_direction(regs, config.pin, config.direction);
                }
            }
        }
    }

    /// The GPIO of a configured pin currently routed to GPIO.
    pub fn gpio(&self, pin: PinId) -> Result<GpioPin<'a>, Error> {
        let (_, regs) = self.pin_config(pin)?;
        if !routed_to_gpio(regs, pin) {
            return Err(Error::NotGpio);
        }
        Ok(GpioPin::new(regs.data, pin.index))
    }

    /// Releases the hardware.
    pub fn release(self) -> PortHardware<'a> {
        self.hardware
    }
}

/// The mux in PCR, which [`Port::set_pin_mode`] may have changed since
/// construction.
fn routed_to_gpio(regs: &PortRegisters<'_>, pin: PinId) -> bool {
    regs.control.pcr[usize::from(pin.index)].read().mux() == MUX_GPIO
}

fn write_direction(regs: &PortRegisters<'_>, pin: PinId, direction: Direction) {
    // PDDR is shared by all pins of the port
    critical_section::with(|_| {
        regs.data.pddr.modify(|pddr| match direction {
            Direction::Output => *pddr |= pin.mask(),
            Direction::Input => *pddr &= !pin.mask(),
        })
    });
}
