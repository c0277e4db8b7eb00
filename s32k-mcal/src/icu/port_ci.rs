//! PORT pin interrupt backend
//!
//! Pin interrupts carry no time base; they serve edge detection and edge
//! counting only.

use super::config::ActivationEdge;
use super::measurement::Capture;
use crate::port::{PortId, PortRegisters};
use crate::reg::port::{self, irqc};

/// Pin interrupts of one port
#[derive(Copy, Clone)]
pub struct PortCapture<'a> {
    regs: &'a port::RegisterBlock,
    port: PortId,
}

impl<'a> PortCapture<'a> {
    /// Pin interrupts of the port behind `registers`.
    ///
    /// The PORT driver may keep using the same port; pin interrupts only
    /// modify the interrupt configuration of the pins mapped to ICU channels.
    pub fn new(registers: PortRegisters<'a>) -> Self {
        Self {
            regs: registers.control,
            port: registers.port,
        }
    }

    /// The port
    pub fn port(&self) -> PortId {
        self.port
    }

    /// Clears a stale flag of `pin` and enables its interrupt on `edge`.
    pub(super) fn enable(&self, pin: usize, edge: ActivationEdge) {
        let code = match edge {
            ActivationEdge::Rising => irqc::RISING,
            ActivationEdge::Falling => irqc::FALLING,
            ActivationEdge::Both => irqc::EITHER,
        };
        self.regs.isfr.write(1 << pin);
        self.regs.pcr[pin].modify(|pcr| {
            pcr.set_irqc(code);
            pcr.set_isf(false);
        });
    }

    /// Disables the interrupt of `pin` and clears its flag.
    pub(super) fn disable(&self, pin: usize) {
        self.regs.pcr[pin].modify(|pcr| {
            pcr.set_irqc(irqc::DISABLED);
            pcr.set_isf(false);
        });
        self.regs.isfr.write(1 << pin);
    }

    /// Pins of `mapped` with a pending interrupt flag.
    pub(super) fn flagged(&self, mapped: u32) -> u32 {
        self.regs.isfr.read() & mapped
    }

    /// Clears the interrupt flags of `pins`.
    pub(super) fn acknowledge(&self, pins: u32) {
        self.regs.isfr.write(pins);
    }

    /// An edge on a pin; pin interrupts have no counter.
    pub(super) fn capture(&self) -> Capture {
        Capture {
            value: 0,
            level: None,
            modulo: 0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reg::{gpio, test::zeroed};

    #[test]
    fn enable_programs_edge_without_clearing_other_flags() {
        let control = zeroed::<port::RegisterBlock>();
        let data = zeroed::<gpio::RegisterBlock>();
        let pins = PortCapture::new(unsafe {
            PortRegisters::from_registers(PortId::B, &control, &data)
        });
        control.pcr[4].modify(|pcr| pcr.set_mux(1));

        pins.enable(4, ActivationEdge::Falling);
        let pcr = control.pcr[4].read();
        assert_eq!(pcr.irqc(), irqc::FALLING);
        assert_eq!(pcr.mux(), 1);
        assert_eq!(control.isfr.read(), 1 << 4);

        pins.enable(4, ActivationEdge::Both);
        assert_eq!(control.pcr[4].read().irqc(), irqc::EITHER);

        pins.disable(4);
        assert_eq!(control.pcr[4].read().irqc(), irqc::DISABLED);
    }

    #[test]
    fn flagged_only_reports_mapped_pins() {
        let control = zeroed::<port::RegisterBlock>();
        let data = zeroed::<gpio::RegisterBlock>();
        let pins = PortCapture::new(unsafe {
            PortRegisters::from_registers(PortId::B, &control, &data)
        });
        control.isfr.write(0b1010_0000);
        assert_eq!(pins.flagged(0b0010_0001), 0b0010_0000);
        assert_eq!(pins.port(), PortId::B);
    }
}
