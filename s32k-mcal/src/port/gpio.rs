//! GPIO pin access

use crate::reg::gpio;
use core::convert::Infallible;
use embedded_hal::digital::v2::{InputPin, OutputPin, StatefulOutputPin, ToggleableOutputPin};

/// A single GPIO pin
///
/// Writes go through the set, clear and toggle registers, so pins of the same
/// port can be driven from different contexts without a critical section.
#[derive(Copy, Clone)]
pub struct GpioPin<'a> {
    regs: &'a gpio::RegisterBlock,
    mask: u32,
}

impl<'a> GpioPin<'a> {
    pub(super) fn new(regs: &'a gpio::RegisterBlock, index: u8) -> Self {
        Self {
            regs,
            mask: 1 << index,
        }
    }
}

impl InputPin for GpioPin<'_> {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Self::Error> {
        Ok(self.regs.pdir.read() & self.mask != 0)
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        Ok(self.regs.pdir.read() & self.mask == 0)
    }
}

impl OutputPin for GpioPin<'_> {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.regs.pcor.write(self.mask);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.regs.psor.write(self.mask);
        Ok(())
    }
}

impl StatefulOutputPin for GpioPin<'_> {
    fn is_set_high(&self) -> Result<bool, Self::Error> {
        Ok(self.regs.pdor.read() & self.mask != 0)
    }

    fn is_set_low(&self) -> Result<bool, Self::Error> {
        Ok(self.regs.pdor.read() & self.mask == 0)
    }
}

impl ToggleableOutputPin for GpioPin<'_> {
    type Error = Infallible;

    fn toggle(&mut self) -> Result<(), Self::Error> {
        self.regs.ptor.write(self.mask);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reg::test::zeroed;

    #[test]
    fn reads_and_writes_use_pin_mask() {
        let regs = zeroed::<gpio::RegisterBlock>();
        let mut pin = GpioPin::new(&regs, 5);

        pin.set_high().unwrap();
        assert_eq!(regs.psor.read(), 1 << 5);
        pin.set_low().unwrap();
        assert_eq!(regs.pcor.read(), 1 << 5);
        pin.toggle().unwrap();
        assert_eq!(regs.ptor.read(), 1 << 5);

        regs.pdir.write(!(1 << 5));
        assert_eq!(pin.is_low(), Ok(true));
        regs.pdor.write(1 << 5);
        assert_eq!(pin.is_set_high(), Ok(true));
    }
}
