//! Register blocks of the peripherals driven by this crate.
//!
//! Only the registers touched by the drivers are described. Each register
//! block is `#[repr(C)]` with reserved gaps so that field offsets match the
//! S32K1xx reference manual; the offsets are checked at compile time.

pub mod crc;
pub mod dmamux;
pub mod edma;
pub mod ftm;
pub mod gpio;
pub mod lpit;
pub mod port;

use s32k_mcal_core::PeripheralId;
use vcell::VolatileCell;

/// A memory mapped register holding a value of type `T`.
///
/// `T` is either a plain integer or one of the `bitfield` newtypes declared
/// with [`register!`].
#[repr(transparent)]
pub struct Reg<T: Copy>(VolatileCell<T>);

impl<T: Copy> Reg<T> {
    /// Register initialized to `value`. Only meaningful for register blocks
    /// living in RAM.
    pub const fn new(value: T) -> Self {
        Self(VolatileCell::new(value))
    }

    /// Volatile read of the whole register.
    #[inline(always)]
    pub fn read(&self) -> T {
        self.0.get()
    }

    /// Volatile write of the whole register.
    #[inline(always)]
    pub fn write(&self, value: T) {
        self.0.set(value)
    }

    /// Read-modify-write. Not atomic; callers sharing the register with other
    /// contexts must run this inside a critical section.
    #[inline(always)]
    pub fn modify<F: FnOnce(&mut T)>(&self, f: F) {
        let mut value = self.read();
        f(&mut value);
        self.write(value);
    }

    /// Raw pointer to the register.
    pub fn as_ptr(&self) -> *mut T {
        self.0.as_ptr()
    }
}

/// Declares a `bitfield` register type together with raw conversions.
macro_rules! register {
    (
        $(#[$attr:meta])*
        $name:ident($ty:ty);
        $($fields:tt)*
    ) => {
        bitfield::bitfield! {
            $(#[$attr])*
            #[derive(Copy, Clone, Default, PartialEq, Eq)]
            pub struct $name($ty);
            impl Debug;
            $($fields)*
        }

        impl $name {
            /// Register value from raw bits
            #[inline(always)]
            pub const fn from_bits(bits: $ty) -> Self {
                Self(bits)
            }

            /// Raw bits of the register value
            #[inline(always)]
            pub const fn bits(self) -> $ty {
                self.0
            }
        }
    };
}
pub(crate) use register;

/// Declares a zero-sized [`PeripheralId`] marker type.
macro_rules! instance {
    ($(#[$attr:meta])* $name:ident = $address:expr) => {
        $(#[$attr])*
        pub enum $name {}

        // Safety: the address is the register block base from the reference manual.
        unsafe impl s32k_mcal_core::PeripheralId for $name {
            const ADDRESS: *const () = $address as *const _;
        }
    };
}
pub(crate) use instance;

/// Register block of the peripheral identified by `Id`.
///
/// # Safety
/// `RB` must be the register block type of the peripheral `Id` stands for and
/// the caller must own the peripheral (typically proven by a
/// [`Dependencies`](s32k_mcal_core::Dependencies) borrow that outlives `'a`).
pub(crate) unsafe fn register_block<'a, Id: PeripheralId, RB>() -> &'a RB {
    &*(Id::ADDRESS as *const RB)
}

#[cfg(test)]
pub(crate) mod test {
    /// Zero initialized register block, standing in for the hardware.
    ///
    /// All register blocks consist of volatile cells of plain integers, for
    /// which all bits 0 is a valid value.
    pub fn zeroed<RB>() -> std::boxed::Box<RB> {
        // Safety: see above.
        unsafe { std::boxed::Box::new(core::mem::zeroed()) }
    }
}
