#![no_std]
#![warn(missing_docs)]

//! `s32k-mcal-core` provides a set of essential abstractions that serve as a
//! thin integration layer between the [`s32k-mcal`] drivers and the crate that
//! owns the chip-level resources (clock tree, peripheral clock gates, pins).
//! In documentation that crate is referred to as the _board HAL_.
//!
//! Traits from this crate are not supposed to be implemented by the
//! application developer; implementations should be provided by board HALs.
//!
//! Integrators of this crate are responsible for soundness of trait
//! implementations and conforming to their respective safety prerequisites.
//!
//! [`s32k-mcal`]: <https://docs.rs/crate/s32k-mcal/>

pub use fugit;

/// Trait representing the identity of a peripheral instance
///
/// Types implementing this trait are expected to be used as marker types that
/// identify a specific instance of a peripheral available on the chip (there
/// are four FTM instances, five PORT instances and so on). It only conveys
/// *where* the peripheral register block is located, not that it can be
/// accessed. The latter is expressed by the [`Dependencies`] trait.
///
/// # Safety
/// `PeripheralId::ADDRESS` points to the start of the register block of the
/// peripheral the marker stands for.
///
/// # Examples
/// ```no_run
/// use s32k_mcal_core::PeripheralId;
///
/// pub enum Ftm0 {}
///
/// unsafe impl PeripheralId for Ftm0 {
///     const ADDRESS: *const () = 0x4003_8000 as *const _;
/// }
/// ```
pub unsafe trait PeripheralId {
    /// Static address of the register block of the peripheral
    const ADDRESS: *const ();
}

/// Trait representing peripheral dependencies
///
/// Structs implementing [`Dependencies`] should
/// - enclose all object representable dependencies of a [`PeripheralId`]
///   (clock gate token, functional clock selection) and release them upon
///   destruction
/// - be constructible only when it is safe and sound to interact with the
///   peripheral (its clock gate in PCC is enabled and a functional clock is
///   selected)
/// - be a singleton (only a single instance of [`Dependencies`] for a specific
///   [`PeripheralId`] must exist at the same time)
///
/// Drivers borrow the dependencies mutably for as long as they exist, which
/// prevents two drivers from owning the same register block.
///
/// # Safety
/// While a [`Dependencies`] type instance exists
/// - the peripheral clock gate must stay enabled
/// - the functional clock source and its frequency must not change
/// - the register block must not be safely accessible by the application
///   developer or other parts of the board HAL
///
/// # Example
/// ```no_run
/// use fugit::HertzU32;
/// use s32k_mcal_core::{Dependencies, PeripheralId};
///
/// pub enum Lpit0 {}
///
/// unsafe impl PeripheralId for Lpit0 {
///     const ADDRESS: *const () = 0x4003_7000 as *const _;
/// }
///
/// # struct PccToken;
/// pub struct LpitDependencies {
///     // Token proving that `PCC_LPIT[CGC]` is set; returned to the clock
///     // driver when the dependencies are released.
///     gate: PccToken,
///     // Frequency of the selected functional clock (SIRCDIV2, FIRCDIV2...)
///     clock: HertzU32,
/// }
///
/// unsafe impl Dependencies<Lpit0> for LpitDependencies {
///     fn functional_clock(&self) -> HertzU32 {
///         self.clock
///     }
/// }
/// ```
pub unsafe trait Dependencies<Id: PeripheralId> {
    /// Frequency of the clock the peripheral counts or samples with.
    ///
    /// For timers this is the frequency before any peripheral-internal
    /// prescaler.
    fn functional_clock(&self) -> fugit::HertzU32;
}
