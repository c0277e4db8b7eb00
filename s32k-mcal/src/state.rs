//! Channel busy/idle tracking shared by the drivers.

use core::cell::Cell;
use critical_section::Mutex;

/// Activity state of a driver channel
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelState {
    /// No operation in progress
    Idle,
    /// An operation owns the channel
    Busy,
}

/// The channel is owned by an operation in progress
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Busy;

/// [`ChannelState`] that can be shared between thread and interrupt context.
///
/// Every transition happens inside a critical section, so checking for
/// [`ChannelState::Idle`] and claiming the channel cannot be interleaved with
/// another claim.
pub struct StateCell(Mutex<Cell<ChannelState>>);

impl StateCell {
    /// A cell in the [`ChannelState::Idle`] state
    pub const fn new() -> Self {
        Self(Mutex::new(Cell::new(ChannelState::Idle)))
    }

    /// Current state
    pub fn get(&self) -> ChannelState {
        critical_section::with(|cs| self.0.borrow(cs).get())
    }

    /// Claims the channel: `Idle -> Busy`. Fails if it is already busy.
    pub fn try_acquire(&self) -> Result<(), Busy> {
        critical_section::with(|cs| {
            let state = self.0.borrow(cs);
            match state.get() {
                ChannelState::Idle => {
                    state.set(ChannelState::Busy);
                    Ok(())
                }
                ChannelState::Busy => Err(Busy),
            }
        })
    }

    /// Returns the channel: `Busy -> Idle`.
    pub fn release(&self) {
        critical_section::with(|cs| self.0.borrow(cs).set(ChannelState::Idle));
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
