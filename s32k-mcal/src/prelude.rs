//! Traits needed to use the drivers, without their names.

pub use embedded_hal::digital::v2::InputPin as _;
pub use embedded_hal::digital::v2::OutputPin as _;
pub use embedded_hal::digital::v2::StatefulOutputPin as _;
pub use embedded_hal::digital::v2::ToggleableOutputPin as _;

pub use crate::dma::Notify as _;
pub use crate::icu::Notify as _;
pub use crate::icu::FtmId as _;
pub use crate::port::PortInstance as _;
