//! DMA controller, channel and transfer configuration

/// Arbitration between channels with pending requests
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Arbitration {
    /// Highest `DCHPRI` wins; priorities must be unique
    #[default]
    FixedPriority,
    /// Channels are served in turn
    RoundRobin,
}

/// Static configuration of one DMA channel
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaChannelConfig {
    /// eDMA channel (0..=15)
    pub channel: u8,
    /// DMAMUX request source slot (0..=63); 0 disables hardware requests
    pub source: u8,
    /// Gate the request source with the periodic trigger of the matching LPIT
    /// channel (channels 0 to 3 only)
    pub periodic_trigger: bool,
    /// Fixed arbitration priority (0..=15)
    pub priority: u8,
    /// The channel may be suspended by a higher priority channel
    pub preemptible: bool,
    /// The channel may suspend lower priority channels
    pub can_preempt: bool,
    /// Raise the error interrupt on transfer errors
    pub error_interrupt: bool,
}

impl DmaChannelConfig {
    /// Channel `channel` with priority `channel`, triggered by software only.
    pub const fn new(channel: u8) -> Self {
        Self {
            channel,
            source: 0,
            periodic_trigger: false,
            priority: channel,
            preemptible: false,
            can_preempt: true,
            error_interrupt: true,
        }
    }
}

/// Configuration of the DMA driver
#[derive(Debug, Default, Copy, Clone)]
pub struct DmaConfig<'a> {
    /// Channel arbitration
    pub arbitration: Arbitration,
    /// Halt the controller when an error occurs
    pub halt_on_error: bool,
    /// Stall new channel starts while the core is halted by a debugger
    pub debug_halt: bool,
    /// Channels managed by the driver, addressed by their index
    pub channels: &'a [DmaChannelConfig],
}

/// Size of one read or write of the DMA engine
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferSize {
    /// 1 byte
    Bits8,
    /// 2 bytes
    Bits16,
    /// 4 bytes
    #[default]
    Bits32,
    /// 16-byte burst
    Burst16,
    /// 32-byte burst
    Burst32,
}

impl TransferSize {
    /// Number of bytes moved per access
    pub fn bytes(self) -> u32 {
        match self {
            TransferSize::Bits8 => 1,
            TransferSize::Bits16 => 2,
            TransferSize::Bits32 => 4,
            TransferSize::Burst16 => 16,
            TransferSize::Burst32 => 32,
        }
    }
}

impl From<TransferSize> for u8 {
    fn from(size: TransferSize) -> Self {
        match size {
            TransferSize::Bits8 => 0,
            TransferSize::Bits16 => 1,
            TransferSize::Bits32 => 2,
            TransferSize::Burst16 => 4,
            TransferSize::Burst32 => 5,
        }
    }
}

/// Engine stalls after each read/write pair
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bandwidth {
    /// No stalls
    #[default]
    NoStall,
    /// Stall for 4 cycles
    Stall4,
    /// Stall for 8 cycles
    Stall8,
}

impl From<Bandwidth> for u8 {
    fn from(bandwidth: Bandwidth) -> Self {
        match bandwidth {
            Bandwidth::NoStall => 0,
            Bandwidth::Stall4 => 2,
            Bandwidth::Stall8 => 3,
        }
    }
}

/// Contents of a transfer control descriptor
///
/// Each request moves `minor_loop_bytes`; the transfer completes after
/// `major_iterations` requests.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferConfig {
    /// Source address
    pub source: u32,
    /// Destination address
    pub destination: u32,
    /// Added to the source address after each read
    pub source_offset: i16,
    /// Added to the destination address after each write
    pub destination_offset: i16,
    /// Size of each read
    pub source_size: TransferSize,
    /// Size of each write
    pub destination_size: TransferSize,
    /// Bytes moved per request
    pub minor_loop_bytes: u32,
    /// Number of requests (1..=32767)
    pub major_iterations: u16,
    /// Added to the source address when the transfer completes
    pub source_last_adjust: i32,
    /// Added to the destination address when the transfer completes
    pub destination_last_adjust: i32,
    /// Interrupt when the transfer completes
    pub interrupt_on_major: bool,
    /// Interrupt when half of the major iterations are done
    pub interrupt_on_half: bool,
    /// Disable hardware requests when the transfer completes
    pub disable_request_on_completion: bool,
    /// Channel started when the transfer completes
    pub major_link: Option<u8>,
    /// Engine stalls
    pub bandwidth: Bandwidth,
}

impl TransferConfig {
    /// Largest major iteration count without minor loop linking
    pub const MAX_MAJOR_ITERATIONS: u16 = 0x7FFF;

    /// Word-wise copy of `words` 32-bit words from `source` to `destination`
    /// in a single request.
    pub const fn copy(source: u32, destination: u32, words: u32) -> Self {
        Self {
            source,
            destination,
            source_offset: 4,
            destination_offset: 4,
            source_size: TransferSize::Bits32,
            destination_size: TransferSize::Bits32,
            minor_loop_bytes: 4 * words,
            major_iterations: 1,
            source_last_adjust: 0,
            destination_last_adjust: 0,
            interrupt_on_major: true,
            interrupt_on_half: false,
            disable_request_on_completion: true,
            major_link: None,
            bandwidth: Bandwidth::NoStall,
        }
    }

    pub(super) fn check(&self) -> Result<(), super::Error> {
        let fits = |size: TransferSize| self.minor_loop_bytes % size.bytes() == 0;
        if self.major_iterations == 0 || self.major_iterations > Self::MAX_MAJOR_ITERATIONS {
            return Err(super::Error::InvalidTransfer);
        }
        if self.minor_loop_bytes == 0 || !fits(self.source_size) || !fits(self.destination_size) {
            return Err(super::Error::InvalidTransfer);
        }
        if matches!(self.major_link, Some(channel) if usize::from(channel) >= crate::reg::edma::CHANNELS)
        {
            return Err(super::Error::InvalidTransfer);
        }
        Ok(())
    }
}
