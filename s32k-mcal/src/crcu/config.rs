//! CRC unit configuration

/// Width of the CRC protocol
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Width {
    /// 16-bit CRC; polynomial and seed use the lower 16 bits
    Bits16,
    /// 32-bit CRC
    Bits32,
}

/// Transposition applied by the CRC unit to written data or to the read
/// checksum
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transpose {
    /// No transposition
    #[default]
    None,
    /// Bits in bytes are transposed; bytes are not
    Bits,
    /// Both bits in bytes and bytes are transposed
    BitsAndBytes,
    /// Only bytes are transposed
    Bytes,
}

impl From<Transpose> for u8 {
    fn from(value: Transpose) -> Self {
        match value {
            Transpose::None => 0,
            Transpose::Bits => 1,
            Transpose::BitsAndBytes => 2,
            Transpose::Bytes => 3,
        }
    }
}

impl Transpose {
    /// `true` if the byte lanes are swapped
    pub fn swaps_bytes(self) -> bool {
        matches!(self, Transpose::BitsAndBytes | Transpose::Bytes)
    }
}

/// Parameters of one logical CRC channel
///
/// All logical channels share the single CRC unit; the unit is reprogrammed
/// with the channel parameters at the start of every calculation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelConfig {
    /// Protocol width
    pub width: Width,
    /// Generator polynomial, without the implicit top bit
    pub polynomial: u32,
    /// Initial remainder
    pub seed: u32,
    /// Transposition of written data (reflect input)
    pub write_transpose: Transpose,
    /// Transposition of the read checksum (reflect output)
    pub read_transpose: Transpose,
    /// Complement the checksum on read
    pub final_xor: bool,
}

impl ChannelConfig {
    /// CRC-16/CCITT-FALSE: poly 0x1021, init 0xFFFF, no reflection, no final
    /// XOR. Check value of `"123456789"` is `0x29B1`.
    pub const fn crc16_ccitt_false() -> Self {
        Self {
            width: Width::Bits16,
            polynomial: 0x1021,
            seed: 0xFFFF,
            write_transpose: Transpose::None,
            read_transpose: Transpose::None,
            final_xor: false,
        }
    }

    /// CRC-32 (Ethernet, zlib): poly 0x04C11DB7, init 0xFFFFFFFF, reflected
    /// input and output, final XOR. Check value of `"123456789"` is
    /// `0xCBF43926`.
    pub const fn crc32_ethernet() -> Self {
        Self {
            width: Width::Bits32,
            polynomial: 0x04C1_1DB7,
            seed: 0xFFFF_FFFF,
            write_transpose: Transpose::Bits,
            read_transpose: Transpose::BitsAndBytes,
            final_xor: true,
        }
    }

    /// CRC-32/MPEG-2: poly 0x04C11DB7, init 0xFFFFFFFF, no reflection, no
    /// final XOR. Check value of `"123456789"` is `0x0376E6E7`.
    pub const fn crc32_mpeg2() -> Self {
        Self {
            width: Width::Bits32,
            polynomial: 0x04C1_1DB7,
            seed: 0xFFFF_FFFF,
            write_transpose: Transpose::None,
            read_transpose: Transpose::None,
            final_xor: false,
        }
    }

    pub(super) fn check(&self) -> Result<(), super::Error> {
        if self.polynomial == 0 {
            return Err(super::Error::InvalidPolynomial);
        }
        if self.width == Width::Bits16 && (self.polynomial > 0xFFFF || self.seed > 0xFFFF) {
            return Err(super::Error::InvalidPolynomial);
        }
        Ok(())
    }
}

/// Configuration of the CRC driver
#[derive(Debug, Copy, Clone)]
pub struct CrcuConfig<'a> {
    /// Logical channels, addressed by their index
    pub channels: &'a [ChannelConfig],
}
