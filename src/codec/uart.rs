use serde::Serialize;
use serde_with::serde_as;

use super::spi::check_transfer_length;
use super::{
    BoundsError, ByteSizeComparison, CharacteristicValue, CheckedBytes, CodecError, Compose,
    MAX_TRANSFER_LENGTH, Nibbles, be_u32, compose_u32,
};

wire_enum! {
    /// UART parity.
    pub enum Parity => InvalidParity {
        None = 0,
        Even = 1,
        Odd = 2,
    }
}

wire_enum! {
    /// UART stop bit count.
    pub enum StopBits => InvalidStopBits {
        One = 1,
        Two = 2,
    }
}

/// UART setup: `[baud rate u32 BE, parity << 4 | stop bits]`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct UartConfig {
    pub baud_rate: u32,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl UartConfig {
    #[must_use]
    pub const fn new(baud_rate: u32, parity: Parity, stop_bits: StopBits) -> Self {
        Self {
            baud_rate,
            parity,
            stop_bits,
        }
    }
}

impl CharacteristicValue for UartConfig {
    const BYTE_SIZE: usize = 5;

    fn decode(bytes: CheckedBytes<'_>) -> Result<Self, CodecError> {
        let nibbles = Nibbles::split(bytes[4]);
        Ok(Self {
            baud_rate: be_u32(&bytes).unwrap_or_default(),
            parity: Parity::try_from(nibbles.high)?,
            stop_bits: StopBits::try_from(nibbles.low)?,
        })
    }
}

impl Compose for UartConfig {
    fn compose(&self) -> Vec<u8> {
        let mut bytes = compose_u32(self.baud_rate).to_vec();
        bytes.push(Nibbles::join(self.parity.as_raw(), self.stop_bits.as_raw()));
        bytes
    }
}

/// Outbound UART bytes, at most 127 per command.
#[serde_as]
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct UartTransfer(#[serde_as(as = "serde_with::hex::Hex")] Vec<u8>);

impl UartTransfer {
    /// Validates the transfer length.
    ///
    /// # Errors
    ///
    /// Returns an error when `data` exceeds 127 bytes.
    pub fn new(data: Vec<u8>) -> Result<Self, BoundsError> {
        check_transfer_length(&data)?;
        Ok(Self(data))
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.0
    }
}

impl CharacteristicValue for UartTransfer {
    const BYTE_SIZE: usize = MAX_TRANSFER_LENGTH;
    const COMPARISON: ByteSizeComparison = ByteSizeComparison::AtMost;

    fn decode(bytes: CheckedBytes<'_>) -> Result<Self, CodecError> {
        Ok(Self(bytes.to_vec()))
    }
}

impl Compose for UartTransfer {
    fn compose(&self) -> Vec<u8> {
        self.0.clone()
    }
}

/// Bytes received on the UART since the previous notification.
#[serde_as]
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct UartData(#[serde_as(as = "serde_with::hex::Hex")] pub Vec<u8>);

impl CharacteristicValue for UartData {
    const BYTE_SIZE: usize = MAX_TRANSFER_LENGTH;
    const COMPARISON: ByteSizeComparison = ByteSizeComparison::AtMost;

    fn decode(bytes: CheckedBytes<'_>) -> Result<Self, CodecError> {
        Ok(Self(bytes.to_vec()))
    }
}

impl Compose for UartData {
    fn compose(&self) -> Vec<u8> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    use super::*;
    use crate::codec::assert_round_trip;

    #[test]
    fn config_encodes_baud_rate_big_endian() {
        let config = UartConfig::new(115_200, Parity::Even, StopBits::Two);
        assert_eq!(vec![0x00, 0x01, 0xC2, 0x00, 0x12], config.compose());
        assert_eq!(Ok(config), UartConfig::parse(&config.compose()));
    }

    #[rstest]
    #[case(0x31, CodecError::InvalidParity { value: 3 })]
    #[case(0x00, CodecError::InvalidStopBits { value: 0 })]
    #[case(0x03, CodecError::InvalidStopBits { value: 3 })]
    fn config_rejects_unknown_framing(#[case] framing: u8, #[case] expected: CodecError) {
        assert_eq!(
            Err(expected),
            UartConfig::parse(&[0x00, 0x00, 0x25, 0x80, framing])
        );
    }

    #[test]
    fn transfer_rejects_oversized_payload() {
        assert_matches!(
            UartTransfer::new(vec![b'x'; 200]),
            Err(BoundsError::InvalidTransferLength { length: 200, max: 127 })
        );
    }

    #[test]
    fn every_uart_value_survives_a_round_trip() {
        for parity in Parity::iter() {
            for stop_bits in StopBits::iter() {
                for baud_rate in [1_200, 115_200, u32::MAX] {
                    assert_round_trip(&UartConfig::new(baud_rate, parity, stop_bits));
                }
            }
        }
        for data in [vec![], vec![0x0D, 0x0A], vec![0x41; MAX_TRANSFER_LENGTH]] {
            assert_round_trip(&UartTransfer::new(data.clone()).expect("transfer within bounds"));
            assert_round_trip(&UartData(data));
        }
    }
}
