use serde::Serialize;
use serde_with::serde_as;

use super::{
    BoundsError, ByteSizeComparison, CharacteristicValue, CheckedBytes, CodecError, Compose,
    MAX_TRANSFER_LENGTH, Nibbles,
};

wire_enum! {
    /// Clock polarity/phase combination.
    pub enum SpiMode => InvalidSpiMode {
        Mode0 = 0,
        Mode1 = 1,
        Mode2 = 2,
        Mode3 = 3,
    }
}

wire_enum! {
    /// Bit order on the wire.
    pub enum BitOrder => InvalidBitOrder {
        MsbFirst = 0,
        LsbFirst = 1,
    }
}

wire_enum! {
    /// SPI clock frequency.
    pub enum SpiClock => InvalidSpiClock {
        Clock125k = 0,
        Clock250k = 1,
        Clock500k = 2,
        Clock1M = 3,
        Clock2M = 4,
        Clock4M = 5,
        Clock8M = 6,
    }
}

/// SPI master setup: `[mode << 4 | bit order, clock]`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct SpiConfig {
    pub mode: SpiMode,
    pub bit_order: BitOrder,
    pub clock: SpiClock,
}

impl SpiConfig {
    #[must_use]
    pub const fn new(mode: SpiMode, bit_order: BitOrder, clock: SpiClock) -> Self {
        Self {
            mode,
            bit_order,
            clock,
        }
    }
}

impl CharacteristicValue for SpiConfig {
    const BYTE_SIZE: usize = 2;

    fn decode(bytes: CheckedBytes<'_>) -> Result<Self, CodecError> {
        let nibbles = Nibbles::split(bytes[0]);
        Ok(Self {
            mode: SpiMode::try_from(nibbles.high)?,
            bit_order: BitOrder::try_from(nibbles.low)?,
            clock: SpiClock::try_from(bytes[1])?,
        })
    }
}

impl Compose for SpiConfig {
    fn compose(&self) -> Vec<u8> {
        vec![
            Nibbles::join(self.mode.as_raw(), self.bit_order.as_raw()),
            self.clock.as_raw(),
        ]
    }
}

/// Outbound SPI bytes, at most 127 per command.
#[serde_as]
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct SpiTransfer(#[serde_as(as = "serde_with::hex::Hex")] Vec<u8>);

impl SpiTransfer {
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

impl CharacteristicValue for SpiTransfer {
    const BYTE_SIZE: usize = MAX_TRANSFER_LENGTH;
    const COMPARISON: ByteSizeComparison = ByteSizeComparison::AtMost;

    fn decode(bytes: CheckedBytes<'_>) -> Result<Self, CodecError> {
        Ok(Self(bytes.to_vec()))
    }
}

impl Compose for SpiTransfer {
    fn compose(&self) -> Vec<u8> {
        self.0.clone()
    }
}

/// Bytes clocked in during the last SPI transfer.
#[serde_as]
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct SpiData(#[serde_as(as = "serde_with::hex::Hex")] pub Vec<u8>);

impl CharacteristicValue for SpiData {
    const BYTE_SIZE: usize = MAX_TRANSFER_LENGTH;
    const COMPARISON: ByteSizeComparison = ByteSizeComparison::AtMost;

    fn decode(bytes: CheckedBytes<'_>) -> Result<Self, CodecError> {
        Ok(Self(bytes.to_vec()))
    }
}

impl Compose for SpiData {
    fn compose(&self) -> Vec<u8> {
        self.0.clone()
    }
}

pub(crate) fn check_transfer_length(data: &[u8]) -> Result<(), BoundsError> {
    if data.len() > MAX_TRANSFER_LENGTH {
        return Err(BoundsError::InvalidTransferLength {
            length: data.len(),
            max: MAX_TRANSFER_LENGTH,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    use super::*;
    use crate::codec::assert_round_trip;

    #[test]
    fn config_packs_mode_and_bit_order() {
        let config = SpiConfig::new(SpiMode::Mode3, BitOrder::LsbFirst, SpiClock::Clock4M);
        assert_eq!(vec![0x31, 0x05], config.compose());
        assert_eq!(Ok(config), SpiConfig::parse(&[0x31, 0x05]));
    }

    #[test]
    fn config_rejects_unknown_fields() {
        assert_matches!(
            SpiConfig::parse(&[0x40, 0x00]),
            Err(CodecError::InvalidSpiMode { value: 4 })
        );
        assert_matches!(
            SpiConfig::parse(&[0x02, 0x00]),
            Err(CodecError::InvalidBitOrder { value: 2 })
        );
        assert_matches!(
            SpiConfig::parse(&[0x00, 0x07]),
            Err(CodecError::InvalidSpiClock { value: 7 })
        );
    }

    #[test]
    fn transfer_rejects_oversized_payload() {
        assert!(SpiTransfer::new(vec![0xAA; MAX_TRANSFER_LENGTH]).is_ok());
        assert_matches!(
            SpiTransfer::new(vec![0xAA; MAX_TRANSFER_LENGTH + 1]),
            Err(BoundsError::InvalidTransferLength { length: 128, max: 127 })
        );
    }

    #[test]
    fn data_accepts_empty_and_bounded_buffers() {
        assert_eq!(Ok(SpiData(Vec::new())), SpiData::parse(&[]));
        assert_matches!(
            SpiData::parse(&[0x00; 128]),
            Err(CodecError::InvalidByteSize { actual: 128, .. })
        );
    }

    #[test]
    fn every_spi_value_survives_a_round_trip() {
        for mode in SpiMode::iter() {
            for bit_order in BitOrder::iter() {
                for clock in SpiClock::iter() {
                    assert_round_trip(&SpiConfig::new(mode, bit_order, clock));
                }
            }
        }
        for data in [vec![], vec![0x9F], vec![0xC3; MAX_TRANSFER_LENGTH]] {
            assert_round_trip(&SpiTransfer::new(data.clone()).expect("transfer within bounds"));
            assert_round_trip(&SpiData(data));
        }
    }
}
