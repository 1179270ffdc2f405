use serde::Serialize;
use serde_with::serde_as;

use super::{
    BoundsError, ByteSizeComparison, CharacteristicValue, CheckedBytes, CodecError, Compose,
    Nibbles, flag_nibble,
};

/// Highest 7-bit I2C slave address.
pub const I2C_MAX_ADDRESS: u8 = 0x7F;
/// Longest read the peripheral returns in one notification.
pub const I2C_MAX_READ_LENGTH: u8 = 126;
/// Longest write the peripheral accepts in one command.
pub const I2C_MAX_WRITE_LENGTH: usize = 124;

wire_enum! {
    /// I2C bus clock.
    pub enum I2cClock => InvalidI2cClock {
        Standard100k = 0,
        Fast250k = 1,
        Fast400k = 2,
    }
}

/// I2C master setup: enable flag in the high nibble, clock in the low nibble.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct I2cConfig {
    pub enabled: bool,
    pub clock: I2cClock,
}

impl I2cConfig {
    #[must_use]
    pub const fn new(enabled: bool, clock: I2cClock) -> Self {
        Self { enabled, clock }
    }
}

impl CharacteristicValue for I2cConfig {
    const BYTE_SIZE: usize = 1;

    fn decode(bytes: CheckedBytes<'_>) -> Result<Self, CodecError> {
        let nibbles = Nibbles::split(bytes[0]);
        Ok(Self {
            enabled: flag_nibble(nibbles.high, |value| CodecError::InvalidEnableFlag { value })?,
            clock: I2cClock::try_from(nibbles.low)?,
        })
    }
}

impl Compose for I2cConfig {
    fn compose(&self) -> Vec<u8> {
        vec![Nibbles::join(u8::from(self.enabled), self.clock.as_raw())]
    }
}

fn check_address(address: u8) -> Result<u8, CodecError> {
    if address > I2C_MAX_ADDRESS {
        return Err(CodecError::InvalidSlaveAddress { value: address });
    }
    Ok(address)
}

/// Data written to one slave. Construction enforces the address and length bounds.
#[serde_as]
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct I2cWrite {
    address: u8,
    #[serde_as(as = "serde_with::hex::Hex")]
    data: Vec<u8>,
}

impl I2cWrite {
    /// Validates a write request.
    ///
    /// # Errors
    ///
    /// Returns an error when `address` exceeds `0x7F` or `data` exceeds 124 bytes.
    pub fn new(address: u8, data: Vec<u8>) -> Result<Self, BoundsError> {
        if address > I2C_MAX_ADDRESS {
            return Err(BoundsError::InvalidSlaveAddress { address });
        }
        if data.len() > I2C_MAX_WRITE_LENGTH {
            return Err(BoundsError::InvalidWriteLength {
                length: data.len(),
                max: I2C_MAX_WRITE_LENGTH,
            });
        }
        Ok(Self { address, data })
    }

    #[must_use]
    pub fn address(&self) -> u8 {
        self.address
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl CharacteristicValue for I2cWrite {
    const BYTE_SIZE: usize = 1 + I2C_MAX_WRITE_LENGTH;
    const COMPARISON: ByteSizeComparison = ByteSizeComparison::AtMost;

    fn decode(bytes: CheckedBytes<'_>) -> Result<Self, CodecError> {
        let (address, data) = split_address(&bytes)?;
        Ok(Self {
            address,
            data: data.to_vec(),
        })
    }
}

impl Compose for I2cWrite {
    fn compose(&self) -> Vec<u8> {
        std::iter::once(self.address)
            .chain(self.data.iter().copied())
            .collect()
    }
}

/// Request for `length` bytes from one slave.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct I2cReadRequest {
    address: u8,
    length: u8,
}

impl I2cReadRequest {
    /// Validates a read request.
    ///
    /// ```
    /// use bleio::codec::I2cReadRequest;
    ///
    /// assert!(I2cReadRequest::new(0x7F, 126).is_ok());
    /// assert!(I2cReadRequest::new(0x80, 1).is_err());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when `address` exceeds `0x7F` or `length` is outside `1..=126`.
    pub fn new(address: u8, length: u8) -> Result<Self, BoundsError> {
        if address > I2C_MAX_ADDRESS {
            return Err(BoundsError::InvalidSlaveAddress { address });
        }
        if !(1..=I2C_MAX_READ_LENGTH).contains(&length) {
            return Err(BoundsError::InvalidReadLength {
                length,
                max: I2C_MAX_READ_LENGTH,
            });
        }
        Ok(Self { address, length })
    }

    #[must_use]
    pub fn address(&self) -> u8 {
        self.address
    }

    #[must_use]
    pub fn length(&self) -> u8 {
        self.length
    }
}

impl CharacteristicValue for I2cReadRequest {
    const BYTE_SIZE: usize = 2;

    fn decode(bytes: CheckedBytes<'_>) -> Result<Self, CodecError> {
        let length = bytes[1];
        if !(1..=I2C_MAX_READ_LENGTH).contains(&length) {
            return Err(CodecError::InvalidReadLength { value: length });
        }
        Ok(Self {
            address: check_address(bytes[0])?,
            length,
        })
    }
}

impl Compose for I2cReadRequest {
    fn compose(&self) -> Vec<u8> {
        vec![self.address, self.length]
    }
}

/// Bytes received from a slave, prefixed with its address.
#[serde_as]
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct I2cData {
    pub address: u8,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub data: Vec<u8>,
}

impl CharacteristicValue for I2cData {
    const BYTE_SIZE: usize = 1 + I2C_MAX_READ_LENGTH as usize;
    const COMPARISON: ByteSizeComparison = ByteSizeComparison::AtMost;

    fn decode(bytes: CheckedBytes<'_>) -> Result<Self, CodecError> {
        let (address, data) = split_address(&bytes)?;
        Ok(Self {
            address,
            data: data.to_vec(),
        })
    }
}

impl Compose for I2cData {
    fn compose(&self) -> Vec<u8> {
        std::iter::once(self.address)
            .chain(self.data.iter().copied())
            .collect()
    }
}

fn split_address(bytes: &[u8]) -> Result<(u8, &[u8]), CodecError> {
    let Some((address, data)) = bytes.split_first() else {
        return Err(CodecError::InvalidByteSize {
            expected: 1,
            actual: 0,
            comparison: ByteSizeComparison::Exact,
        });
    };
    Ok((check_address(*address)?, data))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    use super::*;
    use crate::codec::assert_round_trip;

    #[rstest]
    #[case(0x7F, 126, None)]
    #[case(0x00, 1, None)]
    #[case(0x80, 1, Some(BoundsError::InvalidSlaveAddress { address: 0x80 }))]
    #[case(0x10, 0, Some(BoundsError::InvalidReadLength { length: 0, max: 126 }))]
    #[case(0x10, 127, Some(BoundsError::InvalidReadLength { length: 127, max: 126 }))]
    fn read_request_bounds(
        #[case] address: u8,
        #[case] length: u8,
        #[case] expected: Option<BoundsError>,
    ) {
        assert_eq!(expected, I2cReadRequest::new(address, length).err());
    }

    #[test]
    fn write_rejects_oversized_payload() {
        assert!(I2cWrite::new(0x20, vec![0; I2C_MAX_WRITE_LENGTH]).is_ok());
        assert_matches!(
            I2cWrite::new(0x20, vec![0; I2C_MAX_WRITE_LENGTH + 1]),
            Err(BoundsError::InvalidWriteLength { length: 125, max: 124 })
        );
    }

    #[test]
    fn data_requires_address_byte() {
        assert_matches!(
            I2cData::parse(&[]),
            Err(CodecError::InvalidByteSize { actual: 0, .. })
        );
        assert_matches!(
            I2cData::parse(&[0x90, 0x01]),
            Err(CodecError::InvalidSlaveAddress { value: 0x90 })
        );
        assert_matches!(
            I2cData::parse(&[0x00; 128]),
            Err(CodecError::InvalidByteSize { expected: 127, actual: 128, .. })
        );
    }

    #[test]
    fn data_splits_address_from_payload() {
        let data = I2cData::parse(&[0x48, 0x01, 0x02]).expect("payload should decode");
        assert_eq!(
            I2cData {
                address: 0x48,
                data: vec![0x01, 0x02],
            },
            data
        );
    }

    #[test]
    fn config_rejects_unknown_enable_flag() {
        assert_matches!(
            I2cConfig::parse(&[0x21]),
            Err(CodecError::InvalidEnableFlag { value: 2 })
        );
        assert_eq!(
            Ok(I2cConfig::new(true, I2cClock::Fast400k)),
            I2cConfig::parse(&[0x12])
        );
    }

    #[rstest]
    #[case(&[0x48, 0x00], CodecError::InvalidReadLength { value: 0 })]
    #[case(&[0x48, 0x7F], CodecError::InvalidReadLength { value: 127 })]
    #[case(&[0x48, 0xFF], CodecError::InvalidReadLength { value: 255 })]
    #[case(&[0x80, 0x01], CodecError::InvalidSlaveAddress { value: 0x80 })]
    fn read_request_parse_enforces_the_constructor_bounds(
        #[case] bytes: &[u8],
        #[case] expected: CodecError,
    ) {
        assert_eq!(Err(expected), I2cReadRequest::parse(bytes));
    }

    #[test]
    fn every_i2c_value_survives_a_round_trip() {
        for clock in I2cClock::iter() {
            for enabled in [false, true] {
                assert_round_trip(&I2cConfig::new(enabled, clock));
            }
        }
        for (address, length) in [(0x00, 1), (0x48, 16), (I2C_MAX_ADDRESS, I2C_MAX_READ_LENGTH)] {
            let request = I2cReadRequest::new(address, length).expect("request within bounds");
            assert_round_trip(&request);
        }
        for data in [vec![], vec![0xA5], vec![0x5A; I2C_MAX_WRITE_LENGTH]] {
            let write = I2cWrite::new(0x20, data).expect("write within bounds");
            assert_round_trip(&write);
        }
        assert_round_trip(&I2cData {
            address: I2C_MAX_ADDRESS,
            data: vec![0xEE; usize::from(I2C_MAX_READ_LENGTH)],
        });
        assert_round_trip(&I2cData {
            address: 0x10,
            data: Vec::new(),
        });
    }
}
