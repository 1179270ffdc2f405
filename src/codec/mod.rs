//! Typed wire values exchanged with the I/O expander.
//!
//! Every value type declares the byte length it expects, how that length is
//! compared against an incoming buffer, and how validated bytes map to fields.
//! Writable values also compose back into the exact same layout.

use std::ops::Deref;

use serde::Serialize;
use thiserror::Error;

/// Declares a closed one-byte enumeration decoded through a lookup table.
///
/// Unknown raw values map to the named [`CodecError`] variant; they are never
/// coerced to a default.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident => $error:ident {
            $( $(#[$variant_meta:meta])* $variant:ident = $raw:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            Eq,
            PartialEq,
            Hash,
            strum_macros::EnumIter,
            strum_macros::Display,
            serde::Serialize,
        )]
        #[strum(serialize_all = "snake_case")]
        #[serde(rename_all = "snake_case")]
        $vis enum $name {
            $( $(#[$variant_meta])* $variant ),+
        }

        impl $name {
            /// Returns the raw protocol value.
            #[must_use]
            pub const fn as_raw(self) -> u8 {
                match self {
                    $( Self::$variant => $raw ),+
                }
            }
        }

        impl TryFrom<u8> for $name {
            type Error = $crate::codec::CodecError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $( $raw => Ok(Self::$variant), )+
                    _ => Err($crate::codec::CodecError::$error { value }),
                }
            }
        }
    };
}

mod analog;
mod bytes;
mod command;
mod gpio;
mod i2c;
mod pin;
mod pwm;
mod spi;
mod system;
mod uart;

pub use self::analog::{
    AdcResolution, AnalogConfiguration, AnalogMode, AnalogOutput, AnalogPinConfig,
    AnalogSettings, AnalogValues, ReferenceVoltage,
};
pub use self::bytes::{Nibbles, be_u16, be_u32, bits, chunk, compose_u16, compose_u32, pack_bits};
pub use self::command::{ConfigCommand, ControlCommand, SettingsCommand};
pub use self::gpio::{GpioConfiguration, GpioMode, GpioOutput, GpioPinConfig, GpioValue, GpioValues, Level};
pub use self::i2c::{
    I2C_MAX_ADDRESS, I2C_MAX_READ_LENGTH, I2C_MAX_WRITE_LENGTH, I2cClock, I2cConfig, I2cData,
    I2cReadRequest, I2cWrite,
};
pub use self::pin::{AnalogPin, GpioPin, PwmPin};
pub use self::pwm::{
    HardwarePwmConfig, HardwarePwmValues, PwmCounterMode, PwmPrescaler, SoftwarePwmConfiguration,
    SoftwarePwmDrive, SoftwarePwmMode, SoftwarePwmPinConfig,
};
pub use self::spi::{BitOrder, SpiClock, SpiConfig, SpiData, SpiMode, SpiTransfer};
pub use self::system::{BluetoothSettings, DeviceName, SystemInfo, TxPower};
pub use self::uart::{Parity, StopBits, UartConfig, UartData, UartTransfer};

/// Largest SPI/UART payload carried in one characteristic value.
pub const MAX_TRANSFER_LENGTH: usize = 127;

/// How an incoming buffer length is compared against [`CharacteristicValue::BYTE_SIZE`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ByteSizeComparison {
    /// The buffer must be exactly `BYTE_SIZE` long.
    Exact,
    /// The buffer may be anything up to `BYTE_SIZE` long.
    AtMost,
}

impl ByteSizeComparison {
    /// Returns whether a buffer of `actual` bytes satisfies `expected`.
    #[must_use]
    pub const fn accepts(self, actual: usize, expected: usize) -> bool {
        match self {
            Self::Exact => actual == expected,
            Self::AtMost => actual <= expected,
        }
    }
}

/// Errors returned while decoding characteristic values.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum CodecError {
    #[error("invalid byte size: expected {comparison} {expected} bytes, got {actual}")]
    InvalidByteSize {
        expected: usize,
        actual: usize,
        comparison: ByteSizeComparison,
    },
    #[error("invalid pin number {value}")]
    InvalidPinNumber { value: u8 },
    #[error("invalid GPIO mode {value}")]
    InvalidGpioMode { value: u8 },
    #[error("invalid GPIO level {value}")]
    InvalidGpioLevel { value: u8 },
    #[error("invalid GPIO validity flag {value}")]
    InvalidGpioValidity { value: u8 },
    #[error("invalid software PWM mode {value}")]
    InvalidPwmMode { value: u8 },
    #[error("invalid PWM prescaler {value}")]
    InvalidPrescaler { value: u8 },
    #[error("invalid PWM counter mode {value}")]
    InvalidCounterMode { value: u8 },
    #[error("invalid analog mode {value}")]
    InvalidAnalogMode { value: u8 },
    #[error("invalid reference voltage {value}")]
    InvalidReferenceVoltage { value: u8 },
    #[error("invalid ADC resolution {value}")]
    InvalidResolution { value: u8 },
    #[error("invalid I2C clock {value}")]
    InvalidI2cClock { value: u8 },
    #[error("invalid enable flag {value}")]
    InvalidEnableFlag { value: u8 },
    #[error("invalid I2C slave address {value:#04x}")]
    InvalidSlaveAddress { value: u8 },
    #[error("invalid I2C read length {value}")]
    InvalidReadLength { value: u8 },
    #[error("invalid SPI mode {value}")]
    InvalidSpiMode { value: u8 },
    #[error("invalid SPI bit order {value}")]
    InvalidBitOrder { value: u8 },
    #[error("invalid SPI clock {value}")]
    InvalidSpiClock { value: u8 },
    #[error("invalid UART parity {value}")]
    InvalidParity { value: u8 },
    #[error("invalid UART stop bits {value}")]
    InvalidStopBits { value: u8 },
    #[error("invalid TX power {value}")]
    InvalidTxPower { value: u8 },
    #[error("device name is not valid UTF-8")]
    InvalidDeviceName,
}

/// Range violations caught while constructing outbound values, before any byte is produced.
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum BoundsError {
    #[error("I2C slave address {address:#04x} exceeds 0x7f")]
    InvalidSlaveAddress { address: u8 },
    #[error("I2C read length {length} is outside 1..={max}")]
    InvalidReadLength { length: u8, max: u8 },
    #[error("I2C write length {length} exceeds {max} bytes")]
    InvalidWriteLength { length: usize, max: usize },
    #[error("transfer length {length} exceeds {max} bytes")]
    InvalidTransferLength { length: usize, max: usize },
    #[error("device name length {length} exceeds {max} bytes")]
    InvalidDeviceNameLength { length: usize, max: usize },
}

/// A buffer that already satisfied a value type's length rule.
///
/// Only [`CharacteristicValue::parse`] creates one, so `decode` cannot be
/// reached with an unchecked slice.
///
/// ```compile_fail
/// use bleio::codec::{CharacteristicValue, CheckedBytes, GpioValues};
///
/// let _ = GpioValues::decode(CheckedBytes(&[]));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CheckedBytes<'a>(&'a [u8]);

impl Deref for CheckedBytes<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.0
    }
}

impl<'a> IntoIterator for CheckedBytes<'a> {
    type Item = &'a u8;
    type IntoIter = std::slice::Iter<'a, u8>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A value parsed from a fixed- or bounded-length characteristic buffer.
pub trait CharacteristicValue: Sized {
    /// Length the type expects.
    const BYTE_SIZE: usize;
    /// How buffer lengths are compared against [`Self::BYTE_SIZE`].
    const COMPARISON: ByteSizeComparison = ByteSizeComparison::Exact;

    /// Maps length-checked bytes to fields.
    ///
    /// # Errors
    ///
    /// Returns an error when an enumerated field holds an unknown raw value.
    fn decode(bytes: CheckedBytes<'_>) -> Result<Self, CodecError>;

    /// Returns whether `bytes` satisfies the length rule.
    fn is_valid(bytes: &[u8]) -> bool {
        Self::COMPARISON.accepts(bytes.len(), Self::BYTE_SIZE)
    }

    /// Parses one characteristic value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidByteSize`] before any field is read when
    /// the length rule fails, otherwise any field-level decode error.
    fn parse(bytes: &[u8]) -> Result<Self, CodecError> {
        if !Self::is_valid(bytes) {
            return Err(CodecError::InvalidByteSize {
                expected: Self::BYTE_SIZE,
                actual: bytes.len(),
                comparison: Self::COMPARISON,
            });
        }
        Self::decode(CheckedBytes(bytes))
    }
}

/// A value that can be written to the peripheral.
pub trait Compose {
    /// Returns the outbound payload bytes.
    fn compose(&self) -> Vec<u8>;
}

/// Decodes a validity/enable nibble that only admits `0` and `1`.
pub(crate) fn flag_nibble(
    value: u8,
    error: impl FnOnce(u8) -> CodecError,
) -> Result<bool, CodecError> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(error(value)),
    }
}

/// Asserts that `value` survives a compose/parse cycle unchanged.
#[cfg(test)]
pub(crate) fn assert_round_trip<V>(value: &V)
where
    V: CharacteristicValue + Compose + Clone + PartialEq + std::fmt::Debug,
{
    let bytes = value.compose();
    pretty_assertions::assert_eq!(Ok(value.clone()), V::parse(&bytes), "payload {bytes:02X?}");
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(ByteSizeComparison::Exact, 8, 8, true)]
    #[case(ByteSizeComparison::Exact, 7, 8, false)]
    #[case(ByteSizeComparison::Exact, 9, 8, false)]
    #[case(ByteSizeComparison::AtMost, 0, 127, true)]
    #[case(ByteSizeComparison::AtMost, 127, 127, true)]
    #[case(ByteSizeComparison::AtMost, 128, 127, false)]
    fn comparison_accepts_expected_lengths(
        #[case] comparison: ByteSizeComparison,
        #[case] actual: usize,
        #[case] expected: usize,
        #[case] accepted: bool,
    ) {
        assert_eq!(accepted, comparison.accepts(actual, expected));
    }

    #[test]
    fn byte_size_error_names_the_rule() {
        let error = GpioValues::parse(&[0x00; 3]).expect_err("short buffer should be rejected");
        assert_matches!(
            error,
            CodecError::InvalidByteSize {
                expected: 8,
                actual: 3,
                comparison: ByteSizeComparison::Exact,
            }
        );
        assert_eq!(
            "invalid byte size: expected exact 8 bytes, got 3",
            error.to_string()
        );
    }

    fn assert_rejects_lengths_outside_rule<V>()
    where
        V: CharacteristicValue + std::fmt::Debug,
    {
        let too_long = vec![0; V::BYTE_SIZE + 1];
        assert_matches!(
            V::parse(&too_long),
            Err(CodecError::InvalidByteSize { actual, .. }) if actual == V::BYTE_SIZE + 1
        );
        if V::COMPARISON == ByteSizeComparison::Exact {
            let too_short = vec![0; V::BYTE_SIZE - 1];
            assert_matches!(
                V::parse(&too_short),
                Err(CodecError::InvalidByteSize { actual, .. }) if actual == V::BYTE_SIZE - 1
            );
            assert_matches!(V::parse(&[]), Err(CodecError::InvalidByteSize { actual: 0, .. }));
        }
    }

    #[test]
    fn every_value_type_rejects_buffers_outside_its_length_rule() {
        assert_rejects_lengths_outside_rule::<GpioPinConfig>();
        assert_rejects_lengths_outside_rule::<GpioConfiguration>();
        assert_rejects_lengths_outside_rule::<GpioOutput>();
        assert_rejects_lengths_outside_rule::<GpioValue>();
        assert_rejects_lengths_outside_rule::<GpioValues>();
        assert_rejects_lengths_outside_rule::<SoftwarePwmPinConfig>();
        assert_rejects_lengths_outside_rule::<SoftwarePwmConfiguration>();
        assert_rejects_lengths_outside_rule::<SoftwarePwmDrive>();
        assert_rejects_lengths_outside_rule::<HardwarePwmConfig>();
        assert_rejects_lengths_outside_rule::<HardwarePwmValues>();
        assert_rejects_lengths_outside_rule::<AnalogPinConfig>();
        assert_rejects_lengths_outside_rule::<AnalogSettings>();
        assert_rejects_lengths_outside_rule::<AnalogConfiguration>();
        assert_rejects_lengths_outside_rule::<AnalogOutput>();
        assert_rejects_lengths_outside_rule::<AnalogValues>();
        assert_rejects_lengths_outside_rule::<I2cConfig>();
        assert_rejects_lengths_outside_rule::<I2cWrite>();
        assert_rejects_lengths_outside_rule::<I2cReadRequest>();
        assert_rejects_lengths_outside_rule::<I2cData>();
        assert_rejects_lengths_outside_rule::<SpiConfig>();
        assert_rejects_lengths_outside_rule::<SpiTransfer>();
        assert_rejects_lengths_outside_rule::<SpiData>();
        assert_rejects_lengths_outside_rule::<UartConfig>();
        assert_rejects_lengths_outside_rule::<UartTransfer>();
        assert_rejects_lengths_outside_rule::<UartData>();
        assert_rejects_lengths_outside_rule::<BluetoothSettings>();
        assert_rejects_lengths_outside_rule::<SystemInfo>();
        assert_rejects_lengths_outside_rule::<DeviceName>();
    }
}
