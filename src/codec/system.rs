use serde::Serialize;

use super::{
    BoundsError, ByteSizeComparison, CharacteristicValue, CheckedBytes, CodecError, Compose,
    be_u16, be_u32, compose_u16, compose_u32,
};

wire_enum! {
    /// Radio transmit power step.
    pub enum TxPower => InvalidTxPower {
        Minus20Dbm = 0,
        Minus16Dbm = 1,
        Minus12Dbm = 2,
        Minus8Dbm = 3,
        Minus4Dbm = 4,
        ZeroDbm = 5,
        Plus4Dbm = 6,
    }
}

impl TxPower {
    #[must_use]
    pub const fn dbm(self) -> i8 {
        match self {
            Self::Minus20Dbm => -20,
            Self::Minus16Dbm => -16,
            Self::Minus12Dbm => -12,
            Self::Minus8Dbm => -8,
            Self::Minus4Dbm => -4,
            Self::ZeroDbm => 0,
            Self::Plus4Dbm => 4,
        }
    }
}

/// Radio settings: `[tx power, advertising interval ms u16 BE]`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct BluetoothSettings {
    pub tx_power: TxPower,
    pub advertising_interval_ms: u16,
}

impl BluetoothSettings {
    #[must_use]
    pub const fn new(tx_power: TxPower, advertising_interval_ms: u16) -> Self {
        Self {
            tx_power,
            advertising_interval_ms,
        }
    }
}

impl CharacteristicValue for BluetoothSettings {
    const BYTE_SIZE: usize = 3;

    fn decode(bytes: CheckedBytes<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            tx_power: TxPower::try_from(bytes[0])?,
            advertising_interval_ms: be_u16(&bytes[1..]).unwrap_or_default(),
        })
    }
}

impl Compose for BluetoothSettings {
    fn compose(&self) -> Vec<u8> {
        let [high, low] = compose_u16(self.advertising_interval_ms);
        vec![self.tx_power.as_raw(), high, low]
    }
}

/// Firmware and hardware identification.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct SystemInfo {
    pub firmware_major: u8,
    pub firmware_minor: u8,
    pub firmware_patch: u8,
    pub hardware_revision: u8,
    pub uptime_secs: u32,
}

impl SystemInfo {
    /// Firmware version as `major.minor.patch`.
    #[must_use]
    pub fn firmware_version(&self) -> String {
        format!(
            "{}.{}.{}",
            self.firmware_major, self.firmware_minor, self.firmware_patch
        )
    }
}

impl CharacteristicValue for SystemInfo {
    const BYTE_SIZE: usize = 8;

    fn decode(bytes: CheckedBytes<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            firmware_major: bytes[0],
            firmware_minor: bytes[1],
            firmware_patch: bytes[2],
            hardware_revision: bytes[3],
            uptime_secs: be_u32(&bytes[4..]).unwrap_or_default(),
        })
    }
}

impl Compose for SystemInfo {
    fn compose(&self) -> Vec<u8> {
        let mut bytes = vec![
            self.firmware_major,
            self.firmware_minor,
            self.firmware_patch,
            self.hardware_revision,
        ];
        bytes.extend(compose_u32(self.uptime_secs));
        bytes
    }
}

/// Advertised device name, at most 20 UTF-8 bytes.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize)]
#[serde(transparent)]
pub struct DeviceName(String);

impl DeviceName {
    pub const MAX_LENGTH: usize = 20;

    /// Validates the encoded name length.
    ///
    /// # Errors
    ///
    /// Returns an error when `name` encodes to more than 20 bytes.
    pub fn new(name: impl Into<String>) -> Result<Self, BoundsError> {
        let name = name.into();
        if name.len() > Self::MAX_LENGTH {
            return Err(BoundsError::InvalidDeviceNameLength {
                length: name.len(),
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl CharacteristicValue for DeviceName {
    const BYTE_SIZE: usize = Self::MAX_LENGTH;
    const COMPARISON: ByteSizeComparison = ByteSizeComparison::AtMost;

    fn decode(bytes: CheckedBytes<'_>) -> Result<Self, CodecError> {
        let name = std::str::from_utf8(&bytes).map_err(|_| CodecError::InvalidDeviceName)?;
        Ok(Self(name.to_owned()))
    }
}

impl Compose for DeviceName {
    fn compose(&self) -> Vec<u8> {
        self.0.as_bytes().to_vec()
    }
}
