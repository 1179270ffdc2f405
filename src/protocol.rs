use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Serialize;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};
use uuid::Uuid;

/// GATT services exposed by the I/O expander.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, EnumIter, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ServiceId {
    Settings,
    Config,
    Control,
}

/// Every characteristic the SDK addresses, across all services.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, EnumIter, EnumString, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CharacteristicId {
    SettingsCommand,
    SystemInfo,
    BluetoothSettings,
    DeviceName,
    ConfigCommand,
    GpioConfiguration,
    SoftwarePwmConfiguration,
    HardwarePwmConfiguration,
    AnalogConfiguration,
    I2cConfiguration,
    SpiConfiguration,
    UartConfiguration,
    ControlCommand,
    GpioInput,
    AnalogInput,
    I2cData,
    SpiData,
    UartData,
}

/// Capability shape of one characteristic.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CharacteristicKind {
    /// Write-only; no stored value.
    Command,
    /// Pulled with an explicit read.
    Readable,
    /// Readable and pushed by the device once notifications are enabled.
    Notifiable,
}

impl CharacteristicKind {
    #[must_use]
    pub fn is_readable(self) -> bool {
        !matches!(self, Self::Command)
    }
}

/// Descriptive metadata for one service.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ServiceMetadata {
    name: &'static str,
    uuid: Uuid,
}

impl ServiceMetadata {
    pub fn name(self) -> &'static str {
        self.name
    }

    pub fn uuid(self) -> Uuid {
        self.uuid
    }
}

/// Descriptive metadata for one characteristic.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CharacteristicMetadata {
    name: &'static str,
    uuid: Uuid,
    service: ServiceId,
    kind: CharacteristicKind,
}

impl CharacteristicMetadata {
    pub fn name(self) -> &'static str {
        self.name
    }

    pub fn uuid(self) -> Uuid {
        self.uuid
    }

    /// Owning service.
    pub fn service(self) -> ServiceId {
        self.service
    }

    pub fn kind(self) -> CharacteristicKind {
        self.kind
    }
}

const UUID_BASE: u128 = 0x5c3a_0000_8f2e_4b6d_a1c0_3e7d9b1f2a00;

const fn short_uuid(short: u16) -> Uuid {
    Uuid::from_u128(UUID_BASE | ((short as u128) << 96))
}

impl ServiceId {
    #[must_use]
    pub fn metadata(self) -> ServiceMetadata {
        match self {
            Self::Settings => ServiceMetadata {
                name: "settings service",
                uuid: short_uuid(0x0100),
            },
            Self::Config => ServiceMetadata {
                name: "configuration service",
                uuid: short_uuid(0x0200),
            },
            Self::Control => ServiceMetadata {
                name: "control service",
                uuid: short_uuid(0x0300),
            },
        }
    }

    /// Characteristics that belong to this service, in declaration order.
    pub fn characteristics(self) -> impl Iterator<Item = CharacteristicId> {
        CharacteristicId::iter().filter(move |id| id.metadata().service == self)
    }
}

impl CharacteristicId {
    #[must_use]
    pub fn metadata(self) -> CharacteristicMetadata {
        *CHARACTERISTICS_BY_ID
            .get(&self)
            .unwrap_or(&metadata_for(self))
    }

    #[must_use]
    pub fn service(self) -> ServiceId {
        self.metadata().service
    }

    #[must_use]
    pub fn kind(self) -> CharacteristicKind {
        self.metadata().kind
    }
}

/// Characteristic metadata keyed by typed identifiers.
static CHARACTERISTICS_BY_ID: LazyLock<HashMap<CharacteristicId, CharacteristicMetadata>> =
    LazyLock::new(|| {
        CharacteristicId::iter()
            .map(|id| (id, metadata_for(id)))
            .collect()
    });

static CHARACTERISTICS_BY_UUID: LazyLock<HashMap<Uuid, CharacteristicId>> = LazyLock::new(|| {
    CharacteristicId::iter()
        .map(|id| (metadata_for(id).uuid, id))
        .collect()
});

/// Resolves a GATT characteristic UUID to its identifier.
pub fn characteristic_for_uuid(uuid: Uuid) -> Option<CharacteristicId> {
    CHARACTERISTICS_BY_UUID.get(&uuid).copied()
}

/// Resolves a GATT service UUID to its identifier.
pub fn service_for_uuid(uuid: Uuid) -> Option<ServiceId> {
    ServiceId::iter().find(|service| service.metadata().uuid == uuid)
}

fn metadata_for(id: CharacteristicId) -> CharacteristicMetadata {
    use CharacteristicId as C;
    use CharacteristicKind::{Command, Notifiable, Readable};
    use ServiceId::{Config, Control, Settings};

    let (name, short, service, kind) = match id {
        C::SettingsCommand => ("settings command", 0x0101, Settings, Command),
        C::SystemInfo => ("system info", 0x0102, Settings, Readable),
        C::BluetoothSettings => ("bluetooth settings", 0x0103, Settings, Notifiable),
        C::DeviceName => ("device name", 0x0104, Settings, Readable),
        C::ConfigCommand => ("configuration command", 0x0201, Config, Command),
        C::GpioConfiguration => ("GPIO configuration", 0x0202, Config, Readable),
        C::SoftwarePwmConfiguration => ("software PWM configuration", 0x0203, Config, Readable),
        C::HardwarePwmConfiguration => ("hardware PWM configuration", 0x0204, Config, Readable),
        C::AnalogConfiguration => ("analog configuration", 0x0205, Config, Readable),
        C::I2cConfiguration => ("I2C configuration", 0x0206, Config, Readable),
        C::SpiConfiguration => ("SPI configuration", 0x0207, Config, Readable),
        C::UartConfiguration => ("UART configuration", 0x0208, Config, Readable),
        C::ControlCommand => ("control command", 0x0301, Control, Command),
        C::GpioInput => ("GPIO input", 0x0302, Control, Notifiable),
        C::AnalogInput => ("analog input", 0x0303, Control, Notifiable),
        C::I2cData => ("I2C data", 0x0304, Control, Notifiable),
        C::SpiData => ("SPI data", 0x0305, Control, Notifiable),
        C::UartData => ("UART data", 0x0306, Control, Notifiable),
    };
    CharacteristicMetadata {
        name,
        uuid: short_uuid(short),
        service,
        kind,
    }
}
