//! Command unions written to each service's command characteristic.
//!
//! Every variant composes to `[command identifier] + payload`.

use derive_more::From;
use serde::Serialize;

use super::{
    AnalogOutput, AnalogPinConfig, AnalogSettings, BluetoothSettings, Compose, DeviceName,
    GpioOutput, GpioPinConfig, HardwarePwmConfig, HardwarePwmValues, I2cConfig, I2cReadRequest,
    I2cWrite, SoftwarePwmDrive, SoftwarePwmPinConfig, SpiConfig, SpiTransfer, UartConfig,
    UartTransfer,
};

fn frame(identifier: u8, payload: Vec<u8>) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(payload.len() + 1);
    bytes.push(identifier);
    bytes.extend(payload);
    bytes
}

/// Commands accepted by the settings service.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(tag = "command", content = "payload", rename_all = "snake_case")]
pub enum SettingsCommand {
    SetBluetooth(BluetoothSettings),
    SetDeviceName(DeviceName),
    Reboot,
    FactoryReset,
}

impl SettingsCommand {
    #[must_use]
    pub const fn identifier(&self) -> u8 {
        match self {
            Self::SetBluetooth(_) => 0x01,
            Self::SetDeviceName(_) => 0x02,
            Self::Reboot => 0x03,
            Self::FactoryReset => 0x04,
        }
    }
}

impl Compose for SettingsCommand {
    fn compose(&self) -> Vec<u8> {
        let payload = match self {
            Self::SetBluetooth(settings) => settings.compose(),
            Self::SetDeviceName(name) => name.compose(),
            Self::Reboot | Self::FactoryReset => Vec::new(),
        };
        frame(self.identifier(), payload)
    }
}

/// Commands accepted by the configuration service.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, From)]
#[serde(tag = "command", content = "payload", rename_all = "snake_case")]
pub enum ConfigCommand {
    Gpio(GpioPinConfig),
    SoftwarePwm(SoftwarePwmPinConfig),
    HardwarePwm(HardwarePwmConfig),
    AnalogPin(AnalogPinConfig),
    AnalogSettings(AnalogSettings),
    I2c(I2cConfig),
    Spi(SpiConfig),
    Uart(UartConfig),
}

impl ConfigCommand {
    #[must_use]
    pub const fn identifier(&self) -> u8 {
        match self {
            Self::Gpio(_) => 0x01,
            Self::SoftwarePwm(_) => 0x02,
            Self::HardwarePwm(_) => 0x03,
            Self::AnalogPin(_) => 0x04,
            Self::AnalogSettings(_) => 0x05,
            Self::I2c(_) => 0x06,
            Self::Spi(_) => 0x07,
            Self::Uart(_) => 0x08,
        }
    }
}

impl Compose for ConfigCommand {
    fn compose(&self) -> Vec<u8> {
        let payload = match self {
            Self::Gpio(config) => config.compose(),
            Self::SoftwarePwm(config) => config.compose(),
            Self::HardwarePwm(config) => config.compose(),
            Self::AnalogPin(config) => config.compose(),
            Self::AnalogSettings(settings) => settings.compose(),
            Self::I2c(config) => config.compose(),
            Self::Spi(config) => config.compose(),
            Self::Uart(config) => config.compose(),
        };
        frame(self.identifier(), payload)
    }
}

/// Commands accepted by the control service.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, From)]
#[serde(tag = "command", content = "payload", rename_all = "snake_case")]
pub enum ControlCommand {
    DigitalWrite(GpioOutput),
    SoftwarePwm(SoftwarePwmDrive),
    HardwarePwm(HardwarePwmValues),
    AnalogWrite(AnalogOutput),
    I2cWrite(I2cWrite),
    I2cRead(I2cReadRequest),
    SpiTransfer(SpiTransfer),
    UartSend(UartTransfer),
}

impl ControlCommand {
    #[must_use]
    pub const fn identifier(&self) -> u8 {
        match self {
            Self::DigitalWrite(_) => 0x01,
            Self::SoftwarePwm(_) => 0x02,
            Self::HardwarePwm(_) => 0x03,
            Self::AnalogWrite(_) => 0x04,
            Self::I2cWrite(_) => 0x05,
            Self::I2cRead(_) => 0x06,
            Self::SpiTransfer(_) => 0x07,
            Self::UartSend(_) => 0x08,
        }
    }
}

impl Compose for ControlCommand {
    fn compose(&self) -> Vec<u8> {
        let payload = match self {
            Self::DigitalWrite(output) => output.compose(),
            Self::SoftwarePwm(drive) => drive.compose(),
            Self::HardwarePwm(values) => values.compose(),
            Self::AnalogWrite(output) => output.compose(),
            Self::I2cWrite(write) => write.compose(),
            Self::I2cRead(request) => request.compose(),
            Self::SpiTransfer(transfer) => transfer.compose(),
            Self::UartSend(transfer) => transfer.compose(),
        };
        frame(self.identifier(), payload)
    }
}
