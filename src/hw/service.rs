use std::collections::HashSet;

use crate::codec::{
    AnalogConfiguration, AnalogValues, BluetoothSettings, CodecError, ConfigCommand,
    ControlCommand, DeviceName, GpioConfiguration, GpioValues, HardwarePwmConfig, I2cConfig,
    I2cData, SettingsCommand, SoftwarePwmConfiguration, SpiConfig, SpiData, SystemInfo,
    UartConfig, UartData,
};
use crate::protocol::{CharacteristicId, ServiceId};

use super::characteristic::{
    Characteristic, CommandCharacteristic, NotifiableCharacteristic, ReadableCharacteristic,
};

/// A fixed grouping of characteristics plus the subset that must notify before the session is ready.
pub trait Service: Send + Sync {
    fn id(&self) -> ServiceId;

    /// Complete characteristic set, used for discovery.
    fn characteristics(&self) -> Vec<&dyn Characteristic>;

    /// Characteristics whose notifications must be enabled.
    fn notifiable_characteristics(&self) -> Vec<&dyn Characteristic>;
}

/// Device-wide settings: identification, radio parameters, reboot.
#[derive(Debug)]
pub struct SettingsService {
    pub command: CommandCharacteristic<SettingsCommand>,
    pub system_info: ReadableCharacteristic<SystemInfo>,
    pub bluetooth_settings: NotifiableCharacteristic<BluetoothSettings>,
    pub device_name: ReadableCharacteristic<DeviceName>,
}

impl SettingsService {
    fn new() -> Self {
        Self {
            command: CommandCharacteristic::new(CharacteristicId::SettingsCommand),
            system_info: ReadableCharacteristic::new(CharacteristicId::SystemInfo),
            bluetooth_settings: NotifiableCharacteristic::new(CharacteristicId::BluetoothSettings),
            device_name: ReadableCharacteristic::new(CharacteristicId::DeviceName),
        }
    }
}

impl Service for SettingsService {
    fn id(&self) -> ServiceId {
        ServiceId::Settings
    }

    fn characteristics(&self) -> Vec<&dyn Characteristic> {
        vec![
            &self.command,
            &self.system_info,
            &self.bluetooth_settings,
            &self.device_name,
        ]
    }

    fn notifiable_characteristics(&self) -> Vec<&dyn Characteristic> {
        vec![&self.bluetooth_settings]
    }
}

/// Peripheral configuration for every I/O block.
#[derive(Debug)]
pub struct ConfigService {
    pub command: CommandCharacteristic<ConfigCommand>,
    pub gpio: ReadableCharacteristic<GpioConfiguration>,
    pub software_pwm: ReadableCharacteristic<SoftwarePwmConfiguration>,
    pub hardware_pwm: ReadableCharacteristic<HardwarePwmConfig>,
    pub analog: ReadableCharacteristic<AnalogConfiguration>,
    pub i2c: ReadableCharacteristic<I2cConfig>,
    pub spi: ReadableCharacteristic<SpiConfig>,
    pub uart: ReadableCharacteristic<UartConfig>,
}

impl ConfigService {
    fn new() -> Self {
        Self {
            command: CommandCharacteristic::new(CharacteristicId::ConfigCommand),
            gpio: ReadableCharacteristic::new(CharacteristicId::GpioConfiguration),
            software_pwm: ReadableCharacteristic::new(CharacteristicId::SoftwarePwmConfiguration),
            hardware_pwm: ReadableCharacteristic::new(CharacteristicId::HardwarePwmConfiguration),
            analog: ReadableCharacteristic::new(CharacteristicId::AnalogConfiguration),
            i2c: ReadableCharacteristic::new(CharacteristicId::I2cConfiguration),
            spi: ReadableCharacteristic::new(CharacteristicId::SpiConfiguration),
            uart: ReadableCharacteristic::new(CharacteristicId::UartConfiguration),
        }
    }
}

impl Service for ConfigService {
    fn id(&self) -> ServiceId {
        ServiceId::Config
    }

    fn characteristics(&self) -> Vec<&dyn Characteristic> {
        vec![
            &self.command,
            &self.gpio,
            &self.software_pwm,
            &self.hardware_pwm,
            &self.analog,
            &self.i2c,
            &self.spi,
            &self.uart,
        ]
    }

    fn notifiable_characteristics(&self) -> Vec<&dyn Characteristic> {
        Vec::new()
    }
}

/// Runtime I/O: commands in, sampled inputs and bus data out.
#[derive(Debug)]
pub struct ControlService {
    pub command: CommandCharacteristic<ControlCommand>,
    pub gpio_input: NotifiableCharacteristic<GpioValues>,
    pub analog_input: NotifiableCharacteristic<AnalogValues>,
    pub i2c_data: NotifiableCharacteristic<I2cData>,
    pub spi_data: NotifiableCharacteristic<SpiData>,
    pub uart_data: NotifiableCharacteristic<UartData>,
}

impl ControlService {
    fn new() -> Self {
        Self {
            command: CommandCharacteristic::new(CharacteristicId::ControlCommand),
            gpio_input: NotifiableCharacteristic::new(CharacteristicId::GpioInput),
            analog_input: NotifiableCharacteristic::new(CharacteristicId::AnalogInput),
            i2c_data: NotifiableCharacteristic::new(CharacteristicId::I2cData),
            spi_data: NotifiableCharacteristic::new(CharacteristicId::SpiData),
            uart_data: NotifiableCharacteristic::new(CharacteristicId::UartData),
        }
    }
}

impl Service for ControlService {
    fn id(&self) -> ServiceId {
        ServiceId::Control
    }

    fn characteristics(&self) -> Vec<&dyn Characteristic> {
        vec![
            &self.command,
            &self.gpio_input,
            &self.analog_input,
            &self.i2c_data,
            &self.spi_data,
            &self.uart_data,
        ]
    }

    fn notifiable_characteristics(&self) -> Vec<&dyn Characteristic> {
        vec![
            &self.gpio_input,
            &self.analog_input,
            &self.i2c_data,
            &self.spi_data,
            &self.uart_data,
        ]
    }
}

/// All services owned by one peripheral session.
#[derive(Debug)]
pub struct Services {
    pub settings: SettingsService,
    pub config: ConfigService,
    pub control: ControlService,
}

impl Default for Services {
    fn default() -> Self {
        Self::new()
    }
}

impl Services {
    #[must_use]
    pub fn new() -> Self {
        Self {
            settings: SettingsService::new(),
            config: ConfigService::new(),
            control: ControlService::new(),
        }
    }

    #[must_use]
    pub fn all(&self) -> [&dyn Service; 3] {
        [&self.settings, &self.config, &self.control]
    }

    /// Services that must be discovered before the session is ready.
    #[must_use]
    pub fn expected_services(&self) -> HashSet<ServiceId> {
        self.all().into_iter().map(|service| service.id()).collect()
    }

    /// Characteristics whose notifications must be applied before the session is ready.
    #[must_use]
    pub fn expected_notifiable(&self) -> HashSet<CharacteristicId> {
        self.all()
            .into_iter()
            .flat_map(|service| service.notifiable_characteristics())
            .map(|characteristic| characteristic.id())
            .collect()
    }

    #[must_use]
    pub fn characteristic(&self, id: CharacteristicId) -> Option<&dyn Characteristic> {
        self.all()
            .into_iter()
            .flat_map(|service| service.characteristics())
            .find(|characteristic| characteristic.id() == id)
    }

    /// Routes raw bytes to the owning characteristic.
    ///
    /// # Errors
    ///
    /// Returns the decode error; the held value is left unchanged.
    pub fn update(&self, id: CharacteristicId, bytes: &[u8]) -> Result<(), CodecError> {
        match self.characteristic(id) {
            Some(characteristic) => characteristic.update(bytes),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    use super::*;
    use crate::protocol::CharacteristicKind;

    #[test]
    fn expected_counts_match_the_protocol_table() {
        let services = Services::new();
        assert_eq!(3, services.expected_services().len());
        assert_eq!(6, services.expected_notifiable().len());
    }

    #[test]
    fn every_protocol_characteristic_has_one_owner() {
        let services = Services::new();
        for id in CharacteristicId::iter() {
            let characteristic = services
                .characteristic(id)
                .expect("every identifier should map to a characteristic");
            assert_eq!(id.service(), characteristic.service());
        }
    }

    #[test]
    fn notifiable_subset_matches_declared_kinds() {
        let services = Services::new();
        let declared: HashSet<_> = CharacteristicId::iter()
            .filter(|id| id.kind() == CharacteristicKind::Notifiable)
            .collect();
        assert_eq!(declared, services.expected_notifiable());
    }

    #[test]
    fn update_routes_by_identity() {
        let services = Services::new();
        services
            .update(CharacteristicId::AnalogInput, &[0x00, 0x10, 0x00, 0x20, 0x00, 0x30])
            .expect("six-byte payload should decode");
        assert_eq!(
            Some(AnalogValues::new([0x10, 0x20, 0x30])),
            services.control.analog_input.current()
        );
        assert_eq!(None, services.config.analog.current());
    }
}
