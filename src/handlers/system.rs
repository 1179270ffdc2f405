use crate::codec::{BluetoothSettings, DeviceName, SettingsCommand, SystemInfo};
use crate::error::OperationError;
use crate::hw::Peripheral;

/// Handler for identification, radio settings and device lifecycle.
pub struct SystemHandler;

impl SystemHandler {
    /// # Errors
    ///
    /// Returns an error when the read fails or the value does not decode.
    pub async fn info(peripheral: &Peripheral) -> Result<SystemInfo, OperationError> {
        peripheral
            .read(&peripheral.services().settings.system_info)
            .await
    }

    /// # Errors
    ///
    /// Returns an error when the read fails or the value does not decode.
    pub async fn bluetooth_settings(
        peripheral: &Peripheral,
    ) -> Result<BluetoothSettings, OperationError> {
        peripheral
            .read(&peripheral.services().settings.bluetooth_settings)
            .await
    }

    /// # Errors
    ///
    /// Returns an error when the session is not ready or the write fails.
    pub async fn set_bluetooth_settings(
        peripheral: &Peripheral,
        settings: BluetoothSettings,
    ) -> Result<(), OperationError> {
        Self::send(peripheral, SettingsCommand::SetBluetooth(settings)).await
    }

    /// # Errors
    ///
    /// Returns an error when the read fails or the value does not decode.
    pub async fn device_name(peripheral: &Peripheral) -> Result<DeviceName, OperationError> {
        peripheral
            .read(&peripheral.services().settings.device_name)
            .await
    }

    /// Renames the peripheral. Takes effect in advertisements after a reboot.
    ///
    /// # Errors
    ///
    /// Returns an error when the session is not ready or the write fails.
    pub async fn set_device_name(
        peripheral: &Peripheral,
        name: DeviceName,
    ) -> Result<(), OperationError> {
        Self::send(peripheral, SettingsCommand::SetDeviceName(name)).await
    }

    /// Restarts the peripheral. The link drops shortly after the write completes.
    ///
    /// # Errors
    ///
    /// Returns an error when the session is not ready or the write fails.
    pub async fn reboot(peripheral: &Peripheral) -> Result<(), OperationError> {
        Self::send(peripheral, SettingsCommand::Reboot).await
    }

    /// # Errors
    ///
    /// Returns an error when the session is not ready or the write fails.
    pub async fn factory_reset(peripheral: &Peripheral) -> Result<(), OperationError> {
        Self::send(peripheral, SettingsCommand::FactoryReset).await
    }

    async fn send(peripheral: &Peripheral, command: SettingsCommand) -> Result<(), OperationError> {
        let settings = &peripheral.services().settings;
        peripheral.write(&settings.command, &command).await
    }
}
