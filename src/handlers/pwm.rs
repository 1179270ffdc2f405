use crate::codec::{
    ConfigCommand, ControlCommand, HardwarePwmConfig, HardwarePwmValues, PwmPin,
    SoftwarePwmConfiguration, SoftwarePwmDrive, SoftwarePwmMode, SoftwarePwmPinConfig,
};
use crate::error::OperationError;
use crate::hw::Peripheral;

/// Handler for the software and hardware PWM blocks.
pub struct PwmHandler;

impl PwmHandler {
    /// # Errors
    ///
    /// Returns an error when the session is not ready or the write fails.
    pub async fn software_mode(
        peripheral: &Peripheral,
        pin: PwmPin,
        mode: SoftwarePwmMode,
    ) -> Result<(), OperationError> {
        let config = &peripheral.services().config;
        let command = ConfigCommand::SoftwarePwm(SoftwarePwmPinConfig::new(pin, mode));
        peripheral.write(&config.command, &command).await
    }

    /// Drives a software PWM pin with explicit on/off durations in milliseconds.
    ///
    /// # Errors
    ///
    /// Returns an error when the session is not ready or the write fails.
    pub async fn software_drive(
        peripheral: &Peripheral,
        pin: PwmPin,
        on_ms: u16,
        off_ms: u16,
    ) -> Result<(), OperationError> {
        let control = &peripheral.services().control;
        let command = ControlCommand::SoftwarePwm(SoftwarePwmDrive::new(pin, on_ms, off_ms));
        peripheral.write(&control.command, &command).await
    }

    /// # Errors
    ///
    /// Returns an error when the session is not ready or the write fails.
    pub async fn hardware_begin(
        peripheral: &Peripheral,
        config: HardwarePwmConfig,
    ) -> Result<(), OperationError> {
        let service = &peripheral.services().config;
        peripheral
            .write(&service.command, &ConfigCommand::HardwarePwm(config))
            .await
    }

    /// Updates the control value of every hardware PWM channel at once.
    ///
    /// # Errors
    ///
    /// Returns an error when the session is not ready or the write fails.
    pub async fn hardware_write(
        peripheral: &Peripheral,
        values: HardwarePwmValues,
    ) -> Result<(), OperationError> {
        let control = &peripheral.services().control;
        peripheral
            .write(&control.command, &ControlCommand::HardwarePwm(values))
            .await
    }

    /// # Errors
    ///
    /// Returns an error when the read fails or the configuration does not decode.
    pub async fn software_configuration(
        peripheral: &Peripheral,
    ) -> Result<SoftwarePwmConfiguration, OperationError> {
        peripheral
            .read(&peripheral.services().config.software_pwm)
            .await
    }

    /// # Errors
    ///
    /// Returns an error when the read fails or the configuration does not decode.
    pub async fn hardware_configuration(
        peripheral: &Peripheral,
    ) -> Result<HardwarePwmConfig, OperationError> {
        peripheral
            .read(&peripheral.services().config.hardware_pwm)
            .await
    }
}
