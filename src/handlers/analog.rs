use crate::codec::{
    AnalogConfiguration, AnalogMode, AnalogOutput, AnalogPin, AnalogPinConfig, AnalogSettings,
    ConfigCommand, ControlCommand,
};
use crate::error::OperationError;
use crate::hw::Peripheral;

/// Handler for the ADC/DAC block.
pub struct AnalogHandler;

impl AnalogHandler {
    /// Applies the reference voltage and resolution shared by every analog pin.
    ///
    /// # Errors
    ///
    /// Returns an error when the session is not ready or the write fails.
    pub async fn begin(
        peripheral: &Peripheral,
        settings: AnalogSettings,
    ) -> Result<(), OperationError> {
        let config = &peripheral.services().config;
        peripheral
            .write(&config.command, &ConfigCommand::AnalogSettings(settings))
            .await
    }

    /// # Errors
    ///
    /// Returns an error when the session is not ready or the write fails.
    pub async fn pin_mode(
        peripheral: &Peripheral,
        pin: AnalogPin,
        mode: AnalogMode,
    ) -> Result<(), OperationError> {
        let config = &peripheral.services().config;
        let command = ConfigCommand::AnalogPin(AnalogPinConfig::new(pin, mode));
        peripheral.write(&config.command, &command).await
    }

    /// Reads the latest sample of one analog pin.
    ///
    /// # Errors
    ///
    /// Returns an error when the read fails or the sample buffer does not decode.
    pub async fn read(peripheral: &Peripheral, pin: AnalogPin) -> Result<u16, OperationError> {
        let values = peripheral
            .read(&peripheral.services().control.analog_input)
            .await?;
        Ok(values.value(pin))
    }

    /// Sets the output level of an analog pin.
    ///
    /// # Errors
    ///
    /// Returns an error when the session is not ready or the write fails.
    pub async fn write(
        peripheral: &Peripheral,
        pin: AnalogPin,
        value: u16,
    ) -> Result<(), OperationError> {
        let control = &peripheral.services().control;
        let command = ControlCommand::AnalogWrite(AnalogOutput::new(pin, value));
        peripheral.write(&control.command, &command).await
    }

    /// # Errors
    ///
    /// Returns an error when the read fails or the configuration does not decode.
    pub async fn configuration(
        peripheral: &Peripheral,
    ) -> Result<AnalogConfiguration, OperationError> {
        peripheral.read(&peripheral.services().config.analog).await
    }
}
