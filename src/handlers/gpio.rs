use crate::codec::{
    ConfigCommand, ControlCommand, GpioConfiguration, GpioMode, GpioOutput, GpioPin,
    GpioPinConfig, GpioValue, Level,
};
use crate::error::OperationError;
use crate::hw::Peripheral;

/// Handler for digital I/O.
pub struct GpioHandler;

impl GpioHandler {
    fn pin_mode_command(pin: GpioPin, mode: GpioMode) -> ConfigCommand {
        ConfigCommand::Gpio(GpioPinConfig::new(pin, mode))
    }

    fn digital_write_command(pin: GpioPin, level: Level) -> ControlCommand {
        ControlCommand::DigitalWrite(GpioOutput::new(pin, level))
    }

    /// Configures the direction and pull of one pin.
    ///
    /// ```
    /// # async fn demo(peripheral: bleio::Peripheral) -> Result<(), bleio::OperationError> {
    /// use bleio::GpioHandler;
    /// use bleio::codec::{GpioMode, GpioPin};
    ///
    /// GpioHandler::pin_mode(&peripheral, GpioPin::Pin1, GpioMode::Output).await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when the session is not ready or the write fails.
    pub async fn pin_mode(
        peripheral: &Peripheral,
        pin: GpioPin,
        mode: GpioMode,
    ) -> Result<(), OperationError> {
        let config = &peripheral.services().config;
        peripheral
            .write(&config.command, &Self::pin_mode_command(pin, mode))
            .await
    }

    /// Drives an output pin.
    ///
    /// # Errors
    ///
    /// Returns an error when the session is not ready or the write fails.
    pub async fn digital_write(
        peripheral: &Peripheral,
        pin: GpioPin,
        level: Level,
    ) -> Result<(), OperationError> {
        let control = &peripheral.services().control;
        peripheral
            .write(&control.command, &Self::digital_write_command(pin, level))
            .await
    }

    /// Samples the input state of one pin.
    ///
    /// # Errors
    ///
    /// Returns an error when the read fails or the sampled buffer does not decode.
    pub async fn digital_read(
        peripheral: &Peripheral,
        pin: GpioPin,
    ) -> Result<GpioValue, OperationError> {
        let values = peripheral
            .read(&peripheral.services().control.gpio_input)
            .await?;
        Ok(values.value(pin))
    }

    /// Reads the configured mode of every pin.
    ///
    /// # Errors
    ///
    /// Returns an error when the read fails or the configuration does not decode.
    pub async fn configuration(
        peripheral: &Peripheral,
    ) -> Result<GpioConfiguration, OperationError> {
        peripheral.read(&peripheral.services().config.gpio).await
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::codec::Compose;

    #[test]
    fn digital_write_frames_pin_and_level() {
        let command = GpioHandler::digital_write_command(GpioPin::Pin1, Level::High);
        assert_eq!(vec![0x01, 0x11], command.compose());
    }

    #[rstest]
    #[case(GpioPin::Pin0, GpioMode::Input, vec![0x01, 0x01])]
    #[case(GpioPin::Pin3, GpioMode::InputPullUp, vec![0x01, 0x32])]
    #[case(GpioPin::Pin7, GpioMode::OutputOpenDrain, vec![0x01, 0x75])]
    fn pin_mode_frames_pin_and_mode(
        #[case] pin: GpioPin,
        #[case] mode: GpioMode,
        #[case] expected: Vec<u8>,
    ) {
        assert_eq!(expected, GpioHandler::pin_mode_command(pin, mode).compose());
    }
}
