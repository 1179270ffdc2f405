use crate::codec::{
    ConfigCommand, ControlCommand, I2cClock, I2cConfig, I2cData, I2cReadRequest, I2cWrite,
};
use crate::error::OperationError;
use crate::hw::Peripheral;

/// Handler for the I2C master.
pub struct I2cHandler;

impl I2cHandler {
    /// Enables or disables the bus at the given clock.
    ///
    /// # Errors
    ///
    /// Returns an error when the session is not ready or the write fails.
    pub async fn begin(
        peripheral: &Peripheral,
        enabled: bool,
        clock: I2cClock,
    ) -> Result<(), OperationError> {
        let config = &peripheral.services().config;
        let command = ConfigCommand::I2c(I2cConfig::new(enabled, clock));
        peripheral.write(&config.command, &command).await
    }

    /// Writes `data` to the slave at `address`.
    ///
    /// Bounds are checked before anything is sent.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::Bounds`] for an invalid address or an
    /// oversized payload, otherwise the write failure.
    pub async fn write(
        peripheral: &Peripheral,
        address: u8,
        data: Vec<u8>,
    ) -> Result<(), OperationError> {
        let command = ControlCommand::I2cWrite(I2cWrite::new(address, data)?);
        let control = &peripheral.services().control;
        peripheral.write(&control.command, &command).await
    }

    /// Reads `length` bytes from the slave at `address`.
    ///
    /// ```
    /// # async fn demo(peripheral: bleio::Peripheral) -> Result<(), bleio::OperationError> {
    /// use bleio::I2cHandler;
    ///
    /// let data = I2cHandler::read(&peripheral, 0x48, 2).await?;
    /// assert_eq!(0x48, data.address);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::Bounds`] for an invalid address or length,
    /// otherwise the transfer failure.
    pub async fn read(
        peripheral: &Peripheral,
        address: u8,
        length: u8,
    ) -> Result<I2cData, OperationError> {
        let command = ControlCommand::I2cRead(I2cReadRequest::new(address, length)?);
        let control = &peripheral.services().control;
        peripheral
            .request(&control.command, &command, &control.i2c_data)
            .await
    }

    /// # Errors
    ///
    /// Returns an error when the read fails or the configuration does not decode.
    pub async fn configuration(peripheral: &Peripheral) -> Result<I2cConfig, OperationError> {
        peripheral.read(&peripheral.services().config.i2c).await
    }
}
