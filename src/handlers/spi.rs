use crate::codec::{ConfigCommand, ControlCommand, SpiConfig, SpiData, SpiTransfer};
use crate::error::OperationError;
use crate::hw::Peripheral;

/// Handler for the SPI master.
pub struct SpiHandler;

impl SpiHandler {
    /// # Errors
    ///
    /// Returns an error when the session is not ready or the write fails.
    pub async fn begin(peripheral: &Peripheral, config: SpiConfig) -> Result<(), OperationError> {
        let service = &peripheral.services().config;
        peripheral
            .write(&service.command, &ConfigCommand::Spi(config))
            .await
    }

    /// Clocks `data` out and resolves with the bytes clocked in.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::Bounds`] for an oversized payload, otherwise
    /// the transfer failure.
    pub async fn transfer(
        peripheral: &Peripheral,
        data: Vec<u8>,
    ) -> Result<SpiData, OperationError> {
        let command = ControlCommand::SpiTransfer(SpiTransfer::new(data)?);
        let control = &peripheral.services().control;
        peripheral
            .request(&control.command, &command, &control.spi_data)
            .await
    }

    /// # Errors
    ///
    /// Returns an error when the read fails or the configuration does not decode.
    pub async fn configuration(peripheral: &Peripheral) -> Result<SpiConfig, OperationError> {
        peripheral.read(&peripheral.services().config.spi).await
    }
}
