use crate::codec::{ConfigCommand, ControlCommand, UartConfig, UartTransfer};
use crate::error::OperationError;
use crate::hw::Peripheral;

/// Handler for the UART bridge. Received bytes arrive as `uart_data` notifications.
pub struct UartHandler;

impl UartHandler {
    /// # Errors
    ///
    /// Returns an error when the session is not ready or the write fails.
    pub async fn begin(peripheral: &Peripheral, config: UartConfig) -> Result<(), OperationError> {
        let service = &peripheral.services().config;
        peripheral
            .write(&service.command, &ConfigCommand::Uart(config))
            .await
    }

    /// # Errors
    ///
    /// Returns [`OperationError::Bounds`] for an oversized payload, otherwise
    /// the write failure.
    pub async fn send(peripheral: &Peripheral, data: Vec<u8>) -> Result<(), OperationError> {
        let command = ControlCommand::UartSend(UartTransfer::new(data)?);
        let control = &peripheral.services().control;
        peripheral.write(&control.command, &command).await
    }

    /// # Errors
    ///
    /// Returns an error when the read fails or the configuration does not decode.
    pub async fn configuration(peripheral: &Peripheral) -> Result<UartConfig, OperationError> {
        peripheral.read(&peripheral.services().config.uart).await
    }
}
