use std::io;

use anyhow::Result;
use tracing::{debug, instrument};

use crate::app::SessionHandler;
use crate::cli::{ConnectOptions, OutputFormat};
use crate::error::OperationError;
use crate::hw::{ConfigurationSnapshot, FoundDevice, HardwareClient, InspectReport, Peripheral};
use crate::terminal::TerminalClient;
use crate::{
    AnalogHandler, GpioHandler, I2cHandler, PwmHandler, SpiHandler, SystemHandler, UartHandler,
};

use super::ui::{InspectReportView, Painter};

/// Executes the `inspect` command.
#[instrument(skip(client, out, terminal_client), level = "info", fields(?output_format))]
pub(crate) async fn run<W>(
    client: Box<dyn HardwareClient>,
    options: &ConnectOptions,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    let opened = SessionHandler::new(client)
        .with_options(options.clone())
        .connect_first()
        .await?;
    let report = read_report(&opened.peripheral, opened.device).await;
    if let Err(error) = opened.peripheral.disconnect().await {
        if report.is_ok() {
            return Err(error.into());
        }
        debug!(?error, "failed to close inspect session cleanly");
    }
    let report = report?;

    match output_format {
        OutputFormat::Pretty => {
            let painter = Painter::new(terminal_client.stdout_is_terminal());
            writeln!(out, "{}", InspectReportView::new(&report, &painter))?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &report)?;
            writeln!(out)?;
        }
    }

    Ok(())
}

#[instrument(skip(peripheral), level = "debug")]
async fn read_report(
    peripheral: &Peripheral,
    device: FoundDevice,
) -> Result<InspectReport, OperationError> {
    let (system, name, bluetooth) = tokio::try_join!(
        SystemHandler::info(peripheral),
        SystemHandler::device_name(peripheral),
        SystemHandler::bluetooth_settings(peripheral),
    )?;
    let (gpio, software_pwm, hardware_pwm, analog, i2c, spi, uart) = tokio::try_join!(
        GpioHandler::configuration(peripheral),
        PwmHandler::software_configuration(peripheral),
        PwmHandler::hardware_configuration(peripheral),
        AnalogHandler::configuration(peripheral),
        I2cHandler::configuration(peripheral),
        SpiHandler::configuration(peripheral),
        UartHandler::configuration(peripheral),
    )?;

    Ok(InspectReport {
        device,
        system,
        name,
        bluetooth,
        configuration: ConfigurationSnapshot {
            gpio,
            software_pwm,
            hardware_pwm,
            analog,
            i2c,
            spi,
            uart,
        },
    })
}
