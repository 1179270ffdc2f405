use std::io;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, instrument};

use crate::app::SessionHandler;
use crate::cli::{ConnectOptions, OutputFormat};
use crate::codec::{AnalogValues, CharacteristicValue, GpioValues, I2cData, SpiData, UartData};
use crate::hw::{HardwareClient, ListenStopReason, ListenSummary, SessionSignal, SessionState};
use crate::protocol::{CharacteristicId, ServiceId};
use crate::terminal::TerminalClient;
use crate::utils::format_hex;

use super::ui::{ListenNotificationView, ListenReadyView, ListenSummaryView, Painter};

/// Arguments for the `listen` command.
#[derive(Debug, Args)]
pub struct ListenArgs {
    /// Stop after this many notifications. If omitted, listen until Ctrl+C.
    #[arg(long)]
    max_notifications: Option<usize>,
}

impl ListenArgs {
    /// Creates listen arguments with an optional notification limit.
    #[must_use]
    pub fn new(max_notifications: Option<usize>) -> Self {
        Self { max_notifications }
    }
}

/// One control-service notification as written in JSON output.
#[derive(Debug, Serialize)]
pub(crate) struct NotificationRecord {
    pub(crate) index: usize,
    pub(crate) characteristic: CharacteristicId,
    pub(crate) payload: String,
    pub(crate) decoded: serde_json::Value,
}

impl NotificationRecord {
    fn new(index: usize, characteristic: CharacteristicId, bytes: &[u8]) -> Self {
        let decoded = match decode(characteristic, bytes) {
            Ok(value) => value,
            Err(error) => serde_json::json!({ "decode_error": error }),
        };
        Self {
            index,
            characteristic,
            payload: format_hex(bytes),
            decoded,
        }
    }
}

fn decode(characteristic: CharacteristicId, bytes: &[u8]) -> Result<serde_json::Value, String> {
    fn to_json<V: CharacteristicValue + Serialize>(
        bytes: &[u8],
    ) -> Result<serde_json::Value, String> {
        let value = V::parse(bytes).map_err(|error| error.to_string())?;
        serde_json::to_value(value).map_err(|error| error.to_string())
    }

    match characteristic {
        CharacteristicId::GpioInput => to_json::<GpioValues>(bytes),
        CharacteristicId::AnalogInput => to_json::<AnalogValues>(bytes),
        CharacteristicId::I2cData => to_json::<I2cData>(bytes),
        CharacteristicId::SpiData => to_json::<SpiData>(bytes),
        CharacteristicId::UartData => to_json::<UartData>(bytes),
        other => Err(format!("{other} is not a control characteristic")),
    }
}

/// Executes the `listen` command.
#[instrument(skip(client, out, terminal_client), level = "info", fields(?output_format))]
pub(crate) async fn run<W>(
    client: Box<dyn HardwareClient>,
    options: &ConnectOptions,
    args: &ListenArgs,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    let painter = Painter::new(terminal_client.stdout_is_terminal());
    let opened = SessionHandler::new(client)
        .with_options(options.clone())
        .open_first()
        .await?;
    let device = opened.device;
    let peripheral = opened.peripheral;

    // Subscribe before connecting so values pushed during setup are not missed.
    let mut signals = peripheral.subscribe();
    peripheral.connect().await?;
    if output_format == OutputFormat::Pretty {
        writeln!(out, "{}", ListenReadyView::new(&device, &painter))?;
    }

    let mut received = 0;
    let stop_reason = loop {
        if let Some(limit) = args.max_notifications
            && received >= limit
        {
            break ListenStopReason::ReachedLimit(limit);
        }

        let signal = tokio::select! {
            signal = signals.recv() => signal,
            _ = tokio::signal::ctrl_c() => break ListenStopReason::Interrupted,
        };
        match signal {
            Ok(SessionSignal::ValueUpdated {
                characteristic,
                bytes,
            }) if characteristic.service() == ServiceId::Control => {
                received += 1;
                let record = NotificationRecord::new(received, characteristic, &bytes);
                match output_format {
                    OutputFormat::Pretty => {
                        writeln!(out, "{}", ListenNotificationView::new(&record, &painter))?;
                    }
                    OutputFormat::Json => {
                        serde_json::to_writer(&mut *out, &record)?;
                        writeln!(out)?;
                    }
                }
            }
            Ok(SessionSignal::StateChanged(SessionState::Disconnected))
            | Err(RecvError::Closed) => break ListenStopReason::Disconnected,
            Ok(SessionSignal::SessionFailed(error)) => return Err(error.into()),
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "listener fell behind; notifications were dropped");
            }
        }
    };

    if stop_reason != ListenStopReason::Disconnected
        && let Err(error) = peripheral.disconnect().await
    {
        debug!(?error, "failed to disconnect cleanly");
    }

    let summary = ListenSummary::new(device, received, stop_reason);
    match output_format {
        OutputFormat::Pretty => {
            writeln!(out)?;
            writeln!(out, "{}", ListenSummaryView::new(&summary, &painter))?;
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, &summary)?;
            writeln!(out)?;
        }
    }

    Ok(())
}
