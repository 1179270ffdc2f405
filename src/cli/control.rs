use std::fmt::{self, Display, Formatter};
use std::io;
use std::str::FromStr;

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::instrument;

use crate::app::SessionHandler;
use crate::cli::{ConnectOptions, OutputFormat};
use crate::codec::{AnalogPin, GpioMode, GpioPin, GpioValue, I2cData, Level};
use crate::error::FixtureError;
use crate::hw::{HardwareClient, Peripheral, parse_hex};
use crate::utils::format_hex;
use crate::{AnalogHandler, GpioHandler, I2cHandler, SystemHandler, UartHandler};

/// Result emitted by a `control` action.
#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ControlResult {
    GpioMode { pin: GpioPin, mode: GpioMode },
    DigitalWrite { pin: GpioPin, level: Level },
    DigitalRead { pin: GpioPin, value: GpioValue },
    AnalogRead { pin: AnalogPin, value: u16 },
    AnalogWrite { pin: AnalogPin, value: u16 },
    I2cRead { response: I2cData },
    I2cWrite { address: u8, bytes_written: usize },
    UartSend { bytes_written: usize },
    Reboot,
}

impl Display for ControlResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioMode { pin, mode } => write!(f, "Configured GPIO {pin} as {mode}"),
            Self::DigitalWrite { pin, level } => write!(f, "Drove GPIO {pin} {level}"),
            Self::DigitalRead { pin, value } => {
                let validity = if value.is_valid { "valid" } else { "not an input" };
                write!(f, "GPIO {pin} reads {} ({validity})", value.level)
            }
            Self::AnalogRead { pin, value } => write!(f, "Analog {pin} reads {value}"),
            Self::AnalogWrite { pin, value } => write!(f, "Set analog {pin} to {value}"),
            Self::I2cRead { response } => write!(
                f,
                "Read from I2C {:#04x}: {}",
                response.address,
                format_hex(&response.data)
            ),
            Self::I2cWrite {
                address,
                bytes_written,
            } => write!(f, "Wrote {bytes_written} byte(s) to I2C {address:#04x}"),
            Self::UartSend { bytes_written } => write!(f, "Sent {bytes_written} byte(s) over UART"),
            Self::Reboot => write!(f, "Reboot requested"),
        }
    }
}

/// Arguments for the `control` command.
#[derive(Debug, Args)]
pub struct ControlArgs {
    #[command(subcommand)]
    action: ControlAction,
}

impl ControlArgs {
    /// Creates control arguments for one action.
    ///
    /// ```
    /// use bleio::{ControlAction, ControlArgs};
    ///
    /// let args = ControlArgs::new(ControlAction::Reboot);
    /// let _ = args;
    /// ```
    #[must_use]
    pub fn new(action: ControlAction) -> Self {
        Self { action }
    }
}

/// Action performed by the `control` command.
#[derive(Debug, Clone, Subcommand)]
pub enum ControlAction {
    /// Configure the mode of a GPIO pin.
    GpioMode {
        #[arg(value_parser = parse_gpio_pin)]
        pin: GpioPin,
        #[arg(value_enum)]
        mode: PinMode,
    },
    /// Drive a GPIO output.
    DigitalWrite {
        #[arg(value_parser = parse_gpio_pin)]
        pin: GpioPin,
        #[arg(value_enum)]
        level: PinLevel,
    },
    /// Sample a GPIO input.
    DigitalRead {
        #[arg(value_parser = parse_gpio_pin)]
        pin: GpioPin,
    },
    /// Sample an analog input.
    AnalogRead {
        #[arg(value_parser = parse_analog_pin)]
        pin: AnalogPin,
    },
    /// Set an analog output level.
    AnalogWrite {
        #[arg(value_parser = parse_analog_pin)]
        pin: AnalogPin,
        value: u16,
    },
    /// Read bytes from an I2C slave.
    I2cRead {
        /// 7-bit slave address, decimal or `0x`-prefixed.
        #[arg(value_parser = parse_byte)]
        address: u8,
        length: u8,
    },
    /// Write hexadecimal bytes to an I2C slave.
    I2cWrite {
        /// 7-bit slave address, decimal or `0x`-prefixed.
        #[arg(value_parser = parse_byte)]
        address: u8,
        data: HexBytes,
    },
    /// Send hexadecimal bytes over the UART bridge.
    UartSend { data: HexBytes },
    /// Restart the peripheral.
    Reboot,
}

/// GPIO mode accepted on the command line.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum PinMode {
    Disabled,
    Input,
    InputPullUp,
    InputPullDown,
    Output,
    OutputOpenDrain,
}

impl PinMode {
    fn to_gpio_mode(self) -> GpioMode {
        match self {
            Self::Disabled => GpioMode::Disabled,
            Self::Input => GpioMode::Input,
            Self::InputPullUp => GpioMode::InputPullUp,
            Self::InputPullDown => GpioMode::InputPullDown,
            Self::Output => GpioMode::Output,
            Self::OutputOpenDrain => GpioMode::OutputOpenDrain,
        }
    }
}

/// Output level accepted on the command line.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum PinLevel {
    Low,
    High,
}

impl PinLevel {
    fn to_level(self) -> Level {
        match self {
            Self::Low => Level::Low,
            Self::High => Level::High,
        }
    }
}

fn parse_byte(value: &str) -> Result<u8, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|error| error.to_string())
}

fn parse_gpio_pin(value: &str) -> Result<GpioPin, String> {
    let index = value.parse::<u8>().map_err(|error| error.to_string())?;
    GpioPin::try_from(index).map_err(|error| error.to_string())
}

fn parse_analog_pin(value: &str) -> Result<AnalogPin, String> {
    let index = value.parse::<u8>().map_err(|error| error.to_string())?;
    AnalogPin::try_from(index).map_err(|error| error.to_string())
}

/// Hexadecimal byte string argument, e.g. `DEADBEEF`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct HexBytes(pub Vec<u8>);

impl FromStr for HexBytes {
    type Err = FixtureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse_hex(value).map(Self)
    }
}

/// Executes the `control` command.
#[instrument(skip(client, args, out), level = "info", fields(action = ?args.action, ?output_format))]
pub(crate) async fn run<W>(
    client: Box<dyn HardwareClient>,
    options: &ConnectOptions,
    args: &ControlArgs,
    out: &mut W,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    let opened = SessionHandler::new(client)
        .with_options(options.clone())
        .connect_first()
        .await?;
    let peripheral = opened.peripheral;

    let command_result = run_with_peripheral(&peripheral, &args.action).await;
    // The peripheral drops the link by itself after a reboot.
    if !matches!(args.action, ControlAction::Reboot)
        && let Err(error) = peripheral.disconnect().await
    {
        if command_result.is_ok() {
            return Err(error.into());
        }
        tracing::trace!(?error, "failed to close control session cleanly");
    }

    let result = command_result?;
    match output_format {
        OutputFormat::Pretty => writeln!(out, "{result}")?,
        OutputFormat::Json => write_json_line(out, &result)?,
    }
    Ok(())
}

#[instrument(skip(peripheral), level = "debug")]
async fn run_with_peripheral(
    peripheral: &Peripheral,
    action: &ControlAction,
) -> Result<ControlResult> {
    let result = match action.clone() {
        ControlAction::GpioMode { pin, mode } => {
            let mode = mode.to_gpio_mode();
            GpioHandler::pin_mode(peripheral, pin, mode).await?;
            ControlResult::GpioMode { pin, mode }
        }
        ControlAction::DigitalWrite { pin, level } => {
            let level = level.to_level();
            GpioHandler::digital_write(peripheral, pin, level).await?;
            ControlResult::DigitalWrite { pin, level }
        }
        ControlAction::DigitalRead { pin } => ControlResult::DigitalRead {
            pin,
            value: GpioHandler::digital_read(peripheral, pin).await?,
        },
        ControlAction::AnalogRead { pin } => ControlResult::AnalogRead {
            pin,
            value: AnalogHandler::read(peripheral, pin).await?,
        },
        ControlAction::AnalogWrite { pin, value } => {
            AnalogHandler::write(peripheral, pin, value).await?;
            ControlResult::AnalogWrite { pin, value }
        }
        ControlAction::I2cRead { address, length } => ControlResult::I2cRead {
            response: I2cHandler::read(peripheral, address, length).await?,
        },
        ControlAction::I2cWrite {
            address,
            data: HexBytes(data),
        } => {
            let bytes_written = data.len();
            I2cHandler::write(peripheral, address, data).await?;
            ControlResult::I2cWrite {
                address,
                bytes_written,
            }
        }
        ControlAction::UartSend {
            data: HexBytes(data),
        } => {
            let bytes_written = data.len();
            UartHandler::send(peripheral, data).await?;
            ControlResult::UartSend { bytes_written }
        }
        ControlAction::Reboot => {
            SystemHandler::reboot(peripheral).await?;
            ControlResult::Reboot
        }
    };
    Ok(result)
}

fn write_json_line(out: &mut impl io::Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
