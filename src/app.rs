use std::io;

use anyhow::Result;
use bon::Builder;
use owo_colors::OwoColorize;
use tracing::instrument;
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::cli::{Command, ConnectOptions, FakeArgs, LogLevel, OutputFormat};
use crate::hw::{HardwareBackend, HardwareClient, OpenedDevice, hardware_client_from_backend};
use crate::telemetry;
use crate::terminal::{SystemTerminalClient, TerminalClient};

/// Creates a hardware client backed by the host's Bluetooth adapters.
///
/// # Errors
///
/// Returns an error if the platform Bluetooth manager cannot be created.
pub async fn real_hardware_client() -> Result<Box<dyn HardwareClient>> {
    Ok(hardware_client_from_backend(HardwareBackend::Real).await?)
}

/// Creates a hardware client backed by an emulated peripheral.
///
/// # Errors
///
/// Returns an error if the fake backend cannot be built.
pub async fn fake_hardware_client(fake_args: FakeArgs) -> Result<Box<dyn HardwareClient>> {
    let backend = HardwareBackend::Fake(fake_args.into_backend_config());
    Ok(hardware_client_from_backend(backend).await?)
}

/// Scans for the first matching peripheral and opens a session on it.
pub struct SessionHandler {
    hardware_client: Box<dyn HardwareClient>,
    options: ConnectOptions,
}

impl SessionHandler {
    /// Creates a session handler with default scan settings.
    ///
    /// ```
    /// # async fn demo() -> anyhow::Result<()> {
    /// let fake = bleio::FakeArgs::builder()
    ///     .scan_fixture("hci0|AA:BB:CC|BLEIO-Bench|-43")?
    ///     .build();
    /// let handler = bleio::SessionHandler::new(bleio::fake_hardware_client(fake).await?);
    /// let _ = handler;
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn new(hardware_client: Box<dyn HardwareClient>) -> Self {
        Self {
            hardware_client,
            options: ConnectOptions::default(),
        }
    }

    /// Overrides the name prefix, scan timeout and operation timeout.
    #[must_use]
    pub fn with_options(mut self, options: ConnectOptions) -> Self {
        self.options = options;
        self
    }

    /// Finds the first matching peripheral and starts its session without connecting.
    ///
    /// # Errors
    ///
    /// Returns an error if no adapter is available or no peripheral matches in time.
    #[instrument(skip(self), level = "info", fields(name_prefix = %self.options.name_prefix()))]
    pub async fn open_first(self) -> Result<OpenedDevice> {
        let span = tracing::Span::current();
        span.pb_set_message("Scanning for BLE I/O peripherals");
        span.pb_set_finish_message(&format!("{} Found peripheral", "✓".green()));

        let Self {
            hardware_client,
            options,
        } = self;
        match hardware_client
            .open_first_device(
                options.name_prefix(),
                options.scan_timeout(),
                options.session_config(),
            )
            .await
        {
            Ok(opened) => Ok(opened),
            Err(error) => {
                span.pb_set_finish_message(&format!("{} Scan failed", "✗".red()));
                Err(error.into())
            }
        }
    }

    /// Finds the first matching peripheral and waits until its session is ready.
    ///
    /// # Errors
    ///
    /// Returns an error if scanning fails or the session does not become ready.
    #[instrument(skip(self), level = "info", fields(name_prefix = %self.options.name_prefix()))]
    pub async fn connect_first(self) -> Result<OpenedDevice> {
        let span = tracing::Span::current();
        span.pb_set_message("Connecting to BLE I/O peripheral");
        span.pb_set_finish_message(&format!("{} Connected", "✓".green()));

        let opened = self.open_first().await?;
        if let Err(error) = opened.peripheral.connect().await {
            span.pb_set_finish_message(&format!("{} Connection failed", "✗".red()));
            return Err(error.into());
        }
        Ok(opened)
    }
}

/// Telemetry, output and connection settings for one CLI run.
#[derive(Debug, Clone, Default, Builder)]
pub struct RunSettings {
    log_level: Option<LogLevel>,
    /// Falls back to `pretty` on a terminal and `json` otherwise.
    output_format: Option<OutputFormat>,
    #[builder(default)]
    connect_options: ConnectOptions,
}

/// Runs one CLI command against the process's standard streams.
///
/// ```
/// # async fn run() -> anyhow::Result<()> {
/// use clap::Parser;
///
/// let args = bleio::Args::try_parse_from([
///     "bleio",
///     "--fake",
///     "--fake-scan",
///     "hci0|AA:BB:CC|BLEIO-Bench|-43",
///     "inspect",
/// ])?;
/// let (command, maybe_fake_args) = args.into_command_and_fake_args()?;
/// let hardware_client = match maybe_fake_args {
///     Some(fake_args) => bleio::fake_hardware_client(fake_args).await?,
///     None => bleio::real_hardware_client().await?,
/// };
/// let mut out = Vec::new();
/// bleio::run(command, &mut out, hardware_client).await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, BLE interaction fails, or
/// output writing fails.
pub async fn run<W>(
    command: Command,
    out: &mut W,
    hardware_client: Box<dyn HardwareClient>,
) -> Result<()>
where
    W: io::Write,
{
    run_with_settings(command, out, hardware_client, RunSettings::default()).await
}

/// Runs one CLI command with explicit settings.
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, BLE interaction fails, or
/// output writing fails.
pub async fn run_with_settings<W>(
    command: Command,
    out: &mut W,
    hardware_client: Box<dyn HardwareClient>,
    settings: RunSettings,
) -> Result<()>
where
    W: io::Write,
{
    run_with_clients(command, out, &SystemTerminalClient, hardware_client, settings).await
}

/// Runs one CLI command with injected clients.
///
/// ```
/// # async fn run() -> anyhow::Result<()> {
/// use clap::Parser;
///
/// struct PipedTerminal;
/// impl bleio::TerminalClient for PipedTerminal {
///     fn stdout_is_terminal(&self) -> bool { false }
///     fn stderr_is_terminal(&self) -> bool { false }
/// }
///
/// let args = bleio::Args::try_parse_from([
///     "bleio",
///     "--log-level",
///     "off",
///     "--fake",
///     "--fake-scan",
///     "hci0|AA:BB:CC|BLEIO-Bench|-43",
///     "control",
///     "digital-read",
///     "0",
/// ])?;
/// let settings = bleio::RunSettings::builder()
///     .maybe_log_level(args.log_level())
///     .connect_options(args.connect_options())
///     .build();
/// let (command, maybe_fake_args) = args.into_command_and_fake_args()?;
/// let hardware_client = match maybe_fake_args {
///     Some(fake_args) => bleio::fake_hardware_client(fake_args).await?,
///     None => bleio::real_hardware_client().await?,
/// };
/// let mut out = Vec::new();
/// bleio::run_with_clients(command, &mut out, &PipedTerminal, hardware_client, settings).await?;
/// assert!(String::from_utf8(out)?.starts_with(r#"{"action":"digital_read""#));
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, BLE interaction fails, or
/// output writing fails.
#[instrument(
    skip(out, terminal_client, hardware_client, settings),
    level = "info",
    fields(command = %command.name(), log_level = ?settings.log_level)
)]
pub async fn run_with_clients<W>(
    command: Command,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    hardware_client: Box<dyn HardwareClient>,
    settings: RunSettings,
) -> Result<()>
where
    W: io::Write,
{
    let RunSettings {
        log_level,
        output_format,
        connect_options,
    } = settings;
    telemetry::initialise_tracing(
        "bleio",
        terminal_client.stderr_is_terminal(),
        log_level.map(LogLevel::as_level_filter),
    )?;

    let output_format = output_format.unwrap_or(if terminal_client.stdout_is_terminal() {
        OutputFormat::Pretty
    } else {
        OutputFormat::Json
    });

    match command {
        Command::Inspect => {
            crate::cli::inspect::run(
                hardware_client,
                &connect_options,
                out,
                terminal_client,
                output_format,
            )
            .await
        }
        Command::Listen(args) => {
            crate::cli::listen::run(
                hardware_client,
                &connect_options,
                &args,
                out,
                terminal_client,
                output_format,
            )
            .await
        }
        Command::Control(args) => {
            crate::cli::control::run(
                hardware_client,
                &connect_options,
                &args,
                out,
                output_format,
            )
            .await
        }
    }
}
