use std::time::Duration;

use bon::Builder;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::level_filters::LevelFilter;

use crate::cli::control::ControlArgs;
use crate::cli::listen::ListenArgs;
use crate::error::{CliConfigError, FixtureError};
use crate::hw::{
    FakeBackendConfig, FakeDeviceConfig, MissingCharacteristics, ScanFixture, SessionConfig,
    ValueFixtures,
};

use super::DEFAULT_NAME_PREFIX;

const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(10);

/// Command-line options for the BLE I/O expander tool.
#[derive(Debug, Parser)]
#[command(name = "bleio", about = "Drive BLE I/O expander peripherals.")]
pub struct Args {
    /// Uses the fake BLE backend with an emulated peripheral.
    #[arg(long, global = true)]
    fake: bool,
    /// Fake scan fixtures in the form `adapter|device_id|local_name|rssi;...`.
    #[arg(long, global = true, requires = "fake", required_if_eq("fake", "true"))]
    fake_scan: Option<ScanFixture>,
    /// Initial characteristic values as `characteristic=hex;...`.
    #[arg(long, global = true, requires = "fake")]
    fake_values: Option<ValueFixtures>,
    /// Values pushed once notifications are enabled, as `characteristic=hex;...`.
    #[arg(long, global = true, requires = "fake")]
    fake_notify: Option<ValueFixtures>,
    /// Comma-separated characteristics the fake peripheral does not expose.
    #[arg(long, global = true, requires = "fake")]
    fake_missing: Option<MissingCharacteristics>,
    /// Artificial fake scan delay (e.g. `250ms`, `2s`).
    #[arg(long, global = true, requires = "fake", value_parser = parse_duration)]
    fake_discovery_delay: Option<Duration>,
    /// Advertised local-name prefix to connect to.
    #[arg(long, global = true, default_value = DEFAULT_NAME_PREFIX)]
    name_prefix: String,
    /// How long to scan before giving up (e.g. `5s`).
    #[arg(long, global = true, value_parser = parse_duration)]
    scan_timeout: Option<Duration>,
    /// Upper bound for each connect, read and write (e.g. `2s`).
    #[arg(long, global = true, value_parser = parse_duration)]
    operation_timeout: Option<Duration>,
    /// Log level; overrides `RUST_LOG`.
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,
    /// Output format. Defaults to `pretty` on a terminal and `json` otherwise.
    #[arg(long, global = true, value_enum)]
    output: Option<OutputFormat>,
    #[command(subcommand)]
    command: Command,
}

impl Args {
    /// Creates argument values directly without CLI parsing.
    ///
    /// ```
    /// use bleio::{Args, Command, ListenArgs};
    ///
    /// let inspect = Args::new(Command::Inspect);
    /// let listen = Args::new(Command::Listen(ListenArgs::new(Some(10))));
    /// let _ = (inspect, listen);
    /// ```
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self {
            fake: false,
            fake_scan: None,
            fake_values: None,
            fake_notify: None,
            fake_missing: None,
            fake_discovery_delay: None,
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            scan_timeout: None,
            operation_timeout: None,
            log_level: None,
            output: None,
            command,
        }
    }

    /// Enables fake backend mode with pre-parsed fake configuration.
    #[must_use]
    pub fn with_fake(mut self, fake: FakeArgs) -> Self {
        let FakeArgs {
            scan_fixture,
            values,
            notifications,
            missing,
            discovery_delay,
        } = fake;

        self.fake = true;
        self.fake_scan = Some(scan_fixture);
        self.fake_values = values;
        self.fake_notify = notifications;
        self.fake_missing = missing;
        self.fake_discovery_delay = Some(discovery_delay);
        self
    }

    /// Returns the explicit log-level override, if any.
    #[must_use]
    pub fn log_level(&self) -> Option<LogLevel> {
        self.log_level
    }

    /// Returns the explicit output format, if any.
    #[must_use]
    pub fn output_format(&self) -> Option<OutputFormat> {
        self.output
    }

    /// Scan and session settings selected on the command line.
    #[must_use]
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions::builder()
            .name_prefix(self.name_prefix.clone())
            .maybe_scan_timeout(self.scan_timeout)
            .maybe_operation_timeout(self.operation_timeout)
            .build()
    }

    /// Splits parsed CLI arguments into command and optional fake-client settings.
    ///
    /// # Errors
    ///
    /// Returns an error if CLI backend configuration is invalid.
    pub fn into_command_and_fake_args(self) -> anyhow::Result<(Command, Option<FakeArgs>)> {
        let Args {
            fake,
            fake_scan,
            fake_values,
            fake_notify,
            fake_missing,
            fake_discovery_delay,
            command,
            ..
        } = self;

        let fake_args = if fake {
            let Some(scan_fixture) = fake_scan else {
                return Err(CliConfigError::MissingFakeScanFixture.into());
            };
            Some(FakeArgs {
                scan_fixture,
                values: fake_values,
                notifications: fake_notify,
                missing: fake_missing,
                discovery_delay: fake_discovery_delay.unwrap_or(Duration::ZERO),
            })
        } else {
            None
        };

        Ok((command, fake_args))
    }
}

/// Fake backend arguments for programmatic runs.
#[derive(Debug, Builder)]
pub struct FakeArgs {
    #[builder(with = |value: &str| -> std::result::Result<_, FixtureError> { value.parse() })]
    scan_fixture: ScanFixture,
    #[builder(with = |value: &str| -> std::result::Result<_, FixtureError> { value.parse() })]
    values: Option<ValueFixtures>,
    #[builder(with = |value: &str| -> std::result::Result<_, FixtureError> { value.parse() })]
    notifications: Option<ValueFixtures>,
    #[builder(with = |value: &str| -> std::result::Result<_, FixtureError> { value.parse() })]
    missing: Option<MissingCharacteristics>,
    #[builder(default)]
    discovery_delay: Duration,
}

impl FakeArgs {
    pub(crate) fn into_backend_config(self) -> FakeBackendConfig {
        let Self {
            scan_fixture,
            values,
            notifications,
            missing,
            discovery_delay,
        } = self;

        let device = FakeDeviceConfig::builder()
            .maybe_values(values)
            .maybe_notifications(notifications)
            .maybe_missing(missing)
            .build();
        FakeBackendConfig::builder()
            .scan_fixture(scan_fixture)
            .device(device)
            .discovery_delay(discovery_delay)
            .build()
    }
}

/// Scan and session settings shared by every command.
#[derive(Debug, Clone, Builder)]
pub struct ConnectOptions {
    #[builder(default = DEFAULT_NAME_PREFIX.to_string(), into)]
    name_prefix: String,
    #[builder(default = DEFAULT_SCAN_TIMEOUT)]
    scan_timeout: Duration,
    operation_timeout: Option<Duration>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ConnectOptions {
    #[must_use]
    pub fn name_prefix(&self) -> &str {
        &self.name_prefix
    }

    #[must_use]
    pub fn scan_timeout(&self) -> Duration {
        self.scan_timeout
    }

    pub(crate) fn session_config(&self) -> SessionConfig {
        SessionConfig::builder()
            .maybe_operation_timeout(self.operation_timeout)
            .build()
    }
}

/// Supported CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect to the first matching peripheral and print its identification and configuration.
    Inspect,
    /// Connect, then print control-service notifications as they arrive.
    Listen(ListenArgs),
    /// Connect, then run one I/O action.
    Control(ControlArgs),
}

impl Command {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Inspect => "inspect",
            Self::Listen(_args) => "listen",
            Self::Control(_args) => "control",
        }
    }
}

/// Log level accepted by `--log-level`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub(crate) fn as_level_filter(self) -> LevelFilter {
        match self {
            Self::Off => LevelFilter::OFF,
            Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }
}

/// How command results are written to stdout.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables and lines.
    Pretty,
    /// Machine-readable JSON.
    Json,
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|error| error.to_string())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use clap::error::ErrorKind;
    use pretty_assertions::assert_eq;

    use super::*;

    const FIXTURE: &str = "hci0|AA:BB:CC|BLEIO-Bench|-43";

    #[test]
    fn fake_mode_requires_scan_fixture() {
        let result = Args::try_parse_from(["bleio", "--fake", "inspect"]);

        let error = result.expect_err("missing --fake-scan should fail argument parsing");
        assert_eq!(ErrorKind::MissingRequiredArgument, error.kind());
    }

    #[test]
    fn fake_fixture_flags_require_fake_mode() {
        let result = Args::try_parse_from(["bleio", "--fake-values", "gpio_input=00", "inspect"]);

        let error = result.expect_err("fake fixture flags should require --fake");
        assert_eq!(ErrorKind::MissingRequiredArgument, error.kind());
    }

    #[test]
    fn malformed_value_fixture_is_rejected() {
        let result = Args::try_parse_from([
            "bleio",
            "--fake",
            "--fake-scan",
            FIXTURE,
            "--fake-values",
            "gpio_input=0",
            "inspect",
        ]);

        let error = result.expect_err("odd-length hex should fail argument parsing");
        assert_eq!(ErrorKind::ValueValidation, error.kind());
    }

    #[test]
    fn fake_mode_builds_fake_settings() {
        let cli = Args::try_parse_from([
            "bleio",
            "--fake",
            "--fake-scan",
            FIXTURE,
            "--fake-missing",
            "uart_data",
            "inspect",
        ])
        .expect("valid fake arguments should parse");

        let (command, fake_args) = cli
            .into_command_and_fake_args()
            .expect("fake arguments should split cleanly");
        assert_matches!(command, Command::Inspect);
        let fake_args = fake_args.expect("fake mode should produce fake settings");
        assert_matches!(fake_args.missing, Some(missing) if missing.contains(crate::protocol::CharacteristicId::UartData));
        assert_eq!(Duration::ZERO, fake_args.discovery_delay);
    }

    #[test]
    fn connection_flags_flow_into_options() {
        let cli = Args::try_parse_from([
            "bleio",
            "--name-prefix",
            "LAB-",
            "--scan-timeout",
            "3s",
            "--operation-timeout",
            "500ms",
            "--log-level",
            "debug",
            "--output",
            "json",
            "inspect",
        ])
        .expect("connection flags should parse");

        let options = cli.connect_options();
        assert_eq!("LAB-", options.name_prefix());
        assert_eq!(Duration::from_secs(3), options.scan_timeout());
        assert_eq!(
            Some(Duration::from_millis(500)),
            options.session_config().operation_timeout()
        );
        assert_eq!(Some(LogLevel::Debug), cli.log_level());
        assert_eq!(Some(OutputFormat::Json), cli.output_format());
    }

    #[test]
    fn defaults_apply_without_flags() {
        let cli = Args::try_parse_from(["bleio", "inspect"]).expect("bare command should parse");

        let options = cli.connect_options();
        assert_eq!(DEFAULT_NAME_PREFIX, options.name_prefix());
        assert_eq!(DEFAULT_SCAN_TIMEOUT, options.scan_timeout());
        assert_eq!(None, options.session_config().operation_timeout());
    }
}
