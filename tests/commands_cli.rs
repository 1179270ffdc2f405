use std::collections::BTreeSet;

use clap::Parser;
use clap::error::ErrorKind;
use insta::assert_snapshot;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

const BENCH_SCAN: &str = "hci0|AA:BB:CC|BLEIO-Bench|-43";

#[derive(Debug, Default)]
struct PipedTerminalClient;

impl bleio::TerminalClient for PipedTerminalClient {
    fn stdout_is_terminal(&self) -> bool {
        false
    }

    fn stderr_is_terminal(&self) -> bool {
        false
    }
}

async fn run_with_argv<const N: usize>(
    argv: [&str; N],
    output_format: bleio::OutputFormat,
) -> anyhow::Result<String> {
    let args = bleio::Args::try_parse_from(argv)?;
    let settings = bleio::RunSettings::builder()
        .log_level(bleio::LogLevel::Off)
        .output_format(output_format)
        .connect_options(args.connect_options())
        .build();
    let (command, maybe_fake_args) = args.into_command_and_fake_args()?;
    let hardware_client = match maybe_fake_args {
        Some(fake_args) => bleio::fake_hardware_client(fake_args).await?,
        None => bleio::real_hardware_client().await?,
    };

    let mut output = Vec::new();
    bleio::run_with_clients(
        command,
        &mut output,
        &PipedTerminalClient,
        hardware_client,
        settings,
    )
    .await?;
    Ok(String::from_utf8(output)?)
}

#[tokio::test]
async fn inspect_reports_identification_and_configuration_as_json() -> anyhow::Result<()> {
    let stdout = run_with_argv(
        ["bleio", "--fake", "--fake-scan", BENCH_SCAN, "inspect"],
        bleio::OutputFormat::Json,
    )
    .await?;
    let report: Value = serde_json::from_str(&stdout)?;

    assert_eq!(
        json!({
            "adapter_name": "hci0",
            "device_id": "AA:BB:CC",
            "local_name": "BLEIO-Bench",
            "rssi": -43,
        }),
        report["device"]
    );
    assert_eq!(json!("BLEIO-Fake"), report["name"]);
    assert_eq!(json!(1), report["system"]["firmware_major"]);
    assert_eq!(json!(false), report["configuration"]["i2c"]["enabled"]);
    Ok(())
}

#[tokio::test]
async fn inspect_pretty_output_renders_tables() -> anyhow::Result<()> {
    let stdout = run_with_argv(
        ["bleio", "--fake", "--fake-scan", BENCH_SCAN, "inspect"],
        bleio::OutputFormat::Pretty,
    )
    .await?;

    for expected in ["Device", "BLEIO-Bench", "System", "1.4.2", "GPIO", "Buses"] {
        assert!(stdout.contains(expected), "missing {expected:?} in:\n{stdout}");
    }
    Ok(())
}

#[tokio::test]
async fn name_prefix_selects_the_matching_peripheral() -> anyhow::Result<()> {
    let stdout = run_with_argv(
        [
            "bleio",
            "--fake",
            "--fake-scan",
            "hci0|11:22:33|BLEIO-Bench|-50;hci1|44:55:66|Lab-Expander|-61",
            "--name-prefix",
            "Lab-",
            "inspect",
        ],
        bleio::OutputFormat::Json,
    )
    .await?;
    let report: Value = serde_json::from_str(&stdout)?;

    assert_eq!(json!("44:55:66"), report["device"]["device_id"]);
    Ok(())
}

#[tokio::test]
async fn scan_without_a_match_fails() {
    let result = run_with_argv(
        [
            "bleio",
            "--fake",
            "--fake-scan",
            "hci0|11:22:33|Speaker|-50",
            "--scan-timeout",
            "1s",
            "inspect",
        ],
        bleio::OutputFormat::Json,
    )
    .await;

    let error = result.err().map(|error| error.to_string());
    assert_eq!(
        Some("no peripheral matching `BLEIO-*` was found within 1s".to_string()),
        error
    );
}

#[tokio::test]
async fn control_i2c_read_prints_the_response() -> anyhow::Result<()> {
    let stdout = run_with_argv(
        [
            "bleio",
            "--fake",
            "--fake-scan",
            BENCH_SCAN,
            "control",
            "i2c-read",
            "0x48",
            "3",
        ],
        bleio::OutputFormat::Json,
    )
    .await?;

    assert_snapshot!(stdout.trim_end(), @r#"{"action":"i2c_read","response":{"address":72,"data":"000102"}}"#);
    Ok(())
}

#[tokio::test]
async fn control_gpio_mode_prints_a_confirmation() -> anyhow::Result<()> {
    let stdout = run_with_argv(
        [
            "bleio",
            "--fake",
            "--fake-scan",
            BENCH_SCAN,
            "control",
            "gpio-mode",
            "3",
            "input-pull-up",
        ],
        bleio::OutputFormat::Pretty,
    )
    .await?;

    assert_eq!("Configured GPIO pin3 as input_pull_up\n", stdout);
    Ok(())
}

#[tokio::test]
async fn control_reboot_skips_the_disconnect() -> anyhow::Result<()> {
    let stdout = run_with_argv(
        ["bleio", "--fake", "--fake-scan", BENCH_SCAN, "control", "reboot"],
        bleio::OutputFormat::Json,
    )
    .await?;

    assert_snapshot!(stdout.trim_end(), @r#"{"action":"reboot"}"#);
    Ok(())
}

#[test]
fn control_rejects_malformed_hex_payloads() {
    let result = bleio::Args::try_parse_from([
        "bleio",
        "--fake",
        "--fake-scan",
        BENCH_SCAN,
        "control",
        "uart-send",
        "ZZ",
    ]);

    assert_eq!(
        Some(ErrorKind::ValueValidation),
        result.err().map(|error| error.kind())
    );
}

#[tokio::test]
async fn listen_streams_pushed_values_until_the_limit() -> anyhow::Result<()> {
    let stdout = run_with_argv(
        [
            "bleio",
            "--fake",
            "--fake-scan",
            BENCH_SCAN,
            "--fake-notify",
            "gpio_input=1100000000000000;uart_data=48690A",
            "listen",
            "--max-notifications",
            "2",
        ],
        bleio::OutputFormat::Json,
    )
    .await?;
    let lines = stdout
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<Vec<Value>, _>>()?;

    assert_eq!(3, lines.len());
    let characteristics: BTreeSet<_> = lines[..2]
        .iter()
        .filter_map(|record| record["characteristic"].as_str())
        .collect();
    assert_eq!(BTreeSet::from(["gpio_input", "uart_data"]), characteristics);
    let uart = lines[..2]
        .iter()
        .find(|record| record["characteristic"] == "uart_data");
    assert_eq!(Some(&json!("48 69 0A")), uart.map(|record| &record["payload"]));
    assert_eq!(json!(2), lines[2]["received"]);
    assert_eq!(
        json!({ "reason": "reached_limit", "limit": 2 }),
        lines[2]["stop_reason"]
    );
    Ok(())
}
