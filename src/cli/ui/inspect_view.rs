use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use crate::codec::{AnalogPin, GpioPin, PwmPin};
use crate::hw::{ConfigurationSnapshot, InspectReport};

use super::device_view::DeviceView;
use super::painter::Painter;
use super::table::Table;

/// Renders an inspect report as a stack of tables.
pub(crate) struct InspectReportView<'a> {
    report: &'a InspectReport,
    painter: &'a Painter,
}

impl<'a> InspectReportView<'a> {
    pub(crate) fn new(report: &'a InspectReport, painter: &'a Painter) -> Self {
        Self { report, painter }
    }

    fn system_table(&self) -> Table {
        let painter = self.painter;
        let system = &self.report.system;
        let bluetooth = &self.report.bluetooth;
        let uptime = humantime::format_duration(Duration::from_secs(u64::from(system.uptime_secs)));
        Table::key_value(
            painter,
            vec![
                ("device name", painter.value(self.report.name.as_str())),
                ("firmware", painter.value(system.firmware_version())),
                (
                    "hardware revision",
                    painter.value(system.hardware_revision.to_string()),
                ),
                ("uptime", painter.value(uptime.to_string())),
                ("tx power", painter.value(bluetooth.tx_power.to_string())),
                (
                    "advertising interval",
                    painter.value(format!("{} ms", bluetooth.advertising_interval_ms)),
                ),
            ],
        )
        .titled(painter.heading("System"))
    }

    fn gpio_table(&self) -> Table {
        let gpio = &self.report.configuration.gpio;
        let rows = GpioPin::all()
            .map(|pin| vec![pin.to_string(), gpio.mode(pin).to_string()])
            .collect();
        Table::grid(["pin", "mode"], rows).titled(self.painter.heading("GPIO"))
    }

    fn pwm_table(&self) -> Table {
        let painter = self.painter;
        let configuration = &self.report.configuration;
        let hardware = &configuration.hardware_pwm;
        let rows = PwmPin::all()
            .map(|pin| {
                vec![
                    pin.to_string(),
                    configuration.software_pwm.mode(pin).to_string(),
                    painter.flag(hardware.enabled[pin.index()]),
                    painter.flag(hardware.inverted[pin.index()]),
                ]
            })
            .collect();
        let title = format!(
            "PWM (prescaler {}, {}, top {})",
            hardware.prescaler, hardware.counter_mode, hardware.top
        );
        Table::grid(["pin", "software", "hardware", "inverted"], rows)
            .titled(painter.heading(title))
    }

    fn analog_table(&self) -> Table {
        let analog = &self.report.configuration.analog;
        let rows = AnalogPin::all()
            .map(|pin| vec![pin.to_string(), analog.mode(pin).to_string()])
            .collect();
        let title = format!(
            "Analog (reference {}, resolution {})",
            analog.settings.reference, analog.settings.resolution
        );
        Table::grid(["pin", "mode"], rows).titled(self.painter.heading(title))
    }

    fn bus_table(&self) -> Table {
        let painter = self.painter;
        let ConfigurationSnapshot { i2c, spi, uart, .. } = &self.report.configuration;
        Table::key_value(
            painter,
            vec![
                (
                    "i2c",
                    format!("{} {}", painter.flag(i2c.enabled), painter.value(i2c.clock.to_string())),
                ),
                (
                    "spi",
                    painter.value(format!("{} {} {}", spi.mode, spi.bit_order, spi.clock)),
                ),
                (
                    "uart",
                    painter.value(format!(
                        "{} baud, parity {}, stop bits {}",
                        uart.baud_rate, uart.parity, uart.stop_bits
                    )),
                ),
            ],
        )
        .titled(painter.heading("Buses"))
    }
}

impl Display for InspectReportView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", DeviceView::new(&self.report.device, self.painter))?;
        writeln!(f)?;
        writeln!(f, "{}", self.system_table())?;
        writeln!(f)?;
        writeln!(f, "{}", self.gpio_table())?;
        writeln!(f)?;
        writeln!(f, "{}", self.pwm_table())?;
        writeln!(f)?;
        writeln!(f, "{}", self.analog_table())?;
        writeln!(f)?;
        write!(f, "{}", self.bus_table())
    }
}
