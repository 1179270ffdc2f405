use serde::Serialize;
use strum_macros::Display;

use crate::codec::{
    AnalogConfiguration, BluetoothSettings, DeviceName, GpioConfiguration, HardwarePwmConfig,
    I2cConfig, SoftwarePwmConfiguration, SpiConfig, SystemInfo, UartConfig,
};

/// A discovered BLE peripheral that matched the scan prefix.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct FoundDevice {
    adapter_name: String,
    device_id: String,
    local_name: Option<String>,
    rssi: Option<i16>,
}

impl FoundDevice {
    pub(crate) fn new(
        adapter_name: String,
        device_id: String,
        local_name: Option<String>,
        rssi: Option<i16>,
    ) -> Self {
        Self {
            adapter_name,
            device_id,
            local_name,
            rssi,
        }
    }

    #[must_use]
    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    /// Backend-specific peripheral identifier.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    #[must_use]
    pub fn local_name(&self) -> Option<&str> {
        self.local_name.as_deref()
    }

    /// Last observed signal strength, if the adapter reported one.
    #[must_use]
    pub fn rssi(&self) -> Option<i16> {
        self.rssi
    }

    pub(crate) fn local_name_starts_with(&self, prefix: &str) -> bool {
        self.local_name
            .as_deref()
            .is_some_and(|name| name.starts_with(prefix))
    }
}

/// Identification and configuration snapshot read during `inspect`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct InspectReport {
    pub device: FoundDevice,
    pub system: SystemInfo,
    pub name: DeviceName,
    pub bluetooth: BluetoothSettings,
    pub configuration: ConfigurationSnapshot,
}

/// Current value of every configuration characteristic.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct ConfigurationSnapshot {
    pub gpio: GpioConfiguration,
    pub software_pwm: SoftwarePwmConfiguration,
    pub hardware_pwm: HardwarePwmConfig,
    pub analog: AnalogConfiguration,
    pub i2c: I2cConfig,
    pub spi: SpiConfig,
    pub uart: UartConfig,
}

/// Why a listen run ended.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display, Serialize)]
#[serde(tag = "reason", content = "limit", rename_all = "snake_case")]
pub enum ListenStopReason {
    #[strum(to_string = "reached notification limit ({0})")]
    ReachedLimit(usize),
    #[strum(to_string = "interrupted")]
    Interrupted,
    #[strum(to_string = "peripheral disconnected")]
    Disconnected,
}

/// Outcome of a listen run.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct ListenSummary {
    device: FoundDevice,
    received: usize,
    stop_reason: ListenStopReason,
}

impl ListenSummary {
    pub(crate) fn new(device: FoundDevice, received: usize, stop_reason: ListenStopReason) -> Self {
        Self {
            device,
            received,
            stop_reason,
        }
    }

    #[must_use]
    pub fn device(&self) -> &FoundDevice {
        &self.device
    }

    /// Number of notifications delivered before the run stopped.
    #[must_use]
    pub fn received(&self) -> usize {
        self.received
    }

    #[must_use]
    pub fn stop_reason(&self) -> ListenStopReason {
        self.stop_reason
    }
}
