use std::fmt::{self, Display, Formatter};

use crate::hw::FoundDevice;
use crate::utils::format_rssi;

use super::painter::Painter;
use super::table::Table;

/// Key-value table describing the peripheral picked by the scan.
pub(crate) struct DeviceView<'a> {
    device: &'a FoundDevice,
    painter: &'a Painter,
}

impl<'a> DeviceView<'a> {
    pub(crate) fn new(device: &'a FoundDevice, painter: &'a Painter) -> Self {
        Self { device, painter }
    }
}

impl Display for DeviceView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let painter = self.painter;
        let table = Table::key_value(
            painter,
            vec![
                (
                    "name",
                    painter.value(self.device.local_name().unwrap_or("<unnamed>")),
                ),
                ("adapter", painter.value(self.device.adapter_name())),
                ("id", painter.value(self.device.device_id())),
                ("rssi", painter.value(format_rssi(self.device.rssi()))),
            ],
        )
        .titled(painter.heading("Device"));
        write!(f, "{table}")
    }
}
