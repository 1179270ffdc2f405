use std::fmt::{self, Display, Formatter};

use crate::cli::listen::NotificationRecord;
use crate::hw::{FoundDevice, ListenStopReason, ListenSummary};
use crate::protocol::ServiceId;

use super::device_view::DeviceView;
use super::painter::{Painter, Tone};
use super::table::Table;

/// Printed once the session is ready and notifications are enabled.
pub(crate) struct ListenReadyView<'a> {
    device: &'a FoundDevice,
    painter: &'a Painter,
}

impl<'a> ListenReadyView<'a> {
    pub(crate) fn new(device: &'a FoundDevice, painter: &'a Painter) -> Self {
        Self { device, painter }
    }
}

impl Display for ListenReadyView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let service = ServiceId::Control.metadata();
        writeln!(f, "{}", DeviceView::new(self.device, self.painter))?;
        writeln!(f)?;
        write!(
            f,
            "{} {} {}",
            self.painter.heading("Listening on"),
            self.painter.value(service.uuid().to_string()),
            self.painter
                .muted(format!("({}, Ctrl+C to stop)", service.name()))
        )
    }
}

/// One received notification.
pub(crate) struct ListenNotificationView<'a> {
    record: &'a NotificationRecord,
    painter: &'a Painter,
}

impl<'a> ListenNotificationView<'a> {
    pub(crate) fn new(record: &'a NotificationRecord, painter: &'a Painter) -> Self {
        Self { record, painter }
    }
}

impl Display for ListenNotificationView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.painter.muted(format!("#{}", self.record.index)),
            self.painter.value(self.record.characteristic.to_string()),
            self.painter.paint(Tone::Payload, &self.record.payload),
            self.record.decoded
        )
    }
}

/// Final tally of a listen run.
pub(crate) struct ListenSummaryView<'a> {
    summary: &'a ListenSummary,
    painter: &'a Painter,
}

impl<'a> ListenSummaryView<'a> {
    pub(crate) fn new(summary: &'a ListenSummary, painter: &'a Painter) -> Self {
        Self { summary, painter }
    }
}

impl Display for ListenSummaryView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let painter = self.painter;
        let stop_reason = self.summary.stop_reason();
        let reason = match stop_reason {
            ListenStopReason::Disconnected => painter.paint(Tone::Bad, stop_reason.to_string()),
            _ => painter.paint(Tone::Good, stop_reason.to_string()),
        };
        let table = Table::key_value(
            painter,
            vec![
                (
                    "device",
                    painter.value(self.summary.device().local_name().unwrap_or("<unnamed>")),
                ),
                (
                    "notifications",
                    painter.value(self.summary.received().to_string()),
                ),
                ("stopped", reason),
            ],
        )
        .titled(painter.heading("Listen summary"));
        write!(f, "{table}")
    }
}
