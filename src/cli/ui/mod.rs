mod device_view;
mod inspect_view;
mod listen_view;
mod painter;
mod table;

pub(crate) use self::inspect_view::InspectReportView;
pub(crate) use self::listen_view::{ListenNotificationView, ListenReadyView, ListenSummaryView};
pub(crate) use self::painter::Painter;
