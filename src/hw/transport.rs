use async_trait::async_trait;
use serde::Serialize;
use strum_macros::Display;
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::protocol::{CharacteristicId, ServiceId};

/// Write acknowledgement mode.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Completes when the peripheral acknowledges the write.
    #[default]
    WithResponse,
    /// Completes as soon as the payload has been handed to the transport.
    WithoutResponse,
}

/// Raw events delivered by a transport into the peripheral session.
///
/// Every outcome of a [`Transport`] request arrives here, along with
/// device-initiated notifications and link changes.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Connected,
    ConnectionFailed(TransportError),
    ServicesDiscovered(Result<Vec<ServiceId>, TransportError>),
    CharacteristicsDiscovered {
        service: ServiceId,
        result: Result<Vec<CharacteristicId>, TransportError>,
    },
    NotificationStateUpdated {
        characteristic: CharacteristicId,
        result: Result<(), TransportError>,
    },
    ValueUpdated {
        characteristic: CharacteristicId,
        result: Result<Option<Vec<u8>>, TransportError>,
    },
    WriteCompleted {
        characteristic: CharacteristicId,
        result: Result<(), TransportError>,
    },
    /// The peripheral changed its GATT table; discovery must run again.
    ServicesInvalidated,
    Disconnected {
        error: Option<TransportError>,
    },
}

pub type TransportEventSender = mpsc::UnboundedSender<TransportEvent>;
pub type TransportEventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

/// Request primitives offered by a BLE stack.
///
/// Requests return once they have been issued; their outcome is reported
/// through [`TransportEvent`]s. An `Err` return means the request could not
/// be issued at all.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn connect(&self) -> Result<(), TransportError>;

    async fn disconnect(&self) -> Result<(), TransportError>;

    async fn discover_services(&self) -> Result<(), TransportError>;

    async fn discover_characteristics(&self, service: ServiceId) -> Result<(), TransportError>;

    async fn set_notify(
        &self,
        characteristic: CharacteristicId,
        enabled: bool,
    ) -> Result<(), TransportError>;

    async fn read(&self, characteristic: CharacteristicId) -> Result<(), TransportError>;

    async fn write(
        &self,
        characteristic: CharacteristicId,
        payload: &[u8],
        mode: WriteMode,
    ) -> Result<(), TransportError>;
}
