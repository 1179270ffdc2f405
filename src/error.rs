use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::codec::{BoundsError, CodecError};
use crate::protocol::{CharacteristicId, ServiceId};

/// Errors reported by the BLE transport collaborator.
#[derive(Debug, Error, Clone)]
pub enum TransportError {
    #[error("BLE operation failed")]
    Ble(#[source] Arc<btleplug::Error>),
    #[error("no BLE adapters were found")]
    NoAdapters,
    #[error(
        "no peripheral matching `{prefix}*` was found within {elapsed}",
        elapsed = humantime::format_duration(*timeout)
    )]
    PeripheralNotFound { prefix: String, timeout: Duration },
    #[error(
        "characteristic `{name}` is not available on the connected peripheral",
        name = characteristic.metadata().name()
    )]
    MissingCharacteristic { characteristic: CharacteristicId },
    #[error("peripheral is not connected")]
    NotConnected,
    #[error("peripheral rejected the request: {reason}")]
    Rejected { reason: String },
    #[error("transport event channel closed")]
    EventChannelClosed,
    #[error(transparent)]
    Fixture(#[from] FixtureError),
}

impl From<btleplug::Error> for TransportError {
    fn from(error: btleplug::Error) -> Self {
        Self::Ble(Arc::new(error))
    }
}

/// Failures that move the peripheral session into its error state.
#[derive(Debug, Error, Clone)]
pub enum SessionError {
    #[error("failed to connect to the peripheral")]
    ConnectionFailed(#[source] TransportError),
    #[error("peripheral disconnected")]
    Disconnected {
        #[source]
        source: Option<TransportError>,
    },
    #[error("service discovery failed")]
    ServiceDiscoveryFailed(#[source] TransportError),
    #[error(
        "required service `{name}` ({uuid}) was not found",
        name = service.metadata().name(),
        uuid = service.metadata().uuid()
    )]
    MissingService { service: ServiceId },
    #[error("characteristic discovery failed for {service} service")]
    CharacteristicDiscoveryFailed {
        service: ServiceId,
        #[source]
        source: TransportError,
    },
    #[error(
        "required characteristic `{name}` ({uuid}) was not found",
        name = characteristic.metadata().name(),
        uuid = characteristic.metadata().uuid()
    )]
    MissingCharacteristic { characteristic: CharacteristicId },
    #[error("failed to enable notifications for {characteristic}")]
    NotificationConfigurationFailed {
        characteristic: CharacteristicId,
        #[source]
        source: TransportError,
    },
    #[error("peripheral session task has stopped")]
    Closed,
}

/// Errors local to a single read, write or domain operation.
#[derive(Debug, Error, Clone)]
pub enum OperationError {
    #[error("characteristic {characteristic} was not discovered on the peripheral")]
    CharacteristicNotFound { characteristic: CharacteristicId },
    #[error("read of {characteristic} completed without a value")]
    InvalidReadValue { characteristic: CharacteristicId },
    #[error("could not read {characteristic}")]
    CouldNotReadValue {
        characteristic: CharacteristicId,
        #[source]
        source: TransportError,
    },
    #[error("write to {characteristic} failed")]
    WriteFailed {
        characteristic: CharacteristicId,
        #[source]
        source: TransportError,
    },
    #[error("value received from {characteristic} could not be decoded")]
    InvalidValue {
        characteristic: CharacteristicId,
        #[source]
        source: CodecError,
    },
    #[error(
        "{operation} did not complete within {elapsed}",
        elapsed = humantime::format_duration(*timeout)
    )]
    TimedOut {
        operation: &'static str,
        timeout: Duration,
    },
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Bounds(#[from] BoundsError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Errors returned when parsing fake backend fixtures.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum FixtureError {
    #[error("the fake discovery fixture is empty")]
    EmptyFixture,
    #[error("fixture records must contain four pipe-delimited fields")]
    InvalidRecordFieldCount,
    #[error("fixture records cannot contain empty mandatory fields")]
    EmptyRecordField,
    #[error("failed to parse RSSI value")]
    InvalidRssi(#[from] std::num::ParseIntError),
    #[error("hex payload length must be even")]
    InvalidHexLength,
    #[error("hex payload contains invalid byte `{value}`")]
    InvalidHexByte { value: String },
    #[error("value fixtures must use `characteristic=hex` entries, got `{entry}`")]
    InvalidValueEntry { entry: String },
    #[error("unknown characteristic `{name}` in fixture")]
    UnknownCharacteristic { name: String },
}

/// Errors returned when validating runtime backend options.
#[derive(Debug, Error)]
pub(crate) enum CliConfigError {
    #[error("missing fake scan fixture while fake mode is enabled")]
    MissingFakeScanFixture,
}

/// Errors returned by telemetry initialisation.
#[derive(Debug, Error)]
pub(crate) enum TelemetryError {
    #[error("failed to install tracing subscriber")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn timeout_messages_use_human_durations() {
        let error = OperationError::TimedOut {
            operation: "read",
            timeout: Duration::from_millis(1_500),
        };
        assert_eq!("read did not complete within 1s 500ms", error.to_string());

        let error = TransportError::PeripheralNotFound {
            prefix: "BLEIO-".to_string(),
            timeout: Duration::from_secs(10),
        };
        assert_eq!(
            "no peripheral matching `BLEIO-*` was found within 10s",
            error.to_string()
        );
    }

    #[test]
    fn missing_service_names_the_uuid() {
        let error = SessionError::MissingService {
            service: ServiceId::Control,
        };
        assert_eq!(
            "required service `control service` (5c3a0300-8f2e-4b6d-a1c0-3e7d9b1f2a00) was not found",
            error.to_string()
        );
    }
}
