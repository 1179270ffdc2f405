use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use super::btleplug_backend::BtleplugBackend;
use super::fake_backend::{FakeBackend, FakeBackendConfig};
use super::model::FoundDevice;
use super::peripheral::{Peripheral, SessionConfig};
use crate::error::TransportError;

/// Runtime BLE backend selection.
#[derive(Debug)]
pub(crate) enum HardwareBackend {
    Real,
    Fake(FakeBackendConfig),
}

/// Builds an injected hardware client for the selected runtime backend.
pub(crate) async fn hardware_client_from_backend(
    backend: HardwareBackend,
) -> Result<Box<dyn HardwareClient>, TransportError> {
    let client: Box<dyn HardwareClient> = match backend {
        HardwareBackend::Real => Box::new(RealHardwareClient::new().await?),
        HardwareBackend::Fake(config) => {
            info!("using fake BLE backend");
            Box::new(FakeHardwareClient::new(config))
        }
    };

    Ok(client)
}

/// A matched peripheral with its session task already running.
#[derive(Debug, Clone)]
pub struct OpenedDevice {
    pub device: FoundDevice,
    pub peripheral: Peripheral,
}

#[async_trait]
pub trait HardwareClient: Send + Sync {
    /// Finds the first peripheral whose advertised name starts with `name_prefix`
    /// and starts a session for it. The session is not connected yet.
    async fn open_first_device(
        self: Box<Self>,
        name_prefix: &str,
        scan_timeout: Duration,
        config: SessionConfig,
    ) -> Result<OpenedDevice, TransportError>;
}

#[derive(Debug)]
struct RealHardwareClient {
    backend: BtleplugBackend,
}

impl RealHardwareClient {
    async fn new() -> Result<Self, TransportError> {
        Ok(Self {
            backend: BtleplugBackend::new().await?,
        })
    }
}

#[async_trait]
impl HardwareClient for RealHardwareClient {
    async fn open_first_device(
        self: Box<Self>,
        name_prefix: &str,
        scan_timeout: Duration,
        config: SessionConfig,
    ) -> Result<OpenedDevice, TransportError> {
        let Self { backend } = *self;
        let (device, transport, events) = backend
            .open_first_matching_device(name_prefix, scan_timeout)
            .await?;

        Ok(OpenedDevice {
            device,
            peripheral: Peripheral::spawn(Arc::new(transport), events, config),
        })
    }
}

#[derive(Debug)]
struct FakeHardwareClient {
    backend: FakeBackend,
}

impl FakeHardwareClient {
    fn new(config: FakeBackendConfig) -> Self {
        Self {
            backend: FakeBackend::new(config),
        }
    }
}

#[async_trait]
impl HardwareClient for FakeHardwareClient {
    async fn open_first_device(
        self: Box<Self>,
        name_prefix: &str,
        scan_timeout: Duration,
        config: SessionConfig,
    ) -> Result<OpenedDevice, TransportError> {
        let Self { backend } = *self;
        let (device, transport, events) = backend
            .open_first_matching_device(name_prefix, scan_timeout)
            .await?;

        Ok(OpenedDevice {
            device,
            peripheral: Peripheral::spawn(Arc::new(transport), events, config),
        })
    }
}
