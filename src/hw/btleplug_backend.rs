use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use super::model::FoundDevice;
use super::transport::{
    Transport, TransportEvent, TransportEventReceiver, TransportEventSender, WriteMode,
};
use crate::error::TransportError;
use crate::protocol::{self, CharacteristicId, ServiceId};

const SCAN_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug)]
pub(crate) struct BtleplugBackend {
    manager: Manager,
}

impl BtleplugBackend {
    pub(crate) async fn new() -> Result<Self, TransportError> {
        let manager = Manager::new().await?;
        Ok(Self { manager })
    }

    #[instrument(skip(self), level = "trace")]
    async fn adapters(&self) -> Result<Vec<AdapterHandle>, TransportError> {
        let adapters = self.manager.adapters().await?;
        if adapters.is_empty() {
            return Err(TransportError::NoAdapters);
        }

        let mut handles = Vec::with_capacity(adapters.len());
        for adapter in adapters {
            let name = adapter.adapter_info().await?;
            handles.push(AdapterHandle { adapter, name });
        }
        Ok(handles)
    }

    /// Scans until a peripheral advertising `name_prefix` appears or `scan_timeout` elapses.
    ///
    /// Scanning is stopped on every adapter on both paths.
    #[instrument(skip(self), level = "debug", fields(prefix = name_prefix))]
    pub(crate) async fn open_first_matching_device(
        self,
        name_prefix: &str,
        scan_timeout: Duration,
    ) -> Result<(FoundDevice, BtleplugTransport, TransportEventReceiver), TransportError> {
        let adapters = self.adapters().await?;
        info!(adapter_count = adapters.len(), "starting BLE scan");

        for handle in &adapters {
            handle.adapter.start_scan(ScanFilter::default()).await?;
        }
        let outcome = timeout(scan_timeout, poll_for_match(&adapters, name_prefix)).await;
        for handle in &adapters {
            if let Err(error) = handle.adapter.stop_scan().await {
                debug!(?error, "failed to stop adapter scan cleanly");
            }
        }

        let Ok(found) = outcome else {
            return Err(TransportError::PeripheralNotFound {
                prefix: name_prefix.to_string(),
                timeout: scan_timeout,
            });
        };
        let (adapter, peripheral, device) = found?;
        info!(device_id = device.device_id(), "found matching peripheral");

        let (events, receiver) = mpsc::unbounded_channel();
        let transport = BtleplugTransport {
            adapter,
            peripheral,
            characteristics: Mutex::new(HashMap::new()),
            events,
            link: Mutex::new(CancellationToken::new()),
        };
        Ok((device, transport, receiver))
    }
}

async fn poll_for_match(
    adapters: &[AdapterHandle],
    name_prefix: &str,
) -> Result<(Adapter, Peripheral, FoundDevice), TransportError> {
    loop {
        for handle in adapters {
            for peripheral in handle.adapter.peripherals().await? {
                let Some(properties) = peripheral.properties().await? else {
                    continue;
                };
                let device = FoundDevice::new(
                    handle.name.clone(),
                    peripheral.id().to_string(),
                    properties.local_name,
                    properties.rssi,
                );
                if device.local_name_starts_with(name_prefix) {
                    return Ok((handle.adapter.clone(), peripheral, device));
                }
            }
        }

        sleep(SCAN_POLL_INTERVAL).await;
    }
}

#[derive(Debug)]
struct AdapterHandle {
    adapter: Adapter,
    name: String,
}

/// [`Transport`] over one btleplug peripheral.
#[derive(Debug)]
pub(crate) struct BtleplugTransport {
    adapter: Adapter,
    peripheral: Peripheral,
    characteristics: Mutex<HashMap<CharacteristicId, Characteristic>>,
    events: TransportEventSender,
    /// Cancels the notification and link watchers of the current connection.
    link: Mutex<CancellationToken>,
}

impl BtleplugTransport {
    fn characteristics(&self) -> MutexGuard<'_, HashMap<CharacteristicId, Characteristic>> {
        self.characteristics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn characteristic(
        &self,
        characteristic: CharacteristicId,
    ) -> Result<Characteristic, TransportError> {
        self.characteristics()
            .get(&characteristic)
            .cloned()
            .ok_or(TransportError::MissingCharacteristic { characteristic })
    }

    fn emit(&self, event: TransportEvent) -> Result<(), TransportError> {
        self.events
            .send(event)
            .map_err(|_| TransportError::EventChannelClosed)
    }

    fn renew_link(&self) -> CancellationToken {
        let mut link = self.link.lock().unwrap_or_else(PoisonError::into_inner);
        link.cancel();
        *link = CancellationToken::new();
        link.clone()
    }

    fn cancel_link(&self) {
        self.link
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }

    /// Forwards notifications and adapter disconnect events until `link` is cancelled.
    async fn spawn_watchers(&self, link: CancellationToken) -> Result<(), TransportError> {
        let mut notifications = self.peripheral.notifications().await?;
        let events = self.events.clone();
        let cancelled = link.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancelled.cancelled() => break,
                    notification = notifications.next() => {
                        let Some(notification) = notification else { break };
                        let Some(characteristic) = protocol::characteristic_for_uuid(notification.uuid) else {
                            trace!(uuid = %notification.uuid, "notification from unknown characteristic");
                            continue;
                        };
                        let event = TransportEvent::ValueUpdated {
                            characteristic,
                            result: Ok(Some(notification.value)),
                        };
                        if events.send(event).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        let mut central = self.adapter.events().await?;
        let events = self.events.clone();
        let peripheral_id = self.peripheral.id();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = link.cancelled() => break,
                    event = central.next() => match event {
                        Some(CentralEvent::DeviceDisconnected(id)) if id == peripheral_id => {
                            warn!("peripheral dropped the link");
                            let _ = events.send(TransportEvent::Disconnected { error: None });
                            break;
                        }
                        Some(_) => {}
                        None => break,
                    },
                }
            }
        });
        Ok(())
    }
}

#[async_trait]
impl Transport for BtleplugTransport {
    #[instrument(skip(self), level = "debug")]
    async fn connect(&self) -> Result<(), TransportError> {
        if !self.peripheral.is_connected().await? {
            self.peripheral.connect().await?;
        }
        let link = self.renew_link();
        self.spawn_watchers(link).await?;
        self.emit(TransportEvent::Connected)
    }

    #[instrument(skip(self), level = "debug")]
    async fn disconnect(&self) -> Result<(), TransportError> {
        self.cancel_link();
        if self.peripheral.is_connected().await? {
            self.peripheral.disconnect().await?;
        }
        self.characteristics().clear();
        self.emit(TransportEvent::Disconnected { error: None })
    }

    #[instrument(skip(self), level = "debug")]
    async fn discover_services(&self) -> Result<(), TransportError> {
        self.peripheral.discover_services().await?;

        let mut found = Vec::new();
        {
            let mut cache = self.characteristics();
            cache.clear();
            for service in self.peripheral.services() {
                let Some(id) = protocol::service_for_uuid(service.uuid) else {
                    trace!(uuid = %service.uuid, "ignoring foreign service");
                    continue;
                };
                found.push(id);
                for characteristic in service.characteristics {
                    if let Some(characteristic_id) =
                        protocol::characteristic_for_uuid(characteristic.uuid)
                    {
                        cache.insert(characteristic_id, characteristic);
                    }
                }
            }
        }

        debug!(services = found.len(), "services discovered");
        self.emit(TransportEvent::ServicesDiscovered(Ok(found)))
    }

    async fn discover_characteristics(&self, service: ServiceId) -> Result<(), TransportError> {
        let characteristics = self
            .characteristics()
            .keys()
            .copied()
            .filter(|characteristic| characteristic.service() == service)
            .collect();
        self.emit(TransportEvent::CharacteristicsDiscovered {
            service,
            result: Ok(characteristics),
        })
    }

    #[instrument(skip(self), level = "trace")]
    async fn set_notify(
        &self,
        characteristic: CharacteristicId,
        enabled: bool,
    ) -> Result<(), TransportError> {
        let handle = self.characteristic(characteristic)?;
        if enabled {
            self.peripheral.subscribe(&handle).await?;
        } else {
            self.peripheral.unsubscribe(&handle).await?;
        }
        self.emit(TransportEvent::NotificationStateUpdated {
            characteristic,
            result: Ok(()),
        })
    }

    #[instrument(skip(self), level = "trace")]
    async fn read(&self, characteristic: CharacteristicId) -> Result<(), TransportError> {
        let handle = self.characteristic(characteristic)?;
        let value = self.peripheral.read(&handle).await?;
        self.emit(TransportEvent::ValueUpdated {
            characteristic,
            result: Ok(Some(value)),
        })
    }

    #[instrument(skip(self, payload), level = "trace", fields(payload_len = payload.len()))]
    async fn write(
        &self,
        characteristic: CharacteristicId,
        payload: &[u8],
        mode: WriteMode,
    ) -> Result<(), TransportError> {
        let handle = self.characteristic(characteristic)?;
        let write_type = match mode {
            WriteMode::WithResponse => WriteType::WithResponse,
            WriteMode::WithoutResponse => WriteType::WithoutResponse,
        };
        self.peripheral.write(&handle, payload, write_type).await?;
        if mode == WriteMode::WithResponse {
            self.emit(TransportEvent::WriteCompleted {
                characteristic,
                result: Ok(()),
            })?;
        }
        Ok(())
    }
}
