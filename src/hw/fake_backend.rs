use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bon::Builder;
use serde::Serialize;
use strum::IntoEnumIterator;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tracing::{debug, instrument, trace};

use super::model::FoundDevice;
use super::transport::{
    Transport, TransportEvent, TransportEventReceiver, TransportEventSender, WriteMode,
};
use crate::codec::{
    AnalogConfiguration, AnalogMode, AnalogOutput, AnalogPin, AnalogPinConfig, AnalogSettings,
    AnalogValues, BluetoothSettings, CharacteristicValue, Compose, DeviceName, GpioConfiguration,
    GpioMode, GpioOutput, GpioPin, GpioPinConfig, GpioValue, GpioValues, HardwarePwmConfig,
    HardwarePwmValues, I2cConfig, I2cData, I2cReadRequest, I2cWrite, PwmPin, SoftwarePwmConfiguration,
    SoftwarePwmDrive, SoftwarePwmMode, SoftwarePwmPinConfig, SpiConfig, SpiData, UartConfig,
    UartData,
};
use crate::error::{FixtureError, TransportError};
use crate::protocol::{CharacteristicId, ServiceId};
use crate::utils::format_hex;

/// Parsed fake scan fixture records.
#[derive(Debug, Clone, derive_more::Into)]
pub(crate) struct ScanFixture {
    devices: Vec<FoundDevice>,
}

impl FromStr for ScanFixture {
    type Err = FixtureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let devices = parse_scan_fixture(value)?;
        Ok(Self { devices })
    }
}

/// Initial characteristic values, written as `name=hex` pairs separated by `;`.
///
/// ```
/// use bleio::ValueFixtures;
///
/// let fixtures: ValueFixtures = "gpio_input=1111000000000000;analog_input=000100020003"
///     .parse()
///     .expect("fixture should parse");
/// assert_eq!(2, fixtures.len());
/// ```
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ValueFixtures {
    values: HashMap<CharacteristicId, Vec<u8>>,
}

impl ValueFixtures {
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(CharacteristicId, Vec<u8>)> for ValueFixtures {
    fn from_iter<T: IntoIterator<Item = (CharacteristicId, Vec<u8>)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl FromStr for ValueFixtures {
    type Err = FixtureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value
            .split(';')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let (name, payload) =
                    entry
                        .split_once('=')
                        .ok_or_else(|| FixtureError::InvalidValueEntry {
                            entry: entry.to_string(),
                        })?;
                Ok((parse_characteristic(name)?, parse_hex(payload)?))
            })
            .collect()
    }
}

/// Characteristics the fake peripheral omits from discovery, comma separated.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct MissingCharacteristics {
    characteristics: HashSet<CharacteristicId>,
}

impl MissingCharacteristics {
    #[must_use]
    pub fn contains(&self, characteristic: CharacteristicId) -> bool {
        self.characteristics.contains(&characteristic)
    }
}

impl FromIterator<CharacteristicId> for MissingCharacteristics {
    fn from_iter<T: IntoIterator<Item = CharacteristicId>>(iter: T) -> Self {
        Self {
            characteristics: iter.into_iter().collect(),
        }
    }
}

impl FromStr for MissingCharacteristics {
    type Err = FixtureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(parse_characteristic)
            .collect()
    }
}

/// How the fake peripheral acknowledges writes that request a response.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum AckMode {
    /// Every accepted write is acknowledged immediately.
    #[default]
    Auto,
    /// Acknowledgements are only sent through [`FakeController::complete_write`].
    Manual,
}

/// Behaviour of one emulated peripheral.
#[derive(Debug, Clone, Default, Builder)]
pub struct FakeDeviceConfig {
    #[builder(default)]
    values: ValueFixtures,
    #[builder(default)]
    missing: MissingCharacteristics,
    /// Values pushed once, right after notifications are enabled for their characteristic.
    #[builder(default)]
    notifications: ValueFixtures,
    #[builder(default)]
    ack_mode: AckMode,
}

/// Settings for constructing the fake hardware backend.
#[derive(Debug, Clone, Builder)]
pub(crate) struct FakeBackendConfig {
    scan_fixture: ScanFixture,
    #[builder(default)]
    device: FakeDeviceConfig,
    #[builder(default)]
    discovery_delay: Duration,
}

/// Fake backend used in tests and non-hardware environments.
#[derive(Debug)]
pub(crate) struct FakeBackend {
    devices: Vec<FoundDevice>,
    device: FakeDeviceConfig,
    discovery_delay: Duration,
}

impl FakeBackend {
    pub(crate) fn new(config: FakeBackendConfig) -> Self {
        Self {
            devices: config.scan_fixture.into(),
            device: config.device,
            discovery_delay: config.discovery_delay,
        }
    }

    /// Resolves the first fixture device matching `name_prefix` and builds its transport.
    #[instrument(skip(self), level = "debug")]
    pub(crate) async fn open_first_matching_device(
        self,
        name_prefix: &str,
        scan_timeout: Duration,
    ) -> Result<(FoundDevice, FakeTransport, TransportEventReceiver), TransportError> {
        let Self {
            devices,
            device,
            discovery_delay,
        } = self;

        let found = timeout(scan_timeout, async {
            if !discovery_delay.is_zero() {
                sleep(discovery_delay).await;
            }
            devices
                .into_iter()
                .find(|device| device.local_name_starts_with(name_prefix))
        })
        .await
        .ok()
        .flatten()
        .ok_or_else(|| TransportError::PeripheralNotFound {
            prefix: name_prefix.to_string(),
            timeout: scan_timeout,
        })?;

        debug!(device_id = found.device_id(), "matched fake peripheral");
        let (transport, _controller, events) = FakeTransport::new(device);
        Ok((found, transport, events))
    }
}

/// Payload recorded by the fake peripheral.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct WrittenPayload {
    pub characteristic: CharacteristicId,
    pub payload: Vec<u8>,
}

#[derive(Debug)]
struct FakeDevice {
    values: HashMap<CharacteristicId, Vec<u8>>,
    missing: MissingCharacteristics,
    notifying: HashSet<CharacteristicId>,
    queued_notifications: HashMap<CharacteristicId, Vec<u8>>,
    written: Vec<WrittenPayload>,
    connected: bool,
}

/// In-memory peripheral implementing [`Transport`].
///
/// Responds to commands the way the I/O expander firmware does: configuration
/// commands update the configuration characteristics, control commands update
/// input characteristics, and bus transfers are looped back as data
/// notifications.
#[derive(Clone)]
pub struct FakeTransport {
    device: Arc<Mutex<FakeDevice>>,
    events: TransportEventSender,
    ack_mode: AckMode,
}

impl fmt::Debug for FakeTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeTransport")
            .field("ack_mode", &self.ack_mode)
            .finish_non_exhaustive()
    }
}

/// Test-side handle for injecting events into a [`FakeTransport`].
#[derive(Debug, Clone)]
pub struct FakeController {
    device: Arc<Mutex<FakeDevice>>,
    events: TransportEventSender,
}

impl FakeTransport {
    /// Creates an emulated peripheral, its controller and the event stream to hand to a session.
    #[must_use]
    pub fn new(config: FakeDeviceConfig) -> (Self, FakeController, TransportEventReceiver) {
        let mut values = default_values();
        values.extend(config.values.values);
        let device = Arc::new(Mutex::new(FakeDevice {
            values,
            missing: config.missing,
            notifying: HashSet::new(),
            queued_notifications: config.notifications.values,
            written: Vec::new(),
            connected: false,
        }));
        let (events, receiver) = mpsc::unbounded_channel();

        let controller = FakeController {
            device: Arc::clone(&device),
            events: events.clone(),
        };
        let transport = Self {
            device,
            events,
            ack_mode: config.ack_mode,
        };
        (transport, controller, receiver)
    }

    fn device(&self) -> MutexGuard<'_, FakeDevice> {
        self.device.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: TransportEvent) -> Result<(), TransportError> {
        self.events
            .send(event)
            .map_err(|_| TransportError::EventChannelClosed)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        self.device().connected = true;
        self.emit(TransportEvent::Connected)
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        {
            let mut device = self.device();
            device.connected = false;
            device.notifying.clear();
        }
        self.emit(TransportEvent::Disconnected { error: None })
    }

    async fn discover_services(&self) -> Result<(), TransportError> {
        self.device().ensure_connected()?;
        self.emit(TransportEvent::ServicesDiscovered(Ok(ServiceId::iter().collect())))
    }

    async fn discover_characteristics(&self, service: ServiceId) -> Result<(), TransportError> {
        let characteristics = {
            let device = self.device();
            device.ensure_connected()?;
            service
                .characteristics()
                .filter(|characteristic| !device.missing.contains(*characteristic))
                .collect()
        };
        self.emit(TransportEvent::CharacteristicsDiscovered {
            service,
            result: Ok(characteristics),
        })
    }

    async fn set_notify(
        &self,
        characteristic: CharacteristicId,
        enabled: bool,
    ) -> Result<(), TransportError> {
        let queued = {
            let mut device = self.device();
            device.ensure_available(characteristic)?;
            if enabled {
                device.notifying.insert(characteristic);
                device
                    .queued_notifications
                    .remove(&characteristic)
                    .and_then(|bytes| device.publish(characteristic, bytes))
            } else {
                device.notifying.remove(&characteristic);
                None
            }
        };
        self.emit(TransportEvent::NotificationStateUpdated {
            characteristic,
            result: Ok(()),
        })?;
        if let Some(event) = queued {
            self.emit(event)?;
        }
        Ok(())
    }

    async fn read(&self, characteristic: CharacteristicId) -> Result<(), TransportError> {
        let value = {
            let device = self.device();
            device.ensure_available(characteristic)?;
            device.values.get(&characteristic).cloned()
        };
        self.emit(TransportEvent::ValueUpdated {
            characteristic,
            result: Ok(value),
        })
    }

    #[instrument(skip(self, payload), level = "trace", fields(payload = %format_hex(payload)))]
    async fn write(
        &self,
        characteristic: CharacteristicId,
        payload: &[u8],
        mode: WriteMode,
    ) -> Result<(), TransportError> {
        let (result, follow_ups) = {
            let mut device = self.device();
            device.ensure_available(characteristic)?;
            device.written.push(WrittenPayload {
                characteristic,
                payload: payload.to_vec(),
            });
            match device.respond(characteristic, payload) {
                Ok(events) => (Ok(()), events),
                Err(error) => (Err(error), Vec::new()),
            }
        };

        if mode == WriteMode::WithResponse && self.ack_mode == AckMode::Auto {
            self.emit(TransportEvent::WriteCompleted {
                characteristic,
                result,
            })?;
        }
        for event in follow_ups {
            self.emit(event)?;
        }
        Ok(())
    }
}

impl FakeController {
    fn device(&self) -> MutexGuard<'_, FakeDevice> {
        self.device.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delivers a raw transport event to the session.
    pub fn inject(&self, event: TransportEvent) {
        let _ = self.events.send(event);
    }

    /// Stores `bytes` and pushes them as a notification.
    pub fn notify(&self, characteristic: CharacteristicId, bytes: Vec<u8>) {
        self.device().values.insert(characteristic, bytes.clone());
        self.inject(TransportEvent::ValueUpdated {
            characteristic,
            result: Ok(Some(bytes)),
        });
    }

    /// Replaces a stored value without notifying.
    pub fn set_value(&self, characteristic: CharacteristicId, bytes: Vec<u8>) {
        self.device().values.insert(characteristic, bytes);
    }

    /// Acknowledges a write when running with [`AckMode::Manual`].
    pub fn complete_write(
        &self,
        characteristic: CharacteristicId,
        result: Result<(), TransportError>,
    ) {
        self.inject(TransportEvent::WriteCompleted {
            characteristic,
            result,
        });
    }

    /// Drops the link as if the peripheral went away.
    pub fn disconnect(&self, error: Option<TransportError>) {
        {
            let mut device = self.device();
            device.connected = false;
            device.notifying.clear();
        }
        self.inject(TransportEvent::Disconnected { error });
    }

    pub fn invalidate_services(&self) {
        self.inject(TransportEvent::ServicesInvalidated);
    }

    #[must_use]
    pub fn is_notifying(&self, characteristic: CharacteristicId) -> bool {
        self.device().notifying.contains(&characteristic)
    }

    /// Every payload written so far, in order.
    #[must_use]
    pub fn written(&self) -> Vec<WrittenPayload> {
        self.device().written.clone()
    }
}

fn rejected(error: impl fmt::Display) -> TransportError {
    TransportError::Rejected {
        reason: error.to_string(),
    }
}

impl FakeDevice {
    fn ensure_connected(&self) -> Result<(), TransportError> {
        if self.connected {
            Ok(())
        } else {
            Err(TransportError::NotConnected)
        }
    }

    fn ensure_available(&self, characteristic: CharacteristicId) -> Result<(), TransportError> {
        self.ensure_connected()?;
        if self.missing.contains(characteristic) {
            return Err(TransportError::MissingCharacteristic { characteristic });
        }
        Ok(())
    }

    fn value<V: CharacteristicValue>(
        &self,
        characteristic: CharacteristicId,
    ) -> Result<V, TransportError> {
        let bytes = self
            .values
            .get(&characteristic)
            .map(Vec::as_slice)
            .unwrap_or_default();
        V::parse(bytes).map_err(rejected)
    }

    /// Stores a value and returns the notification for it when notifications are on.
    fn publish(
        &mut self,
        characteristic: CharacteristicId,
        bytes: Vec<u8>,
    ) -> Option<TransportEvent> {
        self.values.insert(characteristic, bytes.clone());
        self.notifying
            .contains(&characteristic)
            .then_some(TransportEvent::ValueUpdated {
                characteristic,
                result: Ok(Some(bytes)),
            })
    }

    fn respond(
        &mut self,
        characteristic: CharacteristicId,
        payload: &[u8],
    ) -> Result<Vec<TransportEvent>, TransportError> {
        let command = match characteristic {
            CharacteristicId::SettingsCommand
            | CharacteristicId::ConfigCommand
            | CharacteristicId::ControlCommand => payload.split_first(),
            other => {
                trace!(characteristic = %other, "storing direct write");
                self.values.insert(other, payload.to_vec());
                return Ok(Vec::new());
            }
        };
        let Some((&identifier, body)) = command else {
            return Err(rejected("empty command"));
        };

        match characteristic {
            CharacteristicId::SettingsCommand => self.apply_settings(identifier, body),
            CharacteristicId::ConfigCommand => self.apply_config(identifier, body),
            _ => self.apply_control(identifier, body),
        }
    }

    fn apply_settings(
        &mut self,
        identifier: u8,
        body: &[u8],
    ) -> Result<Vec<TransportEvent>, TransportError> {
        match identifier {
            0x01 => {
                let settings = BluetoothSettings::parse(body).map_err(rejected)?;
                Ok(self
                    .publish(CharacteristicId::BluetoothSettings, settings.compose())
                    .into_iter()
                    .collect())
            }
            0x02 => {
                let name = DeviceName::parse(body).map_err(rejected)?;
                self.values
                    .insert(CharacteristicId::DeviceName, name.compose());
                Ok(Vec::new())
            }
            0x03 => {
                debug!("fake peripheral rebooting");
                self.connected = false;
                self.notifying.clear();
                Ok(vec![TransportEvent::Disconnected { error: None }])
            }
            0x04 => {
                self.values = default_values();
                Ok(Vec::new())
            }
            other => Err(rejected(format!("unknown settings command 0x{other:02X}"))),
        }
    }

    fn apply_config(
        &mut self,
        identifier: u8,
        body: &[u8],
    ) -> Result<Vec<TransportEvent>, TransportError> {
        match identifier {
            0x01 => {
                let config = GpioPinConfig::parse(body).map_err(rejected)?;
                let mut modes = *self
                    .value::<GpioConfiguration>(CharacteristicId::GpioConfiguration)?
                    .modes();
                modes[config.pin.index()] = config.mode;
                self.values.insert(
                    CharacteristicId::GpioConfiguration,
                    GpioConfiguration::new(modes).compose(),
                );

                let mut inputs = *self
                    .value::<GpioValues>(CharacteristicId::GpioInput)?
                    .values();
                let sampled = &mut inputs[config.pin.index()];
                sampled.is_valid = is_input(config.mode);
                Ok(self
                    .publish(CharacteristicId::GpioInput, GpioValues::new(inputs).compose())
                    .into_iter()
                    .collect())
            }
            0x02 => {
                let config = SoftwarePwmPinConfig::parse(body).map_err(rejected)?;
                let current = self
                    .value::<SoftwarePwmConfiguration>(CharacteristicId::SoftwarePwmConfiguration)?;
                let mut modes = [SoftwarePwmMode::Disabled; PwmPin::COUNT];
                for pin in PwmPin::all() {
                    modes[pin.index()] = current.mode(pin);
                }
                modes[config.pin.index()] = config.mode;
                self.values.insert(
                    CharacteristicId::SoftwarePwmConfiguration,
                    SoftwarePwmConfiguration::new(modes).compose(),
                );
                Ok(Vec::new())
            }
            0x03 => self.store_config::<HardwarePwmConfig>(
                CharacteristicId::HardwarePwmConfiguration,
                body,
            ),
            0x04 => {
                let config = AnalogPinConfig::parse(body).map_err(rejected)?;
                let current =
                    self.value::<AnalogConfiguration>(CharacteristicId::AnalogConfiguration)?;
                let mut modes = [AnalogMode::Disabled; AnalogPin::COUNT];
                for pin in AnalogPin::all() {
                    modes[pin.index()] = current.mode(pin);
                }
                modes[config.pin.index()] = config.mode;
                self.values.insert(
                    CharacteristicId::AnalogConfiguration,
                    AnalogConfiguration::new(current.settings, modes).compose(),
                );
                Ok(Vec::new())
            }
            0x05 => {
                let settings = AnalogSettings::parse(body).map_err(rejected)?;
                let current =
                    self.value::<AnalogConfiguration>(CharacteristicId::AnalogConfiguration)?;
                let mut updated = current;
                updated.settings = settings;
                self.values
                    .insert(CharacteristicId::AnalogConfiguration, updated.compose());
                Ok(Vec::new())
            }
            0x06 => self.store_config::<I2cConfig>(CharacteristicId::I2cConfiguration, body),
            0x07 => self.store_config::<SpiConfig>(CharacteristicId::SpiConfiguration, body),
            0x08 => self.store_config::<UartConfig>(CharacteristicId::UartConfiguration, body),
            other => Err(rejected(format!("unknown config command 0x{other:02X}"))),
        }
    }

    fn store_config<V: CharacteristicValue + Compose>(
        &mut self,
        characteristic: CharacteristicId,
        body: &[u8],
    ) -> Result<Vec<TransportEvent>, TransportError> {
        let value = V::parse(body).map_err(rejected)?;
        self.values.insert(characteristic, value.compose());
        Ok(Vec::new())
    }

    fn apply_control(
        &mut self,
        identifier: u8,
        body: &[u8],
    ) -> Result<Vec<TransportEvent>, TransportError> {
        let event = match identifier {
            0x01 => {
                let output = GpioOutput::parse(body).map_err(rejected)?;
                let mut inputs = *self
                    .value::<GpioValues>(CharacteristicId::GpioInput)?
                    .values();
                inputs[output.pin.index()] = GpioValue::new(output.level, true);
                self.publish(CharacteristicId::GpioInput, GpioValues::new(inputs).compose())
            }
            0x02 => {
                SoftwarePwmDrive::parse(body).map_err(rejected)?;
                None
            }
            0x03 => {
                HardwarePwmValues::parse(body).map_err(rejected)?;
                None
            }
            0x04 => {
                let output = AnalogOutput::parse(body).map_err(rejected)?;
                let current = self.value::<AnalogValues>(CharacteristicId::AnalogInput)?;
                let mut values = [0; AnalogPin::COUNT];
                for pin in AnalogPin::all() {
                    values[pin.index()] = current.value(pin);
                }
                values[output.pin.index()] = output.value;
                self.publish(
                    CharacteristicId::AnalogInput,
                    AnalogValues::new(values).compose(),
                )
            }
            0x05 => {
                I2cWrite::parse(body).map_err(rejected)?;
                None
            }
            0x06 => {
                let request = I2cReadRequest::parse(body).map_err(rejected)?;
                let data = I2cData {
                    address: request.address(),
                    data: (0..request.length()).collect(),
                };
                self.publish(CharacteristicId::I2cData, data.compose())
            }
            0x07 => self.publish(CharacteristicId::SpiData, SpiData(body.to_vec()).compose()),
            0x08 => self.publish(CharacteristicId::UartData, UartData(body.to_vec()).compose()),
            other => return Err(rejected(format!("unknown control command 0x{other:02X}"))),
        };
        Ok(event.into_iter().collect())
    }
}

fn is_input(mode: GpioMode) -> bool {
    matches!(
        mode,
        GpioMode::Input | GpioMode::InputPullUp | GpioMode::InputPullDown
    )
}

/// Values a freshly flashed peripheral reports.
fn default_values() -> HashMap<CharacteristicId, Vec<u8>> {
    use CharacteristicId as C;

    HashMap::from([
        (C::SystemInfo, vec![0x01, 0x04, 0x02, 0x03, 0x00, 0x00, 0x0E, 0x10]),
        (C::BluetoothSettings, vec![0x05, 0x00, 0x64]),
        (C::DeviceName, b"BLEIO-Fake".to_vec()),
        (C::GpioConfiguration, vec![0x00; GpioPin::COUNT]),
        (C::SoftwarePwmConfiguration, vec![0x00; PwmPin::COUNT]),
        (C::HardwarePwmConfiguration, vec![0x00, 0x00, 0x03, 0xE8, 0x00]),
        (C::AnalogConfiguration, vec![0x01, 0x00, 0x00, 0x00]),
        (C::I2cConfiguration, vec![0x00]),
        (C::SpiConfiguration, vec![0x00, 0x03]),
        (C::UartConfiguration, vec![0x00, 0x00, 0x25, 0x80, 0x01]),
        (C::GpioInput, vec![0x00; GpioPin::COUNT]),
        (C::AnalogInput, vec![0x00; AnalogPin::COUNT * 2]),
    ])
}

fn parse_characteristic(name: &str) -> Result<CharacteristicId, FixtureError> {
    let name = name.trim();
    name.parse()
        .map_err(|_| FixtureError::UnknownCharacteristic {
            name: name.to_string(),
        })
}

fn parse_scan_fixture(raw_fixture: &str) -> Result<Vec<FoundDevice>, FixtureError> {
    if raw_fixture.trim().is_empty() {
        return Err(FixtureError::EmptyFixture);
    }

    raw_fixture
        .split(';')
        .map(parse_scan_record)
        .collect::<Result<Vec<_>, _>>()
}

fn parse_scan_record(raw_record: &str) -> Result<FoundDevice, FixtureError> {
    let fields: Vec<&str> = raw_record.split('|').map(str::trim).collect();
    let [adapter, device_id, local_name, rssi] = fields.as_slice() else {
        return Err(FixtureError::InvalidRecordFieldCount);
    };
    if fields.iter().any(|field| field.is_empty()) {
        return Err(FixtureError::EmptyRecordField);
    }

    let local_name = (*local_name != "-").then(|| local_name.to_string());
    let rssi = match *rssi {
        "-" => None,
        value => Some(value.parse::<i16>()?),
    };

    Ok(FoundDevice::new(
        adapter.to_string(),
        device_id.to_string(),
        local_name,
        rssi,
    ))
}

pub(crate) fn parse_hex(raw_value: &str) -> Result<Vec<u8>, FixtureError> {
    let cleaned: String = raw_value.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&cleaned).map_err(|error| match error {
        hex::FromHexError::InvalidHexCharacter { index, .. } => {
            let start = index - index % 2;
            FixtureError::InvalidHexByte {
                value: cleaned.chars().skip(start).take(2).collect(),
            }
        }
        _ => FixtureError::InvalidHexLength,
    })
}
