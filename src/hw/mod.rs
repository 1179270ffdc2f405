mod btleplug_backend;
mod characteristic;
mod fake_backend;
mod hardware;
mod model;
mod peripheral;
mod service;
mod session;
mod transport;

pub use self::characteristic::{
    Characteristic, CommandCharacteristic, NotifiableCharacteristic, ReadableCharacteristic,
    ValueCharacteristic,
};
pub(crate) use self::fake_backend::{FakeBackendConfig, ScanFixture, parse_hex};
pub use self::fake_backend::{
    AckMode, FakeController, FakeDeviceConfig, FakeTransport, MissingCharacteristics,
    ValueFixtures, WrittenPayload,
};
pub(crate) use self::hardware::{HardwareBackend, hardware_client_from_backend};
pub use self::hardware::{HardwareClient, OpenedDevice};
pub use self::model::{
    ConfigurationSnapshot, FoundDevice, InspectReport, ListenStopReason, ListenSummary,
};
pub use self::peripheral::{Peripheral, SessionConfig, SessionSignal};
pub use self::service::{ConfigService, ControlService, Service, Services, SettingsService};
pub use self::session::{Readiness, SessionState};
pub use self::transport::{
    Transport, TransportEvent, TransportEventReceiver, TransportEventSender, WriteMode,
};
