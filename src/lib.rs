mod app;
mod cli;
pub mod codec;
mod error;
mod handlers;
mod hw;
mod protocol;
mod telemetry;
mod terminal;
mod utils;

pub use app::{
    RunSettings, SessionHandler, fake_hardware_client, real_hardware_client, run,
    run_with_clients, run_with_settings,
};
pub use cli::{
    Args, Command, ConnectOptions, ControlAction, ControlArgs, FakeArgs, HexBytes, ListenArgs,
    LogLevel, OutputFormat, PinLevel, PinMode,
};
pub use error::{FixtureError, OperationError, SessionError, TransportError};
pub use handlers::{
    AnalogHandler, GpioHandler, I2cHandler, PwmHandler, SpiHandler, SystemHandler, UartHandler,
};
pub use hw::{
    AckMode, Characteristic, CommandCharacteristic, ConfigService, ConfigurationSnapshot,
    ControlService, FakeController, FakeDeviceConfig, FakeTransport, FoundDevice, HardwareClient,
    InspectReport, ListenStopReason, ListenSummary, MissingCharacteristics,
    NotifiableCharacteristic, OpenedDevice, Peripheral, Readiness, ReadableCharacteristic,
    Service, Services, SessionConfig, SessionSignal, SessionState, SettingsService, Transport,
    TransportEvent, TransportEventReceiver, TransportEventSender, ValueCharacteristic,
    ValueFixtures, WriteMode, WrittenPayload,
};
pub use protocol::{
    CharacteristicId, CharacteristicKind, CharacteristicMetadata, ServiceId, ServiceMetadata,
    characteristic_for_uuid, service_for_uuid,
};
pub use terminal::{SystemTerminalClient, TerminalClient};
