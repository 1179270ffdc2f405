pub(crate) mod command;
pub(crate) mod control;
pub(crate) mod inspect;
pub(crate) mod listen;
pub(crate) mod ui;

pub use self::command::{Args, Command, ConnectOptions, FakeArgs, LogLevel, OutputFormat};
pub use self::control::{ControlAction, ControlArgs, HexBytes, PinLevel, PinMode};
pub use self::listen::ListenArgs;

pub(crate) const DEFAULT_NAME_PREFIX: &str = "BLEIO-";
