mod analog;
mod gpio;
mod i2c;
mod pwm;
mod spi;
mod system;
mod uart;

pub use self::analog::AnalogHandler;
pub use self::gpio::GpioHandler;
pub use self::i2c::I2cHandler;
pub use self::pwm::PwmHandler;
pub use self::spi::SpiHandler;
pub use self::system::SystemHandler;
pub use self::uart::UartHandler;
