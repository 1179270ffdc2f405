use serde::Serialize;

use super::{
    CharacteristicValue, CheckedBytes, CodecError, Compose, GpioPin, Nibbles, flag_nibble,
};

wire_enum! {
    /// Electrical mode of one GPIO pin.
    pub enum GpioMode => InvalidGpioMode {
        Disabled = 0,
        Input = 1,
        InputPullUp = 2,
        InputPullDown = 3,
        Output = 4,
        OutputOpenDrain = 5,
    }
}

wire_enum! {
    /// Logic level of a digital pin.
    pub enum Level => InvalidGpioLevel {
        Low = 0,
        High = 1,
    }
}

/// Mode assignment for a single pin; the pin index travels in the high nibble.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct GpioPinConfig {
    pub pin: GpioPin,
    pub mode: GpioMode,
}

impl GpioPinConfig {
    #[must_use]
    pub const fn new(pin: GpioPin, mode: GpioMode) -> Self {
        Self { pin, mode }
    }
}

impl CharacteristicValue for GpioPinConfig {
    const BYTE_SIZE: usize = 1;

    fn decode(bytes: CheckedBytes<'_>) -> Result<Self, CodecError> {
        let nibbles = Nibbles::split(bytes[0]);
        Ok(Self {
            pin: GpioPin::try_from(nibbles.high)?,
            mode: GpioMode::try_from(nibbles.low)?,
        })
    }
}

impl Compose for GpioPinConfig {
    fn compose(&self) -> Vec<u8> {
        vec![Nibbles::join(self.pin.as_raw(), self.mode.as_raw())]
    }
}

/// Modes of all eight pins, one byte per pin in pin order.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct GpioConfiguration {
    modes: [GpioMode; GpioPin::COUNT],
}

impl GpioConfiguration {
    #[must_use]
    pub const fn new(modes: [GpioMode; GpioPin::COUNT]) -> Self {
        Self { modes }
    }

    /// Returns the mode configured for `pin`.
    #[must_use]
    pub fn mode(&self, pin: GpioPin) -> GpioMode {
        self.modes[pin.index()]
    }

    #[must_use]
    pub fn modes(&self) -> &[GpioMode; GpioPin::COUNT] {
        &self.modes
    }
}

impl CharacteristicValue for GpioConfiguration {
    const BYTE_SIZE: usize = GpioPin::COUNT;

    fn decode(bytes: CheckedBytes<'_>) -> Result<Self, CodecError> {
        let mut modes = [GpioMode::Disabled; GpioPin::COUNT];
        for (slot, raw) in modes.iter_mut().zip(bytes) {
            *slot = GpioMode::try_from(*raw)?;
        }
        Ok(Self { modes })
    }
}

impl Compose for GpioConfiguration {
    fn compose(&self) -> Vec<u8> {
        self.modes.iter().map(|mode| mode.as_raw()).collect()
    }
}

/// Output level for one pin: pin index in the high nibble, level in the low nibble.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct GpioOutput {
    pub pin: GpioPin,
    pub level: Level,
}

impl GpioOutput {
    #[must_use]
    pub const fn new(pin: GpioPin, level: Level) -> Self {
        Self { pin, level }
    }
}

impl CharacteristicValue for GpioOutput {
    const BYTE_SIZE: usize = 1;

    fn decode(bytes: CheckedBytes<'_>) -> Result<Self, CodecError> {
        let nibbles = Nibbles::split(bytes[0]);
        Ok(Self {
            pin: GpioPin::try_from(nibbles.high)?,
            level: Level::try_from(nibbles.low)?,
        })
    }
}

impl Compose for GpioOutput {
    fn compose(&self) -> Vec<u8> {
        vec![Nibbles::join(self.pin.as_raw(), self.level.as_raw())]
    }
}

/// Sampled input of one pin. `is_valid` is false while the pin is not an input.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct GpioValue {
    pub level: Level,
    pub is_valid: bool,
}

impl GpioValue {
    #[must_use]
    pub const fn new(level: Level, is_valid: bool) -> Self {
        Self { level, is_valid }
    }

    fn from_byte(byte: u8) -> Result<Self, CodecError> {
        let nibbles = Nibbles::split(byte);
        Ok(Self {
            level: Level::try_from(nibbles.low)?,
            is_valid: flag_nibble(nibbles.high, |value| CodecError::InvalidGpioValidity {
                value,
            })?,
        })
    }

    fn to_byte(self) -> u8 {
        Nibbles::join(u8::from(self.is_valid), self.level.as_raw())
    }
}

impl CharacteristicValue for GpioValue {
    const BYTE_SIZE: usize = 1;

    fn decode(bytes: CheckedBytes<'_>) -> Result<Self, CodecError> {
        Self::from_byte(bytes[0])
    }
}

impl Compose for GpioValue {
    fn compose(&self) -> Vec<u8> {
        vec![self.to_byte()]
    }
}

/// Input values of all eight pins; byte `i` belongs to pin `i`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct GpioValues {
    values: [GpioValue; GpioPin::COUNT],
}

impl GpioValues {
    #[must_use]
    pub const fn new(values: [GpioValue; GpioPin::COUNT]) -> Self {
        Self { values }
    }

    /// Returns the sampled value of `pin`.
    #[must_use]
    pub fn value(&self, pin: GpioPin) -> GpioValue {
        self.values[pin.index()]
    }

    #[must_use]
    pub fn values(&self) -> &[GpioValue; GpioPin::COUNT] {
        &self.values
    }
}

impl CharacteristicValue for GpioValues {
    const BYTE_SIZE: usize = GpioPin::COUNT;

    fn decode(bytes: CheckedBytes<'_>) -> Result<Self, CodecError> {
        let mut values = [GpioValue::new(Level::Low, false); GpioPin::COUNT];
        for (slot, raw) in values.iter_mut().zip(bytes) {
            *slot = GpioValue::from_byte(*raw)?;
        }
        Ok(Self { values })
    }
}

impl Compose for GpioValues {
    fn compose(&self) -> Vec<u8> {
        self.values.iter().map(|value| value.to_byte()).collect()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    use super::*;
    use crate::codec::assert_round_trip;

    #[test]
    fn output_packs_pin_and_level_into_one_byte() {
        let output = GpioOutput::new(GpioPin::Pin1, Level::High);
        assert_eq!(vec![0x11], output.compose());
        assert_eq!(Ok(output), GpioOutput::parse(&[0x11]));
    }

    #[test]
    fn input_byte_decodes_level_and_validity() {
        let mut payload = [0x00; 8];
        payload[0] = 0b0001_0001;
        let values = GpioValues::parse(&payload).expect("valid payload should decode");

        assert_eq!(GpioValue::new(Level::High, true), values.value(GpioPin::Pin0));
        assert_eq!(GpioValue::new(Level::Low, false), values.value(GpioPin::Pin1));
    }

    #[test]
    fn mutating_one_byte_changes_only_that_pin() {
        let baseline = [0x10; 8];
        let decoded = GpioValues::parse(&baseline).expect("baseline should decode");

        for index in 0..8 {
            let mut mutated = baseline;
            mutated[index] = 0x11;
            let changed = GpioValues::parse(&mutated).expect("mutated payload should decode");
            for pin in GpioPin::all() {
                if pin.index() == index {
                    assert_eq!(GpioValue::new(Level::High, true), changed.value(pin));
                } else {
                    assert_eq!(decoded.value(pin), changed.value(pin));
                }
            }
        }
    }

    #[rstest]
    #[case(0x02, CodecError::InvalidGpioLevel { value: 2 })]
    #[case(0x21, CodecError::InvalidGpioValidity { value: 2 })]
    fn input_rejects_unknown_nibbles(#[case] raw: u8, #[case] expected: CodecError) {
        let mut payload = [0x00; 8];
        payload[5] = raw;
        assert_eq!(Err(expected), GpioValues::parse(&payload));
    }

    #[test]
    fn pin_config_rejects_unknown_mode_and_pin() {
        assert_matches!(
            GpioPinConfig::parse(&[0x36]),
            Err(CodecError::InvalidGpioMode { value: 6 })
        );
        assert_matches!(
            GpioPinConfig::parse(&[0x84]),
            Err(CodecError::InvalidPinNumber { value: 8 })
        );
    }

    #[test]
    fn configuration_keeps_positional_modes() {
        let configuration = GpioConfiguration::new([
            GpioMode::Output,
            GpioMode::Input,
            GpioMode::Disabled,
            GpioMode::InputPullUp,
            GpioMode::InputPullDown,
            GpioMode::OutputOpenDrain,
            GpioMode::Disabled,
            GpioMode::Output,
        ]);
        let bytes = configuration.compose();

        assert_eq!(vec![4, 1, 0, 2, 3, 5, 0, 4], bytes);
        assert_eq!(Ok(configuration), GpioConfiguration::parse(&bytes));
        assert_eq!(GpioMode::InputPullUp, configuration.mode(GpioPin::Pin3));
    }

    #[test]
    fn every_pin_mode_and_level_survives_a_round_trip() {
        for pin in GpioPin::iter() {
            for mode in GpioMode::iter() {
                assert_round_trip(&GpioPinConfig::new(pin, mode));
                assert_round_trip(&GpioConfiguration::new([mode; GpioPin::COUNT]));
            }
            for level in Level::iter() {
                assert_round_trip(&GpioOutput::new(pin, level));
            }
        }
    }

    #[test]
    fn every_sampled_value_survives_a_round_trip() {
        for level in Level::iter() {
            for is_valid in [false, true] {
                let value = GpioValue::new(level, is_valid);
                assert_round_trip(&value);
                assert_round_trip(&GpioValues::new([value; GpioPin::COUNT]));
            }
        }
        let mixed = GpioValues::new(std::array::from_fn(|index| {
            GpioValue::new(if index % 2 == 0 { Level::High } else { Level::Low }, index < 4)
        }));
        assert_round_trip(&mixed);
    }
}
