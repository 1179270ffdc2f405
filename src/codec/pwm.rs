use serde::Serialize;

use super::{
    CharacteristicValue, CheckedBytes, CodecError, Compose, Nibbles, PwmPin, be_u16, bits, chunk,
    compose_u16, pack_bits,
};

wire_enum! {
    /// Software PWM output mode of one pin.
    pub enum SoftwarePwmMode => InvalidPwmMode {
        Disabled = 0,
        ActiveHigh = 1,
        ActiveLow = 2,
    }
}

wire_enum! {
    /// Hardware PWM clock divider.
    pub enum PwmPrescaler => InvalidPrescaler {
        Div1 = 0,
        Div2 = 1,
        Div4 = 2,
        Div8 = 3,
        Div16 = 4,
        Div32 = 5,
        Div64 = 6,
        Div128 = 7,
    }
}

impl PwmPrescaler {
    /// Returns the divisor applied to the 16 MHz base clock.
    #[must_use]
    pub const fn divisor(self) -> u16 {
        1 << self.as_raw()
    }
}

wire_enum! {
    /// Hardware PWM counter direction.
    pub enum PwmCounterMode => InvalidCounterMode {
        Up = 0,
        UpAndDown = 1,
    }
}

/// Software PWM mode of one pin; pin index in the high nibble.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct SoftwarePwmPinConfig {
    pub pin: PwmPin,
    pub mode: SoftwarePwmMode,
}

impl SoftwarePwmPinConfig {
    #[must_use]
    pub const fn new(pin: PwmPin, mode: SoftwarePwmMode) -> Self {
        Self { pin, mode }
    }
}

impl CharacteristicValue for SoftwarePwmPinConfig {
    const BYTE_SIZE: usize = 1;

    fn decode(bytes: CheckedBytes<'_>) -> Result<Self, CodecError> {
        let nibbles = Nibbles::split(bytes[0]);
        Ok(Self {
            pin: PwmPin::try_from(nibbles.high)?,
            mode: SoftwarePwmMode::try_from(nibbles.low)?,
        })
    }
}

impl Compose for SoftwarePwmPinConfig {
    fn compose(&self) -> Vec<u8> {
        vec![Nibbles::join(self.pin.as_raw(), self.mode.as_raw())]
    }
}

/// Software PWM modes of all four pins in pin order.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct SoftwarePwmConfiguration {
    modes: [SoftwarePwmMode; PwmPin::COUNT],
}

impl SoftwarePwmConfiguration {
    #[must_use]
    pub const fn new(modes: [SoftwarePwmMode; PwmPin::COUNT]) -> Self {
        Self { modes }
    }

    #[must_use]
    pub fn mode(&self, pin: PwmPin) -> SoftwarePwmMode {
        self.modes[pin.index()]
    }
}

impl CharacteristicValue for SoftwarePwmConfiguration {
    const BYTE_SIZE: usize = PwmPin::COUNT;

    fn decode(bytes: CheckedBytes<'_>) -> Result<Self, CodecError> {
        let mut modes = [SoftwarePwmMode::Disabled; PwmPin::COUNT];
        for (slot, raw) in modes.iter_mut().zip(bytes) {
            *slot = SoftwarePwmMode::try_from(*raw)?;
        }
        Ok(Self { modes })
    }
}

impl Compose for SoftwarePwmConfiguration {
    fn compose(&self) -> Vec<u8> {
        self.modes.iter().map(|mode| mode.as_raw()).collect()
    }
}

/// On/off durations, in milliseconds, driven on one software PWM pin.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct SoftwarePwmDrive {
    pub pin: PwmPin,
    pub on_ms: u16,
    pub off_ms: u16,
}

impl SoftwarePwmDrive {
    #[must_use]
    pub const fn new(pin: PwmPin, on_ms: u16, off_ms: u16) -> Self {
        Self { pin, on_ms, off_ms }
    }
}

impl CharacteristicValue for SoftwarePwmDrive {
    const BYTE_SIZE: usize = 5;

    fn decode(bytes: CheckedBytes<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            pin: PwmPin::try_from(bytes[0])?,
            on_ms: be_u16(&bytes[1..3]).unwrap_or_default(),
            off_ms: be_u16(&bytes[3..5]).unwrap_or_default(),
        })
    }
}

impl Compose for SoftwarePwmDrive {
    fn compose(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::BYTE_SIZE);
        bytes.push(self.pin.as_raw());
        bytes.extend_from_slice(&compose_u16(self.on_ms));
        bytes.extend_from_slice(&compose_u16(self.off_ms));
        bytes
    }
}

/// Timer setup shared by the four hardware PWM channels.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct HardwarePwmConfig {
    pub prescaler: PwmPrescaler,
    pub counter_mode: PwmCounterMode,
    /// Counter top; control values are compared against it.
    pub top: u16,
    pub enabled: [bool; PwmPin::COUNT],
    pub inverted: [bool; PwmPin::COUNT],
}

impl HardwarePwmConfig {
    /// Returns a configuration with every channel disabled.
    #[must_use]
    pub const fn new(prescaler: PwmPrescaler, counter_mode: PwmCounterMode, top: u16) -> Self {
        Self {
            prescaler,
            counter_mode,
            top,
            enabled: [false; PwmPin::COUNT],
            inverted: [false; PwmPin::COUNT],
        }
    }

    /// Enables `pin`, optionally with inverted polarity.
    #[must_use]
    pub fn with_channel(mut self, pin: PwmPin, inverted: bool) -> Self {
        self.enabled[pin.index()] = true;
        self.inverted[pin.index()] = inverted;
        self
    }

    fn flags(&self) -> u8 {
        Nibbles::join(pack_bits(&self.inverted), pack_bits(&self.enabled))
    }
}

impl CharacteristicValue for HardwarePwmConfig {
    const BYTE_SIZE: usize = 5;

    fn decode(bytes: CheckedBytes<'_>) -> Result<Self, CodecError> {
        let flags = bits(bytes[4]);
        let mut enabled = [false; PwmPin::COUNT];
        let mut inverted = [false; PwmPin::COUNT];
        enabled.copy_from_slice(&flags[..PwmPin::COUNT]);
        inverted.copy_from_slice(&flags[PwmPin::COUNT..]);

        Ok(Self {
            prescaler: PwmPrescaler::try_from(bytes[0])?,
            counter_mode: PwmCounterMode::try_from(bytes[1])?,
            top: be_u16(&bytes[2..4]).unwrap_or_default(),
            enabled,
            inverted,
        })
    }
}

impl Compose for HardwarePwmConfig {
    fn compose(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::BYTE_SIZE);
        bytes.push(self.prescaler.as_raw());
        bytes.push(self.counter_mode.as_raw());
        bytes.extend_from_slice(&compose_u16(self.top));
        bytes.push(self.flags());
        bytes
    }
}

/// Control values of the four hardware PWM channels; chunk `i` is channel `i`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct HardwarePwmValues {
    values: [u16; PwmPin::COUNT],
}

impl HardwarePwmValues {
    #[must_use]
    pub const fn new(values: [u16; PwmPin::COUNT]) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn value(&self, pin: PwmPin) -> u16 {
        self.values[pin.index()]
    }

    #[must_use]
    pub fn values(&self) -> &[u16; PwmPin::COUNT] {
        &self.values
    }
}

impl CharacteristicValue for HardwarePwmValues {
    const BYTE_SIZE: usize = PwmPin::COUNT * 2;

    fn decode(bytes: CheckedBytes<'_>) -> Result<Self, CodecError> {
        let mut values = [0; PwmPin::COUNT];
        for (slot, pair) in values.iter_mut().zip(chunk(&bytes, 2)) {
            *slot = be_u16(&pair).unwrap_or_default();
        }
        Ok(Self { values })
    }
}

impl Compose for HardwarePwmValues {
    fn compose(&self) -> Vec<u8> {
        self.values.iter().flat_map(|value| compose_u16(*value)).collect()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    use super::*;
    use crate::codec::assert_round_trip;

    #[test]
    fn drive_durations_are_big_endian() {
        let drive = SoftwarePwmDrive::new(PwmPin::Pin2, 500, 0x1234);
        assert_eq!(vec![0x02, 0x01, 0xF4, 0x12, 0x34], drive.compose());
    }

    #[test]
    fn hardware_config_packs_channel_flags_into_nibbles() {
        let config = HardwarePwmConfig::new(PwmPrescaler::Div16, PwmCounterMode::UpAndDown, 1_000)
            .with_channel(PwmPin::Pin0, false)
            .with_channel(PwmPin::Pin3, true);

        let bytes = config.compose();
        assert_eq!(vec![0x04, 0x01, 0x03, 0xE8, 0b1000_1001], bytes);
        assert_eq!(Ok(config), HardwarePwmConfig::parse(&bytes));
    }

    #[test]
    fn hardware_config_rejects_unknown_prescaler() {
        assert_matches!(
            HardwarePwmConfig::parse(&[0x08, 0x00, 0x00, 0x10, 0x00]),
            Err(CodecError::InvalidPrescaler { value: 8 })
        );
        assert_matches!(
            HardwarePwmConfig::parse(&[0x00, 0x02, 0x00, 0x10, 0x00]),
            Err(CodecError::InvalidCounterMode { value: 2 })
        );
    }

    #[test]
    fn hardware_values_keep_channel_positions() {
        let values = HardwarePwmValues::new([1, 0x0200, 0, 0xFFFF]);
        let bytes = values.compose();

        assert_eq!(vec![0x00, 0x01, 0x02, 0x00, 0x00, 0x00, 0xFF, 0xFF], bytes);
        let decoded = HardwarePwmValues::parse(&bytes).expect("composed values should parse");
        assert_eq!(0x0200, decoded.value(PwmPin::Pin1));
        assert_eq!(0xFFFF, decoded.value(PwmPin::Pin3));
    }

    #[test]
    fn prescaler_divisor_doubles_per_step() {
        assert_eq!(1, PwmPrescaler::Div1.divisor());
        assert_eq!(128, PwmPrescaler::Div128.divisor());
    }

    #[test]
    fn software_pwm_values_survive_a_round_trip_for_every_pin_and_mode() {
        for pin in PwmPin::iter() {
            for mode in SoftwarePwmMode::iter() {
                assert_round_trip(&SoftwarePwmPinConfig::new(pin, mode));
                assert_round_trip(&SoftwarePwmConfiguration::new([mode; PwmPin::COUNT]));
            }
            assert_round_trip(&SoftwarePwmDrive::new(pin, 0, u16::MAX));
            assert_round_trip(&SoftwarePwmDrive::new(pin, 0x1234, 0x00FF));
        }
    }

    #[test]
    fn hardware_config_survives_a_round_trip_for_every_setting() {
        for prescaler in PwmPrescaler::iter() {
            for counter_mode in PwmCounterMode::iter() {
                assert_round_trip(&HardwarePwmConfig::new(prescaler, counter_mode, 0x03FF));
                for pin in PwmPin::iter() {
                    for inverted in [false, true] {
                        let config = HardwarePwmConfig::new(prescaler, counter_mode, u16::MAX)
                            .with_channel(pin, inverted);
                        assert_round_trip(&config);
                    }
                }
            }
        }
        assert_round_trip(&HardwarePwmValues::new([0, 1, 0x8000, u16::MAX]));
    }
}
