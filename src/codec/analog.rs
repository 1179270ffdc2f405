use serde::Serialize;

use super::{
    AnalogPin, CharacteristicValue, CheckedBytes, CodecError, Compose, Nibbles, be_u16, chunk,
    compose_u16,
};

wire_enum! {
    /// Direction of one analog pin.
    pub enum AnalogMode => InvalidAnalogMode {
        Disabled = 0,
        Input = 1,
        Output = 2,
    }
}

wire_enum! {
    /// ADC reference source.
    pub enum ReferenceVoltage => InvalidReferenceVoltage {
        Vdd = 0,
        Internal = 1,
        External = 2,
    }
}

wire_enum! {
    /// ADC sample width.
    pub enum AdcResolution => InvalidResolution {
        Bits8 = 0,
        Bits10 = 1,
        Bits12 = 2,
        Bits14 = 3,
    }
}

impl AdcResolution {
    /// Largest sample value at this resolution.
    #[must_use]
    pub const fn max_value(self) -> u16 {
        let width = match self {
            Self::Bits8 => 8,
            Self::Bits10 => 10,
            Self::Bits12 => 12,
            Self::Bits14 => 14,
        };
        (1 << width) - 1
    }
}

/// Mode of one analog pin; pin index in the high nibble.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct AnalogPinConfig {
    pub pin: AnalogPin,
    pub mode: AnalogMode,
}

impl AnalogPinConfig {
    #[must_use]
    pub const fn new(pin: AnalogPin, mode: AnalogMode) -> Self {
        Self { pin, mode }
    }
}

impl CharacteristicValue for AnalogPinConfig {
    const BYTE_SIZE: usize = 1;

    fn decode(bytes: CheckedBytes<'_>) -> Result<Self, CodecError> {
        let nibbles = Nibbles::split(bytes[0]);
        Ok(Self {
            pin: AnalogPin::try_from(nibbles.high)?,
            mode: AnalogMode::try_from(nibbles.low)?,
        })
    }
}

impl Compose for AnalogPinConfig {
    fn compose(&self) -> Vec<u8> {
        vec![Nibbles::join(self.pin.as_raw(), self.mode.as_raw())]
    }
}

/// Converter settings: reference in the high nibble, resolution in the low nibble.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct AnalogSettings {
    pub reference: ReferenceVoltage,
    pub resolution: AdcResolution,
}

impl AnalogSettings {
    #[must_use]
    pub const fn new(reference: ReferenceVoltage, resolution: AdcResolution) -> Self {
        Self {
            reference,
            resolution,
        }
    }

    fn from_byte(byte: u8) -> Result<Self, CodecError> {
        let nibbles = Nibbles::split(byte);
        Ok(Self {
            reference: ReferenceVoltage::try_from(nibbles.high)?,
            resolution: AdcResolution::try_from(nibbles.low)?,
        })
    }

    fn to_byte(self) -> u8 {
        Nibbles::join(self.reference.as_raw(), self.resolution.as_raw())
    }
}

impl CharacteristicValue for AnalogSettings {
    const BYTE_SIZE: usize = 1;

    fn decode(bytes: CheckedBytes<'_>) -> Result<Self, CodecError> {
        Self::from_byte(bytes[0])
    }
}

impl Compose for AnalogSettings {
    fn compose(&self) -> Vec<u8> {
        vec![self.to_byte()]
    }
}

/// Converter settings followed by the mode of each analog pin.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct AnalogConfiguration {
    pub settings: AnalogSettings,
    modes: [AnalogMode; AnalogPin::COUNT],
}

impl AnalogConfiguration {
    #[must_use]
    pub const fn new(settings: AnalogSettings, modes: [AnalogMode; AnalogPin::COUNT]) -> Self {
        Self { settings, modes }
    }

    #[must_use]
    pub fn mode(&self, pin: AnalogPin) -> AnalogMode {
        self.modes[pin.index()]
    }
}

impl CharacteristicValue for AnalogConfiguration {
    const BYTE_SIZE: usize = 1 + AnalogPin::COUNT;

    fn decode(bytes: CheckedBytes<'_>) -> Result<Self, CodecError> {
        let settings = AnalogSettings::from_byte(bytes[0])?;
        let mut modes = [AnalogMode::Disabled; AnalogPin::COUNT];
        for (slot, raw) in modes.iter_mut().zip(&bytes[1..]) {
            *slot = AnalogMode::try_from(*raw)?;
        }
        Ok(Self { settings, modes })
    }
}

impl Compose for AnalogConfiguration {
    fn compose(&self) -> Vec<u8> {
        std::iter::once(self.settings.to_byte())
            .chain(self.modes.iter().map(|mode| mode.as_raw()))
            .collect()
    }
}

/// Output value written to one analog pin.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct AnalogOutput {
    pub pin: AnalogPin,
    pub value: u16,
}

impl AnalogOutput {
    #[must_use]
    pub const fn new(pin: AnalogPin, value: u16) -> Self {
        Self { pin, value }
    }
}

impl CharacteristicValue for AnalogOutput {
    const BYTE_SIZE: usize = 3;

    fn decode(bytes: CheckedBytes<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            pin: AnalogPin::try_from(bytes[0])?,
            value: be_u16(&bytes[1..]).unwrap_or_default(),
        })
    }
}

impl Compose for AnalogOutput {
    fn compose(&self) -> Vec<u8> {
        let [high, low] = compose_u16(self.value);
        vec![self.pin.as_raw(), high, low]
    }
}

/// Latest samples of all analog pins; chunk `i` is pin `i`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct AnalogValues {
    values: [u16; AnalogPin::COUNT],
}

impl AnalogValues {
    #[must_use]
    pub const fn new(values: [u16; AnalogPin::COUNT]) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn value(&self, pin: AnalogPin) -> u16 {
        self.values[pin.index()]
    }
}

impl CharacteristicValue for AnalogValues {
    const BYTE_SIZE: usize = AnalogPin::COUNT * 2;

    fn decode(bytes: CheckedBytes<'_>) -> Result<Self, CodecError> {
        let mut values = [0; AnalogPin::COUNT];
        for (slot, pair) in values.iter_mut().zip(chunk(&bytes, 2)) {
            *slot = be_u16(&pair).unwrap_or_default();
        }
        Ok(Self { values })
    }
}

impl Compose for AnalogValues {
    fn compose(&self) -> Vec<u8> {
        self.values.iter().flat_map(|value| compose_u16(*value)).collect()
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
    fn configuration_leads_with_settings_byte() {
        let configuration = AnalogConfiguration::new(
            AnalogSettings::new(ReferenceVoltage::External, AdcResolution::Bits12),
            [AnalogMode::Input, AnalogMode::Output, AnalogMode::Disabled],
        );

        assert_eq!(vec![0x22, 0x01, 0x02, 0x00], configuration.compose());
        assert_eq!(
            Ok(configuration),
            AnalogConfiguration::parse(&configuration.compose())
        );
    }

    #[rstest]
    #[case(&[0x32, 0x00, 0x00, 0x00], CodecError::InvalidReferenceVoltage { value: 3 })]
    #[case(&[0x04, 0x00, 0x00, 0x00], CodecError::InvalidResolution { value: 4 })]
    #[case(&[0x00, 0x00, 0x03, 0x00], CodecError::InvalidAnalogMode { value: 3 })]
    fn configuration_rejects_unknown_fields(#[case] bytes: &[u8], #[case] expected: CodecError) {
        assert_eq!(Err(expected), AnalogConfiguration::parse(bytes));
    }

    #[test]
    fn values_decode_per_pin() {
        let values = AnalogValues::parse(&[0x00, 0x10, 0x0F, 0xFF, 0x3F, 0xFF])
            .expect("six-byte payload should decode");
        assert_eq!(0x0010, values.value(AnalogPin::Pin0));
        assert_eq!(0x0FFF, values.value(AnalogPin::Pin1));
        assert_eq!(0x3FFF, values.value(AnalogPin::Pin2));
    }

    #[test]
    fn output_rejects_unknown_pin() {
        assert_matches!(
            AnalogOutput::parse(&[0x03, 0x00, 0x00]),
            Err(CodecError::InvalidPinNumber { value: 3 })
        );
    }

    #[test]
    fn resolution_bounds_samples() {
        assert_eq!(255, AdcResolution::Bits8.max_value());
        assert_eq!(0x3FFF, AdcResolution::Bits14.max_value());
    }

    #[test]
    fn every_pin_mode_and_setting_survives_a_round_trip() {
        for pin in AnalogPin::iter() {
            for mode in AnalogMode::iter() {
                assert_round_trip(&AnalogPinConfig::new(pin, mode));
            }
            assert_round_trip(&AnalogOutput::new(pin, 0));
            assert_round_trip(&AnalogOutput::new(pin, u16::MAX));
        }
        for reference in ReferenceVoltage::iter() {
            for resolution in AdcResolution::iter() {
                let settings = AnalogSettings::new(reference, resolution);
                assert_round_trip(&settings);
                for mode in AnalogMode::iter() {
                    assert_round_trip(&AnalogConfiguration::new(
                        settings,
                        [mode; AnalogPin::COUNT],
                    ));
                }
                assert_round_trip(&AnalogValues::new([0, resolution.max_value(), 0x0102]));
            }
        }
    }
}
