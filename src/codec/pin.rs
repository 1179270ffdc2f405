use strum::IntoEnumIterator;

use super::CodecError;

wire_enum! {
    /// Digital I/O pin.
    pub enum GpioPin => InvalidPinNumber {
        Pin0 = 0,
        Pin1 = 1,
        Pin2 = 2,
        Pin3 = 3,
        Pin4 = 4,
        Pin5 = 5,
        Pin6 = 6,
        Pin7 = 7,
    }
}

wire_enum! {
    /// PWM-capable pin, shared by the software and hardware PWM blocks.
    pub enum PwmPin => InvalidPinNumber {
        Pin0 = 0,
        Pin1 = 1,
        Pin2 = 2,
        Pin3 = 3,
    }
}

wire_enum! {
    /// Analog input/output pin.
    pub enum AnalogPin => InvalidPinNumber {
        Pin0 = 0,
        Pin1 = 1,
        Pin2 = 2,
    }
}

macro_rules! pin_index {
    ($($pin:ty => $count:literal),+ $(,)?) => {
        $(
            impl $pin {
                /// Number of pins of this kind.
                pub const COUNT: usize = $count;

                /// Returns the position of this pin in multi-value payloads.
                #[must_use]
                pub const fn index(self) -> usize {
                    self.as_raw() as usize
                }

                /// Returns the pin at a payload position.
                ///
                /// # Errors
                ///
                /// Returns [`CodecError::InvalidPinNumber`] when `index` is out of range.
                pub fn from_index(index: usize) -> Result<Self, CodecError> {
                    let raw = u8::try_from(index)
                        .map_err(|_| CodecError::InvalidPinNumber { value: u8::MAX })?;
                    Self::try_from(raw)
                }

                /// Iterates all pins in payload order.
                pub fn all() -> impl Iterator<Item = Self> {
                    Self::iter()
                }
            }
        )+
    };
}

pin_index!(GpioPin => 8, PwmPin => 4, AnalogPin => 3);

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn index_round_trips_for_every_pin() {
        for (position, pin) in GpioPin::all().enumerate() {
            assert_eq!(position, pin.index());
            assert_eq!(Ok(pin), GpioPin::from_index(position));
        }
        assert_eq!(GpioPin::COUNT, GpioPin::all().count());
        assert_eq!(PwmPin::COUNT, PwmPin::all().count());
        assert_eq!(AnalogPin::COUNT, AnalogPin::all().count());
    }

    #[rstest]
    #[case(8)]
    #[case(0x0F)]
    #[case(0xFF)]
    fn out_of_range_gpio_pin_is_rejected(#[case] raw: u8) {
        assert_matches!(
            GpioPin::try_from(raw),
            Err(CodecError::InvalidPinNumber { value }) if value == raw
        );
    }

    #[test]
    fn out_of_range_analog_pin_is_rejected() {
        assert_matches!(
            AnalogPin::try_from(3),
            Err(CodecError::InvalidPinNumber { value: 3 })
        );
    }
}
