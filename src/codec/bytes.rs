//! Byte and bit helpers shared by every value codec.

/// High and low nibble of one byte.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Nibbles {
    /// Bits `7..4`, shifted down.
    pub high: u8,
    /// Bits `3..0`.
    pub low: u8,
}

impl Nibbles {
    /// Splits a byte into its two nibbles.
    ///
    /// ```
    /// use bleio::codec::Nibbles;
    ///
    /// let nibbles = Nibbles::split(0x4A);
    /// assert_eq!((0x4, 0xA), (nibbles.high, nibbles.low));
    /// ```
    #[must_use]
    pub const fn split(byte: u8) -> Self {
        Self {
            high: byte >> 4,
            low: byte & 0x0F,
        }
    }

    /// Joins two nibbles into one byte. Bits above the nibble width are dropped.
    #[must_use]
    pub const fn join(high: u8, low: u8) -> u8 {
        ((high & 0x0F) << 4) | (low & 0x0F)
    }
}

/// Returns the eight bits of `byte`, least significant first.
#[must_use]
pub fn bits(byte: u8) -> [bool; 8] {
    std::array::from_fn(|index| byte & (1 << index) != 0)
}

/// Packs up to eight flags into one byte, least significant first.
#[must_use]
pub fn pack_bits(flags: &[bool]) -> u8 {
    flags
        .iter()
        .take(8)
        .enumerate()
        .fold(0, |byte, (index, flag)| byte | (u8::from(*flag) << index))
}

/// Reads a big-endian `u16` from the first two bytes.
///
/// Callers validate lengths before decoding; a short slice yields `None`.
#[must_use]
pub fn be_u16(bytes: &[u8]) -> Option<u16> {
    let pair: [u8; 2] = bytes.get(..2)?.try_into().ok()?;
    Some(u16::from_be_bytes(pair))
}

/// Reads a big-endian `u32` from the first four bytes.
#[must_use]
pub fn be_u32(bytes: &[u8]) -> Option<u32> {
    let quad: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
    Some(u32::from_be_bytes(quad))
}

/// Wire order of a `u16`: the little-endian byte array, reversed.
#[must_use]
pub fn compose_u16(value: u16) -> [u8; 2] {
    let mut bytes = value.to_le_bytes();
    bytes.reverse();
    bytes
}

/// Wire order of a `u32`: the little-endian byte array, reversed.
#[must_use]
pub fn compose_u32(value: u32) -> [u8; 4] {
    let mut bytes = value.to_le_bytes();
    bytes.reverse();
    bytes
}

/// Splits `bytes` into groups of `size`. A trailing partial group is kept.
///
/// ```
/// use bleio::codec::chunk;
///
/// let groups = chunk(&[1, 2, 3, 4, 5], 2);
/// assert_eq!(vec![vec![1, 2], vec![3, 4], vec![5]], groups);
/// ```
#[must_use]
pub fn chunk(bytes: &[u8], size: usize) -> Vec<Vec<u8>> {
    if size == 0 {
        return Vec::new();
    }
    bytes.chunks(size).map(<[u8]>::to_vec).collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0x00, 0x0, 0x0)]
    #[case(0x11, 0x1, 0x1)]
    #[case(0xF0, 0xF, 0x0)]
    #[case(0x7C, 0x7, 0xC)]
    fn split_separates_nibbles(#[case] byte: u8, #[case] high: u8, #[case] low: u8) {
        assert_eq!(Nibbles { high, low }, Nibbles::split(byte));
        assert_eq!(byte, Nibbles::join(high, low));
    }

    #[test]
    fn join_masks_oversized_nibbles() {
        assert_eq!(0x12, Nibbles::join(0x21, 0x32));
    }

    #[test]
    fn bits_are_least_significant_first() {
        assert_eq!(
            [true, false, false, false, true, false, false, true],
            bits(0b1001_0001)
        );
        assert_eq!(0b1001_0001, pack_bits(&bits(0b1001_0001)));
    }

    #[test]
    fn big_endian_helpers_agree() {
        assert_eq!([0x12, 0x34], compose_u16(0x1234));
        assert_eq!(Some(0x1234), be_u16(&[0x12, 0x34]));
        assert_eq!([0x00, 0x01, 0xC2, 0x00], compose_u32(115_200));
        assert_eq!(Some(115_200), be_u32(&[0x00, 0x01, 0xC2, 0x00]));
        assert_eq!(None, be_u16(&[0x12]));
    }

    #[test]
    fn chunk_with_zero_size_is_empty() {
        assert!(chunk(&[1, 2, 3], 0).is_empty());
    }
}
