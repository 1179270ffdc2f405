/// Renders bytes as space-separated uppercase pairs for logs and terminal output.
pub(crate) fn format_hex(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "<empty>".to_string();
    }

    bytes
        .chunks(1)
        .map(hex::encode_upper)
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn format_rssi(rssi: Option<i16>) -> String {
    rssi.map_or_else(|| "-".to_string(), |value| format!("{value} dBm"))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(&[], "<empty>")]
    #[case(&[0x01, 0x11], "01 11")]
    #[case(&[0x05, 0x00, 0xA1, 0xFF], "05 00 A1 FF")]
    fn format_hex_renders_uppercase_pairs(#[case] bytes: &[u8], #[case] expected: &str) {
        assert_eq!(expected, format_hex(bytes));
    }

    #[test]
    fn format_rssi_marks_unknown_values() {
        assert_eq!("-", format_rssi(None));
        assert_eq!("-43 dBm", format_rssi(Some(-43)));
    }
}
