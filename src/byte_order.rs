//! Helpers for explicit HCI byte-order conversions.
//!
//! Every multi-byte HCI field travels little-endian. These helpers keep that
//! convention in one place so header parsing and the outbound builders stay
//! explicit about wire endianness.

/// Serialise a `u16` in HCI byte order (little-endian).
///
/// # Examples
///
/// ```
/// use h4frame::byte_order::write_hci_u16;
///
/// assert_eq!(write_hci_u16(0x1234), [0x34, 0x12]);
/// ```
#[must_use]
pub fn write_hci_u16(value: u16) -> [u8; 2] { value.to_le_bytes() }

/// Parse an HCI-order `u16` from its on-wire representation.
///
/// # Examples
///
/// ```
/// use h4frame::byte_order::read_hci_u16;
///
/// assert_eq!(read_hci_u16([0x34, 0x12]), 0x1234);
/// ```
#[must_use]
pub fn read_hci_u16(bytes: [u8; 2]) -> u16 { u16::from_le_bytes(bytes) }

/// Read a little-endian length field of `width` bytes (1 or 2) from `bytes`
/// starting at `offset`.
///
/// Returns `None` when the slice is too short or `width` is unsupported.
///
/// # Examples
///
/// ```
/// use h4frame::byte_order::read_length_field;
///
/// assert_eq!(read_length_field(&[0x0e, 0x04], 1, 1), Some(4));
/// assert_eq!(read_length_field(&[0x01, 0x00, 0x02, 0x01], 2, 2), Some(0x0102));
/// assert_eq!(read_length_field(&[0x01], 1, 1), None);
/// ```
#[must_use]
pub fn read_length_field(bytes: &[u8], offset: usize, width: usize) -> Option<usize> {
    match width {
        1 => bytes.get(offset).copied().map(usize::from),
        2 => {
            let field = bytes.get(offset..offset + 2)?;
            Some(usize::from(read_hci_u16([field[0], field[1]])))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    //! Checks for HCI byte-order helpers.

    use rstest::rstest;

    use super::{read_hci_u16, read_length_field, write_hci_u16};

    #[test]
    fn u16_is_little_endian_on_the_wire() {
        assert_eq!(write_hci_u16(0x0c03), [0x03, 0x0c]);
        assert_eq!(read_hci_u16(write_hci_u16(0xbeef)), 0xbeef);
    }

    #[rstest]
    #[case::single_byte(&[0x3e, 0xff], 1, 1, Some(255))]
    #[case::two_bytes(&[0x01, 0x20, 0xfb, 0x03], 2, 2, Some(1019))]
    #[case::truncated(&[0x01, 0x20, 0xfb], 2, 2, None)]
    #[case::bad_width(&[0x01, 0x20, 0xfb], 0, 3, None)]
    fn length_field_reads(
        #[case] bytes: &[u8],
        #[case] offset: usize,
        #[case] width: usize,
        #[case] expected: Option<usize>,
    ) {
        assert_eq!(read_length_field(bytes, offset, width), expected);
    }
}
