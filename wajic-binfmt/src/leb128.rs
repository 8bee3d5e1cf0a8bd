use wajic_error::{codes, Error, Result};

/// Read an unsigned LEB128 integer from `bytes` starting at `pos`.
///
/// Returns the decoded value and the number of bytes consumed. Bounded to
/// 32 bits: a longer encoding is a format error, not merely
/// truncated to `u32`.
pub fn read_leb128_u32(bytes: &[u8], pos: usize) -> Result<(u32, usize)> {
    let mut result: u32 = 0;
    let mut shift: u32 = 0;
    let mut offset = 0usize;

    loop {
        let byte = *bytes
            .get(pos + offset)
            .ok_or_else(|| Error::format_at(pos, "LEB128 exceeds buffer bounds"))?;
        offset += 1;

        if shift >= 32 && (byte & 0x7F) != 0 {
            return Err(Error::new(
                wajic_error::ErrorCategory::Format,
                codes::LEB128_OVERFLOW,
                "LEB128 integer exceeds 32 bits",
            )
            .at_offset(pos));
        }
        if shift < 32 {
            result |= u32::from(byte & 0x7F) << shift;
        }
        shift += 7;

        if byte & 0x80 == 0 {
            break;
        }
    }

    Ok((result, offset))
}

/// The number of bytes `write_leb128` would emit for `value` (1..=5).
#[must_use]
pub fn leb128_byte_length(value: u32) -> usize {
    let mut n = value;
    let mut len = 1;
    while n >= 0x80 {
        n >>= 7;
        len += 1;
    }
    len
}

/// Append the LEB128 encoding of `value` to `buf`.
pub fn write_leb128(buf: &mut Vec<u8>, value: u32) {
    let mut n = value;
    loop {
        let mut byte = (n & 0x7F) as u8;
        n >>= 7;
        if n != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if n == 0 {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_small_values() {
        for v in [0u32, 1, 63, 64, 127, 128, 300, 16384, u32::MAX] {
            let mut buf = Vec::new();
            write_leb128(&mut buf, v);
            assert_eq!(buf.len(), leb128_byte_length(v));
            let (decoded, consumed) = read_leb128_u32(&buf, 0).unwrap();
            assert_eq!(decoded, v);
            assert_eq!(consumed, buf.len());
        }
    }

    #[test]
    fn rejects_truncated_input() {
        let err = read_leb128_u32(&[0x80], 0).unwrap_err();
        assert_eq!(err.category(), wajic_error::ErrorCategory::Format);
    }

    #[test]
    fn rejects_overlong_encoding() {
        // Six continuation bytes, more than 32 bits can hold.
        let bytes = [0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        let err = read_leb128_u32(&bytes, 0).unwrap_err();
        assert_eq!(err.code(), codes::LEB128_OVERFLOW);
    }

    #[test]
    fn reads_at_nonzero_offset() {
        let mut buf = vec![0xFF, 0xFF];
        write_leb128(&mut buf, 300);
        let (v, consumed) = read_leb128_u32(&buf, 2).unwrap();
        assert_eq!(v, 300);
        assert_eq!(consumed, 2);
    }

    proptest::proptest! {
        #[test]
        fn round_trips_any_u32(v: u32) {
            let mut buf = Vec::new();
            write_leb128(&mut buf, v);
            proptest::prop_assert_eq!(buf.len(), leb128_byte_length(v));
            let (decoded, consumed) = read_leb128_u32(&buf, 0).unwrap();
            proptest::prop_assert_eq!(decoded, v);
            proptest::prop_assert_eq!(consumed, buf.len());
        }

        #[test]
        fn round_trips_at_any_offset(v: u32, prefix in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..8)) {
            let mut buf = prefix.clone();
            write_leb128(&mut buf, v);
            let (decoded, consumed) = read_leb128_u32(&buf, prefix.len()).unwrap();
            proptest::prop_assert_eq!(decoded, v);
            proptest::prop_assert_eq!(consumed, buf.len() - prefix.len());
        }
    }
}
