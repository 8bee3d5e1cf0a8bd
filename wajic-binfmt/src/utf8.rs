use wajic_error::{Error, Result};

/// Decode `len` bytes of UTF-8 starting at `start`.
///
/// Tolerant of legacy 1-6 byte sequences the strict `str::from_utf8` would
/// reject — WebAssembly name strings predate the 4-byte cap Unicode
/// settled on, and some producers still emit the wider forms.
pub fn read_utf8(bytes: &[u8], start: usize, len: usize) -> Result<String> {
    let end = start
        .checked_add(len)
        .filter(|&e| e <= bytes.len())
        .ok_or_else(|| Error::format_at(start, "string exceeds buffer bounds"))?;
    let slice = &bytes[start..end];

    match std::str::from_utf8(slice) {
        Ok(s) => Ok(s.to_string()),
        Err(_) => decode_legacy_utf8(slice).ok_or_else(|| Error::format_at(start, "invalid UTF-8 in name")),
    }
}

/// Encode a string to its UTF-8 byte representation.
#[must_use]
pub fn write_utf8(s: &str) -> Vec<u8> {
    s.as_bytes().to_vec()
}

/// Decode a byte slice that may contain legacy 5/6-byte UTF-8 sequences or
/// raw surrogate halves, reassembling surrogate pairs into a single
/// codepoint as it goes.
fn decode_legacy_utf8(bytes: &[u8]) -> Option<String> {
    let mut out = String::new();
    let mut i = 0;
    let mut pending_high_surrogate: Option<u32> = None;

    while i < bytes.len() {
        let b0 = bytes[i];
        let (cp, width) = if b0 < 0x80 {
            (u32::from(b0), 1)
        } else if b0 & 0xE0 == 0xC0 && i + 1 < bytes.len() {
            (decode_continuation(b0 & 0x1F, &bytes[i + 1..i + 2])?, 2)
        } else if b0 & 0xF0 == 0xE0 && i + 2 < bytes.len() {
            (decode_continuation(b0 & 0x0F, &bytes[i + 1..i + 3])?, 3)
        } else if b0 & 0xF8 == 0xF0 && i + 3 < bytes.len() {
            (decode_continuation(b0 & 0x07, &bytes[i + 1..i + 4])?, 4)
        } else if b0 & 0xFC == 0xF8 && i + 4 < bytes.len() {
            (decode_continuation(b0 & 0x03, &bytes[i + 1..i + 5])?, 5)
        } else if b0 & 0xFE == 0xFC && i + 5 < bytes.len() {
            (decode_continuation(b0 & 0x01, &bytes[i + 1..i + 6])?, 6)
        } else {
            return None;
        };
        i += width;

        if (0xD800..0xDC00).contains(&cp) {
            pending_high_surrogate = Some(cp);
            continue;
        }
        if (0xDC00..0xE000).contains(&cp) {
            let high = pending_high_surrogate.take()?;
            let combined = 0x10000 + ((high - 0xD800) << 10) + (cp - 0xDC00);
            out.push(char::from_u32(combined)?);
            continue;
        }
        out.push(char::from_u32(cp)?);
    }

    Some(out)
}

fn decode_continuation(lead_bits: u8, continuations: &[u8]) -> Option<u32> {
    let mut cp = u32::from(lead_bits);
    for &b in continuations {
        if b & 0xC0 != 0x80 {
            return None;
        }
        cp = (cp << 6) | u32::from(b & 0x3F);
    }
    Some(cp)
}
