//! Embedded-module encodings.
//!
//! Both schemes are text-safe binary-to-text codes used when the module is
//! inlined into the loader rather than fetched as a sibling file. The Rust
//! side here is the *encoder* (run once, at build time, over the module
//! bytes); the *decoder* is JS text emitted into the loader so the browser
//! can reconstruct the byte array at load time.

use wajic_error::{codes, Error, ErrorCategory, Result};

/// Which inline encoding a module was packed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedEncoding {
    /// Base-62, 4 characters per 3 bytes.
    W64,
    /// LZ-style byte RLE, then base-85 packed.
    Rle85,
}

const W64_ALPHABET: [u8; 62] = build_w64_alphabet();
const B85_ALPHABET: [u8; 85] = build_b85_alphabet();

const fn build_w64_alphabet() -> [u8; 62] {
    // [58..92) has 34 code points, then [93..122) contributes the
    // remaining 28 to reach 62 total, skipping the backslash at 92.
    let mut out = [0u8; 62];
    let mut i = 0usize;
    let mut c = 58u8;
    while c < 92 {
        out[i] = c;
        i += 1;
        c += 1;
    }
    c = 93;
    while i < 62 {
        out[i] = c;
        i += 1;
        c += 1;
    }
    out
}

const fn build_b85_alphabet() -> [u8; 85] {
    // [41..92) contributes 51 code points, [93..126] the remaining 34,
    // skipping the backslash at 92.
    let mut out = [0u8; 85];
    let mut i = 0usize;
    let mut c = 41u8;
    while c < 92 {
        out[i] = c;
        i += 1;
        c += 1;
    }
    c = 93;
    while i < 85 {
        out[i] = c;
        i += 1;
        c += 1;
    }
    out
}

fn w64_digit(byte: u8) -> Result<u32> {
    W64_ALPHABET
        .iter()
        .position(|&b| b == byte)
        .map(|p| p as u32)
        .ok_or_else(|| Error::new(ErrorCategory::Format, codes::FORMAT_ERROR, "invalid W64 digit"))
}

/// Encode bytes as W64: 3 input bytes become 4 output characters, with a
/// trailing `1`/`2` digit marking 1 or 2 bytes of zero padding on the final
/// group.
#[must_use]
pub fn encode_w64(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 4 / 3 + 1);
    let mut chunks = data.chunks_exact(3);
    for chunk in &mut chunks {
        encode_w64_group(chunk[0], chunk[1], chunk[2], &mut out);
    }
    let rest = chunks.remainder();
    match rest.len() {
        0 => {}
        1 => {
            encode_w64_group(rest[0], 0, 0, &mut out);
            out.push('1');
        }
        2 => {
            encode_w64_group(rest[0], rest[1], 0, &mut out);
            out.push('2');
        }
        _ => unreachable!("chunks_exact(3) remainder is always < 3"),
    }
    out
}

fn encode_w64_group(b0: u8, b1: u8, b2: u8, out: &mut String) {
    let value = (u32::from(b0) << 16) | (u32::from(b1) << 8) | u32::from(b2);
    let mut digits = [0u8; 4];
    let mut v = value;
    for d in digits.iter_mut().rev() {
        *d = W64_ALPHABET[(v % 62) as usize];
        v /= 62;
    }
    out.push_str(std::str::from_utf8(&digits).expect("alphabet is ASCII"));
}

/// Decode a W64-encoded string back to bytes.
pub fn decode_w64(s: &str) -> Result<Vec<u8>> {
    let bytes = s.as_bytes();
    let (padding, digits) = match bytes.last() {
        Some(b'1') => (1usize, &bytes[..bytes.len() - 1]),
        Some(b'2') => (2usize, &bytes[..bytes.len() - 1]),
        _ => (0, bytes),
    };
    if digits.len() % 4 != 0 {
        return Err(Error::new(ErrorCategory::Format, codes::FORMAT_ERROR, "W64 stream length is not a multiple of 4"));
    }
    let mut out = Vec::with_capacity(digits.len() / 4 * 3);
    for group in digits.chunks_exact(4) {
        let mut value = 0u32;
        for &d in group {
            value = value * 62 + w64_digit(d)?;
        }
        out.push(((value >> 16) & 0xFF) as u8);
        out.push(((value >> 8) & 0xFF) as u8);
        out.push((value & 0xFF) as u8);
    }
    out.truncate(out.len() - padding);
    Ok(out)
}

// --- RLE85 ---

const MIN_MATCH: usize = 3;
const MAX_SHORT_MATCH: usize = 17;
const MAX_LONG_MATCH: usize = 273;
const MAX_DISTANCE: usize = 4096;
const WINDOW_SEARCH_CAP: usize = 2048;

enum Token {
    Literal(u8),
    BackRef { distance: usize, length: usize },
}

fn rle_compress(data: &[u8]) -> Vec<u8> {
    let tokens = find_tokens(data);
    let mut out = Vec::new();
    for group in tokens.chunks(8) {
        let mut tag = 0u8;
        for (i, token) in group.iter().enumerate() {
            if matches!(token, Token::BackRef { .. }) {
                tag |= 1 << i;
            }
        }
        out.push(tag);
        for token in group {
            match token {
                Token::Literal(b) => out.push(*b),
                Token::BackRef { distance, length } => encode_backref(*distance, *length, &mut out),
            }
        }
    }
    out
}

fn encode_backref(distance: usize, length: usize, out: &mut Vec<u8>) {
    let dist_minus1 = (distance - 1) as u32;
    if length <= MAX_SHORT_MATCH {
        let len_nibble = (length - MIN_MATCH) as u32;
        out.push((dist_minus1 >> 4) as u8);
        out.push((((dist_minus1 & 0xF) << 4) | len_nibble) as u8);
    } else {
        out.push((dist_minus1 >> 4) as u8);
        out.push((((dist_minus1 & 0xF) << 4) | 0xF) as u8);
        out.push((length - (MAX_SHORT_MATCH + 1)) as u8);
    }
}

fn find_tokens(data: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut i = 0usize;
    while i < data.len() {
        let window_start = i.saturating_sub(MAX_DISTANCE).max(i.saturating_sub(WINDOW_SEARCH_CAP));
        let mut best_len = 0usize;
        let mut best_dist = 0usize;
        let mut j = window_start;
        while j < i {
            let max_len = (data.len() - i).min(MAX_LONG_MATCH);
            let mut len = 0usize;
            while len < max_len && data[j + len] == data[i + len] {
                len += 1;
            }
            if len > best_len {
                best_len = len;
                best_dist = i - j;
            }
            j += 1;
        }
        if best_len >= MIN_MATCH {
            tokens.push(Token::BackRef { distance: best_dist, length: best_len });
            i += best_len;
        } else {
            tokens.push(Token::Literal(data[i]));
            i += 1;
        }
    }
    tokens
}

fn rle_decompress(rle: &[u8], total_len: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(total_len);
    let mut pos = 0usize;
    'outer: while pos < rle.len() && out.len() < total_len {
        let tag = rle[pos];
        pos += 1;
        for bit in 0..8 {
            if out.len() >= total_len {
                break 'outer;
            }
            if pos >= rle.len() {
                break 'outer;
            }
            if tag & (1 << bit) == 0 {
                out.push(rle[pos]);
                pos += 1;
            } else {
                let b0 = rle[pos];
                let b1 = rle[pos + 1];
                pos += 2;
                let dist_minus1 = (u32::from(b0) << 4) | u32::from(b1 >> 4);
                let len_nibble = b1 & 0xF;
                let length = if len_nibble == 0xF {
                    let extra = rle[pos];
                    pos += 1;
                    extra as usize + (MAX_SHORT_MATCH + 1)
                } else {
                    len_nibble as usize + MIN_MATCH
                };
                let distance = dist_minus1 as usize + 1;
                if distance > out.len() {
                    return Err(Error::new(
                        ErrorCategory::Format,
                        codes::FORMAT_ERROR,
                        "RLE85 back-reference distance exceeds decoded length so far",
                    ));
                }
                for _ in 0..length {
                    let b = out[out.len() - distance];
                    out.push(b);
                }
            }
        }
    }
    Ok(out)
}

fn base85_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 5 / 4 + 1);
    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        encode_b85_group(chunk.try_into().expect("chunks_exact(4)"), 5, &mut out);
    }
    let rest = chunks.remainder();
    if !rest.is_empty() {
        let mut padded = [0u8; 4];
        padded[..rest.len()].copy_from_slice(rest);
        encode_b85_group(padded, rest.len() + 1, &mut out);
    }
    out
}

fn encode_b85_group(bytes: [u8; 4], emit_chars: usize, out: &mut String) {
    let mut value = u32::from_be_bytes(bytes);
    let mut digits = [0u8; 5];
    for d in digits.iter_mut().rev() {
        *d = B85_ALPHABET[(value % 85) as usize];
        value /= 85;
    }
    out.push_str(std::str::from_utf8(&digits[..emit_chars]).expect("alphabet is ASCII"));
}

fn base85_decode(s: &str) -> Result<Vec<u8>> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() * 4 / 5);
    let mut chunks = bytes.chunks_exact(5);
    for chunk in &mut chunks {
        out.extend_from_slice(&decode_b85_group(chunk, 4)?);
    }
    let rest = chunks.remainder();
    if !rest.is_empty() {
        let mut padded = [B85_ALPHABET[84]; 5];
        padded[..rest.len()].copy_from_slice(rest);
        let decoded = decode_b85_group(&padded, rest.len() - 1)?;
        out.extend_from_slice(&decoded);
    }
    Ok(out)
}

fn decode_b85_group(chars: &[u8], keep: usize) -> Result<[u8; 4]> {
    let mut value: u32 = 0;
    for &c in chars {
        let digit = B85_ALPHABET.iter().position(|&a| a == c).ok_or_else(|| {
            Error::new(ErrorCategory::Format, codes::FORMAT_ERROR, "invalid base-85 digit")
        })?;
        value = value.wrapping_mul(85).wrapping_add(digit as u32);
    }
    let all = value.to_be_bytes();
    let mut result = [0u8; 4];
    result[..keep].copy_from_slice(&all[..keep]);
    Ok(result)
}

/// Encode `data` with RLE85: a byte-level LZ pass followed by base-85
/// packing, with the decoded total length stamped into the first 4 bytes
/// of the pre-packed stream.
#[must_use]
pub fn encode_rle85(data: &[u8]) -> String {
    let rle = rle_compress(data);
    let mut packed = Vec::with_capacity(rle.len() + 4);
    packed.extend_from_slice(&(data.len() as u32).to_le_bytes());
    packed.extend_from_slice(&rle);
    base85_encode(&packed)
}

/// Decode an RLE85-encoded string back to the original bytes.
pub fn decode_rle85(s: &str) -> Result<Vec<u8>> {
    let packed = base85_decode(s)?;
    if packed.len() < 4 {
        return Err(Error::new(ErrorCategory::Format, codes::FORMAT_ERROR, "RLE85 stream missing length header"));
    }
    let total_len = u32::from_le_bytes(packed[..4].try_into().expect("checked len")) as usize;
    rle_decompress(&packed[4..], total_len)
}

/// Emit the JS decoder for the chosen inline encoding and the encoded
/// literal; returns the name of the local variable holding the decoded
/// `Uint8Array`.
pub fn emit_inline_decoder(out: &mut String, bytes: &[u8], encoding: EmbedEncoding) -> String {
    match encoding {
        EmbedEncoding::W64 => {
            let literal = encode_w64(bytes);
            out.push_str(&format!("var W64_DATA = {literal:?};\n"));
            out.push_str(
                "function decodeW64(s) {\n\
                 \x20 var alphabet = '';\n\
                 \x20 for (var c = 58; c < 92; c++) alphabet += String.fromCharCode(c);\n\
                 \x20 for (var c = 93; alphabet.length < 62; c++) alphabet += String.fromCharCode(c);\n\
                 \x20 var pad = 0, digits = s;\n\
                 \x20 var tail = s.charAt(s.length - 1);\n\
                 \x20 if (tail === '1' || tail === '2') { pad = +tail; digits = s.slice(0, -1); }\n\
                 \x20 var out = new Uint8Array(digits.length / 4 * 3 - pad);\n\
                 \x20 var oi = 0;\n\
                 \x20 for (var i = 0; i < digits.length; i += 4) {\n\
                 \x20\x20  var v = 0;\n\
                 \x20\x20  for (var k = 0; k < 4; k++) { v = v * 62 + alphabet.indexOf(digits[i + k]); }\n\
                 \x20\x20  if (oi < out.length) out[oi++] = (v >> 16) & 0xFF;\n\
                 \x20\x20  if (oi < out.length) out[oi++] = (v >> 8) & 0xFF;\n\
                 \x20\x20  if (oi < out.length) out[oi++] = v & 0xFF;\n\
                 \x20 }\n\
                 \x20 return out;\n\
                 }\n\
                 var wasmBytes = decodeW64(W64_DATA);\n",
            );
        }
        EmbedEncoding::Rle85 => {
            let literal = encode_rle85(bytes);
            out.push_str(&format!("var RLE85_DATA = {literal:?};\n"));
            out.push_str(
                "function decodeRle85(s) {\n\
                 \x20 var alphabet = '';\n\
                 \x20 for (var c = 41; c < 92; c++) alphabet += String.fromCharCode(c);\n\
                 \x20 for (var c = 93; alphabet.length < 85; c++) alphabet += String.fromCharCode(c);\n\
                 \x20 var packed = [];\n\
                 \x20 for (var i = 0; i < s.length; i += 5) {\n\
                 \x20\x20  var group = s.slice(i, i + 5);\n\
                 \x20\x20  var keep = group.length - 1;\n\
                 \x20\x20  while (group.length < 5) group += alphabet.charAt(84);\n\
                 \x20\x20  var v = 0;\n\
                 \x20\x20  for (var k = 0; k < 5; k++) { v = (v * 85 + alphabet.indexOf(group[k])) >>> 0; }\n\
                 \x20\x20  packed.push((v >>> 24) & 0xFF, (v >>> 16) & 0xFF, (v >>> 8) & 0xFF, v & 0xFF);\n\
                 \x20 }\n\
                 \x20 var totalLen = packed[0] | (packed[1] << 8) | (packed[2] << 16) | (packed[3] << 24);\n\
                 \x20 var out = new Uint8Array(totalLen);\n\
                 \x20 var oi = 0, pi = 4;\n\
                 \x20 while (oi < totalLen) {\n\
                 \x20\x20  var tag = packed[pi++];\n\
                 \x20\x20  for (var bit = 0; bit < 8 && oi < totalLen; bit++) {\n\
                 \x20\x20\x20  if (!(tag & (1 << bit))) { out[oi++] = packed[pi++]; continue; }\n\
                 \x20\x20\x20  var b0 = packed[pi], b1 = packed[pi + 1]; pi += 2;\n\
                 \x20\x20\x20  var distMinus1 = (b0 << 4) | (b1 >> 4);\n\
                 \x20\x20\x20  var lenNibble = b1 & 0xF;\n\
                 \x20\x20\x20  var length = lenNibble === 0xF ? (packed[pi++] + 18) : (lenNibble + 3);\n\
                 \x20\x20\x20  var distance = distMinus1 + 1;\n\
                 \x20\x20\x20  for (var n = 0; n < length; n++) { out[oi] = out[oi - distance]; oi++; }\n\
                 \x20\x20  }\n\
                 \x20 }\n\
                 \x20 return out;\n\
                 }\n\
                 var wasmBytes = decodeRle85(RLE85_DATA);\n",
            );
        }
    }
    "wasmBytes".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn w64_round_trips_arbitrary_lengths() {
        for len in 0..20 {
            let data: Vec<u8> = (0..len).map(|i| (i * 37 + 5) as u8).collect();
            let encoded = encode_w64(&data);
            assert_eq!(decode_w64(&encoded).unwrap(), data);
        }
    }

    #[test]
    fn rle85_round_trips_repetitive_data() {
        let data = b"abcabcabcabcabcabcabc xyz abcabcabcabc".to_vec();
        let encoded = encode_rle85(&data);
        assert_eq!(decode_rle85(&encoded).unwrap(), data);
    }

    #[test]
    fn rle85_round_trips_non_repetitive_data() {
        let data: Vec<u8> = (0..97).map(|i| (i * 131 + 7) as u8).collect();
        let encoded = encode_rle85(&data);
        assert_eq!(decode_rle85(&encoded).unwrap(), data);
    }

    #[test]
    fn rle85_round_trips_empty_input() {
        let encoded = encode_rle85(&[]);
        assert_eq!(decode_rle85(&encoded).unwrap(), Vec::<u8>::new());
    }
}
