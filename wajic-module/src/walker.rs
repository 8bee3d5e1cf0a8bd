use wajic_binfmt::constants::{HEADER_LEN, WASM_MAGIC, WASM_VERSION};
use wajic_binfmt::{read_leb128_u32, read_utf8};
use wajic_error::{Error, Result};

use crate::entries::{ExportEntry, ImportEntry, ImportKind, Limits};

/// A single top-level section as seen by [`for_each_section`]: its id and
/// the byte range of its payload (after the id and length prefix).
#[derive(Debug, Clone, Copy)]
pub struct Section<'a> {
    pub id: u8,
    pub payload: &'a [u8],
    /// Offset of `payload[0]` within the original module bytes.
    pub payload_offset: usize,
}

/// Walk the top-level sections of `module`, starting after the 8-byte
/// header, invoking `visitor` on each.
///
/// Halts cleanly at the end of the bytes; returns a format error if a
/// section's declared length would run past the end of the module, or if
/// the header doesn't match.
pub fn for_each_section<'a>(
    module: &'a [u8],
    mut visitor: impl FnMut(Section<'a>) -> Result<()>,
) -> Result<()> {
    verify_header(module)?;

    let mut offset = HEADER_LEN;
    while offset < module.len() {
        let id = module[offset];
        let len_pos = offset + 1;
        let (payload_len, len_size) = read_leb128_u32(module, len_pos)?;
        let payload_start = len_pos + len_size;
        let payload_end = payload_start
            .checked_add(payload_len as usize)
            .filter(|&e| e <= module.len())
            .ok_or_else(|| {
                Error::format_at(offset, "section payload overruns the module")
            })?;

        visitor(Section { id, payload: &module[payload_start..payload_end], payload_offset: payload_start })?;

        offset = payload_end;
    }
    Ok(())
}

fn verify_header(module: &[u8]) -> Result<()> {
    if module.len() < HEADER_LEN {
        return Err(Error::format_at(0, "module shorter than the 8-byte header"));
    }
    if module[0..4] != WASM_MAGIC {
        return Err(Error::format_at(0, "invalid WebAssembly magic bytes"));
    }
    if module[4..8] != WASM_VERSION {
        return Err(Error::format_at(4, "unsupported WebAssembly version"));
    }
    Ok(())
}

fn read_limits(bytes: &[u8], pos: usize) -> Result<(Limits, usize)> {
    let flag = *bytes.get(pos).ok_or_else(|| Error::format_at(pos, "truncated limits"))?;
    let (initial, n1) = read_leb128_u32(bytes, pos + 1)?;
    if flag & 0x01 != 0 {
        let (maximum, n2) = read_leb128_u32(bytes, pos + 1 + n1)?;
        Ok((Limits { initial, maximum: Some(maximum) }, 1 + n1 + n2))
    } else {
        Ok((Limits { initial, maximum: None }, 1 + n1))
    }
}

fn read_name(bytes: &[u8], pos: usize) -> Result<(String, usize)> {
    let (len, len_size) = read_leb128_u32(bytes, pos)?;
    let start = pos + len_size;
    let name = read_utf8(bytes, start, len as usize)?;
    Ok((name, len_size + len as usize))
}

/// Parse the entries of an import section payload.
pub fn parse_import_section(payload: &[u8]) -> Result<Vec<ImportEntry>> {
    let mut pos = 0;
    let (count, n) = read_leb128_u32(payload, pos)?;
    pos += n;

    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (module, n) = read_name(payload, pos)?;
        pos += n;

        let (field, n) = read_name(payload, pos)?;
        pos += n;

        let kind_tag = *payload.get(pos).ok_or_else(|| Error::format_at(pos, "truncated import kind"))?;
        pos += 1;

        let kind = match kind_tag {
            wajic_binfmt::constants::KIND_FUNCTION => {
                let (type_idx, n) = read_leb128_u32(payload, pos)?;
                pos += n;
                ImportKind::Function(type_idx)
            }
            wajic_binfmt::constants::KIND_TABLE => {
                let elem_type = *payload.get(pos).ok_or_else(|| Error::format_at(pos, "truncated table import"))?;
                pos += 1;
                let (limits, n) = read_limits(payload, pos)?;
                pos += n;
                ImportKind::Table { elem_type, limits }
            }
            wajic_binfmt::constants::KIND_MEMORY => {
                let (limits, n) = read_limits(payload, pos)?;
                pos += n;
                ImportKind::Memory(limits)
            }
            wajic_binfmt::constants::KIND_GLOBAL => {
                let valtype = *payload.get(pos).ok_or_else(|| Error::format_at(pos, "truncated global import"))?;
                pos += 1;
                let mut_byte = *payload.get(pos).ok_or_else(|| Error::format_at(pos, "truncated global import"))?;
                pos += 1;
                ImportKind::Global { valtype, mutable: mut_byte != 0 }
            }
            other => return Err(Error::format_at(pos, format!("invalid import kind tag 0x{other:02x}"))),
        };

        out.push(ImportEntry { module, field, kind });
    }
    Ok(out)
}

/// Parse the entries of an export section payload.
pub fn parse_export_section(payload: &[u8]) -> Result<Vec<ExportEntry>> {
    let mut pos = 0;
    let (count, n) = read_leb128_u32(payload, pos)?;
    pos += n;

    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (field, n) = read_name(payload, pos)?;
        pos += n;
        let kind = *payload.get(pos).ok_or_else(|| Error::format_at(pos, "truncated export"))?;
        pos += 1;
        let (index, n) = read_leb128_u32(payload, pos)?;
        pos += n;
        out.push(ExportEntry { field, kind, index });
    }
    Ok(out)
}

/// Parse the entries of a memory section payload, returning each defined
/// memory's initial page count.
pub fn parse_memory_section(payload: &[u8]) -> Result<Vec<u32>> {
    let mut pos = 0;
    let (count, n) = read_leb128_u32(payload, pos)?;
    pos += n;

    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (limits, n) = read_limits(payload, pos)?;
        pos += n;
        out.push(limits.initial);
    }
    Ok(out)
}

/// Evaluate a constant init expression, accepting only `i32.const N end`
/// — the only form a data/element offset needs in this tool's scope.
pub fn get_init_expr(bytes: &[u8], pos: usize) -> Result<(i32, usize)> {
    use wajic_binfmt::constants::{END_OPCODE, I32_CONST_OPCODE};

    let opcode = *bytes.get(pos).ok_or_else(|| Error::format_at(pos, "truncated init expr"))?;
    if opcode != I32_CONST_OPCODE {
        return Err(Error::format_at(pos, "unsupported init expression (only i32.const is understood)"));
    }
    let (value, n) = wajic_binfmt::read_leb128_u32(bytes, pos + 1)?;
    let end_pos = pos + 1 + n;
    let end = *bytes.get(end_pos).ok_or_else(|| Error::format_at(end_pos, "truncated init expr"))?;
    if end != END_OPCODE {
        return Err(Error::format_at(end_pos, "init expression missing end opcode"));
    }
    Ok((value as i32, end_pos + 1 - pos))
}
