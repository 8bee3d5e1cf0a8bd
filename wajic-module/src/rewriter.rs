use wajic_binfmt::constants::{CUSTOM_SECTION_ID, EXPORT_SECTION_ID, IMPORT_SECTION_ID};
use wajic_binfmt::{leb128_byte_length, read_leb128_u32, read_utf8, write_leb128};
use wajic_error::{Error, Result};

use crate::entries::{ImportEntry, ImportKind};
use crate::walker::for_each_section;

/// What [`replace_import_field`]'s callback decides for one import entry.
#[derive(Debug, Clone)]
pub enum FieldAction {
    /// Leave this import's field name untouched.
    Keep,
    /// Replace the field name with these raw bytes (not length-prefixed;
    /// the rewriter adds the length prefix).
    Replace(Vec<u8>),
}

struct RawImport<'a> {
    entry: ImportEntry,
    module_name_bytes: &'a [u8],
    field_name_bytes: &'a [u8],
    descriptor_bytes: &'a [u8],
}

fn read_raw_name(bytes: &[u8], pos: usize) -> Result<(&[u8], usize)> {
    let (len, len_size) = read_leb128_u32(bytes, pos)?;
    let total = len_size + len as usize;
    let end = pos
        .checked_add(total)
        .filter(|&e| e <= bytes.len())
        .ok_or_else(|| Error::format_at(pos, "name exceeds buffer bounds"))?;
    Ok((&bytes[pos..end], total))
}

/// Byte width of an import's kind-specific descriptor (kind tag plus the
/// fixed-width fields that follow), recomputed from the parsed value so
/// `ImportEntry` can stay a plain value type instead of also carrying its
/// own raw byte range.
fn descriptor_width(kind: &ImportKind) -> usize {
    fn limits_width(limits: &crate::entries::Limits) -> usize {
        let base = 1 + leb128_byte_length(limits.initial); // flag byte + initial
        base + limits.maximum.map_or(0, leb128_byte_length)
    }
    match kind {
        ImportKind::Function(type_idx) => leb128_byte_length(*type_idx),
        ImportKind::Table { limits, .. } => 1 + limits_width(limits), // elem_type byte + limits
        ImportKind::Memory(limits) => limits_width(limits),
        ImportKind::Global { .. } => 2, // valtype byte + mutability byte
    }
}

fn raw_import_entries(payload: &[u8]) -> Result<Vec<RawImport<'_>>> {
    let entries = crate::walker::parse_import_section(payload)?;
    let (_count, mut pos) = {
        let (count, n) = read_leb128_u32(payload, 0)?;
        (count, n)
    };

    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        let (module_name_bytes, module_len) = read_raw_name(payload, pos)?;
        let field_pos = pos + module_len;
        let (field_name_bytes, field_len) = read_raw_name(payload, field_pos)?;
        let descriptor_start = field_pos + field_len;
        let descriptor_len = 1 + descriptor_width(&entry.kind);
        let descriptor_end = descriptor_start + descriptor_len;
        let descriptor_bytes = payload
            .get(descriptor_start..descriptor_end)
            .ok_or_else(|| Error::format_at(descriptor_start, "truncated import descriptor"))?;

        out.push(RawImport { entry, module_name_bytes, field_name_bytes, descriptor_bytes });
        pos = descriptor_end;
    }
    Ok(out)
}

fn section_header_len(payload_len: usize) -> usize {
    1 + leb128_byte_length(payload_len as u32)
}

/// Walk the import section, letting `callback` replace individual field
/// names, and return the rewritten module.
///
/// Pre-section bytes are copied verbatim, the section header is re-emitted
/// with a recomputed length, and each entry's module name and kind
/// descriptor pass through unchanged — only the field name may grow or
/// shrink.
pub fn replace_import_field(
    module: &[u8],
    mut callback: impl FnMut(&ImportEntry) -> FieldAction,
) -> Result<Vec<u8>> {
    let mut found = None;

    for_each_section(module, |section| {
        if section.id == IMPORT_SECTION_ID && found.is_none() {
            let header_start = section.payload_offset - section_header_len(section.payload.len());
            let payload_end = section.payload_offset + section.payload.len();
            found = Some((header_start, section.payload_offset, payload_end));
        }
        Ok(())
    })?;

    let Some((header_start, payload_start, payload_end)) = found else {
        return Ok(module.to_vec());
    };

    let payload = &module[payload_start..payload_end];
    let raw_entries = raw_import_entries(payload)?;

    let mut new_payload = Vec::new();
    write_leb128(&mut new_payload, raw_entries.len() as u32);
    for raw in &raw_entries {
        new_payload.extend_from_slice(raw.module_name_bytes);
        match callback(&raw.entry) {
            FieldAction::Keep => new_payload.extend_from_slice(raw.field_name_bytes),
            FieldAction::Replace(new_field) => {
                write_leb128(&mut new_payload, new_field.len() as u32);
                new_payload.extend_from_slice(&new_field);
            }
        }
        new_payload.extend_from_slice(raw.descriptor_bytes);
    }

    let mut output = Vec::with_capacity(module.len());
    output.extend_from_slice(&module[..header_start]);
    output.push(IMPORT_SECTION_ID);
    write_leb128(&mut output, new_payload.len() as u32);
    output.extend_from_slice(&new_payload);
    output.extend_from_slice(&module[payload_end..]);
    Ok(output)
}

/// Append a new custom section `(0, total_len, name_len, name, payload)` to
/// the end of the module, first removing any existing custom section with
/// the same name so re-embedding is idempotent.
pub fn append_custom_section(module: &[u8], name: &str, payload: &[u8]) -> Result<Vec<u8>> {
    let deduped = remove_custom_sections(module, |existing, _| existing == name)?;

    let mut section = Vec::new();
    write_leb128(&mut section, name.len() as u32);
    section.extend_from_slice(name.as_bytes());
    section.extend_from_slice(payload);

    let mut output = deduped;
    output.push(CUSTOM_SECTION_ID);
    write_leb128(&mut output, section.len() as u32);
    output.extend_from_slice(&section);
    Ok(output)
}

/// Remove every custom section whose `(name, payload_size)` satisfies
/// `predicate`, preserving the order and content of everything else.
/// Multiple removals happen in this single pass.
pub fn remove_custom_sections(
    module: &[u8],
    predicate: impl Fn(&str, usize) -> bool,
) -> Result<Vec<u8>> {
    let header_len = wajic_binfmt::constants::HEADER_LEN;
    let mut output = Vec::with_capacity(module.len());
    output.extend_from_slice(&module[..header_len]);

    let mut offset = header_len;
    while offset < module.len() {
        let id = module[offset];
        let (len, len_size) = read_leb128_u32(module, offset + 1)?;
        let payload_start = offset + 1 + len_size;
        let payload_end = payload_start + len as usize;
        let whole_section = &module[offset..payload_end];

        let drop = id == CUSTOM_SECTION_ID && {
            let (name_len, name_len_size) = read_leb128_u32(module, payload_start)?;
            let name = read_utf8(module, payload_start + name_len_size, name_len as usize)?;
            let embed_payload_size = len as usize - name_len_size - name_len as usize;
            predicate(&name, embed_payload_size)
        };

        if !drop {
            output.extend_from_slice(whole_section);
        }
        offset = payload_end;
    }
    Ok(output)
}

/// Remove export entries whose name is in `names`, shifting the export
/// section's count and length LEBs as needed. Only the export section is
/// touched; indices of surviving exports are unchanged since WebAssembly
/// exports are looked up by name, not position.
pub fn remove_exports(module: &[u8], names: &std::collections::HashSet<String>) -> Result<Vec<u8>> {
    let mut found = None;

    for_each_section(module, |section| {
        if section.id == EXPORT_SECTION_ID && found.is_none() {
            let header_start = section.payload_offset - section_header_len(section.payload.len());
            let payload_end = section.payload_offset + section.payload.len();
            found = Some((header_start, section.payload_offset, payload_end));
        }
        Ok(())
    })?;

    let Some((header_start, payload_start, payload_end)) = found else {
        return Ok(module.to_vec());
    };

    let payload = &module[payload_start..payload_end];
    let (count, mut pos) = {
        let (count, n) = read_leb128_u32(payload, 0)?;
        (count, n)
    };

    let mut kept = Vec::new();
    let mut kept_count = 0u32;
    for _ in 0..count {
        let entry_start = pos;
        let (name_len, name_len_size) = read_leb128_u32(payload, pos)?;
        let name = read_utf8(payload, pos + name_len_size, name_len as usize)?;
        let kind_pos = pos + name_len_size + name_len as usize;
        let (_, idx_len) = read_leb128_u32(payload, kind_pos + 1)?;
        let entry_end = kind_pos + 1 + idx_len;

        if !names.contains(&name) {
            kept.extend_from_slice(&payload[entry_start..entry_end]);
            kept_count += 1;
        }
        pos = entry_end;
    }

    let mut new_payload = Vec::new();
    write_leb128(&mut new_payload, kept_count);
    new_payload.extend_from_slice(&kept);

    let mut output = Vec::with_capacity(module.len());
    output.extend_from_slice(&module[..header_start]);
    output.push(EXPORT_SECTION_ID);
    write_leb128(&mut output, new_payload.len() as u32);
    output.extend_from_slice(&new_payload);
    output.extend_from_slice(&module[payload_end..]);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walker::{parse_export_section, parse_import_section};
    use wajic_binfmt::constants::{WASM_MAGIC, WASM_VERSION};

    fn module_with_import_and_export() -> Vec<u8> {
        let mut m = Vec::new();
        m.extend_from_slice(&WASM_MAGIC);
        m.extend_from_slice(&WASM_VERSION);

        let mut import_payload = Vec::new();
        write_leb128(&mut import_payload, 1);
        write_leb128(&mut import_payload, 1);
        import_payload.extend_from_slice(b"J");
        write_leb128(&mut import_payload, 3);
        import_payload.extend_from_slice(b"foo");
        import_payload.push(0); // function kind
        write_leb128(&mut import_payload, 0); // type index

        m.push(IMPORT_SECTION_ID);
        write_leb128(&mut m, import_payload.len() as u32);
        m.extend_from_slice(&import_payload);

        let mut export_payload = Vec::new();
        write_leb128(&mut export_payload, 1);
        write_leb128(&mut export_payload, 3);
        export_payload.extend_from_slice(b"bar");
        export_payload.push(0);
        write_leb128(&mut export_payload, 0);

        m.push(EXPORT_SECTION_ID);
        write_leb128(&mut m, export_payload.len() as u32);
        m.extend_from_slice(&export_payload);

        m
    }

    fn import_section_payload(module: &[u8]) -> Vec<u8> {
        let mut found = Vec::new();
        for_each_section(module, |s| {
            if s.id == IMPORT_SECTION_ID {
                found = s.payload.to_vec();
            }
            Ok(())
        })
        .unwrap();
        found
    }

    fn export_section_payload(module: &[u8]) -> Vec<u8> {
        let mut found = Vec::new();
        for_each_section(module, |s| {
            if s.id == EXPORT_SECTION_ID {
                found = s.payload.to_vec();
            }
            Ok(())
        })
        .unwrap();
        found
    }

    #[test]
    fn keep_reproduces_original_bytes() {
        let module = module_with_import_and_export();
        let rewritten = replace_import_field(&module, |_| FieldAction::Keep).unwrap();
        assert_eq!(rewritten, module);
    }

    #[test]
    fn replace_shrinks_and_grows_field_name() {
        let module = module_with_import_and_export();
        let rewritten = replace_import_field(&module, |entry| {
            assert_eq!(entry.module, "J");
            assert_eq!(entry.field, "foo");
            FieldAction::Replace(b"a".to_vec())
        })
        .unwrap();

        let entries = parse_import_section(&import_section_payload(&rewritten)).unwrap();
        assert_eq!(entries[0].field, "a");
        assert_eq!(entries[0].module, "J");
    }

    #[test]
    fn remove_exports_drops_named_entry_only() {
        let module = module_with_import_and_export();
        let mut names = std::collections::HashSet::new();
        names.insert("bar".to_string());
        let rewritten = remove_exports(&module, &names).unwrap();
        let exports = parse_export_section(&export_section_payload(&rewritten)).unwrap();
        assert!(exports.is_empty());
    }

    #[test]
    fn append_custom_section_is_idempotent() {
        let module = module_with_import_and_export();
        let once = append_custom_section(&module, "|hello.txt", b"Hello").unwrap();
        let twice = append_custom_section(&once, "|hello.txt", b"Goodbye").unwrap();

        let mut matches = Vec::new();
        for_each_section(&twice, |s| {
            if s.id == CUSTOM_SECTION_ID {
                let (name_len, ls) = read_leb128_u32(s.payload, 0).unwrap();
                let name = read_utf8(s.payload, ls, name_len as usize).unwrap();
                if name == "|hello.txt" {
                    matches.push(s.payload[ls + name_len as usize..].to_vec());
                }
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0], b"Goodbye");
    }
}
