//! Section walker and import/export rewriter for the core WebAssembly
//! binary format.
//!
//! Everything here is "parser-free": sections other than import/export are
//! never decoded past their `(type, payload)` envelope, which preserves
//! byte-for-byte fidelity for the parts of the module this tool doesn't
//! understand.

mod entries;
mod rewriter;
mod walker;

pub use entries::{ExportEntry, ImportEntry, ImportKind, Limits};
pub use rewriter::{
    append_custom_section, remove_custom_sections, remove_exports, replace_import_field,
    FieldAction,
};
pub use walker::{for_each_section, parse_export_section, parse_import_section, parse_memory_section, Section};

use wajic_error::Result;

/// An in-memory WebAssembly module, identified only by its raw bytes.
///
/// Never materialized into an AST; every accessor here re-walks the
/// byte sequence on demand. Cheap because modules are expected to fit
/// comfortably in RAM.
#[derive(Debug, Clone)]
pub struct Module {
    bytes: Vec<u8>,
}

impl Module {
    /// Wrap raw module bytes. Does not validate the header; callers that
    /// need that should check `imports()` or another accessor, which will
    /// surface a format error on first section walk.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// The raw module bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the module, returning its raw bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Parse the import section's entries, or an empty vector if the
    /// module has none.
    pub fn imports(&self) -> Result<Vec<ImportEntry>> {
        let mut result = Vec::new();
        for_each_section(&self.bytes, |section| {
            if section.id == wajic_binfmt::constants::IMPORT_SECTION_ID {
                result = parse_import_section(section.payload)?;
            }
            Ok(())
        })?;
        Ok(result)
    }

    /// Parse the export section's entries, or an empty vector if the
    /// module has none.
    pub fn exports(&self) -> Result<Vec<ExportEntry>> {
        let mut result = Vec::new();
        for_each_section(&self.bytes, |section| {
            if section.id == wajic_binfmt::constants::EXPORT_SECTION_ID {
                result = parse_export_section(section.payload)?;
            }
            Ok(())
        })?;
        Ok(result)
    }

    /// The initial page count of an imported memory, if the module imports
    /// (rather than defines) one.
    pub fn imported_memory_initial_pages(&self) -> Result<Option<u32>> {
        for import in self.imports()? {
            if let ImportKind::Memory(limits) = import.kind {
                return Ok(Some(limits.initial));
            }
        }
        Ok(None)
    }

    /// The initial page count of a module-defined memory, if present.
    pub fn defined_memory_initial_pages(&self) -> Result<Option<u32>> {
        let mut result = None;
        for_each_section(&self.bytes, |section| {
            if section.id == wajic_binfmt::constants::MEMORY_SECTION_ID {
                result = parse_memory_section(section.payload)?.into_iter().next();
            }
            Ok(())
        })?;
        Ok(result)
    }

    /// Whether any export matches `name`.
    pub fn exports_name(&self, name: &str) -> Result<bool> {
        Ok(self.exports()?.iter().any(|e| e.field == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_module() -> Vec<u8> {
        // magic + version, import section (env.sbrk function), export section (memory)
        let mut m = Vec::new();
        m.extend_from_slice(&wajic_binfmt::constants::WASM_MAGIC);
        m.extend_from_slice(&wajic_binfmt::constants::WASM_VERSION);
        m
    }

    #[test]
    fn empty_module_has_no_imports_or_exports() {
        let module = Module::new(sample_module());
        assert!(module.imports().unwrap().is_empty());
        assert!(module.exports().unwrap().is_empty());
    }
}
