//! The layout verifier: from the set of imports a module actually
//! requests, the fragments extracted from its `J`-module imports, and the
//! set of exports it provides, derive the minimum set of loader glue
//! routines the synthesizer needs to emit, then check the result for
//! internal consistency.

mod flags;

pub use flags::FeatureFlags;

use wajic_error::{codes, Error, ErrorCategory, Result, Warning};
use wajic_fragment::Fragment;
use wajic_module::{ExportEntry, ImportEntry};

/// Everything the verifier needs to know about a module to derive its
/// feature flags.
pub struct VerifierInput<'a> {
    pub imports: &'a [ImportEntry],
    pub fragments: &'a [Fragment],
    pub exports: &'a [ExportEntry],
    pub has_memory: bool,
}

/// Run the verifier: compute feature flags and check them for internal
/// consistency, collecting non-fatal warnings along the way.
///
/// Returns the flags and any warnings on success; a [`wajic_error::Error`]
/// in category [`ErrorCategory::Verifier`] if a feature requires something
/// the module doesn't provide.
pub fn verify(input: &VerifierInput<'_>) -> Result<(FeatureFlags, Vec<Warning>)> {
    let flags = FeatureFlags::compute(input);
    check_consistency(&flags, input)?;
    let warnings = collect_warnings(&flags, input);
    Ok((flags, warnings))
}

fn check_consistency(flags: &FeatureFlags, input: &VerifierInput<'_>) -> Result<()> {
    if flags.needs_memory_object && !input.has_memory {
        return Err(Error::new(
            ErrorCategory::Verifier,
            codes::MISSING_MEMORY,
            "module requires a memory object (set_views/sbrk) but imports or exports none",
        ));
    }

    if flags.needs_malloc && !export_named(input.exports, "malloc") {
        return Err(Error::new(
            ErrorCategory::Verifier,
            codes::MISSING_ALLOCATOR_EXPORT,
            "module requires malloc but does not export it",
        ));
    }

    Ok(())
}

fn collect_warnings(flags: &FeatureFlags, input: &VerifierInput<'_>) -> Vec<Warning> {
    let mut warnings = Vec::new();

    let malloc_exported = export_named(input.exports, "malloc");
    let free_exported = export_named(input.exports, "free");
    if (malloc_exported || free_exported) && !flags.needs_malloc {
        warnings.push(Warning {
            kind: wajic_error::ErrorKind::UnusedExport,
            message: "malloc/free are exported but no fragment or startup path uses them; \
                      the native optimizer could strip them"
                .to_string(),
        });
    }

    for import in input.imports {
        if import.is_fragment_import() {
            continue;
        }
        if crate::flags::known_shim_for(&import.module, &import.field).is_none() {
            warnings.push(Warning {
                kind: wajic_error::ErrorKind::UnknownImport,
                message: format!(
                    "no known shim for import {}.{} — emitting a zero-returning stub",
                    import.module, import.field
                ),
            });
        }
    }

    warnings
}

fn export_named(exports: &[ExportEntry], name: &str) -> bool {
    exports.iter().any(|e| e.field == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wajic_module::ImportKind;

    fn fragment(code: &str) -> Fragment {
        Fragment { js_name: "f".into(), js_args: String::new(), js_code: code.into(), js_lib: String::new(), js_init: None }
    }

    #[test]
    fn sbrk_import_requires_memory_object() {
        let imports =
            vec![ImportEntry { module: "env".into(), field: "sbrk".into(), kind: ImportKind::Function(0) }];
        let exports = vec![ExportEntry { field: "memory".into(), kind: 2, index: 0 }];
        let input = VerifierInput { imports: &imports, fragments: &[], exports: &exports, has_memory: true };
        let (flags, _) = verify(&input).unwrap();
        assert!(flags.uses_sbrk);
        assert!(flags.needs_memory_object);
    }

    #[test]
    fn sbrk_without_memory_is_a_verifier_error() {
        let imports =
            vec![ImportEntry { module: "env".into(), field: "sbrk".into(), kind: ImportKind::Function(0) }];
        let input = VerifierInput { imports: &imports, fragments: &[], exports: &[], has_memory: false };
        let err = verify(&input).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Verifier);
        assert_eq!(err.code(), codes::MISSING_MEMORY);
    }

    #[test]
    fn wasi_file_descriptors_require_sys_open() {
        let imports = vec![
            ImportEntry {
                module: "wasi_snapshot_preview1".into(),
                field: "fd_write".into(),
                kind: ImportKind::Function(0),
            },
            ImportEntry { module: "env".into(), field: "__sys_open".into(), kind: ImportKind::Function(0) },
        ];
        let input = VerifierInput { imports: &imports, fragments: &[], exports: &[], has_memory: true };
        let (flags, _) = verify(&input).unwrap();
        assert!(flags.is_wasi);
        assert!(flags.uses_file_descriptors);
        assert!(flags.needs_string_put_get);
    }

    #[test]
    fn wasi_without_memory_is_a_verifier_error() {
        let imports = vec![ImportEntry {
            module: "wasi_snapshot_preview1".into(),
            field: "fd_write".into(),
            kind: ImportKind::Function(0),
        }];
        let input = VerifierInput { imports: &imports, fragments: &[], exports: &[], has_memory: false };
        let err = verify(&input).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Verifier);
        assert_eq!(err.code(), codes::MISSING_MEMORY);
    }

    #[test]
    fn string_marshalling_mentions_set_the_flag() {
        let fragments = vec![fragment("MStrPut(s, ptr, 16)")];
        let exports = vec![ExportEntry { field: "memory".into(), kind: 2, index: 0 }];
        let input = VerifierInput { imports: &[], fragments: &fragments, exports: &exports, has_memory: true };
        let (flags, _) = verify(&input).unwrap();
        assert!(flags.needs_string_put_get);
        assert!(flags.needs_mu8);
    }

    #[test]
    fn unused_malloc_export_is_a_warning_not_an_error() {
        let exports = vec![
            ExportEntry { field: "malloc".into(), kind: 0, index: 0 },
            ExportEntry { field: "free".into(), kind: 0, index: 1 },
        ];
        let input = VerifierInput { imports: &[], fragments: &[], exports: &exports, has_memory: false };
        let (_, warnings) = verify(&input).unwrap();
        assert_eq!(warnings.len(), 1);
    }
}
