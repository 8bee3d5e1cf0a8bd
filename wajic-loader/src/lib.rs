//! The loader synthesizer: the largest single component. Emits a
//! single host-language (JS) program that reconstitutes a module's import
//! object from extracted fragments and known shims, instantiates it, and
//! runs its startup sequence.
//!
//! The synthesizer never executes or parses JS; it assembles one from
//! string templates gated by the [`wajic_verify::FeatureFlags`] the
//! verifier derived, so a flag that is unset leaves the corresponding
//! primitive entirely out of the emitted text.

mod abort;
mod embed;
mod instantiate;
mod marshal;
mod memory;
mod preamble;
mod shims;
mod startup;

pub use embed::{decode_rle85, decode_w64, encode_rle85, encode_w64, EmbedEncoding};
pub use instantiate::InstantiationMode;

use wajic_error::Result;
use wajic_fragment::Fragment;
use wajic_module::{ExportEntry, ImportEntry};
use wajic_verify::FeatureFlags;

/// Everything the synthesizer needs to emit a complete loader for one
/// module.
pub struct LoaderInput<'a> {
    pub imports: &'a [ImportEntry],
    pub exports: &'a [ExportEntry],
    pub fragments: &'a [Fragment],
    pub flags: &'a FeatureFlags,
    pub module_source: ModuleSource,
    /// Whether this loader is embedded inside an HTML `<script>` with no
    /// outer function scope — triggers the `WA.prop` → `WA_prop` rewrite,
    /// performed by the minification driver, not here.
    pub html_embedded: bool,
}

/// Where the instantiation harness gets the module's bytes from.
pub enum ModuleSource {
    /// The module is embedded directly in the loader text, encoded with
    /// the given scheme.
    Inline { bytes: Vec<u8>, encoding: EmbedEncoding },
    /// The module is a sibling file, fetched or read from disk.
    External { url: String, mode: InstantiationMode },
}

/// Synthesize the complete loader source for one module.
///
/// Each call below emits one numbered step of the loader structure:
/// preamble, declarations, abort, marshalling, embedded-module decode,
/// import object, instantiation harness, startup sequence, error tail.
pub fn synthesize(input: &LoaderInput<'_>) -> Result<String> {
    let mut out = String::new();

    preamble::emit(&mut out, input.html_embedded);
    preamble::emit_declarations(&mut out, input.flags);
    abort::emit(&mut out);

    if input.flags.needs_set_views {
        marshal::emit_set_views(&mut out);
    }
    if input.flags.needs_string_put_get {
        marshal::emit_string_marshal(&mut out);
    }
    if input.flags.needs_array_put {
        marshal::emit_array_marshal(&mut out);
    }

    let module_expr = match &input.module_source {
        ModuleSource::Inline { bytes, encoding } => embed::emit_inline_decoder(&mut out, bytes, *encoding),
        ModuleSource::External { .. } => "wasmBytes".to_string(),
    };

    let memory_imported = memory::emit_imported_memory(&mut out, input.imports);

    shims::emit_import_object(&mut out, input.imports, input.fragments, input.flags)?;

    instantiate::emit(&mut out, &input.module_source, &module_expr);

    if !memory_imported {
        memory::emit_exported_memory_capture(&mut out, input.flags.needs_set_views);
    }

    startup::emit(&mut out, input.exports, input.flags);

    preamble::emit_error_tail(&mut out);
    preamble::emit_footer(&mut out, input.html_embedded);

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wajic_module::{ImportKind, Limits};

    fn flags(f: impl FnOnce(&mut FeatureFlags)) -> FeatureFlags {
        let mut flags = FeatureFlags::default();
        f(&mut flags);
        flags
    }

    /// S1: a `J.log` fragment must show up as a function in the `J`
    /// object, and the memory import must become a constructed
    /// `WebAssembly.Memory`.
    #[test]
    fn emits_fragment_function_and_memory_for_scenario_s1() {
        let imports = vec![
            ImportEntry { module: "env".into(), field: "memory".into(), kind: ImportKind::Memory(Limits { initial: 1, maximum: None }) },
        ];
        let fragments = vec![Fragment {
            js_name: "log".into(),
            js_args: "x".into(),
            js_code: "{ console.log(x); }".into(),
            js_lib: String::new(),
            js_init: None,
        }];
        let flags = FeatureFlags::default();
        let input = LoaderInput {
            imports: &imports,
            exports: &[],
            fragments: &fragments,
            flags: &flags,
            module_source: ModuleSource::External { url: "module.wasm".into(), mode: InstantiationMode::FetchArrayBuffer },
            html_embedded: false,
        };
        let loader = synthesize(&input).unwrap();
        assert!(loader.contains("J[\"log\"] = function(x) { console.log(x); };"));
        assert!(loader.contains("MEM = new WebAssembly.Memory({ initial: 1 });"));
    }

    /// S2: `uses_sbrk` must produce `WASM_HEAP`/`WASM_HEAP_MAX` and an
    /// `sbrk` shim that checks the max and rebuilds views after growth.
    #[test]
    fn emits_sbrk_shim_for_scenario_s2() {
        let imports = vec![ImportEntry { module: "env".into(), field: "sbrk".into(), kind: ImportKind::Function(0) }];
        let flags = flags(|f| {
            f.uses_sbrk = true;
            f.needs_memory_object = true;
        });
        let input = LoaderInput {
            imports: &imports,
            exports: &[ExportEntry { field: "memory".into(), kind: 2, index: 0 }],
            fragments: &[],
            flags: &flags,
            module_source: ModuleSource::External { url: "m.wasm".into(), mode: InstantiationMode::FetchArrayBuffer },
            html_embedded: false,
        };
        let loader = synthesize(&input).unwrap();
        assert!(loader.contains("var WASM_HEAP = 0, WASM_HEAP_MAX = WA.maxmem;"));
        assert!(loader.contains("function sbrk(increment)"));
        assert!(loader.contains("abort('MEM'"));
    }

    /// S3: `main` + `malloc` must allocate 10 bytes, write `87, 0` at
    /// offsets 8/9, and call `main(1, ptr)`.
    #[test]
    fn emits_argv_setup_for_scenario_s3() {
        let exports = vec![
            ExportEntry { field: "main".into(), kind: 0, index: 0 },
            ExportEntry { field: "malloc".into(), kind: 0, index: 1 },
        ];
        let flags = flags(|f| f.needs_malloc = true);
        let input = LoaderInput {
            imports: &[],
            exports: &exports,
            fragments: &[],
            flags: &flags,
            module_source: ModuleSource::External { url: "m.wasm".into(), mode: InstantiationMode::FetchArrayBuffer },
            html_embedded: false,
        };
        let loader = synthesize(&input).unwrap();
        assert!(loader.contains("ASM.malloc(10)"));
        assert!(loader.contains("MU8[ptr + 8] = 87;"));
        assert!(loader.contains("MU8[ptr + 9] = 0;"));
        assert!(loader.contains("ASM.main(1, ptr);"));
    }

    /// Invariant 4 (feature-flag monotonicity): an unset flag must leave
    /// its primitive out of the loader entirely.
    #[test]
    fn omits_string_marshalling_when_flag_is_unset() {
        let flags = FeatureFlags::default();
        let input = LoaderInput {
            imports: &[],
            exports: &[],
            fragments: &[],
            flags: &flags,
            module_source: ModuleSource::External { url: "m.wasm".into(), mode: InstantiationMode::FetchArrayBuffer },
            html_embedded: false,
        };
        let loader = synthesize(&input).unwrap();
        assert!(!loader.contains("function MStrPut"));
        assert!(!loader.contains("function MStrGet"));
        assert!(!loader.contains("function sbrk"));
    }

    /// Builds a [`FeatureFlags`] from the low bits of `bits`, one bit per
    /// boolean field that purely *adds* lines to the loader. `needs_malloc`
    /// is deliberately left unset and excluded from the bitmask: it picks
    /// between two mutually exclusive `startup.rs` bodies rather than
    /// adding a line, so it isn't a fit for a line-superset property.
    fn flags_from_bits(bits: u32) -> FeatureFlags {
        FeatureFlags {
            uses_sbrk: bits & (1 << 0) != 0,
            is_wasi: bits & (1 << 1) != 0,
            uses_file_descriptors: bits & (1 << 2) != 0,
            needs_mu8: bits & (1 << 3) != 0,
            needs_mu16: bits & (1 << 4) != 0,
            needs_mu32: bits & (1 << 5) != 0,
            needs_mi32: bits & (1 << 6) != 0,
            needs_mf32: bits & (1 << 7) != 0,
            needs_set_views: bits & (1 << 8) != 0,
            needs_string_put_get: bits & (1 << 9) != 0,
            needs_array_put: bits & (1 << 10) != 0,
            needs_malloc: false,
            needs_memory_object: bits & (1 << 11) != 0,
            has_main_with_args: bits & (1 << 12) != 0,
            has_main_no_args: bits & (1 << 13) != 0,
            has_ctors: bits & (1 << 14) != 0,
            has_wajic_main: bits & (1 << 15) != 0,
        }
    }

    /// A fixed set of imports/exports broad enough that every flag's
    /// codegen branch can fire, so the two synthesize() calls below differ
    /// only in which flags are set, never in which inputs are available.
    fn monotonicity_fixture() -> (Vec<ImportEntry>, Vec<ExportEntry>, Vec<Fragment>) {
        let imports = vec![
            ImportEntry { module: "env".into(), field: "sbrk".into(), kind: ImportKind::Function(0) },
            ImportEntry { module: "env".into(), field: "__sys_open".into(), kind: ImportKind::Function(0) },
            ImportEntry {
                module: "wasi_snapshot_preview1".into(),
                field: "fd_write".into(),
                kind: ImportKind::Function(0),
            },
        ];
        let exports = vec![
            ExportEntry { field: "memory".into(), kind: 2, index: 0 },
            ExportEntry { field: "main".into(), kind: 0, index: 1 },
            ExportEntry { field: "malloc".into(), kind: 0, index: 2 },
            ExportEntry { field: "__wasm_call_ctors".into(), kind: 0, index: 3 },
            ExportEntry { field: "WajicMain".into(), kind: 0, index: 4 },
        ];
        let fragments = vec![Fragment {
            js_name: "log".into(),
            js_args: "s".into(),
            js_code: "{ console.log(MStrGet(s)); }".into(),
            js_lib: String::new(),
            js_init: None,
        }];
        (imports, exports, fragments)
    }

    fn loader_lines(imports: &[ImportEntry], exports: &[ExportEntry], fragments: &[Fragment], flags: &FeatureFlags) -> std::collections::HashSet<String> {
        let input = LoaderInput {
            imports,
            exports,
            fragments,
            flags,
            module_source: ModuleSource::External { url: "m.wasm".into(), mode: InstantiationMode::FetchArrayBuffer },
            html_embedded: false,
        };
        synthesize(&input).unwrap().lines().map(str::to_string).collect()
    }

    proptest::proptest! {
        /// Feature-flag monotonicity: setting additional flags can only add
        /// lines to the emitted loader, never remove one that a subset of
        /// those flags already produced.
        #[test]
        fn more_flags_never_removes_emitted_lines(base_bits in 0u32..(1 << 16), extra_bits in 0u32..(1 << 16)) {
            let (imports, exports, fragments) = monotonicity_fixture();
            let base = flags_from_bits(base_bits);
            let superset = flags_from_bits(base_bits | extra_bits);

            let base_lines = loader_lines(&imports, &exports, &fragments, &base);
            let superset_lines = loader_lines(&imports, &exports, &fragments, &superset);

            for line in &base_lines {
                proptest::prop_assert!(
                    superset_lines.contains(line),
                    "line present with flags {:?} missing with superset flags {:?}: {line:?}",
                    base,
                    superset
                );
            }
        }
    }
}
