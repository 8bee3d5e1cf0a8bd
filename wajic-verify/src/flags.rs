//! Feature flag derivation.
//!
//! Every flag here gates one piece of loader glue the synthesizer can skip
//! when nothing in the module needs it — the point of the verifier is to
//! keep the emitted loader as small as the module actually requires.

use crate::VerifierInput;

/// The minimum set of loader glue routines a module requires, as derived
/// from its imports, exports, and fragments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    pub uses_sbrk: bool,
    pub is_wasi: bool,
    pub uses_file_descriptors: bool,
    pub needs_mu8: bool,
    pub needs_mu16: bool,
    pub needs_mu32: bool,
    pub needs_mi32: bool,
    pub needs_mf32: bool,
    pub needs_set_views: bool,
    pub needs_string_put_get: bool,
    pub needs_array_put: bool,
    pub needs_malloc: bool,
    pub needs_memory_object: bool,
    pub has_main_with_args: bool,
    pub has_main_no_args: bool,
    pub has_ctors: bool,
    pub has_wajic_main: bool,
}

impl FeatureFlags {
    /// Derive flags from a module's imports, exports, and decoded
    /// fragments. Never fails — inconsistent combinations are caught
    /// separately by [`crate::verify`]'s consistency checks.
    #[must_use]
    pub fn compute(input: &VerifierInput<'_>) -> Self {
        let mut flags = Self::default();

        for import in input.imports {
            match (import.module.as_str(), import.field.as_str()) {
                ("env", "sbrk") => flags.uses_sbrk = true,
                (module, field) if module.starts_with("wasi") => {
                    flags.is_wasi = true;
                    if field.starts_with("fd_") {
                        flags.uses_file_descriptors = true;
                    }
                }
                _ => {}
            }
        }

        // WASI's fd_* calls marshal buffers through iovecs backed by
        // sys_open; without that shim the descriptor table has nothing to
        // open against, so only count the flag once both are present.
        if flags.uses_file_descriptors {
            flags.uses_file_descriptors =
                input.imports.iter().any(|i| i.module == "env" && i.field == "__sys_open");
        }

        for fragment in input.fragments {
            let code = &fragment.js_code;
            if mentions(code, "MU8") {
                flags.needs_mu8 = true;
            }
            if mentions(code, "MU16") {
                flags.needs_mu16 = true;
            }
            if mentions(code, "MU32") {
                flags.needs_mu32 = true;
            }
            if mentions(code, "MI32") {
                flags.needs_mi32 = true;
            }
            if mentions(code, "MF32") {
                flags.needs_mf32 = true;
            }
            if mentions(code, "MStrPut") || mentions(code, "MStrGet") {
                flags.needs_string_put_get = true;
                flags.needs_mu8 = true;
            }
            if mentions(code, "MArrPut") || mentions(code, "MArrGet") {
                flags.needs_array_put = true;
            }
        }

        // wasi_*.fd_write/fd_read decode strings and pack iovec offsets
        // through MStrGet/MU8/MU32 even when no fragment mentions them.
        if flags.is_wasi {
            flags.needs_string_put_get = true;
            flags.needs_mu8 = true;
            flags.needs_mu32 = true;
        }

        // The assert/crash shims decode their message argument through
        // MStrGet, which in turn reads MU8.
        let assertion_handler_present = input
            .imports
            .iter()
            .any(|i| i.module == "env" && matches!(i.field.as_str(), "__assert_fail" | "__cxa_throw" | "abort" | "longjmp"));
        if assertion_handler_present {
            flags.needs_string_put_get = true;
            flags.needs_mu8 = true;
        }

        flags.needs_set_views =
            flags.needs_mu8 || flags.needs_mu16 || flags.needs_mu32 || flags.needs_mi32 || flags.needs_mf32;

        flags.needs_memory_object = flags.uses_sbrk || flags.needs_set_views;

        let has_main = |name: &str| input.exports.iter().any(|e| e.field == name);
        flags.has_main_with_args = has_main("__main_argc_argv");
        flags.has_main_no_args = has_main("main") || has_main("_main");
        flags.has_ctors = has_main("__wasm_call_ctors");
        flags.has_wajic_main = has_main("WajicMain");

        let malloc_exported = input.exports.iter().any(|e| e.field == "malloc");
        flags.needs_malloc = ((flags.has_main_with_args || flags.has_main_no_args) && malloc_exported)
            || ((flags.needs_array_put || flags.needs_string_put_get) && malloc_exported)
            || input.fragments.iter().any(|f| mentions(&f.js_code, "malloc"));

        flags
    }
}

fn mentions(code: &str, symbol: &str) -> bool {
    code.contains(symbol)
}

/// Whether the loader synthesizer has a built-in shim for this import, used
/// by the verifier to decide whether an unrecognized import deserves a
/// warning.
#[must_use]
pub fn known_shim_for(module: &str, field: &str) -> Option<&'static str> {
    const ENV_SHIMS: &[&str] = &[
        "sbrk", "time", "exit", "abort", "__assert_fail", "setjmp", "longjmp", "__sys_open",
        "__sys_read", "__sys_write", "__sys_close", "__sys_lseek",
    ];
    const WASI_SHIMS: &[&str] =
        &["fd_write", "fd_read", "fd_seek", "fd_close", "proc_exit", "environ_sizes_get", "environ_get"];

    if module == "J" {
        return None; // fragment imports are synthesized per-module, not shimmed.
    }
    if module == "env" && ENV_SHIMS.contains(&field) {
        return Some(field);
    }
    if module.starts_with("wasi") && WASI_SHIMS.contains(&field) {
        return Some(field);
    }
    None
}
