//! Startup sequence: each step runs only if its corresponding
//! export exists, so a module with no `main` emits no call to one.

use std::fmt::Write as _;
use wajic_module::ExportEntry;
use wajic_verify::FeatureFlags;

pub fn emit(out: &mut String, exports: &[ExportEntry], flags: &FeatureFlags) {
    let has = |name: &str| exports.iter().any(|e| e.field == name);

    if flags.has_ctors {
        out.push_str("  ASM.__wasm_call_ctors();\n");
    }

    let main_entry = if has("__main_argc_argv") { Some("__main_argc_argv") } else if has("main") { Some("main") } else { None };

    if let Some(entry) = main_entry {
        if flags.needs_malloc {
            // / S3: allocate argv[0]'s backing string ("W\0") plus the
            // argv array itself in the same 10-byte block.
            out.push_str("  var ptr = ASM.malloc(10);\n");
            out.push_str("  MU8[ptr + 8] = 87;\n");
            out.push_str("  MU8[ptr + 9] = 0;\n");
            out.push_str("  MU32[ptr >> 2] = ptr + 8;\n");
            out.push_str("  MU32[(ptr + 4) >> 2] = 0;\n");
            let _ = writeln!(out, "  ASM.{entry}(1, ptr);");
        } else {
            let _ = writeln!(out, "  ASM.{entry}(0, 0);");
        }
    } else if has("__original_main") {
        out.push_str("  ASM.__original_main();\n");
    } else if has("__main_void") {
        out.push_str("  ASM.__main_void();\n");
    }

    if flags.has_wajic_main {
        out.push_str("  ASM.WajicMain();\n");
    }

    out.push_str("  WA.started();\n");
}
