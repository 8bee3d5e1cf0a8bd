//! Preamble and variable pre-declarations.

use std::fmt::Write as _;
use wajic_verify::FeatureFlags;

/// Open the strict-mode IIFE and declare the `WA` handshake object with its
/// user-overridable defaults.
pub fn emit(out: &mut String, html_embedded: bool) {
    out.push_str("\"use strict\";\n");
    if html_embedded {
        // No outer function scope: WA.* accesses are later rewritten to
        // WA_* locals by the minifier's AST pre-pass.
        out.push_str("var WA = window.WA || (window.WA = {});\n");
    } else {
        out.push_str("(function(WA) {\n");
    }
    out.push_str(
        "WA.canvas = WA.canvas || null;\n\
         WA.print = WA.print || (function(t) { (typeof console !== 'undefined') && console.log(t); });\n\
         WA.error = WA.error || (function(code, msg) { throw code + ': ' + msg; });\n\
         WA.started = WA.started || function() {};\n\
         WA.maxmem = WA.maxmem || (256 * 1024 * 1024);\n",
    );
}

/// Declare every state variable and sentinel the synthesized shims and
/// marshalling primitives will reference, gated by the flags that require
/// them.
pub fn emit_declarations(out: &mut String, flags: &FeatureFlags) {
    out.push_str("var STOP = false, WM, ASM, MEM;\n");
    if flags.needs_mu8 {
        out.push_str("var MU8;\n");
    }
    if flags.needs_mu16 {
        out.push_str("var MU16;\n");
    }
    if flags.needs_mu32 {
        out.push_str("var MU32;\n");
    }
    if flags.needs_mi32 {
        out.push_str("var MI32;\n");
    }
    if flags.needs_mf32 {
        out.push_str("var MF32;\n");
    }
    if flags.uses_file_descriptors {
        // fd 0 and 1 are reserved (stdin/stdout), each a (buffer, cursor) pair.
        out.push_str("var FPTS = [null, null, null, null];\n");
    }
    if flags.is_wasi || flags.uses_sbrk {
        let _ = writeln!(out, "var TEMP = 0;");
    }
    if flags.uses_sbrk {
        out.push_str("var WASM_HEAP = 0, WASM_HEAP_MAX = WA.maxmem;\n");
    }
}

/// The `.catch` tail every instantiation harness ends with.
pub fn emit_error_tail(out: &mut String) {
    out.push_str(
        "}).catch(function(err) { if (err !== 'abort') { WA.abort('BOOT', 'WASM instantiate error: ' + err + (err && err.stack || '')); } });\n",
    );
}

/// Close the outer IIFE opened by [`emit`] for the non-HTML-embedded case.
pub fn emit_footer(out: &mut String, html_embedded: bool) {
    if !html_embedded {
        out.push_str("})(window.WA || (window.WA = {}));\n");
    }
}
