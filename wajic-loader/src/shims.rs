//! Import object construction: one property per imported module,
//! built from extracted `J` fragments and a table of known shims for
//! everything else.

use std::fmt::Write as _;
use wajic_error::Result;
use wajic_fragment::Fragment;
use wajic_module::{ImportEntry, ImportKind};
use wajic_verify::FeatureFlags;

/// Emit `var imports = { ... };` covering every imported module name.
pub fn emit_import_object(
    out: &mut String,
    imports: &[ImportEntry],
    fragments: &[Fragment],
    flags: &FeatureFlags,
) -> Result<()> {
    emit_sbrk_shim(out, flags);
    emit_time_shims(out, imports);
    emit_assert_and_control_shims(out, imports);
    emit_math_shims(out, imports);
    emit_wasi_shims(out, flags);

    out.push_str("var imports = {\n");

    let by_module = group_by_module(imports);
    for (module, entries) in &by_module {
        if *module == "J" {
            emit_fragment_library(out, fragments);
            continue;
        }
        let _ = writeln!(out, "  {module:?}: {{");
        for import in entries {
            let shim = match &import.kind {
                ImportKind::Memory(_) => "MEM".to_string(),
                ImportKind::Table { limits, .. } => {
                    format!("new WebAssembly.Table({{ initial: {}, element: 'anyfunc' }})", limits.initial)
                }
                ImportKind::Global { mutable, .. } => {
                    format!("new WebAssembly.Global({{ value: 'i32', mutable: {mutable} }}, 0)")
                }
                ImportKind::Function(_) => env_shim_reference(module, &import.field),
            };
            let _ = writeln!(out, "    {:?}: {},", import.field, shim);
        }
        out.push_str("  },\n");
    }

    out.push_str("};\n");
    Ok(())
}

fn group_by_module<'a>(imports: &'a [ImportEntry]) -> Vec<(&'a str, Vec<&'a ImportEntry>)> {
    let mut modules: Vec<&str> = Vec::new();
    let mut grouped: Vec<(&str, Vec<&ImportEntry>)> = Vec::new();
    for import in imports {
        let module = import.module.as_str();
        if !modules.contains(&module) {
            modules.push(module);
            grouped.push((module, Vec::new()));
        }
        grouped.iter_mut().find(|(m, _)| *m == module).expect("just inserted").1.push(import);
    }
    grouped
}

/// Fragments sharing a `js_lib` tag get one lexical scope each; fragments
/// with no library tag contribute to a flat, shared object.
fn emit_fragment_library(out: &mut String, fragments: &[Fragment]) {
    out.push_str("  J: (function() {\n");
    out.push_str("    var J = {};\n");

    let mut seen_libs: Vec<&str> = Vec::new();
    for fragment in fragments {
        if fragment.is_default_library() || seen_libs.contains(&fragment.js_lib.as_str()) {
            continue;
        }
        seen_libs.push(&fragment.js_lib);
        let lib_fragments: Vec<&Fragment> = fragments.iter().filter(|f| f.js_lib == fragment.js_lib).collect();
        let init_text: String = lib_fragments.iter().filter_map(|f| f.js_init.as_deref()).collect::<Vec<_>>().join(";");
        let _ = writeln!(out, "    (function() {{ {init_text};");
        for lib_fragment in &lib_fragments {
            let _ = writeln!(
                out,
                "      J[{:?}] = function({}) {}",
                lib_fragment.js_name, lib_fragment.js_args, lib_fragment.js_code
            );
        }
        out.push_str("    })();\n");
    }

    for fragment in fragments.iter().filter(|f| f.is_default_library()) {
        let _ = writeln!(out, "    J[{:?}] = function({}) {};", fragment.js_name, fragment.js_args, fragment.js_code);
    }

    out.push_str("    return J;\n");
    out.push_str("  })(),\n");
}

fn emit_sbrk_shim(out: &mut String, flags: &FeatureFlags) {
    if !flags.uses_sbrk {
        return;
    }
    out.push_str(
        "function sbrk(increment) {\n\
         \x20 var old = WASM_HEAP;\n\
         \x20 var next = old + increment;\n\
         \x20 if (next > WASM_HEAP_MAX) { abort('MEM', 'heap would exceed ' + WASM_HEAP_MAX + ' bytes'); }\n\
         \x20 if (next > MEM.buffer.byteLength) {\n\
         \x20\x20  var need = next - MEM.buffer.byteLength;\n\
         \x20\x20  MEM.grow(Math.ceil(need / 65536));\n\
         \x20\x20  MSetViews();\n\
         \x20 }\n\
         \x20 WASM_HEAP = next;\n\
         \x20 return old;\n\
         }\n",
    );
}

fn emit_time_shims(out: &mut String, imports: &[ImportEntry]) {
    let has = |name: &str| imports.iter().any(|i| i.module == "env" && i.field == name);
    if has("time") {
        out.push_str("function env_time(ptr) { var t = Math.floor(Date.now() / 1000); if (ptr) { MU32[ptr >> 2] = t; } return t; }\n");
    }
    if has("gettimeofday") {
        out.push_str(
            "function env_gettimeofday(tv) {\n\
             \x20 var now = Date.now();\n\
             \x20 MU32[tv >> 2] = Math.floor(now / 1000);\n\
             \x20 MU32[(tv + 4) >> 2] = (now % 1000) * 1000;\n\
             \x20 return 0;\n\
             }\n",
        );
    }
    if has("clock_gettime") {
        out.push_str(
            "function env_clock_gettime(clkId, tp) {\n\
             \x20 var now = Date.now();\n\
             \x20 MU32[tp >> 2] = Math.floor(now / 1000);\n\
             \x20 MU32[(tp + 4) >> 2] = (now % 1000) * 1000000;\n\
             \x20 return 0;\n\
             }\n",
        );
    }
    if has("clock_getres") {
        out.push_str("function env_clock_getres(clkId, res) { MU32[res >> 2] = 0; MU32[(res + 4) >> 2] = 1000000; return 0; }\n");
    }
}

fn emit_assert_and_control_shims(out: &mut String, imports: &[ImportEntry]) {
    let has = |name: &str| imports.iter().any(|i| i.module == "env" && i.field == name);
    if has("exit") {
        out.push_str("function env_exit(code) { abort('EXIT', 'exit(' + code + ')'); }\n");
    }
    if has("__assert_fail") {
        out.push_str(
            "function env___assert_fail(condition, filename, line, func) {\n\
             \x20 abort('CRASH', 'assert(' + MStrGet(condition) + ') at ' + MStrGet(filename) + ':' + line);\n\
             }\n",
        );
    }
    if has("__cxa_throw") {
        out.push_str(
            "function env___cxa_throw(ptr, type, destructor) {\n\
             \x20 abort('CRASH', 'C++ exception thrown: ' + MStrGet(type));\n\
             }\n",
        );
    }
    if has("abort") {
        out.push_str("function env_abort() { abort('CRASH', 'abort() called'); }\n");
    }
    if has("longjmp") {
        out.push_str("function env_longjmp(env, value) { abort('CRASH', 'longjmp(' + env + ', ' + value + ') called'); }\n");
    }
    for name in ["setjmp", "__cxa_atexit", "__lock", "__unlock"] {
        if has(name) {
            let _ = writeln!(out, "function env_{name}() {{ return 0; }}");
        }
    }
    if has("getTempRet0") {
        out.push_str("function env_getTempRet0() { return TEMP; }\n");
    }
    if has("setTempRet0") {
        out.push_str("function env_setTempRet0(v) { TEMP = v; }\n");
    }
}

const MATH_FUNCTIONS: &[(&str, &str)] = &[
    ("sin", "Math.sin"),
    ("cos", "Math.cos"),
    ("tan", "Math.tan"),
    ("asin", "Math.asin"),
    ("acos", "Math.acos"),
    ("atan", "Math.atan"),
    ("atan2", "Math.atan2"),
    ("exp", "Math.exp"),
    ("log", "Math.log"),
    ("pow", "Math.pow"),
    ("sqrt", "Math.sqrt"),
    ("ceil", "Math.ceil"),
    ("floor", "Math.floor"),
    ("fabs", "Math.abs"),
    ("rint", "Math.round"),
];

fn emit_math_shims(out: &mut String, imports: &[ImportEntry]) {
    for import in imports {
        if import.module != "env" {
            continue;
        }
        if let Some(host_fn) = math_host_function(&import.field) {
            let _ = writeln!(out, "var env_{0} = {1};", import.field, host_fn);
        }
    }
}

/// Matches a math import name against the known table, tolerating an `f`
/// prefix/suffix float variant.
fn math_host_function(name: &str) -> Option<&'static str> {
    let stripped = name.strip_prefix('f').or_else(|| name.strip_suffix('f')).unwrap_or(name);
    MATH_FUNCTIONS.iter().find(|(n, _)| *n == stripped || *n == name).map(|(_, host)| *host)
}

fn emit_wasi_shims(out: &mut String, flags: &FeatureFlags) {
    if !flags.is_wasi {
        return;
    }
    out.push_str(
        "function wasi_fd_write(fd, iov, iovcnt, pOut) {\n\
         \x20 var text = '';\n\
         \x20 for (var i = 0; i < iovcnt; i++) {\n\
         \x20\x20  var ptr = MU32[(iov >> 2) + i * 2];\n\
         \x20\x20  var len = MU32[(iov >> 2) + i * 2 + 1];\n\
         \x20\x20  text += MStrGet(ptr, len);\n\
         \x20 }\n\
         \x20 WA.print(text);\n\
         \x20 MU32[pOut >> 2] = text.length;\n\
         \x20 return 0;\n\
         }\n",
    );
    if flags.uses_file_descriptors {
        out.push_str(
            "function env_sys_open(pathPtr, flags_) {\n\
             \x20 var path = MStrGet(pathPtr);\n\
             \x20 var sections = WebAssembly.Module.customSections(WM, '|' + path);\n\
             \x20 if (!sections.length) { return -1; }\n\
             \x20 FPTS.push(new Uint8Array(sections[0]), 0);\n\
             \x20 return FPTS.length / 2 - 1;\n\
             }\n\
             function wasi_fd_read(fd, iov, iovcnt, pOut) {\n\
             \x20 var buffer = FPTS[fd * 2], cursor = FPTS[fd * 2 + 1];\n\
             \x20 var ptr = MU32[iov >> 2], len = MU32[(iov >> 2) + 1];\n\
             \x20 var n = Math.min(len, buffer.length - cursor);\n\
             \x20 for (var i = 0; i < n; i++) { MU8[ptr + i] = buffer[cursor + i]; }\n\
             \x20 FPTS[fd * 2 + 1] = cursor + n;\n\
             \x20 MU32[pOut >> 2] = n;\n\
             \x20 return 0;\n\
             }\n\
             function wasi_fd_seek(fd, offset, whence, pOut) {\n\
             \x20 FPTS[fd * 2 + 1] = offset;\n\
             \x20 MU32[pOut >> 2] = offset;\n\
             \x20 return 0;\n\
             }\n\
             function wasi_fd_close(fd) { FPTS[fd * 2] = null; return 0; }\n",
        );
    }
}

fn env_shim_reference(module: &str, field: &str) -> String {
    if field == "sbrk" {
        return "sbrk".to_string();
    }
    if module.starts_with("wasi") {
        return format!("wasi_{field}");
    }
    if math_host_function(field).is_some()
        || matches!(
            field,
            "time" | "gettimeofday" | "clock_gettime" | "clock_getres" | "exit" | "getTempRet0" | "setTempRet0"
        )
        || matches!(field, "__assert_fail" | "__cxa_throw" | "abort" | "longjmp" | "setjmp" | "__cxa_atexit" | "__lock" | "__unlock")
    {
        return format!("env_{field}");
    }
    if field == "__sys_open" {
        return "env_sys_open".to_string();
    }
    "function() { return 0; }".to_string()
}
