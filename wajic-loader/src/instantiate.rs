//! Instantiation harness: wires the decoded/fetched module bytes
//! and the constructed import object into a `WebAssembly.instantiate`
//! call, capturing the resulting module/exports onto `WM`/`ASM`.

use crate::ModuleSource;

/// How an externally-sourced module's bytes are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstantiationMode {
    /// `fetch(url).then(r => r.arrayBuffer())` then instantiate.
    FetchArrayBuffer,
    /// `WebAssembly.instantiateStreaming(fetch(url), imports)`.
    Streaming,
    /// Node-style host: read the module from the local filesystem.
    NodeFilesystem,
}

pub fn emit(out: &mut String, source: &ModuleSource, module_expr: &str) {
    match source {
        ModuleSource::Inline { .. } => {
            out.push_str(&format!("WebAssembly.instantiate({module_expr}, imports).then(function(output) {{\n"));
        }
        ModuleSource::External { url, mode: InstantiationMode::Streaming } => {
            out.push_str(&format!(
                "WebAssembly.instantiateStreaming(fetch({url:?}), imports).then(function(output) {{\n"
            ));
        }
        ModuleSource::External { url, mode: InstantiationMode::FetchArrayBuffer } => {
            out.push_str(&format!(
                "fetch({url:?}).then(function(r) {{ return r.arrayBuffer(); }}).then(function(bytes) {{\n\
                 \x20 return WebAssembly.instantiate(bytes, imports);\n\
                 }}).then(function(output) {{\n"
            ));
        }
        ModuleSource::External { url, mode: InstantiationMode::NodeFilesystem } => {
            out.push_str(&format!(
                "Promise.resolve(require('fs').readFileSync({url:?})).then(function(bytes) {{\n\
                 \x20 return WebAssembly.instantiate(bytes, imports);\n\
                 }}).then(function(output) {{\n"
            ));
        }
    }
    out.push_str("  WM = output.module;\n");
    out.push_str("  ASM = output.instance.exports;\n");
    out.push_str("  WA.wm = WM;\n");
    out.push_str("  WA.asm = ASM;\n");
}
