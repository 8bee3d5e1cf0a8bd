//! Memory provisioning: construct a `WebAssembly.Memory` up
//! front when the module imports one, or capture it from the instance's
//! exports afterward when the module defines its own.

use wajic_module::ImportEntry;
use wajic_module::ImportKind;

/// If the module imports a memory, emit its construction and return
/// `true` — the import object then references the `MEM` variable for
/// that slot instead of a shim function.
pub fn emit_imported_memory(out: &mut String, imports: &[ImportEntry]) -> bool {
    let Some(limits) = imports.iter().find_map(|i| match &i.kind {
        ImportKind::Memory(limits) => Some(*limits),
        _ => None,
    }) else {
        return false;
    };
    out.push_str(&format!("MEM = new WebAssembly.Memory({{ initial: {} }});\n", limits.initial));
    true
}

/// Emitted after instantiation when the module defines (rather than
/// imports) its memory: pull it out of the exports and rebuild views.
pub fn emit_exported_memory_capture(out: &mut String, needs_views: bool) {
    out.push_str("  if (!MEM && ASM.memory) { MEM = ASM.memory; }\n");
    if needs_views {
        out.push_str("  if (MEM) { MSetViews(); }\n");
    }
}
