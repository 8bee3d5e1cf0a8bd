//! Glues the fragment protocol to the import rewriter: decode
//! every `J.*` import's field name and rewrite the module, in either of
//! two shapes:
//!
//! - [`extract_and_rewrite`] — fragments move *out* into the loader; the
//!   module keeps only a bare short name per import, which is no longer
//!   decodable (re-running this on its output is a no-op, matching the
//!   "module already processed" behavior).
//! - [`rewrite_compact_standalone`] — no loader is emitted, so fragments
//!   stay inside the module in the full compact wire form.

use std::collections::HashMap;

use wajic_error::Result;
use wajic_fragment::{encode_compact, Fragment, NameCounter};
use wajic_module::{FieldAction, ImportEntry, Module};

/// The result of rewriting a module's `J.*` imports.
pub struct Extracted {
    pub module: Module,
    pub fragments: Vec<Fragment>,
    pub rewritten_imports: Vec<ImportEntry>,
}

struct LibraryNaming {
    counter: NameCounter,
    ids: HashMap<String, String>,
    init_emitted: HashMap<String, bool>,
}

impl LibraryNaming {
    fn new() -> Self {
        Self { counter: NameCounter::new(), ids: HashMap::new(), init_emitted: HashMap::new() }
    }

    fn id_for(&mut self, lib: &str) -> String {
        self.ids.entry(lib.to_string()).or_insert_with(|| self.counter.next_name()).clone()
    }

    /// Only the first fragment (by import order) of each library carries
    /// its initializer onward — "one evaluation per unique init text per
    /// library group".
    fn init_for<'a>(&mut self, fragment: &'a Fragment) -> Option<&'a str> {
        if fragment.is_default_library() {
            return fragment.js_init.as_deref();
        }
        let already_emitted = self.init_emitted.entry(fragment.js_lib.clone()).or_insert(false);
        if *already_emitted {
            None
        } else {
            *already_emitted = true;
            fragment.js_init.as_deref()
        }
    }
}

fn decode_each_fragment(
    module: &Module,
    mut on_fragment: impl FnMut(&Fragment, &str) -> FieldAction,
) -> Result<Extracted> {
    let mut name_counter = NameCounter::new();
    let mut fragments = Vec::new();

    let rewritten_bytes = wajic_module::replace_import_field(module.as_bytes(), |entry| {
        if entry.module != "J" {
            return FieldAction::Keep;
        }
        let fragment = match wajic_fragment::decode(&entry.field) {
            Ok(f) => f,
            Err(_) => return FieldAction::Keep, // no js_code: already processed
        };
        let compact_name = name_counter.next_name();
        let action = on_fragment(&fragment, &compact_name);
        fragments.push(fragment);
        action
    })?;

    let rewritten = Module::new(rewritten_bytes);
    let rewritten_imports = rewritten.imports()?;
    Ok(Extracted { module: rewritten, fragments, rewritten_imports })
}

/// Extract every `J.*` fragment out of the module for the loader
/// synthesizer to consume, leaving only a bare compact name behind.
pub fn extract_and_rewrite(module: &Module, _imports: &[ImportEntry]) -> Result<Extracted> {
    decode_each_fragment(module, |_fragment, compact_name| FieldAction::Replace(compact_name.as_bytes().to_vec()))
}

/// Rewrite `J.*` fragments to the compact wire form in place, keeping
/// their code inside the module for the "processed, still standalone"
/// output shape.
pub fn rewrite_compact_standalone(module: &Module) -> Result<Extracted> {
    let mut libraries = LibraryNaming::new();
    decode_each_fragment(module, |fragment, compact_name| {
        let lib_id = if fragment.is_default_library() { None } else { Some(libraries.id_for(&fragment.js_lib)) };
        let init_code = libraries.init_for(fragment);
        let wire = encode_compact(compact_name, &fragment.js_args, &fragment.js_code, lib_id.as_deref(), init_code);
        FieldAction::Replace(wire.into_bytes())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wajic_binfmt::constants::{IMPORT_SECTION_ID, WASM_MAGIC, WASM_VERSION};
    use wajic_binfmt::write_leb128;

    fn module_with_fragment(field: &str) -> Vec<u8> {
        let mut m = Vec::new();
        m.extend_from_slice(&WASM_MAGIC);
        m.extend_from_slice(&WASM_VERSION);

        let mut payload = Vec::new();
        write_leb128(&mut payload, 1);
        write_leb128(&mut payload, 1);
        payload.extend_from_slice(b"J");
        write_leb128(&mut payload, field.len() as u32);
        payload.extend_from_slice(field.as_bytes());
        payload.push(0);
        write_leb128(&mut payload, 0);

        m.push(IMPORT_SECTION_ID);
        write_leb128(&mut m, payload.len() as u32);
        m.extend_from_slice(&payload);
        m
    }

    #[test]
    fn extract_leaves_a_bare_undecodable_name() {
        let bytes = module_with_fragment("log\u{11}(int x)\u{11}{ console.log(x); }");
        let module = Module::new(bytes);
        let imports = module.imports().unwrap();
        let extracted = extract_and_rewrite(&module, &imports).unwrap();

        assert_eq!(extracted.fragments.len(), 1);
        assert_eq!(extracted.fragments[0].js_name, "log");
        assert_eq!(extracted.rewritten_imports[0].field, "a");
    }

    #[test]
    fn extract_is_idempotent_once_names_are_bare() {
        let bytes = module_with_fragment("log\u{11}(int x)\u{11}{ console.log(x); }");
        let module = Module::new(bytes);
        let imports = module.imports().unwrap();
        let first = extract_and_rewrite(&module, &imports).unwrap();

        let second_imports = first.module.imports().unwrap();
        let second = extract_and_rewrite(&first.module, &second_imports).unwrap();
        assert!(second.fragments.is_empty());
        assert_eq!(second.rewritten_imports[0].field, "a");
    }

    #[test]
    fn standalone_rewrite_keeps_code_in_the_field_name() {
        let bytes = module_with_fragment("log\u{11}(int x)\u{11}{ console.log(x); }");
        let module = Module::new(bytes);
        let rewritten = rewrite_compact_standalone(&module).unwrap();
        assert_eq!(rewritten.rewritten_imports[0].field, "a\u{11}x\u{11}{ console.log(x); }");
    }

    #[test]
    fn library_initializer_is_attached_only_once() {
        let mut m = Vec::new();
        m.extend_from_slice(&WASM_MAGIC);
        m.extend_from_slice(&WASM_VERSION);

        let mut payload = Vec::new();
        write_leb128(&mut payload, 2);
        for name in ["f1", "f2"] {
            write_leb128(&mut payload, 1);
            payload.extend_from_slice(b"J");
            let field = format!("{name}\u{11}\u{11}{{return 1}}\u{11}grp\u{11}(grp_state = 1)");
            write_leb128(&mut payload, field.len() as u32);
            payload.extend_from_slice(field.as_bytes());
            payload.push(0);
            write_leb128(&mut payload, 0);
        }
        m.push(IMPORT_SECTION_ID);
        write_leb128(&mut m, payload.len() as u32);
        m.extend_from_slice(&payload);

        let module = Module::new(m);
        let rewritten = rewrite_compact_standalone(&module).unwrap();
        let inits: Vec<bool> = rewritten.rewritten_imports.iter().map(|i| i.field.contains("grp_state")).collect();
        assert_eq!(inits, vec![true, false]);
    }
}
