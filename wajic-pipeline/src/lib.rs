//! The top-level pipeline: raw module bytes → section walk →
//! fragment extraction + field rewrite → feature flags → loader text →
//! optional minify → final artifacts.
//!
//! Each stage is a thin wrapper delegating to the crate that owns it
//! (`wajic-module`, `wajic-fragment`, `wajic-verify`, `wajic-loader`); this
//! crate's job is only to sequence them and assemble the result the
//! embedding caller asked for.

mod artifact;
mod compact;
mod minify;

pub use artifact::{assemble, Artifact, ArtifactRequest};
pub use compact::{extract_and_rewrite, rewrite_compact_standalone, Extracted};
pub use minify::{MinifyOptions, MinifyPreset, Minifier, PassthroughMinifier};

use wajic_error::Result;
use wajic_loader::{LoaderInput, ModuleSource};
use wajic_module::Module;
use wajic_verify::VerifierInput;

/// Run the full pipeline over one input module and produce the artifacts
/// named in `request`.
///
/// When no loader or HTML shell is requested, fragments are rewritten to
/// the compact wire form and stay *inside* the module, as a processed but
/// still-standalone module; only when a loader (or an HTML shell embedding
/// one) is requested are fragments extracted out of the module and into
/// the loader's `J` table instead.
pub fn run(
    input_bytes: Vec<u8>,
    minifier: &dyn Minifier,
    module_source_for_loader: ModuleSource,
    html_embedded: bool,
    request: &ArtifactRequest,
) -> Result<Artifact> {
    let module = Module::new(input_bytes);
    let imports = module.imports()?;

    let needs_loader = request.emit_loader || request.html.is_some();

    let compacted = if needs_loader {
        compact::extract_and_rewrite(&module, &imports)?
    } else {
        compact::rewrite_compact_standalone(&module)?
    };

    let exports = compacted.module.exports()?;
    let has_memory = module.imported_memory_initial_pages()?.is_some() || module.defined_memory_initial_pages()?.is_some();

    let verifier_input = VerifierInput {
        imports: &compacted.rewritten_imports,
        fragments: &compacted.fragments,
        exports: &exports,
        has_memory,
    };
    let (flags, warnings) = wajic_verify::verify(&verifier_input)?;
    for warning in &warnings {
        log::warn!("{warning}");
    }

    let loader_source = if needs_loader {
        let loader_input = LoaderInput {
            imports: &compacted.rewritten_imports,
            exports: &exports,
            fragments: &compacted.fragments,
            flags: &flags,
            module_source: module_source_for_loader,
            html_embedded,
        };
        let loader_source = wajic_loader::synthesize(&loader_input)?;
        let top_level_options = MinifyOptions { preset: MinifyPreset::TopLevel };
        minifier.minify(&loader_source, &top_level_options)?
    } else {
        String::new()
    };

    assemble(request, compacted.module.into_bytes(), loader_source)
}
