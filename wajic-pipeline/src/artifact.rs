//! Artifact assembly: choose which of {module, loader, HTML} to
//! produce from the pipeline's intermediate results and stitch them
//! together.

use wajic_error::Result;

/// Which artifacts the caller wants produced. The HTML shell template
/// itself is out of scope; this crate only decides whether to
/// inline or link the loader inside it, given a template the caller
/// supplies.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactRequest {
    pub emit_module: bool,
    pub emit_loader: bool,
    pub html: Option<HtmlRequest>,
}

/// How to fold the loader into an HTML shell, when requested.
#[derive(Debug, Clone, Copy)]
pub struct HtmlRequest {
    /// Inline the loader as a `<script>` body rather than a `src=` link.
    pub inline_script: bool,
}

/// The produced set of artifacts, any subset of which may be absent
/// depending on the request.
#[derive(Debug, Clone, Default)]
pub struct Artifact {
    pub module_bytes: Option<Vec<u8>>,
    pub loader_source: Option<String>,
    pub html: Option<String>,
}

/// Stitch together whichever of {module, loader, HTML} `request` asks
/// for, from the module bytes and (already minified) loader source the
/// pipeline produced.
pub fn assemble(request: &ArtifactRequest, module_bytes: Vec<u8>, loader_source: String) -> Result<Artifact> {
    let mut artifact = Artifact::default();

    if request.emit_module {
        artifact.module_bytes = Some(module_bytes);
    }
    if request.emit_loader {
        artifact.loader_source = Some(loader_source.clone());
    }
    if let Some(html_request) = request.html {
        artifact.html = Some(render_html_shell(&loader_source, html_request));
    }

    Ok(artifact)
}

/// A minimal HTML shell. The real page template (progress bar, styling)
/// is an external concern; this only decides the `<script>` form.
fn render_html_shell(loader_source: &str, request: HtmlRequest) -> String {
    if request.inline_script {
        format!("<!DOCTYPE html>\n<html><body><script>\n{loader_source}\n</script></body></html>\n")
    } else {
        "<!DOCTYPE html>\n<html><body><script src=\"loader.js\"></script></body></html>\n".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_only_the_requested_subset() {
        let request = ArtifactRequest { emit_module: true, emit_loader: false, html: None };
        let artifact = assemble(&request, vec![1, 2, 3], "var x;".to_string()).unwrap();
        assert!(artifact.module_bytes.is_some());
        assert!(artifact.loader_source.is_none());
        assert!(artifact.html.is_none());
    }

    #[test]
    fn inline_html_embeds_the_loader_source() {
        let request = ArtifactRequest { emit_module: false, emit_loader: false, html: Some(HtmlRequest { inline_script: true }) };
        let artifact = assemble(&request, vec![], "var x = 1;".to_string()).unwrap();
        assert!(artifact.html.unwrap().contains("var x = 1;"));
    }

    #[test]
    fn linked_html_references_a_sibling_script() {
        let request = ArtifactRequest { emit_module: false, emit_loader: false, html: Some(HtmlRequest { inline_script: false }) };
        let artifact = assemble(&request, vec![], "ignored".to_string()).unwrap();
        assert!(artifact.html.unwrap().contains("src=\"loader.js\""));
    }
}
