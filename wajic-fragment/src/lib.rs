//! The import-fragment protocol: the convention by which the
//! compile-time macro layer packs a JS function body into the textual
//! `field` name of a `J`-module import, delimited by `\x11` (ASCII DC1).
//!
//! ```text
//! js_name \x11 js_args \x11 js_code [\x11 js_lib [\x11 js_init]]
//! ```

mod args;
mod escape;
mod names;

pub use args::normalize_args;
pub use escape::{escape_control_chars, unescape_control_chars};
pub use names::NameCounter;

use wajic_error::{codes, Error, ErrorCategory, Result};

/// The in-band delimiter separating fragment fields inside an import's
/// field name.
pub const DELIMITER: char = '\u{11}';

/// A logical record decoded from one `J.*` import's field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// The original JS identifier this fragment was compiled from.
    pub js_name: String,
    /// Normalized JS argument identifier list (already run through
    /// [`normalize_args`]).
    pub js_args: String,
    /// The function body text, braces (or expression form) included,
    /// verbatim from the compiler — never parsed, only passed through.
    pub js_code: String,
    /// Library group tag; empty string (not `None`) means the default
    /// (unnamed) group, matching the wire form where an absent `js_lib`
    /// field decodes to `""`.
    pub js_lib: String,
    /// One-time initializer block for this fragment's library group, if
    /// any. Wrapped in parentheses at emission time, unwrapped here.
    pub js_init: Option<String>,
}

impl Fragment {
    /// Whether this fragment belongs to the default (unnamed) library
    /// group.
    #[must_use]
    pub fn is_default_library(&self) -> bool {
        self.js_lib.is_empty()
    }
}

/// Decode a `J.*` import field name into a [`Fragment`].
///
/// Splits on [`DELIMITER`] into up to five parts. A record with no
/// `js_code` is a format error — per the design, that case means the
/// module has already been processed once (its field names are now the
/// compact numeric form, not raw fragments) and should not be re-fed
/// through the decoder.
pub fn decode(field: &str) -> Result<Fragment> {
    let parts: Vec<&str> = field.splitn(5, DELIMITER).collect();

    let js_name = parts.first().copied().unwrap_or_default().to_string();
    let raw_args = parts.get(1).copied().unwrap_or_default();
    let js_code = parts.get(2).copied().ok_or_else(|| {
        Error::new(ErrorCategory::Format, codes::FRAGMENT_MISSING_CODE, "module already processed")
    })?;
    let js_lib = parts.get(3).copied().unwrap_or_default().to_string();
    let js_init = parts.get(4).map(unescape_init);

    Ok(Fragment {
        js_name,
        js_args: normalize_args(raw_args),
        js_code: unescape_control_chars(js_code),
        js_lib,
        js_init,
    })
}

fn unescape_init(wrapped: &str) -> String {
    let trimmed = wrapped.strip_prefix('(').and_then(|s| s.strip_suffix(')')).unwrap_or(wrapped);
    unescape_control_chars(trimmed)
}

/// Encode a fragment back to its non-minifying (verbatim) wire form:
/// original name, normalized args, code, and the optional lib/init tail.
///
/// Used when minification is disabled — field names and bodies are
/// emitted unchanged.
#[must_use]
pub fn encode_verbatim(fragment: &Fragment) -> String {
    let mut out = format!(
        "{}{DELIMITER}{}{DELIMITER}{}",
        fragment.js_name,
        fragment.js_args,
        escape_control_chars(&fragment.js_code)
    );
    if !fragment.js_lib.is_empty() || fragment.js_init.is_some() {
        out.push(DELIMITER);
        out.push_str(&fragment.js_lib);
    }
    if let Some(init) = &fragment.js_init {
        out.push(DELIMITER);
        out.push('(');
        out.push_str(&escape_control_chars(init));
        out.push(')');
    }
    out
}

/// Encode a fragment in the compact, post-minification form used once the
/// module has been processed: `new_name`, `new_args`, `new_code`, and
/// optionally `lib_id` followed by a doubled-delimiter-prefixed init block.
///
/// `new_name`/`new_args`/`new_code` are expected to already be the
/// minified text; this function only handles the wire packing.
#[must_use]
pub fn encode_compact(new_name: &str, new_args: &str, new_code: &str, lib_id: Option<&str>, init_code: Option<&str>) -> String {
    let mut out = format!("{new_name}{DELIMITER}{new_args}{DELIMITER}{}", escape_control_chars(new_code));
    if let Some(lib) = lib_id {
        out.push(DELIMITER);
        out.push_str(lib);
    }
    if let Some(init) = init_code {
        // Double delimiter disambiguates "no lib_id, but an init block" from
        // "lib_id present, no init block".
        if lib_id.is_none() {
            out.push(DELIMITER);
        }
        out.push(DELIMITER);
        out.push('(');
        out.push_str(&escape_control_chars(init));
        out.push(')');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_minimal_fragment() {
        let field = "log\u{11}(int x)\u{11}{ console.log(x); }";
        let fragment = decode(field).unwrap();
        assert_eq!(fragment.js_name, "log");
        assert_eq!(fragment.js_args, "x");
        assert_eq!(fragment.js_code, "{ console.log(x); }");
        assert!(fragment.is_default_library());
        assert_eq!(fragment.js_init, None);
    }

    #[test]
    fn decodes_fragment_with_lib_and_init() {
        let field = "draw\u{11}()\u{11}{ return 1; }\u{11}gfx\u{11}(ctx = setup())";
        let fragment = decode(field).unwrap();
        assert_eq!(fragment.js_lib, "gfx");
        assert_eq!(fragment.js_init.as_deref(), Some("ctx = setup()"));
    }

    #[test]
    fn missing_code_is_a_format_error() {
        let err = decode("a\u{11}()").unwrap_err();
        assert_eq!(err.code(), codes::FRAGMENT_MISSING_CODE);
    }

    #[test]
    fn round_trips_fragments_without_the_delimiter() {
        let fragment = Fragment {
            js_name: "f".to_string(),
            js_args: "x, y".to_string(),
            js_code: "{return x+y}".to_string(),
            js_lib: "grp".to_string(),
            js_init: Some("grp_state = {}".to_string()),
        };
        let wire = encode_verbatim(&fragment);
        let decoded = decode(&wire).unwrap();
        assert_eq!(decoded.js_name, fragment.js_name);
        assert_eq!(decoded.js_code, fragment.js_code);
        assert_eq!(decoded.js_lib, fragment.js_lib);
        assert_eq!(decoded.js_init, fragment.js_init);
    }
}
