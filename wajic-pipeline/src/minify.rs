//! The minification driver: wraps an external JS minifier, treated
//! as an opaque `minify(source, options) -> { code } | { error }` service
//! this crate never implements itself.
//!
//! Embedding callers supply their own [`Minifier`] backed by whatever
//! external tool they invoke; [`PassthroughMinifier`] is the identity
//! implementation used when minification is disabled or under test.

use wajic_error::{codes, Error, ErrorCategory, Result};

/// Which of the two presets names is in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinifyPreset {
    /// Aggressive: multiple passes, unsafe math, symbol mangling with a
    /// reserved set covering every public handshake name.
    TopLevel,
    /// Formatting-only, run once after all code is assembled.
    Merge,
}

/// Names the top-level preset must never mangle away.
pub const RESERVED_NAMES: &[&str] =
    &["abort", "MU8", "MU16", "MU32", "MI32", "MF32", "STOP", "TEMP", "MStrPut", "MStrGet", "MArrPut", "ASM", "WM", "J", "N"];

/// Options passed to a [`Minifier`] call.
#[derive(Debug, Clone, Copy)]
pub struct MinifyOptions {
    pub preset: MinifyPreset,
}

/// An external minification backend. Implementors typically shell out to
/// or FFI into a real JS minifier; this crate never parses or transforms
/// JS itself.
pub trait Minifier {
    fn minify(&self, source: &str, options: &MinifyOptions) -> Result<String>;
}

/// Identity minifier: returns the source unchanged. Used when
/// minification is disabled or as a stand-in
/// in tests that don't exercise a real backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughMinifier;

impl Minifier for PassthroughMinifier {
    fn minify(&self, source: &str, _options: &MinifyOptions) -> Result<String> {
        Ok(source.to_string())
    }
}

/// The AST pre-pass for the "HTML-embedded, no outer loader" layout
///: rewrite every `WA.prop`/`WA['prop']` member access
/// (where `prop` is a simple string) to a local `WA_prop` reference.
///
/// This is a textual approximation of the real AST pass — it recognizes
/// the two member-access forms the spec names and leaves everything else
/// untouched. A non-string computed access (`WA[dynamic]`) is a minifier
/// error.
pub fn rewrite_wa_properties(source: &str) -> Result<String> {
    let mut out = String::with_capacity(source.len());
    let bytes = source.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if let Some(rest) = source[i..].strip_prefix("WA.") {
            let prop_len = rest.bytes().take_while(|b| b.is_ascii_alphanumeric() || *b == b'_').count();
            if prop_len > 0 {
                out.push_str("WA_");
                out.push_str(&rest[..prop_len]);
                i += "WA.".len() + prop_len;
                continue;
            }
        } else if let Some(rest) = source[i..].strip_prefix("WA[") {
            if let Some((prop, consumed)) = parse_bracket_key(rest)? {
                out.push_str("WA_");
                out.push_str(&prop);
                i += "WA[".len() + consumed;
                continue;
            }
        }
        let ch = source[i..].chars().next().expect("i < bytes.len()");
        out.push(ch);
        i += ch.len_utf8();
    }
    Ok(out)
}

/// Parses the inside of a `WA[...]` subscript. Returns the extracted
/// property name and how many bytes (up to and including the closing
/// `]`) were consumed, or `None` if this isn't a string-literal key at
/// all (e.g. empty brackets). A non-string, non-identifier-looking key
/// is a hard error (S6).
fn parse_bracket_key(rest: &str) -> Result<Option<(String, usize)>> {
    let quote = match rest.as_bytes().first() {
        Some(b'\'' | b'"') => rest.as_bytes()[0] as char,
        _ => {
            return Err(Error::new(
                ErrorCategory::Minifier,
                codes::NON_SIMPLE_PROPERTY_KEY,
                "WA[...] subscript is not a simple string literal",
            ))
        }
    };
    let body = &rest[1..];
    let Some(close_quote) = body.find(quote) else {
        return Err(Error::new(ErrorCategory::Minifier, codes::NON_SIMPLE_PROPERTY_KEY, "unterminated string in WA[...]"));
    };
    let prop = &body[..close_quote];
    let after_quote = &body[close_quote + 1..];
    let Some(bracket_pos) = after_quote.find(']') else {
        return Err(Error::new(ErrorCategory::Minifier, codes::NON_SIMPLE_PROPERTY_KEY, "unterminated WA[...] subscript"));
    };
    if !after_quote[..bracket_pos].trim().is_empty() {
        return Err(Error::new(ErrorCategory::Minifier, codes::NON_SIMPLE_PROPERTY_KEY, "unexpected text inside WA[...]"));
    }
    let consumed = 1 + close_quote + 1 + bracket_pos + 1;
    Ok(Some((prop.to_string(), consumed)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_returns_source_unchanged() {
        let minifier = PassthroughMinifier;
        let options = MinifyOptions { preset: MinifyPreset::TopLevel };
        assert_eq!(minifier.minify("var x = 1;", &options).unwrap(), "var x = 1;");
    }

    #[test]
    fn rewrites_dot_and_string_subscript_access() {
        let rewritten = rewrite_wa_properties("WA.canvas.width = WA['foo'].bar").unwrap();
        assert_eq!(rewritten, "WA_canvas.width = WA_foo.bar");
    }

    #[test]
    fn dynamic_subscript_is_a_hard_error() {
        let err = rewrite_wa_properties("WA[dynamic]").unwrap_err();
        assert_eq!(err.code(), codes::NON_SIMPLE_PROPERTY_KEY);
    }
}
