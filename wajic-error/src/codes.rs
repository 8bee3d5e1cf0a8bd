//! Numeric error codes, grouped by category in the style of `wrt_error::codes`.
//!
//! Codes are stable identifiers a caller can match on; the message text is
//! free to change between versions.

// Format errors (1000-1999): binary codec, section walker, fragment protocol.
/// Generic format error; more specific codes below narrow the cause.
pub const FORMAT_ERROR: u16 = 1000;
/// LEB128 exceeded 32 bits or ran past the end of the buffer.
pub const LEB128_OVERFLOW: u16 = 1001;
/// Invalid UTF-8 in a name or string field.
pub const INVALID_UTF8: u16 = 1002;
/// The 4-byte magic did not match `\0asm`.
pub const INVALID_MAGIC: u16 = 1003;
/// The version field did not match the supported version.
pub const UNSUPPORTED_VERSION: u16 = 1004;
/// A section's declared length runs past the end of the module.
pub const SECTION_OVERRUNS_MODULE: u16 = 1005;
/// `get_init_expr` saw something other than `i32.const N end`.
pub const UNSUPPORTED_INIT_EXPR: u16 = 1006;
/// A `J`-module import's field name had no `js_code` component.
pub const FRAGMENT_MISSING_CODE: u16 = 1007;
/// A fragment field contained the `\x11` delimiter unescaped.
pub const FRAGMENT_DELIMITER_COLLISION: u16 = 1008;
/// An import/export kind tag was not one of the four known values.
pub const INVALID_IMPORT_KIND: u16 = 1009;

// Verifier errors (2000-2999): layout verifier.
/// Generic verifier error.
pub const VERIFIER_ERROR: u16 = 2000;
/// A feature flag that requires linear memory was set, but no memory is
/// imported or exported.
pub const MISSING_MEMORY: u16 = 2001;
/// A feature flag that requires `malloc`/`free` was set, but the module
/// does not export them.
pub const MISSING_ALLOCATOR_EXPORT: u16 = 2002;

// Minifier errors (3000-3999).
/// Generic minifier failure.
pub const MINIFIER_ERROR: u16 = 3000;
/// The minifier rejected the source with a line/column diagnostic.
pub const MINIFIER_SYNTAX_ERROR: u16 = 3001;
/// The AST pre-pass found a computed `WA[...]` property access.
pub const NON_SIMPLE_PROPERTY_KEY: u16 = 3002;

// I/O errors (4000-4999): left mostly to the embedding CLI.
/// Generic I/O failure reported with a path.
pub const IO_ERROR: u16 = 4000;
