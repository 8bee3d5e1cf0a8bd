//! Error handling shared by every stage of the wajic pipeline.
//!
//! The pipeline (binary codec → section walker → fragment protocol →
//! layout verifier → loader synthesizer → minifier → artifact assembly)
//! funnels all failures through a single [`Error`] type, categorized so a
//! caller embedding this as a library can match on `category()` without
//! parsing the message text.

pub mod codes;
mod kind;

pub use kind::{ErrorCategory, ErrorKind};

use std::fmt;

/// A specialized `Result` alias for wajic operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type produced by every wajic crate.
///
/// Mirrors the taxonomy in the pipeline's error handling design:
/// `ArgumentError` is left to the embedding CLI, everything else
/// (`FormatError`, `VerifierError`, `MinifierError`, `IOError`) is
/// represented here as an [`ErrorCategory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    category: ErrorCategory,
    code: u16,
    message: String,
    /// Byte offset into the input module, when the failure can be pinned
    /// to one (format errors almost always can).
    offset: Option<usize>,
}

impl Error {
    /// Create a new error with an explicit category and code.
    pub fn new(category: ErrorCategory, code: u16, message: impl Into<String>) -> Self {
        Self { category, code, message: message.into(), offset: None }
    }

    /// Attach a byte offset to this error, for diagnostics that can name one.
    #[must_use]
    pub fn at_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// The error's category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    /// The error's numeric code (see [`codes`]).
    #[must_use]
    pub fn code(&self) -> u16 {
        self.code
    }

    /// The byte offset this error was raised at, if any.
    #[must_use]
    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    /// Construct a [`ErrorCategory::Format`] error.
    pub fn format(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Format, codes::FORMAT_ERROR, message)
    }

    /// Construct a [`ErrorCategory::Format`] error with a byte offset.
    pub fn format_at(offset: usize, message: impl Into<String>) -> Self {
        Self::format(message).at_offset(offset)
    }

    /// Construct a [`ErrorCategory::Verifier`] error naming the offending
    /// import/export.
    pub fn verifier(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Verifier, codes::VERIFIER_ERROR, message)
    }

    /// Construct a [`ErrorCategory::Minifier`] error.
    pub fn minifier(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Minifier, codes::MINIFIER_ERROR, message)
    }

    /// Construct a [`ErrorCategory::Io`] error naming a path.
    pub fn io(path: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self::new(ErrorCategory::Io, codes::IO_ERROR, format!("{path}: {message}"))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset {
            Some(offset) => write!(f, "{} (code {}, offset 0x{:x}): {}", self.category, self.code, offset, self.message),
            None => write!(f, "{} (code {}): {}", self.category, self.code, self.message),
        }
    }
}

impl std::error::Error for Error {}

/// A non-fatal condition the pipeline surfaces but does not abort on:
/// an unused export the verifier could have pruned, or an unknown
/// import serviced by a zero-returning stub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub kind: ErrorKind,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "warning: {}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_offset_when_present() {
        let err = Error::format_at(12, "bad LEB128");
        assert!(err.to_string().contains("0xc"));
        assert_eq!(err.category(), ErrorCategory::Format);
    }

    #[test]
    fn displays_without_offset() {
        let err = Error::verifier("missing malloc export");
        assert!(!err.to_string().contains("offset"));
    }
}
