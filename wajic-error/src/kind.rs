use std::fmt;

/// Which stage of the pipeline raised an [`crate::Error`].
///
/// `Argument` exists only so embedding CLIs can map their own
/// argument-validation failures onto the same enum; this crate never
/// constructs one itself (argument parsing is out of scope for the core).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// CLI argument validation — raised by an external caller, not this crate.
    Argument,
    /// Binary codec, section walker, or fragment protocol failure.
    Format,
    /// Layout verifier inconsistency (missing export, feature without memory).
    Verifier,
    /// The minifier backend rejected or failed to process a fragment.
    Minifier,
    /// Filesystem I/O performed by an embedding caller.
    Io,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Argument => "argument error",
            Self::Format => "format error",
            Self::Verifier => "verifier error",
            Self::Minifier => "minifier error",
            Self::Io => "I/O error",
        };
        f.write_str(s)
    }
}

/// Finer-grained classification used by [`crate::Warning`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An export exists but the generated loader never references it.
    UnusedExport,
    /// An import name the loader synthesizer has no shim for.
    UnknownImport,
}
