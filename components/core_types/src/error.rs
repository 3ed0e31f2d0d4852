//! Classification of catchable language-level errors.

use std::fmt;

/// The kind of a language-level error.
///
/// These correspond to the language's built-in error constructors. Fatal
/// engine conditions (decode corruption, invariant violations) are *not*
/// represented here; they are not catchable by user code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Type error (e.g., writing a property of a primitive)
    TypeError,
    /// Reference error (e.g., access before initialization)
    ReferenceError,
    /// Value out of allowed range
    RangeError,
    /// Syntax error surfaced at runtime (e.g., from dynamic evaluation)
    SyntaxError,
    /// Internal engine error
    InternalError,
}

impl ErrorKind {
    /// Returns the constructor name for this error kind.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::InternalError => "InternalError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
