//! Source location types for error reporting and stack traces.

/// A position in source code.
///
/// Used by stack trace elements and error reporting to indicate where an
/// event occurred.
///
/// # Examples
///
/// ```
/// use core_types::SourcePosition;
///
/// let pos = SourcePosition { line: 10, column: 5, char_index: 150 };
/// assert_eq!(pos.line, 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePosition {
    /// Line number (1-indexed)
    pub line: u32,
    /// Column number (1-indexed)
    pub column: u32,
    /// Character offset from the start of the source
    pub char_index: usize,
}

/// A section of a source file, possibly unavailable.
///
/// Sections of internal or synthesized sources carry no position; such
/// sections are "unavailable" and render as `<unknown>` in stack traces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSection {
    /// Name of the source file this section belongs to
    pub file_name: String,
    /// Position of the section, or `None` when unavailable
    pub position: Option<SourcePosition>,
}

impl SourceSection {
    /// Creates an available section at the given position.
    pub fn new(file_name: impl Into<String>, line: u32, column: u32, char_index: usize) -> Self {
        Self {
            file_name: file_name.into(),
            position: Some(SourcePosition {
                line,
                column,
                char_index,
            }),
        }
    }

    /// Creates an unavailable section for the given source.
    pub fn unavailable(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            position: None,
        }
    }

    /// Returns whether position information is present.
    pub fn is_available(&self) -> bool {
        self.position.is_some()
    }
}
