//! Failure conditions of the property storage contract.

use thiserror::Error;

/// A rejected property or element mutation.
///
/// These are storage-level verdicts; the interpreter converts them into
/// catchable language-level errors (TypeError) at the node boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    /// The property exists but may not be written (frozen object).
    #[error("cannot assign to read only property `{0}`")]
    NotWritable(String),

    /// A new property or element may not be added (sealed/frozen object).
    #[error("cannot add property `{0}`, object is not extensible")]
    NotExtensible(String),

    /// The property exists but may not be deleted (sealed/frozen object).
    #[error("cannot delete property `{0}`")]
    NotConfigurable(String),
}
