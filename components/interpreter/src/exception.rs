//! Catchable language-level exceptions.

use crate::stack_trace::StackTraceElement;
use core_types::ErrorKind;
use std::fmt;

/// A language-level error in flight.
///
/// Carries the stack trace captured at construction time; once captured,
/// the trace is an immutable snapshot independent of the live call stack.
#[derive(Debug, Clone, PartialEq)]
pub struct JsException {
    kind: ErrorKind,
    message: String,
    stack: Vec<StackTraceElement>,
}

impl JsException {
    /// Creates an exception without a stack trace.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            stack: Vec::new(),
        }
    }

    /// Shorthand for a `TypeError`.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    /// Shorthand for a `ReferenceError`.
    pub fn reference_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ReferenceError, message)
    }

    /// Shorthand for a `RangeError`.
    pub fn range_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RangeError, message)
    }

    /// Attaches a captured stack trace.
    pub fn with_stack(mut self, stack: Vec<StackTraceElement>) -> Self {
        self.stack = stack;
        self
    }

    /// The error classification.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The stack trace captured when the exception was constructed.
    pub fn stack(&self) -> &[StackTraceElement] {
        &self.stack
    }
}

impl fmt::Display for JsException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
