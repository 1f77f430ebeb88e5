//! Error types for the Tabby bytecode backend

use std::fmt;
use thiserror::Error;

use crate::bytecode::PointId;

/// Source position in Tabby code (1-indexed line and column).
///
/// Assertion failure messages embed this position, so its `Display`
/// form (`line:column`) is part of the runtime report contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourcePos {
    /// Line number (1-indexed)
    pub line: u32,
    /// Column number (1-indexed)
    pub column: u32,
}

impl SourcePos {
    /// Create a new source position
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Main error type for the backend.
///
/// Every variant is an internal-invariant violation: the upstream
/// type-checker is assumed to have rejected source-level errors, and a
/// failing test at run time is ordinary data, not an error. When one of
/// these surfaces, emission of the enclosing class must be aborted so no
/// partial artifact is finalized.
#[derive(Error, Debug)]
pub enum Error {
    /// A jump refers to a program point that is no longer present in the
    /// instruction sequence.
    #[error("InternalError: jump target {target:?} no longer exists in the instruction sequence")]
    DanglingJump {
        /// The unresolvable program point
        target: PointId,
    },

    /// Two control-flow paths reach the same instruction with different
    /// operand-stack depths.
    #[error("InternalError: stack depth mismatch at instruction {offset}: {expected} vs {found}")]
    StackMismatch {
        /// Index of the instruction in the flat sequence
        offset: usize,
        /// Depth recorded by the first path to reach it
        expected: u32,
        /// Depth computed by the conflicting path
        found: u32,
    },

    /// An instruction pops more operands than the stack holds.
    #[error("InternalError: operand stack underflow at instruction {offset}")]
    StackUnderflow {
        /// Index of the instruction in the flat sequence
        offset: usize,
    },

    /// Catch-all internal invariant violation.
    #[error("InternalError: {0}")]
    Internal(String),
}

impl Error {
    /// Create a catch-all internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal(message.into())
    }
}

/// Result type alias used throughout the backend
pub type Result<T> = std::result::Result<T, Error>;
