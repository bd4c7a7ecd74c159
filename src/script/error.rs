//! Error types for the script compiler.

use std::fmt;

/// An error that occurred while compiling a particle script.
///
/// Carries the originating file name and line so tooling can point at the
/// offending statement.
#[derive(Debug, Clone)]
pub struct CompileError {
    pub message: String,
    pub file: String,
    pub line: usize,
    pub kind: ErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The file could not be read.
    Io,
    /// The raw text could not be tokenized.
    Lex,
    /// The token stream did not form valid statements.
    Parse,
    /// Statements were well-formed but illegal for their context
    /// (imports below top level, circular imports, misplaced blocks).
    Structure,
    /// An object named a base that no previously compiled object provides.
    MissingBase,
    /// An abstract template object was used as an instantiable class.
    AbstractInstantiation,
}

impl CompileError {
    pub fn io(message: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            file: file.into(),
            line: 0,
            kind: ErrorKind::Io,
        }
    }

    pub fn lex(message: impl Into<String>, file: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            file: file.into(),
            line,
            kind: ErrorKind::Lex,
        }
    }

    pub fn parse(message: impl Into<String>, file: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            file: file.into(),
            line,
            kind: ErrorKind::Parse,
        }
    }

    pub fn structure(message: impl Into<String>, file: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            file: file.into(),
            line,
            kind: ErrorKind::Structure,
        }
    }

    pub fn missing_base(message: impl Into<String>, file: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            file: file.into(),
            line,
            kind: ErrorKind::MissingBase,
        }
    }

    pub fn abstract_instantiation(
        message: impl Into<String>,
        file: impl Into<String>,
        line: usize,
    ) -> Self {
        Self {
            message: message.into(),
            file: file.into(),
            line,
            kind: ErrorKind::AbstractInstantiation,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}:{}] {:?}: {}",
            self.file, self.line, self.kind, self.message
        )
    }
}

impl std::error::Error for CompileError {}
