use thiserror::Error;

use crate::ast::SourceLocation;

/// Category of a compile error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// A token did not match the expected kind or set.
    #[error("syntax error")]
    Syntax,
    /// A name was used without a visible declaration.
    #[error("undeclared identifier")]
    UndeclaredIdentifier,
    /// Operand types are incompatible with the operation.
    #[error("type error")]
    Type,
}

/// The first error found in a source text. Parsing stops as soon as one is raised.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} at {loc}: {msg}")]
pub struct CompileError {
    pub kind: ErrorKind,
    pub msg: String,
    pub loc: SourceLocation,
}

impl CompileError {
    pub fn new<M: Into<String>>(kind: ErrorKind, msg: M, loc: SourceLocation) -> Self {
        Self { kind, msg: msg.into(), loc }
    }

    pub fn syntax<M: Into<String>>(msg: M, loc: SourceLocation) -> Self {
        Self::new(ErrorKind::Syntax, msg, loc)
    }

    pub fn undeclared(name: &str, loc: SourceLocation) -> Self {
        Self::new(ErrorKind::UndeclaredIdentifier, format!("undeclared variable `{}`", name), loc)
    }

    pub fn type_error<M: Into<String>>(msg: M, loc: SourceLocation) -> Self {
        Self::new(ErrorKind::Type, msg, loc)
    }
}

pub type CompileResult<T> = Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_kind_location_and_message() {
        let err = CompileError::undeclared("x", SourceLocation::new(3, 7));
        assert_eq!(err.kind, ErrorKind::UndeclaredIdentifier);
        assert_eq!(err.to_string(), "undeclared identifier at 3:7: undeclared variable `x`");
    }
}
