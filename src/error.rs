use std::fmt;

use thiserror::Error;

use crate::analyzer::Ty;

pub type CompileResult<T> = Result<T, CompileError>;

/// Every way a compilation can fail. The first error aborts the whole run.
#[derive(Debug, Error, PartialEq)]
pub enum CompileError {
    #[error("line {line}: {kind}")]
    Lexical { line: usize, kind: LexicalErrorKind },

    #[error("line {line}: expected one of [{}], got {actual}", .expected.join(", "))]
    Syntax {
        line: usize,
        expected: Vec<&'static str>,
        actual: &'static str,
    },

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Name(#[from] NameError),

    #[error("function {name} expects {expected} arguments, {given} given")]
    Arity {
        name: String,
        expected: usize,
        given: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum LexicalErrorKind {
    InvalidCharacter(char),
    UnterminatedString,
    /// A lone `.` that does not start `..`.
    InvalidOperator(Option<char>),
    IntegerOutOfRange(String),
}

impl fmt::Display for LexicalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexicalErrorKind::InvalidCharacter(c) => write!(f, "not a valid character: {c:?}"),
            LexicalErrorKind::UnterminatedString => write!(f, "quotation mark is not closed"),
            LexicalErrorKind::InvalidOperator(Some(c)) => {
                write!(f, "not a valid operator: '.{c}'")
            }
            LexicalErrorKind::InvalidOperator(None) => write!(f, "not a valid operator: '.'"),
            LexicalErrorKind::IntegerOutOfRange(s) => {
                write!(f, "integer literal {s} does not fit in 32 bits")
            }
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TypeError {
    #[error("\"{op}\" operator is only allowed with INT data, got {left} and {right}")]
    Arithmetic {
        op: &'static str,
        left: Ty,
        right: Ty,
    },

    #[error("\"{op}\" operator can't be used between data with different types ({left} and {right})")]
    Mismatch {
        op: &'static str,
        left: Ty,
        right: Ty,
    },

    #[error("unary \"{op}\" operator is only allowed with INT data, got {operand}")]
    Unary { op: &'static str, operand: Ty },

    #[error("\"..\" operator is only allowed with INT or STRING data, got {left} and {right}")]
    Concat { left: Ty, right: Ty },
}

#[derive(Debug, Error, PartialEq)]
pub enum NameError {
    #[error("variable {0} already declared")]
    DuplicateVariable(String),
    #[error("variable {0} not declared")]
    UndeclaredVariable(String),
    #[error("function {0} already declared")]
    DuplicateFunction(String),
    #[error("function {0} not declared")]
    UndeclaredFunction(String),
}
