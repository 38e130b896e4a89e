use crate::sql::lexer::Position;
use crate::sql::types::DataType;
use thiserror::Error;

/// Coarse error categories, one per failure family a caller may want to
/// branch on without inspecting the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lexical,
    Syntax,
    Schema,
    Validation,
    UnsupportedExpression,
    Evaluation,
    Config,
    Backend,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Lexical error at {position}: {message}")]
    Lexical { message: String, position: Position },

    #[error("Syntax error at token {token_index} ({position}): expected {expected}, found {found}")]
    Syntax {
        expected: String,
        found: String,
        token_index: usize,
        position: Position,
    },

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Table already exists: {0}")]
    TableAlreadyExists(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("Row width mismatch for table {table}: expected {expected} values, found {found}")]
    RowWidthMismatch {
        table: String,
        expected: usize,
        found: usize,
    },

    #[error("NULL value in non-nullable column: {0}")]
    NullConstraintViolation(String),

    #[error("Type mismatch in column {column}: expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        found: DataType,
    },

    #[error("Unsupported expression: {0}")]
    UnsupportedExpression(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Integer overflow: {0}")]
    IntegerOverflow(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Execution backend error: {0}")]
    Backend(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Lexical { .. } => ErrorKind::Lexical,
            Error::Syntax { .. } => ErrorKind::Syntax,
            Error::TableNotFound(_)
            | Error::TableAlreadyExists(_)
            | Error::ColumnNotFound(_)
            | Error::DuplicateColumn(_) => ErrorKind::Schema,
            Error::RowWidthMismatch { .. }
            | Error::NullConstraintViolation(_)
            | Error::TypeMismatch { .. } => ErrorKind::Validation,
            Error::UnsupportedExpression(_) => ErrorKind::UnsupportedExpression,
            Error::InvalidOperation(_) | Error::DivisionByZero | Error::IntegerOverflow(_) => {
                ErrorKind::Evaluation
            }
            Error::Config(_) => ErrorKind::Config,
            Error::Backend(_) => ErrorKind::Backend,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
