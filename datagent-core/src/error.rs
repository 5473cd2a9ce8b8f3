//! Core error helpers
//!
//! Re-exports datagent-error and provides core-specific conveniences.

pub use datagent_error::{Error, ErrorKind, ErrorStatus, Result};

// =============================================================================
// Core-specific error constructors
// =============================================================================

/// Create a FileNotFound error with the message shown to the model
pub fn file_not_found(path: impl Into<String>) -> Error {
    let path = path.into();
    Error::new(ErrorKind::FileNotFound, format!("File not found at path: {}", path))
        .with_context("path", path)
}

/// Create an Unsupported error for a file format the reader cannot handle
pub fn unsupported_format(path: impl Into<String>) -> Error {
    let path = path.into();
    Error::unsupported("Only .csv files are supported for reading.").with_context("path", path)
}

/// Create a missing-argument error
pub fn missing_argument(name: &str) -> Error {
    Error::invalid_argument(format!("missing required argument '{}'", name))
        .with_context("argument", name.to_string())
}

/// Create a wrong-type argument error
pub fn argument_type(name: &str, expected: &str) -> Error {
    Error::invalid_argument(format!("argument '{}' must be {}", name, expected))
        .with_context("argument", name.to_string())
        .with_context("expected", expected.to_string())
}

/// Create a TypeMismatch error for a column operation
pub fn type_mismatch(column: impl Into<String>, dtype: &str, method: &str) -> Error {
    let column = column.into();
    Error::new(
        ErrorKind::TypeMismatch,
        format!("cannot compute {} of column '{}' with dtype {}", method, column, dtype),
    )
    .with_context("column", column)
    .with_context("dtype", dtype.to_string())
}

/// Create an IoFailed error
pub fn io_error(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::IoFailed, message)
}

/// Create a SerializationFailed error
pub fn serialization_error(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::SerializationFailed, message)
}

/// Create a CacheFailed error
pub fn cache_failed(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::CacheFailed, message)
}

/// Create a ParseFailed error
pub fn parse_error(message: impl Into<String>) -> Error {
    Error::parse_failed(message)
}
