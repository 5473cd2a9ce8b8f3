//! The main Error type for datagent

use crate::{ErrorKind, ErrorStatus};
use std::fmt;

/// Error raised anywhere in a datagent run.
///
/// Carries a [`ErrorKind`], the message the model or user sees, a retry
/// [`ErrorStatus`], the operation that failed, key-value context and an
/// optional source. `Display` is one line for logs; `Debug` is the
/// multi-line traceback stored in failure envelopes.
///
/// ```rust
/// use datagent_error::{Error, ErrorKind};
///
/// let err = Error::column_not_found("revenue")
///     .with_operation("actions::describe_column")
///     .with_context("path", "data/targets_2024.csv");
///
/// assert_eq!(err.kind(), ErrorKind::ColumnNotFound);
/// assert!(!err.is_retryable());
/// assert!(err.traceback().contains("path: data/targets_2024.csv"));
/// ```
pub struct Error {
    kind: ErrorKind,
    message: String,
    status: ErrorStatus,
    operation: &'static str,
    context: Vec<(&'static str, String)>,
    source: Option<anyhow::Error>,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let status = if kind.is_retryable() {
            ErrorStatus::Temporary
        } else {
            ErrorStatus::Permanent
        };

        Self {
            kind,
            message: message.into(),
            status,
            operation: "",
            context: Vec::new(),
            source: None,
        }
    }

    // =========================================================================
    // Getters
    // =========================================================================

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the error status
    pub fn status(&self) -> ErrorStatus {
        self.status
    }

    /// Get the operation that caused this error
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Get the context key-value pairs
    pub fn context(&self) -> &[(&'static str, String)] {
        &self.context
    }

    // =========================================================================
    // Builders (chainable)
    // =========================================================================

    /// Set the operation that caused this error.
    ///
    /// If an operation was already set, the previous one is moved to context
    /// as "called" to preserve the call chain.
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        if !self.operation.is_empty() {
            self.context.push(("called", self.operation.to_string()));
        }
        self.operation = operation;
        self
    }

    /// Add context to the error
    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    /// Set the source error.
    ///
    /// # Panics (debug only)
    /// Panics in debug mode if source was already set.
    pub fn set_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.source.is_none(), "source error already set");
        self.source = Some(source.into());
        self
    }

    /// Give up on a temporary error once its retries are spent
    pub fn persist(mut self) -> Self {
        self.status = self.status.persist();
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.status.is_retryable()
    }

    /// Multi-line report recorded as the traceback of a failed action
    pub fn traceback(&self) -> String {
        format!("{:?}", self)
    }
}

// =============================================================================
// Display - compact, single-line format for logs
// =============================================================================

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) at {}", self.kind, self.status, self.operation)?;

        if !self.context.is_empty() {
            write!(f, ", context {{ ")?;
            for (i, (key, value)) in self.context.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", key, value)?;
            }
            write!(f, " }}")?;
        }

        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }

        Ok(())
    }
}

// =============================================================================
// Debug - verbose, multi-line format for debugging
// =============================================================================

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({}) at {}", self.kind, self.status, self.operation)?;

        if !self.message.is_empty() {
            writeln!(f)?;
            writeln!(f, "    Message: {}", self.message)?;
        }

        if !self.context.is_empty() {
            writeln!(f)?;
            writeln!(f, "    Context:")?;
            for (key, value) in &self.context {
                writeln!(f, "        {}: {}", key, value)?;
            }
        }

        if let Some(source) = &self.source {
            writeln!(f)?;
            writeln!(f, "    Source: {:?}", source)?;
        }

        Ok(())
    }
}

// =============================================================================
// std::error::Error implementation
// =============================================================================

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

// =============================================================================
// Convenient From implementations (be careful not to leak raw errors!)
// =============================================================================

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            _ => ErrorKind::IoFailed,
        };
        Error::new(kind, err.to_string())
            .with_operation("io")
            .set_source(err)
    }
}

// =============================================================================
// Convenience constructors
// =============================================================================

impl Error {
    /// Create an Unsupported error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unsupported, message)
    }

    /// Create a ConfigInvalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create an InvalidArgument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Create an ActionNotFound error
    pub fn action_not_found(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(ErrorKind::ActionNotFound, format!("action '{}' is not registered", name))
            .with_context("action", name)
    }

    /// Create a FrameNotFound error
    pub fn frame_not_found(alias: impl Into<String>) -> Self {
        let alias = alias.into();
        Self::new(
            ErrorKind::FrameNotFound,
            format!("No dataframe registered with alias '{}'", alias),
        )
        .with_context("alias", alias)
    }

    /// Create a ColumnNotFound error
    pub fn column_not_found(column: impl Into<String>) -> Self {
        let column = column.into();
        Self::new(ErrorKind::ColumnNotFound, format!("Column {} not found", column))
            .with_context("column", column)
    }

    /// Create a MethodNotAllowed error
    pub fn method_not_allowed(method: impl Into<String>) -> Self {
        let method = method.into();
        Self::new(ErrorKind::MethodNotAllowed, format!("Method {} not allowed", method))
            .with_context("method", method)
    }

    /// Create an InferenceFailed error
    pub fn inference_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InferenceFailed, message)
    }

    /// Create a ParseFailed error
    pub fn parse_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseFailed, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sets_status_from_kind() {
        let err = Error::new(ErrorKind::FrameNotFound, "no frame 'prev'");
        assert_eq!(err.message(), "no frame 'prev'");
        assert_eq!(err.status(), ErrorStatus::Permanent);

        let err = Error::new(ErrorKind::RateLimited, "429 from provider");
        assert_eq!(err.status(), ErrorStatus::Temporary);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_operation_chain_moves_to_context() {
        let err = Error::column_not_found("sbti_id")
            .with_operation("frame::merge")
            .with_operation("actions::merge_dataframes");

        assert_eq!(err.operation(), "actions::merge_dataframes");
        assert_eq!(
            err.context(),
            &[
                ("column", "sbti_id".to_string()),
                ("called", "frame::merge".to_string()),
            ]
        );
    }

    #[test]
    fn test_persist_after_retries() {
        let err = Error::new(ErrorKind::NetworkFailed, "connection reset");
        assert!(err.is_retryable());

        let err = err.persist();
        assert!(!err.is_retryable());
        assert_eq!(err.status(), ErrorStatus::Persistent);
    }

    #[test]
    fn test_display_is_one_line() {
        let err = Error::new(ErrorKind::InferenceFailed, "model returned no choices")
            .with_operation("generator::generate")
            .with_context("model", "gpt-4o");

        assert_eq!(
            err.to_string(),
            "InferenceFailed (temporary) at generator::generate, context { model: gpt-4o } => model returned no choices"
        );
    }

    #[test]
    fn test_traceback_is_multiline() {
        let err = Error::frame_not_found("prev").with_operation("actions::call_column_method");
        let traceback = err.traceback();

        assert!(traceback.lines().count() > 1);
        assert!(traceback.starts_with("FrameNotFound (permanent) at actions::call_column_method"));
        assert!(traceback.contains("Message: No dataframe registered with alias 'prev'"));
        assert!(traceback.contains("alias: prev"));
    }

    #[test]
    fn test_domain_constructors() {
        assert_eq!(Error::method_not_allowed("drop").message(), "Method drop not allowed");
        assert_eq!(Error::column_not_found("revenue").message(), "Column revenue not found");

        let err = Error::action_not_found("read_minds");
        assert_eq!(err.kind(), ErrorKind::ActionNotFound);
        assert_eq!(err.context(), &[("action", "read_minds".to_string())]);
    }

    #[test]
    fn test_missing_csv_maps_to_file_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "targets_2024.csv");
        let err = Error::from(io_err);

        assert_eq!(err.kind(), ErrorKind::FileNotFound);
        assert_eq!(err.operation(), "io");
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.traceback().contains("Source: "));
    }
}
