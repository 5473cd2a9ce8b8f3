//! Error kinds for datagent operations

use std::fmt;

/// The kind of error that occurred.
///
/// Callers match on `ErrorKind` to decide how to react. The agent loop itself
/// only ever sees these through failure envelopes or generator failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    /// The requested feature or operation is not supported
    Unsupported,

    /// Invalid configuration or parameters
    ConfigInvalid,

    // =========================================================================
    // Action errors
    // =========================================================================
    /// No action registered under the requested name
    ActionNotFound,

    /// An action handler failed while executing
    ActionFailed,

    /// An action handler panicked
    ActionPanicked,

    /// Invalid argument passed to an action
    InvalidArgument,

    /// Method is not on the allow-list for a frame or column
    MethodNotAllowed,

    // =========================================================================
    // Tabular data errors
    // =========================================================================
    /// No dataframe registered under the requested alias
    FrameNotFound,

    /// Column is missing from a dataframe
    ColumnNotFound,

    /// Operation is not defined for the column's dtype
    TypeMismatch,

    // =========================================================================
    // Cache errors
    // =========================================================================
    /// Response cache read or write failed
    CacheFailed,

    /// Serialization/deserialization failed
    SerializationFailed,

    // =========================================================================
    // Inference/LLM errors
    // =========================================================================
    /// LLM inference failed
    InferenceFailed,

    /// Provider not available
    ProviderUnavailable,

    /// Rate limit exceeded
    RateLimited,

    /// Credentials were rejected by the provider
    AuthenticationFailed,

    // =========================================================================
    // IO errors
    // =========================================================================
    /// File not found
    FileNotFound,

    /// Permission denied
    PermissionDenied,

    /// IO operation failed
    IoFailed,

    /// Network error
    NetworkFailed,

    // =========================================================================
    // Parse errors
    // =========================================================================
    /// Failed to parse input
    ParseFailed,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            // General
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::Unsupported => "Unsupported",
            ErrorKind::ConfigInvalid => "ConfigInvalid",

            // Action
            ErrorKind::ActionNotFound => "ActionNotFound",
            ErrorKind::ActionFailed => "ActionFailed",
            ErrorKind::ActionPanicked => "ActionPanicked",
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::MethodNotAllowed => "MethodNotAllowed",

            // Tabular
            ErrorKind::FrameNotFound => "FrameNotFound",
            ErrorKind::ColumnNotFound => "ColumnNotFound",
            ErrorKind::TypeMismatch => "TypeMismatch",

            // Cache
            ErrorKind::CacheFailed => "CacheFailed",
            ErrorKind::SerializationFailed => "SerializationFailed",

            // Inference
            ErrorKind::InferenceFailed => "InferenceFailed",
            ErrorKind::ProviderUnavailable => "ProviderUnavailable",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::AuthenticationFailed => "AuthenticationFailed",

            // IO
            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::IoFailed => "IoFailed",
            ErrorKind::NetworkFailed => "NetworkFailed",

            // Parse
            ErrorKind::ParseFailed => "ParseFailed",
        }
    }

    /// Check if this error kind is retryable by default
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::InferenceFailed
                | ErrorKind::NetworkFailed
                | ErrorKind::RateLimited
                | ErrorKind::ProviderUnavailable
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::FrameNotFound.to_string(), "FrameNotFound");
        assert_eq!(ErrorKind::InferenceFailed.to_string(), "InferenceFailed");
    }

    #[test]
    fn test_is_retryable() {
        assert!(ErrorKind::NetworkFailed.is_retryable());
        assert!(ErrorKind::RateLimited.is_retryable());
        assert!(!ErrorKind::FileNotFound.is_retryable());
        assert!(!ErrorKind::MethodNotAllowed.is_retryable());
    }
}
