//! # datagent-error
//!
//! Unified error handling for datagent, following OpenDAL's error handling practices.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: Know what error occurred (e.g., FrameNotFound, InferenceFailed)
//! - **ErrorStatus**: Decide how to handle it (Permanent, Temporary, Persistent)
//! - **Error Context**: Assist in locating the cause with rich context
//! - **Error Source**: Wrap underlying errors without leaking raw types
//!
//! ## Usage
//!
//! ```rust
//! use datagent_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::FrameNotFound, "no dataframe registered with alias 'prev'")
//!         .with_operation("actions::call_dataframe_method")
//!         .with_context("alias", "prev")
//!         .with_context("method", "describe"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All functions return `Result<T, datagent_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - Same error handled once, subsequent ops only append context
//! - Don't abuse `From<OtherError>` to prevent raw error leakage

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using datagent Error
pub type Result<T> = std::result::Result<T, Error>;
