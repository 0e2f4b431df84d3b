use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for pinlock operations.
#[derive(Debug, Error, Diagnostic)]
pub enum PinlockError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or unreadable configuration file.
    #[error("Config error: {message}")]
    #[diagnostic(help("Check ~/.pinlock/config.toml for syntax errors"))]
    Config { message: String },

    /// Invalid input manifest (e.g. requirements.in).
    #[error("Manifest error: {message}")]
    #[diagnostic(help("Each line must be a requirement such as `name>=1.0,<2`"))]
    Manifest { message: String },

    /// The package index could not be loaded or queried.
    #[error("Index error: {message}")]
    Index { message: String },

    /// The run was aborted before it finished.
    #[error("Operation cancelled")]
    Cancelled,

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type PinlockResult<T> = miette::Result<T>;
