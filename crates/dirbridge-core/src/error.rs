//! Error types for Dirbridge

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Transport Errors
    #[error("Directory connection failed: {0}")]
    Connection(String),

    // Identity Errors
    #[error("Directory bind rejected: {0}")]
    Bind(String),

    // Search Errors
    #[error("Directory search failed: {0}")]
    Search(String),

    #[error("Filter {filter} matched {count} entries, expected exactly one")]
    AmbiguousMatch { filter: String, count: usize },

    #[error("No directory entry matched: {0}")]
    NotFound(String),

    // Configuration Errors
    #[error("Invalid directory configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::Connection(_) => "ConnectionError",
            Error::Bind(_) => "BindError",
            Error::Search(_) => "SearchError",
            Error::AmbiguousMatch { .. } => "AmbiguousMatchError",
            Error::NotFound(_) => "NotFoundError",
            Error::InvalidConfig(_) => "InvalidConfig",
            Error::Io(_) => "InternalError",
            Error::Other(_) => "InternalError",
        }
    }

    /// Whether the failure came from talking to the directory rather than
    /// from local configuration or I/O.
    pub fn is_directory_error(&self) -> bool {
        matches!(
            self,
            Error::Connection(_)
                | Error::Bind(_)
                | Error::Search(_)
                | Error::AmbiguousMatch { .. }
                | Error::NotFound(_)
        )
    }

    /// Prefix the message with the operation that failed.
    pub fn context(self, operation: &str) -> Self {
        match self {
            Error::Connection(msg) => Error::Connection(format!("{}: {}", operation, msg)),
            Error::Bind(msg) => Error::Bind(format!("{}: {}", operation, msg)),
            Error::Search(msg) => Error::Search(format!("{}: {}", operation, msg)),
            Error::NotFound(msg) => Error::NotFound(format!("{}: {}", operation, msg)),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::Bind("x".into()).code(), "BindError");
        assert_eq!(
            Error::AmbiguousMatch {
                filter: "(uid=a)".into(),
                count: 2
            }
            .code(),
            "AmbiguousMatchError"
        );
        assert!(Error::NotFound("x".into()).is_directory_error());
        assert!(!Error::InvalidConfig("x".into()).is_directory_error());
    }

    #[test]
    fn test_context_prefixes_message() {
        let err = Error::Search("no such object".into()).context("user filter search");
        assert_eq!(
            err.to_string(),
            "Directory search failed: user filter search: no such object"
        );
    }
}
