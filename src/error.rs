//! The error taxonomy shared by every public entry point in this crate.

use std::path::PathBuf;

/// Errors that can occur while manipulating sparse files, pack indices,
/// multi-pack indices, Bloom filters, or varint streams.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("I/O error{}: {source}", path.as_ref().map(|p| format!(" ({})", p.display())).unwrap_or_default())]
    Io {
        #[source]
        source: std::io::Error,
        path: Option<PathBuf>,
    },

    #[error("integer overflow: {0}")]
    Overflow(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("domain error: {0}")]
    Domain(String),
}

impl From<std::io::Error> for CoreError {
    fn from(source: std::io::Error) -> Self {
        Self::Io { source, path: None }
    }
}

impl CoreError {
    /// Attach a path to an I/O error for more useful error reporting.
    pub fn with_path(self, path: impl Into<PathBuf>) -> Self {
        match self {
            Self::Io { source, .. } => Self::Io {
                source,
                path: Some(path.into()),
            },
            other => other,
        }
    }

    pub(crate) fn overflow(msg: impl Into<String>) -> Self {
        Self::Overflow(msg.into())
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn domain(msg: impl Into<String>) -> Self {
        Self::Domain(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_mentions_path_when_present() {
        let err = CoreError::from(std::io::Error::other("boom")).with_path("/tmp/x.idx");
        let msg = err.to_string();
        assert!(msg.contains("/tmp/x.idx"));
        assert!(msg.contains("boom"));
    }

    #[test]
    fn io_error_without_path_omits_parens() {
        let err = CoreError::from(std::io::Error::other("boom"));
        let msg = err.to_string();
        assert!(!msg.contains('('));
    }
}
