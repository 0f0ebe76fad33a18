use thiserror::Error;

/// Classifies compiled-database errors for programmatic matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseErrorKind {
    /// Tables violate a structural invariant (bad child range, dangling Huffman index, etc.)
    Corrupt,
    /// Serialized blob is unreadable (wrong magic, unknown version, truncated, oversized)
    InvalidFormat,
}

/// Public suffix engine error types
#[derive(Error, Debug)]
pub enum PslError {
    #[error("Parse error at line {line}: {message}")]
    ParseErrorAtLine { line: usize, message: String },

    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Database error: {message}")]
    Database {
        kind: DatabaseErrorKind,
        message: String,
    },

    #[error("Download error: {0}")]
    DownloadError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Suffix database already installed")]
    AlreadyInstalled,

    #[error("Suffix database not installed")]
    NotInstalled,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl PslError {
    pub(crate) fn corrupt(message: impl Into<String>) -> Self {
        PslError::Database {
            kind: DatabaseErrorKind::Corrupt,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_format(message: impl Into<String>) -> Self {
        PslError::Database {
            kind: DatabaseErrorKind::InvalidFormat,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PslError>;
