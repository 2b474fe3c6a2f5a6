use std::path::PathBuf;
use thiserror::Error;

/// Error type shared by the normalizer, the record sources and the HTTP side
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Source file missing or unreadable
    #[error("I/O error on '{}': {source}", path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Delimited text could not be read or written
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    /// The search service answered with a non-success status
    #[error("HTTP {status} from {url}: {body}")]
    HttpError {
        status: u16,
        url: String,
        body: String,
    },

    /// Transport-level failure (connection refused, broken body, ...)
    #[error("Request error: {0}")]
    RequestError(#[from] reqwest::Error),

    /// A source row lacks one of the attributes of the fixed record schema
    #[error("Missing field '{field}' for record {id}")]
    MissingField { id: u64, field: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Collection kept answering "already exists" after being deleted
    #[error("Collection '{name}' could not be recreated after {attempts} attempts")]
    RecreateExhausted { name: String, attempts: usize },
}

impl LoaderError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LoaderError::IoError {
            path: path.into(),
            source,
        }
    }

    /// Status code carried by an `HttpError`, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            LoaderError::HttpError { status, .. } => Some(*status),
            LoaderError::RequestError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The service could not be reached at all
    pub fn is_connect(&self) -> bool {
        matches!(self, LoaderError::RequestError(e) if e.is_connect())
    }

    /// Transient server-side failures worth retrying on the read path
    pub fn is_transient(&self) -> bool {
        matches!(self.status(), Some(500 | 502 | 503 | 504))
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, LoaderError>;
