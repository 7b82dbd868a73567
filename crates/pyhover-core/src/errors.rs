//! Error types for the PyHover core library.

/// Top-level error enum for the PyHover core library.
#[derive(Debug, thiserror::Error)]
pub enum HoverError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {url}")]
    Http { status: u16, url: String },

    #[error("Too many redirects (>{max}) while fetching {url}")]
    TooManyRedirects { url: String, max: usize },

    #[error("Inventory format error: {0}")]
    Format(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl HoverError {
    /// True for failures caused by the remote side or the transport, as
    /// opposed to malformed data.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            HoverError::Network(_)
                | HoverError::Http { .. }
                | HoverError::TooManyRedirects { .. }
                | HoverError::Request(_)
        )
    }
}

#[cfg(feature = "python")]
impl From<HoverError> for pyo3::PyErr {
    fn from(err: HoverError) -> pyo3::PyErr {
        use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
        match &err {
            HoverError::Io(_) => PyIOError::new_err(err.to_string()),
            HoverError::Config(_)
            | HoverError::Parse(_)
            | HoverError::Format(_)
            | HoverError::Json(_) => PyValueError::new_err(err.to_string()),
            _ => PyRuntimeError::new_err(err.to_string()),
        }
    }
}

pub type HoverResult<T> = Result<T, HoverError>;
