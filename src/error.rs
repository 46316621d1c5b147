use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Tokio Join Error, couldn't await a task! {0}")]
    RuntimeJoin(#[from] tokio::task::JoinError),
}

impl Error {
    /// Stable, machine readable tag for the kind of failure.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Fetch(FetchError::Timeout | FetchError::DeadlineExceeded) => "timeout",
            Error::Fetch(FetchError::HttpStatus(_)) => "http_status",
            Error::Fetch(_) => "fetch",
            Error::Parse(ParseError::SchemaMismatch { .. }) => "schema_mismatch",
            Error::Parse(_) => "parse",
            Error::Write(_) => "write",
            Error::InvalidInput(_) => "invalid_input",
            Error::RuntimeJoin(_) => "internal",
        }
    }
}

/// Network layer failures. Some of them are worth another attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection refused by {0}")]
    ConnectionRefused(String),

    #[error("Portal answered with HTTP status {0}")]
    HttpStatus(u16),

    #[error("Connection Error: {0}")]
    Connection(String),

    #[error("Deadline exceeded before the request could complete")]
    DeadlineExceeded,

    #[error("Couldn't build the HTTP client: {0}")]
    Client(String),
}

impl FetchError {
    /// Connection problems, timeouts and 5xx answers. A 4xx is a definitive miss.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout | FetchError::ConnectionRefused(_) | FetchError::Connection(_) => {
                true
            }
            FetchError::HttpStatus(code) => (500..600).contains(code),
            FetchError::DeadlineExceeded | FetchError::Client(_) => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return FetchError::Timeout;
        }
        if let Some(status) = err.status() {
            return FetchError::HttpStatus(status.as_u16());
        }
        if err.is_connect() && is_refused(&err) {
            let target = err
                .url()
                .and_then(|u| u.host_str().map(str::to_string))
                .unwrap_or_default();
            return FetchError::ConnectionRefused(target);
        }
        if err.is_builder() {
            return FetchError::Client(err.to_string());
        }
        FetchError::Connection(err.to_string())
    }
}

fn is_refused(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = Some(err);
    while let Some(e) = source {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::ConnectionRefused {
                return true;
            }
        }
        source = e.source();
    }
    false
}

/// The document could not be read as the page we asked for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Unrecognised page: {reason}")]
    SchemaMismatch { reason: String },

    #[error("Required field is missing: {0}")]
    MissingField(&'static str),

    #[error("The selector you are trying to scrape for is invalid. Selector: {0}")]
    Selector(String),
}

impl ParseError {
    pub fn mismatch(reason: impl Into<String>) -> Self {
        ParseError::SchemaMismatch {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Couldn't create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Io Error while writing {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Couldn't serialize data for {path}: {source}")]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("CSV Error for {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
}
