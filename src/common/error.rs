//! Error types for ringcache

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Crate error.
///
/// `Clone`: one load outcome is handed to every caller coalesced onto it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // === Lookup Errors ===
    #[error("key is required")]
    EmptyKey,

    #[error("{0} not exist")]
    NotFound(String),

    #[error("loader error: {0}")]
    Loader(String),

    // === Peer Errors ===
    #[error("peer fetch failed: {0}")]
    Peer(String),

    #[error("no such group: {0}")]
    GroupNotFound(String),

    // === Config Errors ===
    #[error("peers already registered for group {0}")]
    PeersAlreadyRegistered(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Network Errors ===
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("I/O error: {0}")]
    Io(String),

    // === Generic ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convert to HTTP status code
    pub fn to_http_status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Error::EmptyKey | Error::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) | Error::GroupNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Peer(e.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(Error::EmptyKey.to_http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::NotFound("x".into()).to_http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::GroupNotFound("g".into()).to_http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::Loader("db down".into()).to_http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::Peer("refused".into()).to_http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(Error::EmptyKey.to_string(), "key is required");
        assert_eq!(Error::NotFound("unknown".into()).to_string(), "unknown not exist");
    }
}
