// src/importer/error.rs
use std::error::Error as StdError;
use std::fmt;

/// インポートモジュール専用のエラー型
#[derive(Debug)]
pub(super) enum ImportError {
    Fetch(reqwest::Error),
    Http(String),
    Metadata(String),
    Database(sqlx::Error),
    Url(url::ParseError),
    InvalidDoi(String),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::Fetch(e) => write!(f, "Failed to fetch metadata: {}", e),
            ImportError::Http(s) => write!(f, "HTTP error: {}", s),
            ImportError::Metadata(s) => write!(f, "Metadata error: {}", s),
            ImportError::Database(e) => write!(f, "Database error: {}", e),
            ImportError::Url(e) => write!(f, "Invalid URL: {}", e),
            ImportError::InvalidDoi(doi) => write!(f, "Not a valid DOI: {}", doi),
        }
    }
}

impl StdError for ImportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ImportError::Fetch(e) => Some(e),
            ImportError::Database(e) => Some(e),
            ImportError::Url(e) => Some(e),
            _ => None,
        }
    }
}

// --- 便利な From 実装 ---
impl From<reqwest::Error> for ImportError {
    fn from(e: reqwest::Error) -> Self {
        ImportError::Fetch(e)
    }
}
impl From<sqlx::Error> for ImportError {
    fn from(e: sqlx::Error) -> Self {
        ImportError::Database(e)
    }
}
impl From<url::ParseError> for ImportError {
    fn from(e: url::ParseError) -> Self {
        ImportError::Url(e)
    }
}
