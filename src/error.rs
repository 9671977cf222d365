use std::path::PathBuf;

use thiserror::Error;

/// Retrieving the source document failed.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Could not read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The input is neither a feature collection nor a KML document.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// A geometry lacks the coordinate data its type requires.
    #[error("Malformed geometry: {0}")]
    MalformedGeometry(String),
}

pub type Result<T> = std::result::Result<T, Error>;
