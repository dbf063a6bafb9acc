use crate::store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// A source could not deliver its files.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to extract archive from {url}: {source}")]
    Archive {
        url: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("git operation on {repository} failed: {source}")]
    Git {
        repository: String,
        #[source]
        source: git2::Error,
    },

    #[error("destination {0} already contains files")]
    DestinationNotEmpty(PathBuf),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A declared source entry could not be turned into a source.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("source entry is not an object with a string 'type' field")]
    MissingType,

    #[error("unknown source type '{kind}' (known: {})", .known.join(", "))]
    UnknownType { kind: String, known: Vec<String> },

    #[error("invalid '{kind}' source: {source}")]
    Invalid {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("git source may name only one of branch, tag or commit (found {found})")]
    AmbiguousCheckout { found: String },
}
