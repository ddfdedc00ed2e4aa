use thiserror::Error;

/// Errors surfaced by path-store operations.
///
/// Absence of a value is not an error; point reads return `Option`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid path segment {0:?}")]
    InvalidPath(String),

    #[error("unsupported store endpoint {0:?}")]
    UnsupportedEndpoint(String),

    #[error("value encoding failed")]
    Encoding(#[from] serde_json::Error),
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
