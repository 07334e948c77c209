use std::sync::Arc;

/// Represents a result type for operations in this crate.
///
/// This `Result` type is a standard Rust `Result` type where the error variant is defined by the
/// crate-specific [`Error`] enum.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum representing possible errors that can occur in the evaluation core.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// A mandatory configuration entry was absent from the configuration cache. Configuration is
    /// never optional at the point of use, so this error is fatal to the caller.
    #[error("mandatory configuration is missing from cache: {0}")]
    MissingConfiguration(&'static str),

    /// A refresh loader failed in an unexpected way (after the staleness decision was made).
    /// Swallowing this would risk serving a partially updated cache, so it is always propagated.
    #[error("refresh of {artifact_key:?} failed: {reason}")]
    RefreshFailed {
        /// Storage key of the artifact being refreshed.
        artifact_key: String,
        /// Human-readable failure description.
        reason: String,
    },

    /// An experiment definition violated the allocation-space tiling invariant.
    #[error("invalid traffic allocation: {0}")]
    InvalidAllocation(String),

    /// Invalid blob-storage base URL configuration.
    #[error("invalid base_url configuration")]
    InvalidBaseUrl(#[source] url::ParseError),

    /// Indicates that the discovery thread panicked. This should normally never happen.
    #[error("operator discovery thread panicked")]
    DiscoveryThreadPanicked,

    /// An I/O error.
    #[error(transparent)]
    // std::io::Error is not clonable, so we're wrapping it in an Arc.
    Io(Arc<std::io::Error>),

    /// Network error.
    #[error(transparent)]
    Network(Arc<reqwest::Error>),
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::Network(Arc::new(value.without_url()))
    }
}
