use std::sync::Arc;

/// Represents a result type for operations in the proxy core.
///
/// This `Result` type is a standard Rust `Result` type where the error variant is defined by the
/// proxy-specific [`Error`] enum.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum representing possible errors that can occur in the proxy core.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// A context enricher failed. The pipeline aborts and the request cannot be evaluated; the
    /// caller is expected to translate this into a request-level failure response.
    #[error("context enrichment failed: {0}")]
    // The underlying enricher error is not clonable, so we're wrapping it in an Arc.
    Enrichment(#[source] Arc<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wrap an arbitrary enricher error into [`Error::Enrichment`].
    pub fn enrichment(source: impl std::error::Error + Send + Sync + 'static) -> Error {
        Error::Enrichment(Arc::new(source))
    }
}
