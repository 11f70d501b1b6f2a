//! Error types for resource fetching

/// Errors from fetching or assembling a paginated resource.
///
/// All of these are scoped to one resource: a failure here never aborts an
/// unrelated collection fetched alongside it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("resource {url} returned {status}: {body}")]
    ResourceFetch {
        url: String,
        status: u16,
        body: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("pagination protocol violated: {0}")]
    PaginationViolation(String),

    #[error("malformed page {index}: {reason}")]
    MalformedPage { index: usize, reason: String },
}

/// Result alias for paging operations.
pub type Result<T> = std::result::Result<T, Error>;
