//! Error types for the authorization flow

/// Errors from the PKCE authorization flow.
///
/// Every variant except `MissingAuthorizationCode` is terminal for the
/// current page load: the user has to start sign-in again.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// First visit. Recovered locally by starting a fresh redirect.
    #[error("no authorization code present")]
    MissingAuthorizationCode,

    #[error("authorization denied by provider: {error}{}", fmt_description(.description))]
    AuthorizationDenied {
        error: String,
        description: Option<String>,
    },

    #[error("no PKCE verifier persisted, please restart sign-in")]
    MissingVerifier,

    #[error("token endpoint returned {status}: {body}")]
    TokenExchange { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("verifier store error: {0}")]
    Store(String),

    #[error("verifier length {0} outside 43..=128")]
    InvalidVerifierLength(usize),

    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

fn fmt_description(description: &Option<String>) -> String {
    description
        .as_deref()
        .map(|d| format!(" ({d})"))
        .unwrap_or_default()
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
