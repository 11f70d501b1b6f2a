//! PKCE (Proof Key for Code Exchange) per RFC 7636
//!
//! The verifier stays with the client; only its S256 challenge travels in
//! the authorization URL. At token exchange the provider hashes the verifier
//! itself and compares, binding the authorization code to whoever started
//! the flow.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::distr::Alphanumeric;
use rand::{CryptoRng, RngExt};
use reqwest::Url;
use sha2::{Digest, Sha256};

use crate::config::OAuthClientConfig;
use crate::constants::{MAX_VERIFIER_LENGTH, MIN_VERIFIER_LENGTH};
use crate::error::{Error, Result};

/// Generate a PKCE code verifier of exactly `length` characters.
///
/// Characters are drawn independently and uniformly from `[A-Za-z0-9]`.
/// The source must be a [`CryptoRng`]; `rand::rng()` in production.
/// Fails if `length` is outside the RFC 7636 range of 43..=128.
pub fn generate_verifier<R>(length: usize, rng: &mut R) -> Result<String>
where
    R: CryptoRng,
{
    if !(MIN_VERIFIER_LENGTH..=MAX_VERIFIER_LENGTH).contains(&length) {
        return Err(Error::InvalidVerifierLength(length));
    }

    Ok(rng
        .sample_iter(Alphanumeric)
        .take(length)
        .map(char::from)
        .collect())
}

/// Compute the S256 code challenge from a verifier.
///
/// `challenge = BASE64URL-NOPAD(SHA256(ascii(verifier)))`
pub fn compute_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Build the authorization request URL.
///
/// Parameter set is fixed: client id, `response_type=code`, the registered
/// redirect URI, the space-delimited scopes, `code_challenge_method=S256`
/// and the challenge. Values are form-encoded by [`Url`].
pub fn build_authorization_url(config: &OAuthClientConfig, challenge: &str) -> Result<Url> {
    let scope = config.scope_param();
    Url::parse_with_params(
        &config.authorize_endpoint,
        &[
            ("client_id", config.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("scope", scope.as_str()),
            ("code_challenge_method", "S256"),
            ("code_challenge", challenge),
        ],
    )
    .map_err(|e| {
        Error::InvalidConfig(format!(
            "authorize_endpoint {:?}: {e}",
            config.authorize_endpoint
        ))
    })
}
