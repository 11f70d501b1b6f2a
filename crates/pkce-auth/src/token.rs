//! Authorization code exchange
//!
//! Second leg of the flow. The provider redirected back with `?code=...`;
//! we POST that code plus the verifier persisted by
//! [`AuthRedirector`](crate::redirect::AuthRedirector) to the token endpoint.
//!
//! Codes are single-use; a failed exchange is never retried.

use std::sync::Arc;
use std::time::Duration;

use common::Secret;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::OAuthClientConfig;
use crate::constants::{DEFAULT_TOKEN_LIFETIME_SECS, VERIFIER_KEY};
use crate::error::{Error, Result};
use crate::session::AccessToken;
use crate::store::KeyValueStore;

/// Successful token endpoint response.
///
/// Only `access_token` is required. Refresh tokens are not requested or
/// used; an access token lives for one session.
#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Seconds until the access token expires
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}

pub struct TokenExchanger {
    client: reqwest::Client,
    config: OAuthClientConfig,
    store: Arc<dyn KeyValueStore>,
}

impl TokenExchanger {
    pub fn new(
        client: reqwest::Client,
        config: OAuthClientConfig,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            client,
            config,
            store,
        }
    }

    /// Exchange an authorization code for an access token.
    ///
    /// The persisted verifier is consumed before the request is sent. If no
    /// verifier is present this fails with [`Error::MissingVerifier`] without
    /// touching the network.
    pub async fn exchange(&self, code: &str) -> Result<AccessToken> {
        if code.is_empty() {
            return Err(Error::MissingAuthorizationCode);
        }

        let verifier = self
            .store
            .take(VERIFIER_KEY)
            .await?
            .filter(|v| !v.is_empty())
            .ok_or(Error::MissingVerifier)?;

        let token = self.post_exchange(code, &verifier).await?;
        info!(
            token_type = token.token_type.as_deref().unwrap_or("unknown"),
            expires_in = token.expires_in,
            "authorization code exchanged"
        );
        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS));
        Ok(AccessToken::new(Secret::new(token.access_token), lifetime))
    }

    async fn post_exchange(&self, code: &str, verifier: &Secret<String>) -> Result<TokenResponse> {
        let response = self
            .client
            .post(&self.config.token_endpoint)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("code_verifier", verifier.expose().as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Http(format!("token exchange request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            warn!(status = status.as_u16(), "token endpoint rejected exchange");
            return Err(Error::TokenExchange {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| Error::TokenExchange {
                status: status.as_u16(),
                body: format!("invalid token response: {e}"),
            })
    }
}
