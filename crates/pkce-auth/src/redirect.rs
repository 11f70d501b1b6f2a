//! Authorization request construction
//!
//! First leg of the flow: mint a verifier, persist it, and hand back the URL
//! the browser must be navigated to. The navigation itself belongs to the
//! caller (an HTTP `302` in the gallery service), since control leaves this
//! process at that point.

use std::sync::Arc;

use common::Secret;
use rand::CryptoRng;
use reqwest::Url;
use tracing::info;

use crate::config::OAuthClientConfig;
use crate::constants::VERIFIER_KEY;
use crate::error::Result;
use crate::pkce::{build_authorization_url, compute_challenge, generate_verifier};
use crate::store::KeyValueStore;

pub struct AuthRedirector {
    config: OAuthClientConfig,
    store: Arc<dyn KeyValueStore>,
}

impl AuthRedirector {
    pub fn new(config: OAuthClientConfig, store: Arc<dyn KeyValueStore>) -> Self {
        Self { config, store }
    }

    /// Start an authorization attempt using the thread-local CSPRNG.
    pub async fn begin(&self) -> Result<Url> {
        let verifier = generate_verifier(self.config.verifier_length, &mut rand::rng())?;
        self.issue(Secret::new(verifier)).await
    }

    /// Start an authorization attempt with an explicit random source.
    pub async fn begin_with<R>(&self, rng: &mut R) -> Result<Url>
    where
        R: CryptoRng,
    {
        let verifier = generate_verifier(self.config.verifier_length, rng)?;
        self.issue(Secret::new(verifier)).await
    }

    /// Persist `verifier` and build the URL carrying its challenge.
    ///
    /// Overwrites any verifier left by an earlier, unfinished attempt.
    async fn issue(&self, verifier: Secret<String>) -> Result<Url> {
        let challenge = compute_challenge(verifier.expose());
        let url = build_authorization_url(&self.config, &challenge)?;

        let verifier_len = verifier.len();
        self.store.set(VERIFIER_KEY, verifier).await?;

        info!(
            client_id = %self.config.client_id,
            verifier_len,
            "verifier persisted, redirecting to authorization endpoint"
        );
        Ok(url)
    }
}
