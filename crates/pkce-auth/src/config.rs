//! OAuth client registration settings

use serde::Deserialize;

use crate::constants::{
    AUTHORIZE_ENDPOINT, DEFAULT_VERIFIER_LENGTH, MAX_VERIFIER_LENGTH, MIN_VERIFIER_LENGTH,
    REDIRECT_URI, SCOPES, TOKEN_ENDPOINT,
};
use crate::error::{Error, Result};

/// Everything needed to build an authorization request and redeem its code.
///
/// Deserializes directly from the `[oauth]` table of the service config.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthClientConfig {
    pub client_id: String,
    #[serde(default = "default_authorize_endpoint")]
    pub authorize_endpoint: String,
    #[serde(default = "default_token_endpoint")]
    pub token_endpoint: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    #[serde(default = "default_verifier_length")]
    pub verifier_length: usize,
}

fn default_authorize_endpoint() -> String {
    AUTHORIZE_ENDPOINT.to_string()
}

fn default_token_endpoint() -> String {
    TOKEN_ENDPOINT.to_string()
}

fn default_redirect_uri() -> String {
    REDIRECT_URI.to_string()
}

fn default_scopes() -> Vec<String> {
    SCOPES.iter().map(|s| s.to_string()).collect()
}

fn default_verifier_length() -> usize {
    DEFAULT_VERIFIER_LENGTH
}

impl OAuthClientConfig {
    /// Config with the provider defaults for the given client id.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            authorize_endpoint: default_authorize_endpoint(),
            token_endpoint: default_token_endpoint(),
            redirect_uri: default_redirect_uri(),
            scopes: default_scopes(),
            verifier_length: default_verifier_length(),
        }
    }

    /// Space-delimited scope list as sent in the `scope` parameter.
    pub fn scope_param(&self) -> String {
        self.scopes.join(" ")
    }

    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::InvalidConfig("client_id must not be empty".into()));
        }
        for (name, url) in [
            ("authorize_endpoint", &self.authorize_endpoint),
            ("token_endpoint", &self.token_endpoint),
            ("redirect_uri", &self.redirect_uri),
        ] {
            let parsed = reqwest::Url::parse(url)
                .map_err(|e| Error::InvalidConfig(format!("{name} {url:?}: {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(Error::InvalidConfig(format!(
                    "{name} must use http or https, got: {url}"
                )));
            }
        }
        if !(MIN_VERIFIER_LENGTH..=MAX_VERIFIER_LENGTH).contains(&self.verifier_length) {
            return Err(Error::InvalidVerifierLength(self.verifier_length));
        }
        Ok(())
    }
}
