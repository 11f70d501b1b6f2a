//! PKCE authorization-code client
//!
//! Implements the browser-side half of OAuth 2.0 Authorization Code with
//! PKCE (RFC 7636) against a third-party authorization server. Nothing here
//! talks to a resource API; the output of a completed flow is a [`Session`]
//! holding the bearer token.
//!
//! Flow:
//! 1. Page load without a `code` → [`AuthRedirector::begin`] generates a
//!    verifier, persists it in a [`KeyValueStore`] and returns the authorize URL
//! 2. User consents at the provider, which redirects back with `?code=...`
//! 3. [`TokenExchanger::exchange`] takes the stored verifier and trades the
//!    code for an access token (exactly once, never retried)
//! 4. The caller wraps the token in a [`Session`] and passes it to every
//!    resource fetch
//!
//! [`flow::handle_event`] encodes the lifecycle as a pure state machine so the
//! caller can decide what to do on each page load without re-deriving it.

pub mod config;
pub mod constants;
pub mod error;
pub mod flow;
pub mod pkce;
pub mod redirect;
pub mod session;
pub mod store;
pub mod token;

pub use config::OAuthClientConfig;
pub use constants::*;
pub use error::{Error, Result};
pub use flow::{AuthAction, AuthEvent, AuthState, CallbackOutcome, CallbackParams, handle_event};
pub use pkce::{build_authorization_url, compute_challenge, generate_verifier};
pub use redirect::AuthRedirector;
pub use session::{AccessToken, Session};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use token::{TokenExchanger, TokenResponse};
