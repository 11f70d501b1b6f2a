//! Authentication lifecycle state machine
//!
//! Pure state machine: receives events, returns (new_state, action).
//! The caller performs the I/O implied by each action and feeds the result
//! back as the next event. One machine covers one page load:
//!
//! ```text
//! NoCode ──RedirectIssued──▶ AwaitingRedirect            (control leaves)
//! NoCode ──PageLoaded(Code)──▶ HasCode ──ExchangeSucceeded──▶ Authenticated
//!                                  └──ExchangeFailed──▶ Failed
//! NoCode ──PageLoaded(Denied)──▶ Failed
//! ```
//!
//! `Failed` is terminal for the page load; the user restarts at `NoCode`.

use serde::Deserialize;
use uuid::Uuid;

/// Query parameters the provider appends when redirecting back.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// What a page load's query string means for the flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Neither `code` nor `error`: a first visit.
    FirstVisit,
    /// Provider granted consent.
    Code(String),
    /// Provider reported an error (user denied consent, bad scope, ...).
    /// Terminal: never restarts authorization.
    Denied {
        error: String,
        description: Option<String>,
    },
}

impl CallbackParams {
    /// Classify the parameters. Empty values count as absent, and an
    /// `error` wins over a `code` if the provider sent both.
    pub fn classify(self) -> CallbackOutcome {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
        match (non_empty(self.error), non_empty(self.code)) {
            (Some(error), _) => CallbackOutcome::Denied {
                error,
                description: non_empty(self.error_description),
            },
            (None, Some(code)) => CallbackOutcome::Code(code),
            (None, None) => CallbackOutcome::FirstVisit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Page loaded, nothing known yet
    NoCode,
    /// Browser sent to the provider
    AwaitingRedirect,
    /// Provider returned a code that has not been exchanged
    HasCode { code: String },
    /// Token obtained; resources may be fetched with this session
    Authenticated { session_id: Uuid },
    /// Terminal failure for this page load
    Failed { reason: String },
}

#[derive(Debug)]
pub enum AuthEvent {
    /// The application was loaded with these callback parameters
    PageLoaded(CallbackOutcome),
    /// Authorization URL built and the verifier persisted
    RedirectIssued,
    /// Token endpoint returned an access token
    ExchangeSucceeded { session_id: Uuid },
    /// Token exchange failed; the code is spent
    ExchangeFailed(String),
}

/// Actions the caller should execute after a transition
#[derive(Debug, PartialEq, Eq)]
pub enum AuthAction {
    /// Generate a verifier and navigate to the authorization endpoint
    StartAuthorization,
    /// Redeem the code at the token endpoint, exactly once
    ExchangeCode { code: String },
    /// Fetch resource collections with the session's token
    FetchResources { session_id: Uuid },
    /// Show the failure; do not restart automatically
    ReportFailure { reason: String },
    /// No-op
    None,
}

/// Handle a state transition. Pure function: no I/O.
pub fn handle_event(state: AuthState, event: AuthEvent) -> (AuthState, AuthAction) {
    match (state, event) {
        // --- NoCode ---
        (AuthState::NoCode, AuthEvent::PageLoaded(CallbackOutcome::FirstVisit)) => {
            (AuthState::NoCode, AuthAction::StartAuthorization)
        }

        (AuthState::NoCode, AuthEvent::PageLoaded(CallbackOutcome::Code(code))) => (
            AuthState::HasCode { code: code.clone() },
            AuthAction::ExchangeCode { code },
        ),

        (
            AuthState::NoCode,
            AuthEvent::PageLoaded(CallbackOutcome::Denied { error, description }),
        ) => {
            let reason = match description {
                Some(d) => format!("authorization denied: {error} ({d})"),
                None => format!("authorization denied: {error}"),
            };
            (
                AuthState::Failed {
                    reason: reason.clone(),
                },
                AuthAction::ReportFailure { reason },
            )
        }

        (AuthState::NoCode, AuthEvent::RedirectIssued) => {
            (AuthState::AwaitingRedirect, AuthAction::None)
        }

        // --- HasCode ---
        (AuthState::HasCode { .. }, AuthEvent::ExchangeSucceeded { session_id }) => (
            AuthState::Authenticated { session_id },
            AuthAction::FetchResources { session_id },
        ),

        (AuthState::HasCode { .. }, AuthEvent::ExchangeFailed(reason)) => (
            AuthState::Failed {
                reason: reason.clone(),
            },
            AuthAction::ReportFailure { reason },
        ),

        // Terminal states and out-of-order events are ignored
        (state, _) => (state, AuthAction::None),
    }
}
