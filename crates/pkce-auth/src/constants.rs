//! OAuth defaults for the Spotify accounts service
//!
//! None of these are secrets. The client id is not defaulted here: it
//! identifies a registered application and always comes from configuration.

/// Authorization endpoint the browser is navigated to
pub const AUTHORIZE_ENDPOINT: &str = "https://accounts.spotify.com/authorize";

/// Token endpoint for the authorization-code exchange
pub const TOKEN_ENDPOINT: &str = "https://accounts.spotify.com/api/token";

/// Redirect URI registered with the provider. Must match byte for byte.
pub const REDIRECT_URI: &str = "http://localhost:5173/callback";

/// Scopes needed to read the profile and private playlists
pub const SCOPES: &[&str] = &[
    "playlist-read-private",
    "user-read-private",
    "user-read-email",
];

/// Well-known slot the verifier is persisted under across the redirect
pub const VERIFIER_KEY: &str = "verifier";

/// RFC 7636 bounds on the code verifier length
pub const MIN_VERIFIER_LENGTH: usize = 43;
pub const MAX_VERIFIER_LENGTH: usize = 128;

/// Verifier length used unless configured otherwise
pub const DEFAULT_VERIFIER_LENGTH: usize = MAX_VERIFIER_LENGTH;

/// Token lifetime assumed when the token response omits `expires_in`
pub const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;
