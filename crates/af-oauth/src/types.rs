//! Core types for the OAuth client engine

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Redirect URI used when the caller does not configure one
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080/callback";

/// Request timeout used when the caller does not configure one
pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Token lifetime assumed when the server omits `expires_in`
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Clock-skew buffer applied when checking token expiry
const EXPIRY_BUFFER_SECS: i64 = 60;

/// OAuth client configuration, immutable for the life of a client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// OAuth client ID
    pub client_id: String,

    /// OAuth client secret (optional, for confidential clients)
    pub client_secret: Option<String>,

    /// Authorization endpoint URL
    pub auth_url: String,

    /// Token endpoint URL
    pub token_url: String,

    /// Redirect URI the authorization server sends the user back to
    pub redirect_uri: String,

    /// Space-delimited scope string (optional)
    pub scope: Option<String>,

    /// Whether to use PKCE (RFC 7636) for authorization requests
    pub use_pkce: bool,

    /// Token revocation endpoint URL (optional)
    pub revocation_url: Option<String>,

    /// Additional authorization request parameters, applied in order with
    /// last-write-wins semantics over the standard parameters
    pub extra_auth_params: Vec<(String, String)>,

    /// Additional token request parameters, same merge semantics
    pub extra_token_params: Vec<(String, String)>,

    /// Timeout applied to token and revocation requests
    pub timeout: std::time::Duration,
}

impl ClientConfig {
    /// Create a configuration with the required endpoints and defaults for
    /// everything else (PKCE on, localhost callback redirect, 30s timeout).
    pub fn new(
        client_id: impl Into<String>,
        auth_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            auth_url: auth_url.into(),
            token_url: token_url.into(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            scope: None,
            use_pkce: true,
            revocation_url: None,
            extra_auth_params: Vec::new(),
            extra_token_params: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Check the non-empty invariants that must hold for the life of the
    /// client.
    pub fn validate(&self) -> af_types::AuthResult<()> {
        if self.client_id.is_empty() {
            return Err(af_types::AuthError::Config(
                "client_id must not be empty".to_string(),
            ));
        }
        if self.auth_url.is_empty() {
            return Err(af_types::AuthError::Config(
                "auth_url must not be empty".to_string(),
            ));
        }
        if self.token_url.is_empty() {
            return Err(af_types::AuthError::Config(
                "token_url must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Token response from the OAuth server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Access token
    pub access_token: String,

    /// Token type (usually "Bearer")
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Expires in seconds (may be absent or zero)
    #[serde(default)]
    pub expires_in: Option<i64>,

    /// Refresh token (optional)
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Granted scope (optional, may differ from requested)
    #[serde(default)]
    pub scope: Option<String>,

    /// Provider-specific fields not covered by the standard ones
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,

    /// Absolute expiry, derived from `expires_in` when the response is
    /// received; not part of the wire format
    #[serde(skip)]
    pub expires_at: Option<DateTime<Utc>>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl TokenResponse {
    /// Derive the absolute expiry timestamp from `expires_in`.
    ///
    /// Servers that omit `expires_in` (or send zero) get the one-hour policy
    /// default.
    pub fn compute_expiry(&mut self, issued_at: DateTime<Utc>) {
        let lifetime = match self.expires_in {
            Some(secs) if secs > 0 => Duration::seconds(secs),
            _ => Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS),
        };
        self.expires_at = Some(issued_at + lifetime);
    }

    /// Whether the token is expired, with a one-minute clock-skew buffer.
    ///
    /// A token whose expiry was never computed counts as expired.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() + Duration::seconds(EXPIRY_BUFFER_SECS) >= expires_at,
            None => true,
        }
    }
}

/// Machine-readable failure code for an authentication operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCode {
    /// User cancelled or denied the authorization
    UserCancelled,

    /// Returned state did not match the generated one (possible CSRF)
    InvalidState,

    /// Token endpoint rejected the authorization code
    TokenExchangeFailed,

    /// Transport or protocol error during code exchange
    ExchangeError,

    /// Token endpoint rejected the refresh request
    RefreshFailed,

    /// Transport or protocol error during refresh
    RefreshError,

    /// No refresh token is held, refresh was not attempted
    NoRefreshToken,

    /// Unexpected internal error during the orchestrated flow
    AuthenticationError,

    /// Error code relayed verbatim from the authorization server
    Provider(String),
}

impl FailureCode {
    /// The snake_case wire form of the code.
    pub fn as_str(&self) -> &str {
        match self {
            Self::UserCancelled => "user_cancelled",
            Self::InvalidState => "invalid_state",
            Self::TokenExchangeFailed => "token_exchange_failed",
            Self::ExchangeError => "exchange_error",
            Self::RefreshFailed => "refresh_failed",
            Self::RefreshError => "refresh_error",
            Self::NoRefreshToken => "no_refresh_token",
            Self::AuthenticationError => "authentication_error",
            Self::Provider(code) => code,
        }
    }
}

impl std::fmt::Display for FailureCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an authentication operation
#[derive(Debug, Clone)]
pub enum AuthOutcome {
    /// Operation completed with tokens
    Success {
        /// The acquired tokens
        tokens: TokenResponse,
    },

    /// Operation failed
    Failure {
        /// Machine-readable failure code
        code: FailureCode,

        /// Human-readable description
        description: String,
    },
}

impl AuthOutcome {
    /// Build a failure outcome.
    pub fn failure(code: FailureCode, description: impl Into<String>) -> Self {
        Self::Failure {
            code,
            description: description.into(),
        }
    }

    /// Check if the operation completed successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The failure code, if this is a failure.
    pub fn failure_code(&self) -> Option<&FailureCode> {
        match self {
            Self::Failure { code, .. } => Some(code),
            Self::Success { .. } => None,
        }
    }

    /// Extract tokens if successful.
    pub fn tokens(self) -> Option<TokenResponse> {
        match self {
            Self::Success { tokens } => Some(tokens),
            Self::Failure { .. } => None,
        }
    }
}

/// Terminal outcome reported by the external browser collaborator
#[derive(Debug, Clone, Default)]
pub struct BrowserResult {
    /// Whether the browser obtained an authorization code
    pub success: bool,

    /// Authorization code (present on success)
    pub code: Option<String>,

    /// State parameter echoed back by the authorization server
    pub state: Option<String>,

    /// Error code (provider error, or absent on plain cancellation)
    pub error: Option<String>,

    /// Error description
    pub error_description: Option<String>,
}

/// Observable state of the interactive flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowStatus {
    /// No attempt in progress
    Idle,

    /// CSRF state generated for the current attempt
    StateGenerated,

    /// PKCE verifier and challenge generated
    PkceGenerated,

    /// Authorization URL built, about to hand off to the browser
    AuthorizationUrlBuilt,

    /// Waiting for the user to complete authorization in the browser
    AwaitingBrowser,

    /// Exchanging the authorization code for tokens
    ExchangingToken,

    /// Attempt finished successfully
    Succeeded,

    /// Attempt finished with a failure
    Failed,
}
