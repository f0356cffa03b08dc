//! OAuth 2.0 Authorization Code flow engine
//!
//! Drives the Authorization Code grant (optionally with PKCE), manages the
//! resulting token's lifecycle, and protects the exchange against CSRF via
//! the state parameter.
//!
//! # Features
//! - PKCE (RFC 7636) verifier/challenge generation with S256
//! - CSRF protection with a per-attempt state parameter
//! - Authorization URL construction with caller-supplied extra parameters
//! - Token exchange, refresh (with refresh-token preservation) and
//!   revocation (RFC 7009)
//! - Lazy expiry checks with a clock-skew buffer
//! - Cancellation of in-flight operations via `CancellationToken`
//!
//! The interactive browser surface is not part of this crate: callers
//! implement [`BrowserFlow`] (open the URL, intercept the redirect) and the
//! engine does the rest.
//!
//! # Usage Example
//! ```no_run
//! use af_oauth::{ClientConfig, OAuthClient};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run(browser: &dyn af_oauth::BrowserFlow) -> af_types::AuthResult<()> {
//! let mut config = ClientConfig::new(
//!     "my-client-id",
//!     "https://auth.example.com/authorize",
//!     "https://auth.example.com/token",
//! );
//! config.scope = Some("read write".to_string());
//!
//! let client = OAuthClient::new(config)?;
//! let outcome = client.authenticate(browser, &CancellationToken::new()).await;
//! if outcome.is_success() {
//!     let token = client.access_token();
//! }
//! # Ok(())
//! # }
//! ```

pub mod authorize;
pub mod flow;
pub mod manager;
pub mod pkce;
pub mod redirect;
pub mod transport;
pub mod types;

// Re-export public API
pub use authorize::build_authorization_url;
pub use flow::{BrowserFlow, OAuthClient};
pub use manager::TokenManager;
pub use pkce::{
    generate_code_challenge, generate_code_verifier, generate_state, PkceChallenge,
};
pub use redirect::parse_redirect_params;
pub use transport::TokenTransport;
pub use types::{
    AuthOutcome, BrowserResult, ClientConfig, FailureCode, FlowStatus, TokenResponse,
};
