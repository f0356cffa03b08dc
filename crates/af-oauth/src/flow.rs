//! Interactive authentication flow orchestration
//!
//! Ties state generation, PKCE, authorization URL construction, the external
//! browser collaborator and token exchange into one attempt. The browser is
//! behind the [`BrowserFlow`] trait, the deterministic substitution point
//! for tests.

use crate::authorize::build_authorization_url;
use crate::manager::TokenManager;
use crate::pkce::{generate_state, PkceChallenge};
use crate::types::{
    AuthOutcome, BrowserResult, ClientConfig, FailureCode, FlowStatus, TokenResponse,
};
use af_types::AuthResult;
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// External collaborator that displays the authorization page and intercepts
/// the redirect.
///
/// Implementations must keep waiting (or navigating) until the user agent
/// lands on a URI starting with `redirect_prefix`, then report exactly one
/// terminal outcome: code+state, a provider error, or cancellation.
#[async_trait]
pub trait BrowserFlow: Send + Sync {
    /// Display `authorization_url` and wait for the redirect.
    async fn authorize(&self, authorization_url: &str, redirect_prefix: &str) -> BrowserResult;
}

/// OAuth 2.0 authorization code client.
///
/// One instance holds one current token and at most one in-flight
/// authentication attempt.
pub struct OAuthClient {
    config: ClientConfig,
    tokens: TokenManager,
    status: RwLock<FlowStatus>,
}

impl OAuthClient {
    /// Create a client. Fails when the configuration violates its non-empty
    /// invariants.
    pub fn new(config: ClientConfig) -> AuthResult<Self> {
        let tokens = TokenManager::new(config.clone())?;

        Ok(Self {
            config,
            tokens,
            status: RwLock::new(FlowStatus::Idle),
        })
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Snapshot of the current flow status.
    pub fn status(&self) -> FlowStatus {
        self.status.read().clone()
    }

    /// The token lifecycle manager backing this client.
    pub fn token_manager(&self) -> &TokenManager {
        &self.tokens
    }

    /// The current access token, only while held and not expired.
    pub fn access_token(&self) -> Option<String> {
        self.tokens.access_token()
    }

    /// Whether a non-expired token is held.
    pub fn has_valid_token(&self) -> bool {
        self.tokens.has_valid_token()
    }

    /// The full held token, including when expired.
    pub fn current_token(&self) -> Option<TokenResponse> {
        self.tokens.current_token()
    }

    /// Refresh the held token. See [`TokenManager::refresh`].
    pub async fn refresh(&self, cancel: &CancellationToken) -> AuthOutcome {
        self.tokens.refresh(cancel).await
    }

    /// Revoke a token (defaults to the held one). See
    /// [`TokenManager::revoke`].
    pub async fn revoke(&self, token: Option<&str>, cancel: &CancellationToken) -> bool {
        self.tokens.revoke(token, cancel).await
    }

    /// Run one full interactive authentication attempt.
    ///
    /// Never returns an error: every internal failure is mapped to an
    /// [`AuthOutcome::Failure`], with `authentication_error` as the
    /// catch-all for unexpected ones.
    pub async fn authenticate(
        &self,
        browser: &dyn BrowserFlow,
        cancel: &CancellationToken,
    ) -> AuthOutcome {
        let outcome = match self.run_flow(browser, cancel).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Authentication flow error: {}", e);
                AuthOutcome::failure(FailureCode::AuthenticationError, e.to_string())
            }
        };

        *self.status.write() = if outcome.is_success() {
            FlowStatus::Succeeded
        } else {
            FlowStatus::Failed
        };
        outcome
    }

    async fn run_flow(
        &self,
        browser: &dyn BrowserFlow,
        cancel: &CancellationToken,
    ) -> AuthResult<AuthOutcome> {
        // Fresh state per attempt
        let state = generate_state();
        *self.status.write() = FlowStatus::StateGenerated;

        let pkce = if self.config.use_pkce {
            let pkce = PkceChallenge::generate()?;
            *self.status.write() = FlowStatus::PkceGenerated;
            Some(pkce)
        } else {
            None
        };

        let auth_url = build_authorization_url(
            &self.config,
            &state,
            pkce.as_ref().map(|pkce| pkce.code_challenge.as_str()),
        );
        *self.status.write() = FlowStatus::AuthorizationUrlBuilt;
        debug!("Built authorization URL for client {}", self.config.client_id);

        *self.status.write() = FlowStatus::AwaitingBrowser;
        info!("Awaiting browser authorization");

        let browser_result = tokio::select! {
            _ = cancel.cancelled() => {
                info!("Authentication cancelled while awaiting browser");
                return Ok(AuthOutcome::failure(
                    FailureCode::UserCancelled,
                    "authentication cancelled",
                ));
            }
            result = browser.authorize(&auth_url, &self.config.redirect_uri) => result,
        };

        if !browser_result.success {
            let code = browser_result
                .error
                .clone()
                .map(FailureCode::Provider)
                .unwrap_or(FailureCode::UserCancelled);
            let description = browser_result
                .error_description
                .or(browser_result.error)
                .unwrap_or_else(|| "authorization was cancelled or denied".to_string());
            warn!("Browser flow ended without authorization: {}", description);
            return Ok(AuthOutcome::failure(code, description));
        }

        // The state must match before anything touches the network; a
        // mismatch means the redirect cannot be trusted.
        let returned_state = browser_result.state.as_deref().unwrap_or_default();
        if returned_state != state {
            warn!("State mismatch on redirect, rejecting authorization code");
            return Ok(AuthOutcome::failure(
                FailureCode::InvalidState,
                "state parameter mismatch (possible CSRF)",
            ));
        }

        let Some(code) = browser_result.code.as_deref() else {
            return Ok(AuthOutcome::failure(
                FailureCode::AuthenticationError,
                "browser reported success without an authorization code",
            ));
        };

        *self.status.write() = FlowStatus::ExchangingToken;

        let verifier = pkce.as_ref().map(|pkce| pkce.code_verifier.as_str());
        Ok(self.tokens.exchange_code(code, verifier, cancel).await)
    }
}
