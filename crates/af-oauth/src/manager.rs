//! Token lifecycle management
//!
//! Holds at most one current token and orchestrates exchange, refresh and
//! revocation against the transport. Mutating operations are serialized
//! internally so concurrent callers cannot race on the held token.

use crate::authorize::set_param;
use crate::transport::TokenTransport;
use crate::types::{AuthOutcome, ClientConfig, FailureCode, TokenResponse};
use af_types::AuthResult;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Owns the current token for one OAuth client instance.
pub struct TokenManager {
    config: ClientConfig,
    transport: TokenTransport,

    /// Current token; single-writer cell, readers clone out
    current: RwLock<Option<TokenResponse>>,

    /// Serializes exchange/refresh/revoke so their read-modify-write of the
    /// current token cannot interleave
    op_guard: Mutex<()>,
}

impl TokenManager {
    /// Create a manager for the given configuration.
    pub fn new(config: ClientConfig) -> AuthResult<Self> {
        config.validate()?;
        let transport = TokenTransport::new(&config)?;

        Ok(Self {
            config,
            transport,
            current: RwLock::new(None),
            op_guard: Mutex::new(()),
        })
    }

    /// The current access token, only while a token is held and not expired.
    pub fn access_token(&self) -> Option<String> {
        let current = self.current.read();
        match current.as_ref() {
            Some(tokens) if !tokens.is_expired() => Some(tokens.access_token.clone()),
            _ => None,
        }
    }

    /// Whether a non-expired token is held.
    pub fn has_valid_token(&self) -> bool {
        self.current
            .read()
            .as_ref()
            .is_some_and(|tokens| !tokens.is_expired())
    }

    /// The full held token, including when expired (callers may want its
    /// refresh token), or `None` when nothing is held.
    pub fn current_token(&self) -> Option<TokenResponse> {
        self.current.read().clone()
    }

    /// Drop the held token.
    pub fn clear(&self) {
        *self.current.write() = None;
    }

    fn store(&self, tokens: TokenResponse) {
        *self.current.write() = Some(tokens);
    }

    /// Exchange an authorization code for tokens and store the result.
    ///
    /// `code_verifier` is the PKCE verifier from the authorization request,
    /// when PKCE was used. Cancellation aborts the in-flight request without
    /// touching the held token.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
        cancel: &CancellationToken,
    ) -> AuthOutcome {
        let _guard = self.op_guard.lock().await;

        let mut fields: Vec<(String, String)> = Vec::new();
        set_param(&mut fields, "grant_type", "authorization_code");
        set_param(&mut fields, "code", code);
        set_param(&mut fields, "redirect_uri", &self.config.redirect_uri);
        set_param(&mut fields, "client_id", &self.config.client_id);
        if let Some(secret) = self.config.client_secret.as_deref() {
            set_param(&mut fields, "client_secret", secret);
        }
        if let Some(verifier) = code_verifier {
            set_param(&mut fields, "code_verifier", verifier);
        }
        for (key, value) in &self.config.extra_token_params {
            set_param(&mut fields, key, value);
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Token exchange cancelled");
                return AuthOutcome::failure(FailureCode::UserCancelled, "token exchange cancelled");
            }
            result = self.transport.send_token_request(&fields) => result,
        };

        match result {
            Ok(Some(tokens)) => {
                info!("Authorization code exchange succeeded");
                self.store(tokens.clone());
                AuthOutcome::Success { tokens }
            }
            Ok(None) => AuthOutcome::failure(
                FailureCode::TokenExchangeFailed,
                "token endpoint rejected the authorization code",
            ),
            Err(e) => AuthOutcome::failure(FailureCode::ExchangeError, e.to_string()),
        }
    }

    /// Refresh the held token using its refresh token.
    ///
    /// Fails immediately, without a network call, when no refresh token is
    /// held. Providers commonly omit `refresh_token` on refresh responses;
    /// the previously held refresh token is carried over in that case so
    /// future refreshes keep working.
    pub async fn refresh(&self, cancel: &CancellationToken) -> AuthOutcome {
        let _guard = self.op_guard.lock().await;

        let refresh_token = self
            .current
            .read()
            .as_ref()
            .and_then(|tokens| tokens.refresh_token.clone())
            .filter(|token| !token.is_empty());

        let Some(refresh_token) = refresh_token else {
            return AuthOutcome::failure(
                FailureCode::NoRefreshToken,
                "no refresh token available, re-authentication required",
            );
        };

        let mut fields: Vec<(String, String)> = Vec::new();
        set_param(&mut fields, "grant_type", "refresh_token");
        set_param(&mut fields, "refresh_token", &refresh_token);
        set_param(&mut fields, "client_id", &self.config.client_id);
        if let Some(secret) = self.config.client_secret.as_deref() {
            set_param(&mut fields, "client_secret", secret);
        }
        if let Some(scope) = self.config.scope.as_deref() {
            if !scope.is_empty() {
                set_param(&mut fields, "scope", scope);
            }
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Token refresh cancelled");
                return AuthOutcome::failure(FailureCode::UserCancelled, "token refresh cancelled");
            }
            result = self.transport.send_token_request(&fields) => result,
        };

        match result {
            Ok(Some(mut tokens)) => {
                if tokens
                    .refresh_token
                    .as_deref()
                    .is_none_or(|token| token.is_empty())
                {
                    tokens.refresh_token = Some(refresh_token);
                }
                info!("Token refresh succeeded");
                self.store(tokens.clone());
                AuthOutcome::Success { tokens }
            }
            Ok(None) => AuthOutcome::failure(
                FailureCode::RefreshFailed,
                "token endpoint rejected the refresh request",
            ),
            Err(e) => AuthOutcome::failure(FailureCode::RefreshError, e.to_string()),
        }
    }

    /// Revoke a token, defaulting to the currently held access token.
    ///
    /// Without a configured revocation endpoint (or without any token to
    /// revoke) this only clears local state and reports success. When the
    /// endpoint is called, the held token is cleared regardless of the
    /// remote outcome: a token we asked to revoke is never used again.
    /// Cancellation returns early with nothing cleared.
    pub async fn revoke(&self, token: Option<&str>, cancel: &CancellationToken) -> bool {
        let _guard = self.op_guard.lock().await;

        let Some(revocation_url) = self.config.revocation_url.as_deref() else {
            self.clear();
            return true;
        };

        let token = match token {
            Some(token) => Some(token.to_string()),
            None => self
                .current
                .read()
                .as_ref()
                .map(|tokens| tokens.access_token.clone()),
        };
        let Some(token) = token else {
            self.clear();
            return true;
        };

        let revoked = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Revocation cancelled");
                return false;
            }
            revoked = self.transport.send_revocation_request(
                revocation_url,
                &token,
                &self.config.client_id,
                self.config.client_secret.as_deref(),
            ) => revoked,
        };

        if !revoked {
            warn!("Remote revocation failed, clearing local token anyway");
        }
        self.clear();
        revoked
    }
}
