//! Authorization request URL construction

use crate::types::ClientConfig;
use urlencoding::encode;

/// Insert or replace a key in an ordered parameter set. Later writes win,
/// so caller-supplied extras override the standard parameters on collision.
pub(crate) fn set_param(params: &mut Vec<(String, String)>, key: &str, value: &str) {
    if let Some(existing) = params.iter_mut().find(|(k, _)| k == key) {
        existing.1 = value.to_string();
    } else {
        params.push((key.to_string(), value.to_string()));
    }
}

/// Build the authorization endpoint URL for one authentication attempt.
///
/// Standard parameters first (`client_id`, `redirect_uri`,
/// `response_type=code`, `state`), then `scope` when configured,
/// `code_challenge`/`code_challenge_method=S256` when PKCE is enabled and a
/// challenge was generated, and finally the caller's extra authorization
/// parameters. All values are percent-encoded. Pure function, no I/O.
pub fn build_authorization_url(
    config: &ClientConfig,
    state: &str,
    code_challenge: Option<&str>,
) -> String {
    let mut params: Vec<(String, String)> = Vec::new();

    set_param(&mut params, "client_id", &config.client_id);
    set_param(&mut params, "redirect_uri", &config.redirect_uri);
    set_param(&mut params, "response_type", "code");
    set_param(&mut params, "state", state);

    if let Some(scope) = config.scope.as_deref() {
        if !scope.is_empty() {
            set_param(&mut params, "scope", scope);
        }
    }

    // The verifier never appears here; only its derived challenge does.
    if config.use_pkce {
        if let Some(challenge) = code_challenge {
            set_param(&mut params, "code_challenge", challenge);
            set_param(&mut params, "code_challenge_method", "S256");
        }
    }

    for (key, value) in &config.extra_auth_params {
        set_param(&mut params, key, value);
    }

    let query = params
        .iter()
        .map(|(key, value)| format!("{}={}", encode(key), encode(value)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", config.auth_url, query)
}
