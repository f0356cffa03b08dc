//! HTTP transport for token and revocation endpoints

use crate::types::{ClientConfig, TokenResponse};
use af_types::{AuthError, AuthResult};
use chrono::Utc;
use reqwest::Client;
use tracing::{debug, warn};

/// Transport for form-encoded POST requests to the token and revocation
/// endpoints. Both code exchange and refresh go through
/// [`send_token_request`](TokenTransport::send_token_request).
pub struct TokenTransport {
    client: Client,
    token_url: String,
}

impl TokenTransport {
    /// Build a transport with the configured request timeout.
    pub fn new(config: &ClientConfig) -> AuthResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AuthError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            token_url: config.token_url.clone(),
        })
    }

    /// POST `form_fields` to the token endpoint and parse the JSON response.
    ///
    /// Returns `Ok(None)` on any non-2xx status without reading the body;
    /// the status is the only failure signal here and the caller maps it to
    /// its own failure code. A 2xx response that is not valid JSON is a
    /// protocol error, never a silent `None`. The token's absolute expiry is
    /// computed from the wall clock at the moment the response is received.
    pub async fn send_token_request(
        &self,
        form_fields: &[(String, String)],
    ) -> AuthResult<Option<TokenResponse>> {
        let response = self
            .client
            .post(&self.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(form_fields)
            .send()
            .await
            .map_err(|e| AuthError::Transport(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Token endpoint returned status {}", status);
            return Ok(None);
        }

        let received_at = Utc::now();
        let body = response.bytes().await.map_err(|e| {
            AuthError::Transport(format!("failed to read token response body: {}", e))
        })?;

        let mut tokens = parse_token_response(&body)?;
        tokens.compute_expiry(received_at);

        debug!("Token response parsed, expires at {:?}", tokens.expires_at);
        Ok(Some(tokens))
    }

    /// POST a revocation request (RFC 7009) for `token`.
    ///
    /// Returns true only on a 2xx status. Transport errors are reported as
    /// false and never propagated; revocation is best-effort.
    pub async fn send_revocation_request(
        &self,
        revocation_url: &str,
        token: &str,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> bool {
        let mut form: Vec<(String, String)> = vec![
            ("token".to_string(), token.to_string()),
            ("token_type_hint".to_string(), "access_token".to_string()),
            ("client_id".to_string(), client_id.to_string()),
        ];
        if let Some(secret) = client_secret {
            form.push(("client_secret".to_string(), secret.to_string()));
        }

        match self.client.post(revocation_url).form(&form).send().await {
            Ok(response) => {
                let status = response.status();
                if !status.is_success() {
                    warn!("Revocation endpoint returned status {}", status);
                }
                status.is_success()
            }
            Err(e) => {
                warn!("Revocation request failed: {}", e);
                false
            }
        }
    }
}

/// Parse a token response body with case-insensitive field mapping.
///
/// Providers disagree on key casing, so top-level keys are lowercased before
/// mapping onto [`TokenResponse`]. Unrecognized keys land in the catch-all
/// `extra` map.
fn parse_token_response(body: &[u8]) -> AuthResult<TokenResponse> {
    let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(body)
        .map_err(|e| AuthError::Protocol(format!("malformed token response: {}", e)))?;

    let normalized: serde_json::Map<String, serde_json::Value> = raw
        .into_iter()
        .map(|(key, value)| (key.to_ascii_lowercase(), value))
        .collect();

    serde_json::from_value(serde_json::Value::Object(normalized))
        .map_err(|e| AuthError::Protocol(format!("malformed token response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token_response() {
        let body = br#"{
            "access_token": "tok",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "r1"
        }"#;

        let tokens = parse_token_response(body).unwrap();
        assert_eq!(tokens.access_token, "tok");
        assert_eq!(tokens.expires_in, Some(3600));
        assert_eq!(tokens.refresh_token.as_deref(), Some("r1"));
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let body = br#"{
            "Access_Token": "tok",
            "EXPIRES_IN": 120,
            "Refresh_Token": "r1"
        }"#;

        let tokens = parse_token_response(body).unwrap();
        assert_eq!(tokens.access_token, "tok");
        assert_eq!(tokens.expires_in, Some(120));
        assert_eq!(tokens.refresh_token.as_deref(), Some("r1"));
    }

    #[test]
    fn test_parse_keeps_unknown_fields() {
        let body = br#"{"access_token": "tok", "id_token": "jwt"}"#;

        let tokens = parse_token_response(body).unwrap();
        assert_eq!(tokens.extra["id_token"], serde_json::json!("jwt"));
    }

    #[test]
    fn test_parse_rejects_malformed_bodies() {
        assert!(matches!(
            parse_token_response(b"not json"),
            Err(AuthError::Protocol(_))
        ));
        // Valid JSON but not an object
        assert!(matches!(
            parse_token_response(b"[1, 2, 3]"),
            Err(AuthError::Protocol(_))
        ));
        // Object missing the required access_token
        assert!(matches!(
            parse_token_response(b"{\"token_type\": \"Bearer\"}"),
            Err(AuthError::Protocol(_))
        ));
    }
}
