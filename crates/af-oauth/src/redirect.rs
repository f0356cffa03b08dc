//! Redirect URL parameter parsing
//!
//! Helpers for [`BrowserFlow`](crate::flow::BrowserFlow) implementors:
//! authorization servers deliver `code`/`state`/`error` either in the query
//! string or in the URL fragment, and some providers use both. Query values
//! take precedence on key collision.

use crate::types::BrowserResult;
use std::collections::HashMap;

fn decode_component(raw: &str) -> String {
    // '+' means space in query strings
    let raw = raw.replace('+', " ");
    match urlencoding::decode(&raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw,
    }
}

fn parse_pairs(input: &str, out: &mut HashMap<String, String>) {
    for pair in input.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        out.insert(decode_component(key), decode_component(value));
    }
}

/// Parse both query-string and fragment parameters from a redirect URL.
///
/// Fragment parameters are merged first so that query parameters win when a
/// key appears in both.
pub fn parse_redirect_params(url: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    let (without_fragment, fragment) = match url.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (url, None),
    };

    if let Some(fragment) = fragment {
        parse_pairs(fragment, &mut params);
    }

    if let Some((_, query)) = without_fragment.split_once('?') {
        parse_pairs(query, &mut params);
    }

    params
}

impl BrowserResult {
    /// Build a collaborator outcome from the redirect URI the user agent
    /// landed on.
    ///
    /// A redirect carrying a `code` and no `error` is a success; anything
    /// else (explicit provider error, or a response with neither) reports
    /// `success = false` with whatever error information was present.
    pub fn from_redirect(url: &str) -> Self {
        let mut params = parse_redirect_params(url);

        let code = params.remove("code");
        let state = params.remove("state");
        let error = params.remove("error");
        let error_description = params.remove("error_description");

        match (code, error) {
            (Some(code), None) => Self {
                success: true,
                code: Some(code),
                state,
                error: None,
                error_description,
            },
            (_, error) => Self {
                success: false,
                code: None,
                state,
                error,
                error_description,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_params() {
        let params =
            parse_redirect_params("http://localhost:8080/callback?code=abc&state=xyz");

        assert_eq!(params.get("code").map(String::as_str), Some("abc"));
        assert_eq!(params.get("state").map(String::as_str), Some("xyz"));
    }

    #[test]
    fn test_parse_fragment_params() {
        let params =
            parse_redirect_params("http://localhost:8080/callback#code=abc&state=xyz");

        assert_eq!(params.get("code").map(String::as_str), Some("abc"));
        assert_eq!(params.get("state").map(String::as_str), Some("xyz"));
    }

    #[test]
    fn test_query_wins_over_fragment() {
        let params = parse_redirect_params(
            "http://localhost:8080/callback?code=from_query#code=from_fragment&state=xyz",
        );

        assert_eq!(params.get("code").map(String::as_str), Some("from_query"));
        assert_eq!(params.get("state").map(String::as_str), Some("xyz"));
    }

    #[test]
    fn test_percent_and_plus_decoding() {
        let params = parse_redirect_params(
            "http://localhost:8080/callback?error_description=Access%20was+denied&code=a%2Bb",
        );

        assert_eq!(
            params.get("error_description").map(String::as_str),
            Some("Access was denied")
        );
        assert_eq!(params.get("code").map(String::as_str), Some("a+b"));
    }

    #[test]
    fn test_valueless_and_empty_pairs() {
        let params = parse_redirect_params("http://localhost:8080/callback?flag&&state=s");

        assert_eq!(params.get("flag").map(String::as_str), Some(""));
        assert_eq!(params.get("state").map(String::as_str), Some("s"));
    }

    #[test]
    fn test_browser_result_success() {
        let result =
            BrowserResult::from_redirect("http://localhost:8080/callback?code=abc&state=xyz");

        assert!(result.success);
        assert_eq!(result.code.as_deref(), Some("abc"));
        assert_eq!(result.state.as_deref(), Some("xyz"));
        assert!(result.error.is_none());
    }

    #[test]
    fn test_browser_result_provider_error() {
        let result = BrowserResult::from_redirect(
            "http://localhost:8080/callback?error=access_denied&error_description=User%20denied&state=xyz",
        );

        assert!(!result.success);
        assert!(result.code.is_none());
        assert_eq!(result.error.as_deref(), Some("access_denied"));
        assert_eq!(result.error_description.as_deref(), Some("User denied"));
        assert_eq!(result.state.as_deref(), Some("xyz"));
    }

    #[test]
    fn test_browser_result_neither_code_nor_error() {
        let result = BrowserResult::from_redirect("http://localhost:8080/callback?state=xyz");

        assert!(!result.success);
        assert!(result.code.is_none());
        assert!(result.error.is_none());
    }

    #[test]
    fn test_browser_result_error_wins_over_code() {
        let result = BrowserResult::from_redirect(
            "http://localhost:8080/callback?code=abc&error=server_error",
        );

        assert!(!result.success);
        assert!(result.code.is_none());
        assert_eq!(result.error.as_deref(), Some("server_error"));
    }
}
