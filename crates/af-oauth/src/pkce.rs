//! PKCE (Proof Key for Code Exchange) and CSRF state generation
//!
//! Implements PKCE as defined in RFC 7636 with the S256 (SHA-256) challenge
//! method.

use af_types::{AuthError, AuthResult};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};

/// Minimum accepted verifier byte length (RFC 7636)
pub const MIN_VERIFIER_LENGTH: usize = 43;

/// Maximum accepted verifier byte length (RFC 7636)
pub const MAX_VERIFIER_LENGTH: usize = 128;

/// Verifier byte length used when none is requested
pub const DEFAULT_VERIFIER_LENGTH: usize = 64;

/// Length of the generated CSRF state string
const STATE_LENGTH: usize = 32;

/// PKCE pair for one authentication attempt
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    /// Code verifier, sent only in the token exchange request body
    pub code_verifier: String,

    /// Code challenge (BASE64URL(SHA256(code_verifier)))
    pub code_challenge: String,

    /// Challenge method (always "S256")
    pub code_challenge_method: String,
}

impl PkceChallenge {
    /// Generate a verifier/challenge pair with the default verifier length.
    pub fn generate() -> AuthResult<Self> {
        Self::with_length(DEFAULT_VERIFIER_LENGTH)
    }

    /// Generate a verifier/challenge pair drawing `length` random bytes for
    /// the verifier.
    pub fn with_length(length: usize) -> AuthResult<Self> {
        let code_verifier = generate_code_verifier(length)?;
        let code_challenge = generate_code_challenge(&code_verifier)?;

        Ok(Self {
            code_verifier,
            code_challenge,
            code_challenge_method: "S256".to_string(),
        })
    }
}

/// Generate a PKCE code verifier from `length` cryptographically secure
/// random bytes.
///
/// The verifier is the base64url encoding (no padding) of the random bytes,
/// so its character count is the base64url expansion of `length` — 86
/// characters for the default of 64 bytes. `length` outside [43, 128] is
/// rejected before any randomness is drawn.
pub fn generate_code_verifier(length: usize) -> AuthResult<String> {
    if !(MIN_VERIFIER_LENGTH..=MAX_VERIFIER_LENGTH).contains(&length) {
        return Err(AuthError::Validation(format!(
            "code verifier length must be between {} and {}, got {}",
            MIN_VERIFIER_LENGTH, MAX_VERIFIER_LENGTH, length
        )));
    }

    let mut bytes = vec![0u8; length];
    thread_rng().fill(&mut bytes[..]);

    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Derive the code challenge: BASE64URL(SHA256(verifier)), no padding.
///
/// Deterministic; the same verifier always yields the same challenge.
pub fn generate_code_challenge(verifier: &str) -> AuthResult<String> {
    if verifier.is_empty() {
        return Err(AuthError::Validation(
            "code verifier must not be empty".to_string(),
        ));
    }

    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    Ok(URL_SAFE_NO_PAD.encode(hasher.finalize()))
}

/// Generate a random state string for CSRF protection.
///
/// The state is generated per attempt, carried through the authorization
/// URL, and compared exactly once against the value echoed back by the
/// authorization server.
pub fn generate_state() -> String {
    let mut rng = thread_rng();
    (0..STATE_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..62);
            match idx {
                0..=25 => (b'A' + idx) as char,
                26..=51 => (b'a' + (idx - 26)) as char,
                _ => (b'0' + (idx - 52)) as char,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_url_safe(s: &str) -> bool {
        s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    #[test]
    fn test_verifier_charset_across_valid_lengths() {
        for length in MIN_VERIFIER_LENGTH..=MAX_VERIFIER_LENGTH {
            let verifier = generate_code_verifier(length).unwrap();
            assert!(is_url_safe(&verifier), "verifier for length {} contains invalid characters", length);
            assert!(!verifier.contains('='));
            assert!(!verifier.contains('+'));
            assert!(!verifier.contains('/'));
        }
    }

    #[test]
    fn test_verifier_character_count_is_base64_expansion() {
        // 64 random bytes encode to 86 base64url characters without padding
        let verifier = generate_code_verifier(DEFAULT_VERIFIER_LENGTH).unwrap();
        assert_eq!(verifier.len(), 86);
    }

    #[test]
    fn test_verifier_rejects_out_of_range_lengths() {
        assert!(generate_code_verifier(0).is_err());
        assert!(generate_code_verifier(42).is_err());
        assert!(generate_code_verifier(129).is_err());
        assert!(generate_code_verifier(1024).is_err());

        assert!(generate_code_verifier(43).is_ok());
        assert!(generate_code_verifier(128).is_ok());
    }

    #[test]
    fn test_challenge_is_deterministic() {
        let verifier = generate_code_verifier(64).unwrap();

        let challenge1 = generate_code_challenge(&verifier).unwrap();
        let challenge2 = generate_code_challenge(&verifier).unwrap();
        assert_eq!(challenge1, challenge2);

        let other = generate_code_verifier(64).unwrap();
        assert_ne!(challenge1, generate_code_challenge(&other).unwrap());
    }

    #[test]
    fn test_challenge_known_value() {
        // SHA-256 of "test" is 9f86d08..., base64url without padding below
        let challenge = generate_code_challenge("test").unwrap();
        assert_eq!(challenge, "n4bQgYhMfWWaL-qgxVrQFaO_TxsrC4Is0V1sFbDwCgg");
    }

    #[test]
    fn test_challenge_rejects_empty_verifier() {
        assert!(generate_code_challenge("").is_err());
    }

    #[test]
    fn test_pkce_pair_generation() {
        let pkce = PkceChallenge::generate().unwrap();

        assert_eq!(pkce.code_challenge_method, "S256");
        assert!(is_url_safe(&pkce.code_verifier));
        assert!(!pkce.code_challenge.is_empty());
        assert!(!pkce.code_challenge.contains('='));
        assert_eq!(
            pkce.code_challenge,
            generate_code_challenge(&pkce.code_verifier).unwrap()
        );
    }

    #[test]
    fn test_pkce_uniqueness() {
        let mut verifiers = std::collections::HashSet::new();
        for _ in 0..100 {
            let pkce = PkceChallenge::generate().unwrap();
            assert!(
                verifiers.insert(pkce.code_verifier),
                "Generated duplicate PKCE verifier"
            );
        }
        assert_eq!(verifiers.len(), 100);
    }

    #[test]
    fn test_generate_state() {
        let state = generate_state();

        assert_eq!(state.len(), STATE_LENGTH);
        assert!(state.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_state_uniqueness() {
        let mut states = std::collections::HashSet::new();
        for _ in 0..100 {
            assert!(states.insert(generate_state()), "Generated duplicate state");
        }
        assert_eq!(states.len(), 100);
    }
}
