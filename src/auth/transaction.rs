//! Login transaction carried across the provider redirect.
//!
//! State, PKCE verifier and return path travel in a short-lived HS256 cookie
//! signed with `AUTH0_SECRET`.

use axum::http::{HeaderValue, Uri};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginTransaction {
    pub state: String,
    pub code_verifier: String,
    pub return_to: String,
    pub exp: i64,
}

impl LoginTransaction {
    pub fn new(return_to: Option<&str>, ttl_secs: u64) -> Self {
        Self {
            state: Uuid::new_v4().simple().to_string(),
            code_verifier: generate_code_verifier(),
            return_to: safe_return_to(return_to),
            exp: (Utc::now() + Duration::seconds(ttl_secs as i64)).timestamp(),
        }
    }

    pub fn seal(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        encode(&Header::new(Algorithm::HS256), self, &EncodingKey::from_secret(secret.as_bytes()))
    }

    pub fn open(sealed: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<Self>(sealed, &DecodingKey::from_secret(secret.as_bytes()), &validation).map(|data| data.claims)
    }

    pub fn code_challenge(&self) -> String {
        code_challenge(&self.code_verifier)
    }
}

/// 64 unreserved characters, within the 43..=128 range PKCE allows
pub fn generate_code_verifier() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// S256 challenge: base64url(sha256(verifier)) without padding
pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Only same-site absolute paths that are valid in a `Location` header
/// survive; anything else lands on `/`. No whitespace or control characters.
pub fn safe_return_to(return_to: Option<&str>) -> String {
    match return_to {
        Some(path) if is_local_path(path) => path.to_string(),
        _ => "/".to_string(),
    }
}

fn is_local_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.starts_with("//")
        && !path.starts_with("/\\")
        && !path.chars().any(|c| c.is_control() || c.is_whitespace())
        && HeaderValue::from_str(path).is_ok()
        && path.parse::<Uri>().is_ok_and(|uri| uri.scheme().is_none() && uri.authority().is_none())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pkce_challenge_is_unpadded_base64url_sha256() {
        // sha256("") in base64url without padding
        assert_eq!(code_challenge(""), "47DEQpj8HBSa-_TImW-5JCeuQeRkm5NMpJWZG3hSuFU");
        assert_eq!(
            code_challenge("M25iVXpKU3puUjFaYWg3T1NDTDQtcW1ROUY5YXlwalNoc0hhakxifmZHag"),
            "qjrzSW9gMiUgpUvqgEPE4_-8swvyCtfOVvg55o5S_es"
        );
    }

    #[test]
    fn verifier_length_is_valid() {
        let verifier = generate_code_verifier();
        assert!((43..=128).contains(&verifier.len()));
        assert!(verifier.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn return_to_must_be_local() {
        assert_eq!(safe_return_to(Some("/appointments?page=2")), "/appointments?page=2");
        assert_eq!(safe_return_to(Some("//evil.example.com")), "/");
        assert_eq!(safe_return_to(Some("https://evil.example.com")), "/");
        assert_eq!(safe_return_to(Some("/\\evil.example.com")), "/");
        assert_eq!(safe_return_to(None), "/");
    }

    #[test]
    fn return_to_with_control_characters_is_dropped() {
        assert_eq!(safe_return_to(Some("/appointments\nSet-Cookie: x=1")), "/");
        assert_eq!(safe_return_to(Some("/\t/evil.example.com")), "/");
        assert_eq!(safe_return_to(Some("/appointments\r")), "/");
        assert_eq!(safe_return_to(Some("/a b")), "/");
        assert_eq!(safe_return_to(Some("/admin/users?page=2&sort=name")), "/admin/users?page=2&sort=name");
    }

    #[test]
    fn sealed_transaction_rejects_other_secret() {
        let txn = LoginTransaction::new(Some("/profile"), 600);
        let sealed = txn.seal("first-secret").unwrap();

        assert_eq!(LoginTransaction::open(&sealed, "first-secret").unwrap(), txn);
        assert!(LoginTransaction::open(&sealed, "second-secret").is_err());
    }
}
