//! Authentication
//!
//! The "verify credential, return identity" capability guarding the data
//! endpoints, and its API key implementation (SHA-256 digests).

use std::collections::HashSet;

use crate::config::AuthConfig;

/// Authenticated caller attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Short, non-secret label for logs (digest prefix for API keys)
    pub subject: String,
}

/// Verify a presented credential.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, credential: &str) -> Option<Identity>;
}

// ── API Key Hashing (SHA-256) ───────────────────────────────────────────────

/// Hash an API key using SHA-256 for fast lookup.
pub fn hash_api_key(key: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Accepts any key whose SHA-256 digest is configured.
#[derive(Debug, Clone, Default)]
pub struct ApiKeyVerifier {
    digests: HashSet<String>,
}

impl ApiKeyVerifier {
    /// Build from plain keys and pre-computed hex digests.
    pub fn new(plain_keys: &[String], digests: &[String]) -> Self {
        let mut set: HashSet<String> = plain_keys.iter().map(|k| hash_api_key(k)).collect();
        set.extend(digests.iter().map(|d| d.trim().to_ascii_lowercase()));
        Self { digests: set }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.api_keys, &config.api_key_hashes)
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}

impl CredentialVerifier for ApiKeyVerifier {
    fn verify(&self, credential: &str) -> Option<Identity> {
        let digest = hash_api_key(credential);
        self.digests.contains(&digest).then(|| Identity {
            subject: format!("key:{}", &digest[..12]),
        })
    }
}

/// Extract the token of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
