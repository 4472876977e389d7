//! Tenant identity and API-key material.
//!
//! A tenant owns exactly one active API key at a time. Rotation replaces the
//! stored key atomically; the old value stops resolving the instant the
//! rotation commits.

use chrono::{DateTime, Utc};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Fixed prefix carried by every issued key, e.g. `zero_3f9a…`.
pub const KEY_PREFIX: &str = "zero_";

/// A tenant account. Created out-of-band (admin tooling), never through the
/// authenticated API surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
  pub id:         Uuid,
  pub email:      String,
  pub created_at: DateTime<Utc>,
}

/// The profile view returned to an authenticated caller. Field names match
/// the wire contract (`apiKey` is camel-cased).
#[derive(Debug, Clone, Serialize)]
pub struct TenantProfile {
  pub id:         Uuid,
  pub email:      String,
  #[serde(rename = "apiKey")]
  pub api_key:    ApiKey,
  pub created_at: DateTime<Utc>,
}

// ─── ApiKey ──────────────────────────────────────────────────────────────────

/// An API key value: [`KEY_PREFIX`] followed by 32 bytes of OS entropy,
/// hex-encoded.
///
/// Serialises as a plain string. The `Debug` impl redacts the token so keys
/// do not end up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey(String);

impl ApiKey {
  /// Generate a fresh key from OS entropy.
  pub fn generate() -> Self {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    Self(format!("{KEY_PREFIX}{}", hex::encode(bytes)))
  }

  pub fn as_str(&self) -> &str { &self.0 }

  /// SHA-256 digest of the full key string, hex-encoded. Lookups go through
  /// the digest so no raw-key string comparison happens on the auth path.
  pub fn digest(&self) -> String { digest_of(&self.0) }
}

impl From<String> for ApiKey {
  fn from(value: String) -> Self { Self(value) }
}

impl std::fmt::Debug for ApiKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "ApiKey({KEY_PREFIX}…)")
  }
}

/// Digest an arbitrary candidate string the same way stored keys are
/// digested.
pub fn digest_of(candidate: &str) -> String {
  hex::encode(Sha256::digest(candidate.as_bytes()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn generated_keys_carry_prefix_and_entropy() {
    let a = ApiKey::generate();
    let b = ApiKey::generate();
    assert!(a.as_str().starts_with(KEY_PREFIX));
    assert_eq!(a.as_str().len(), KEY_PREFIX.len() + 64);
    assert_ne!(a, b);
  }

  #[test]
  fn digest_matches_digest_of() {
    let key = ApiKey::generate();
    assert_eq!(key.digest(), digest_of(key.as_str()));
  }

  #[test]
  fn debug_never_prints_the_token() {
    let key = ApiKey::generate();
    let shown = format!("{key:?}");
    assert!(!shown.contains(&key.as_str()[KEY_PREFIX.len()..]));
  }
}
