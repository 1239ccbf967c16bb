//! Domain-separated hashing for memo keys.
//!
//! Match results are memoized under the ordered pair of the operands' display
//! strings, qualified by the registry. The pair is hashed with SHA-256, using
//! domain separation and length prefixing so that `("ab", "c")` and
//! `("a", "bc")` never collide structurally.
//!
//! # Citations
//! - SHA-256: NIST FIPS 180-4 (2015)
//! - Domain separation & length prefixing: Bernstein et al., "How to hash into elliptic curves" (2009)

use crate::arena::RegistryId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Domain for match memo keys (v0).
pub const DOMAIN_MATCH_PAIR_V0: &[u8] = b"MATCH_PAIR_V0";

/// A 256-bit hash value.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashValue(pub [u8; 32]);

impl HashValue {
    /// Computes SHA-256 of `data` with domain separation.
    ///
    /// Hashed as `b"sortal/<domain>/1" || le64(len(data)) || data`.
    pub fn hash_with_domain(domain: &[u8], data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"sortal/");
        hasher.update(domain);
        hasher.update(b"/1");
        hasher.update((data.len() as u64).to_le_bytes());
        hasher.update(data);
        Self(hasher.finalize().into())
    }
}

impl std::fmt::Display for HashValue {
    /// Short hex prefix, enough to tell keys apart in logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0[..6] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

fn push_prefixed(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
    buf.extend_from_slice(bytes);
}

/// Memo key of the ordered pair `(lhs, rhs)` of display strings.
pub fn pair_key(label: &str, registry: RegistryId, lhs: &str, rhs: &str) -> HashValue {
    let mut data = Vec::with_capacity(32 + label.len() + lhs.len() + rhs.len());
    push_prefixed(&mut data, label.as_bytes());
    data.extend_from_slice(&registry.as_u32().to_le_bytes());
    push_prefixed(&mut data, lhs.as_bytes());
    push_prefixed(&mut data, rhs.as_bytes());
    HashValue::hash_with_domain(DOMAIN_MATCH_PAIR_V0, &data)
}
