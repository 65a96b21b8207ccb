//! Order-independent fingerprint over a set of vhosts.
//!
//! Each vhost contributes `SHA256(hostname) ‖ SHA256(website_id)`. The
//! per-vhost values are sorted bytewise, concatenated, and hashed once more.
//! Sorting makes the result independent of storage order while any added,
//! removed, renamed or re-owned vhost still changes it.
//!
//! Hashing cannot fail; the functions still return `VhostResult` so callers
//! treat fingerprinting like any other fallible registry step.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::vhosts::binding::Vhost;
use crate::vhosts::error::VhostResult;

/// 256-bit fingerprint of a vhost set.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Checksum([u8; 32]);

impl Checksum {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({})", self.to_hex())
    }
}

/// Per-vhost value: digest of the hostname followed by digest of the website ID.
fn vhost_digest(hostname: &str, website_id: &str) -> [u8; 64] {
    let mut out = [0u8; 64];
    out[..32].copy_from_slice(&Sha256::digest(hostname.as_bytes()));
    out[32..].copy_from_slice(&Sha256::digest(website_id.as_bytes()));
    out
}

/// Fingerprint over `(hostname, website_id)` pairs.
pub fn fingerprint_pairs<'a, I>(pairs: I) -> VhostResult<Checksum>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut digests: Vec<[u8; 64]> = pairs
        .into_iter()
        .map(|(hostname, website_id)| vhost_digest(hostname, website_id))
        .collect();
    digests.sort_unstable();

    let mut hasher = Sha256::new();
    for digest in &digests {
        hasher.update(digest);
    }
    Ok(Checksum(hasher.finalize().into()))
}

/// Fingerprint over a vhost set. Storage order does not affect the result.
pub fn fingerprint<'a, I>(vhosts: I) -> VhostResult<Checksum>
where
    I: IntoIterator<Item = &'a Vhost>,
{
    fingerprint_pairs(
        vhosts
            .into_iter()
            .map(|v| (v.hostname.as_str(), v.website_id.as_str())),
    )
}
