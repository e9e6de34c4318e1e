//! # Tagged SHA-256
//!
//! Domain-separated SHA-256 used for deterministic address derivation,
//! ciphertext handle derivation and mock input proofs.
//!
//! ## Security Invariant
//!
//! Every digest is prefixed with a domain tag and each part is length
//! prefixed, so `("ab", "c")` and `("a", "bc")` never collide and a handle
//! digest can never be replayed as an address digest.

use sha2::{Digest, Sha256};

/// Compute `SHA-256(len(tag) || tag || len(p0) || p0 || ...)`.
pub fn tagged_sha256(tag: &str, parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update((tag.len() as u64).to_be_bytes());
    hasher.update(tag.as_bytes());
    for part in parts {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    let hash = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    bytes
}

/// Render bytes as a lowercase hex string.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
