//! SHA-256 helpers via `ring::digest`.

use ring::digest::{Context, SHA256};

/// Compute SHA-256 of raw bytes, lowercase hex.
#[must_use]
pub fn sha256_bytes(data: &[u8]) -> String {
    let digest = ring::digest::digest(&SHA256, data);
    hex::encode(digest.as_ref())
}

/// Fingerprint of a code window: SHA-256 over `address || bytes`.
///
/// The same bytes at a different address give a different fingerprint.
#[must_use]
pub fn code_fingerprint(address: usize, bytes: &[u8]) -> String {
    let mut context = Context::new(&SHA256);
    context.update(&(address as u64).to_le_bytes());
    context.update(bytes);
    hex::encode(context.finish().as_ref())
}
