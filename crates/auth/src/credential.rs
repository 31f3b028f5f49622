//! Credential digests.
//!
//! Stored digests are lowercase hex SHA-256 of the raw credential.

use sha2::{Digest, Sha256};

/// Compute the stored form of a credential.
pub fn hash_credential(credential: &str) -> String {
    hex::encode(Sha256::digest(credential.as_bytes()))
}

/// Check a presented credential against a stored digest.
///
/// The comparison runs over every byte regardless of where the first
/// difference is, so timing does not reveal the matching prefix length.
pub fn verify_credential(presented: &str, stored_hash: &str) -> bool {
    let computed = hash_credential(presented);
    let stored = stored_hash.trim().to_ascii_lowercase();

    if computed.len() != stored.len() {
        return false;
    }

    computed
        .bytes()
        .zip(stored.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
