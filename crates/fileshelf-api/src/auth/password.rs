//! Password hashing compatible with stored legacy hashes: unsalted SHA-1, hex encoded.

use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;

pub fn hash_password(password: &str) -> String {
    hex::encode(Sha1::digest(password.as_bytes()))
}

/// Constant-time comparison against a stored hex digest.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let computed = hash_password(password);
    let stored = stored_hash.to_ascii_lowercase();
    if computed.len() != stored.len() {
        return false;
    }
    computed.as_bytes().ct_eq(stored.as_bytes()).into()
}
