use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `input` (always 64 chars).
pub fn fingerprint(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}
