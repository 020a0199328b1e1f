//! Cryptographic Utilities

use sha2::{Digest, Sha256};

/// Number of digest bytes kept in a fingerprint
const FINGERPRINT_BYTES: usize = 6;

/// Compute SHA-256 hash
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Short, non-reversible identifier for a secret.
///
/// Lets logs correlate events about the same credential without
/// ever writing the credential itself.
pub fn fingerprint(secret: &[u8]) -> String {
    let digest = sha256(secret);
    hex::encode(&digest[..FINGERPRINT_BYTES])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_values() {
        let hash = sha256(b"");
        let expected =
            hex::decode("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
                .unwrap();
        assert_eq!(hash.to_vec(), expected);

        let hash = sha256(b"hello");
        let expected =
            hex::decode("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
                .unwrap();
        assert_eq!(hash.to_vec(), expected);
    }

    #[test]
    fn test_fingerprint_is_digest_prefix() {
        assert_eq!(fingerprint(b"hello"), "2cf24dba5fb0");
        assert_eq!(fingerprint(b"hello").len(), FINGERPRINT_BYTES * 2);
    }

    #[test]
    fn test_fingerprint_differs_per_secret() {
        assert_ne!(fingerprint(b"tok123"), fingerprint(b"tok124"));
    }
}
