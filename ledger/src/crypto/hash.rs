//! # Hashing Utilities
//!
//! SHA-256 in the shapes the ledger consumes: a fixed array and lowercase
//! hex. Block hashes are stored and compared as hex strings, so
//! `sha256_hex` is the one you want most of the time.

use sha2::{Digest, Sha256};

use crate::config::HASH_HEX_LENGTH;

/// Compute the SHA-256 hash and return a fixed-size array.
///
/// # Example
///
/// ```
/// use diabot_ledger::crypto::sha256_array;
///
/// let hash = sha256_array(b"DiaBot");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256_array(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Compute the SHA-256 hash and return it as lowercase hex.
///
/// # Example
///
/// ```
/// use diabot_ledger::crypto::sha256_hex;
///
/// assert_eq!(
///     sha256_hex(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256_array(data))
}

/// Hash several byte slices as if they were concatenated, without building
/// the concatenation.
pub fn sha256_hex_multi(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}

/// True if `s` looks like a hex-encoded SHA-256 digest (64 lowercase hex
/// characters).
pub fn is_hex_digest(s: &str) -> bool {
    s.len() == HASH_HEX_LENGTH && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_vector() {
        let expected =
            hex::decode("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
                .unwrap();
        assert_eq!(sha256_array(b"").as_slice(), expected.as_slice());
    }

    #[test]
    fn sha256_abc_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn multi_part_equals_concatenation() {
        let multi = sha256_hex_multi(&[b"hello", b" ", b"world"]);
        assert_eq!(multi, sha256_hex(b"hello world"));
    }

    #[test]
    fn hex_digest_detection() {
        assert!(is_hex_digest(&sha256_hex(b"x")));
        assert!(!is_hex_digest("0"));
        assert!(!is_hex_digest(&sha256_hex(b"x").to_uppercase()));
        assert!(!is_hex_digest(&"g".repeat(64)));
    }
}
