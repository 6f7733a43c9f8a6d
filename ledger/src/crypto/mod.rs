//! # Cryptographic Primitives
//!
//! The ledger needs exactly one primitive: SHA-256. Block hashes, chain
//! links, and integrity checks all go through the helpers in [`hash`].
//!
//! SHA-256 rather than anything faster, because chains written by the
//! legacy DiaBot service are SHA-256 and they have to keep verifying.

pub mod hash;

pub use hash::{is_hex_digest, sha256_array, sha256_hex, sha256_hex_multi};
