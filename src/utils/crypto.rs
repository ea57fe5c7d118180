// src/utils/crypto.rs
//! Digest helpers used for deterministic naming and identity hashing.
//!
//! - SHA-1 names key files and assertion uids
//! - SHA-256 hashes recipient identities
//!
//! Signature digests are computed inside the signature engine, not here.

use crate::error::{BadgeError, Result};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Prefix of a hashed recipient identity.
pub const IDENTITY_PREFIX: &str = "sha256$";

/// Digest algorithms known to the hash utility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
}

impl FromStr for HashAlgorithm {
    type Err = BadgeError;

    fn from_str(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().replace('-', "").as_str() {
            "sha1" => Ok(HashAlgorithm::Sha1),
            "sha256" => Ok(HashAlgorithm::Sha256),
            other => Err(BadgeError::HashError(format!("unknown digest `{other}`"))),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Sha1 => f.write_str("sha1"),
            HashAlgorithm::Sha256 => f.write_str("sha256"),
        }
    }
}

/// Computes the lowercase hex digest of `data`.
///
/// # Arguments
/// * `data` - Bytes to hash
/// * `algorithm` - Digest to apply
pub fn digest(data: &[u8], algorithm: HashAlgorithm) -> String {
    match algorithm {
        HashAlgorithm::Sha1 => hex::encode(Sha1::digest(data)),
        HashAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
    }
}

/// Like [`digest`], but selects the algorithm by name.
///
/// # Errors
/// `HashError` when the name is not a supported digest.
pub fn digest_named(data: &[u8], algorithm: &str) -> Result<String> {
    Ok(digest(data, algorithm.parse()?))
}

pub fn sha1_hex(data: &[u8]) -> String {
    digest(data, HashAlgorithm::Sha1)
}

pub fn sha256_hex(data: &[u8]) -> String {
    digest(data, HashAlgorithm::Sha256)
}

/// Hashed recipient identity as stored in assertions: `sha256$<hex>`.
pub fn recipient_identity(recipient: &str) -> String {
    format!("{IDENTITY_PREFIX}{}", sha256_hex(recipient.as_bytes()))
}

/// Checks a stored `<algorithm>$<hex>` identity against a plain recipient.
///
/// The digest is taken from the identity's own prefix, so identities hashed
/// with any supported algorithm can be checked. An identity without a prefix
/// never matches.
///
/// # Errors
/// `HashError` when the prefix names an unsupported digest.
pub fn identity_matches(identity: &str, recipient: &str) -> Result<bool> {
    let Some((algorithm, expected)) = identity.split_once('$') else {
        return Ok(false);
    };
    let actual = digest_named(recipient.as_bytes(), algorithm)?;
    Ok(actual.eq_ignore_ascii_case(expected))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(sha1_hex(b"abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_named_digest() {
        assert_eq!(digest_named(b"abc", "SHA-1").unwrap(), sha1_hex(b"abc"));
        assert_eq!(digest_named(b"abc", "sha256").unwrap(), sha256_hex(b"abc"));
        assert!(matches!(
            digest_named(b"abc", "md5"),
            Err(BadgeError::HashError(_))
        ));
    }

    #[test]
    fn test_identity_matches() {
        let identity = recipient_identity("alice@example.com");
        assert!(identity_matches(&identity, "alice@example.com").unwrap());
        assert!(!identity_matches(&identity, "bob@example.com").unwrap());

        let sha1_identity = format!("sha1${}", sha1_hex(b"alice@example.com").to_uppercase());
        assert!(identity_matches(&sha1_identity, "alice@example.com").unwrap());

        assert!(!identity_matches("alice@example.com", "alice@example.com").unwrap());
        assert!(matches!(
            identity_matches("md5$0cc175b9c0f1b6a831c399e269772661", "a"),
            Err(BadgeError::HashError(_))
        ));
    }

    #[test]
    fn test_recipient_identity_format() {
        let identity = recipient_identity("alice@example.com");
        assert!(identity.starts_with("sha256$"));
        assert_eq!(identity.len(), "sha256$".len() + 64);
        assert_eq!(identity, recipient_identity("alice@example.com"));
        assert_ne!(identity, recipient_identity("bob@example.com"));
    }
}
