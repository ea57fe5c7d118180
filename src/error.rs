// src/error.rs
//! Error taxonomy for badge issuance and verification.
//!
//! Structural and I/O failures (key files, token parsing, configuration
//! lookups, container handling) surface as a [`BadgeError`] and abort the
//! operation. Cryptographic verification failures never appear here: they
//! collapse to `false` inside the signature engine.

use std::path::PathBuf;
use thiserror::Error;

/// Every failure kind the library reports to its callers.
#[derive(Debug, Error)]
pub enum BadgeError {
    /// A private key already exists for this issuer; generation never overwrites.
    #[error("a private key already exists at {}", .0.display())]
    KeyAlreadyExists(PathBuf),

    #[error("key generation failed: {0}")]
    KeyGenerationError(String),

    #[error("could not persist key to {}: {reason}", .path.display())]
    KeyPersistenceError { path: PathBuf, reason: String },

    #[error("could not read key from {source_name}: {reason}")]
    KeyReadError { source_name: String, reason: String },

    #[error("digest computation failed: {0}")]
    HashError(String),

    #[error("unsupported algorithm `{0}`")]
    UnsupportedAlgorithm(String),

    /// Resolution needed a key and none was supplied.
    #[error("no key available for algorithm `{0}`")]
    MissingKey(String),

    #[error("algorithm `{0}` has no signer registered")]
    MissingSigner(String),

    #[error("algorithm `{0}` has no verifier registered")]
    MissingVerifier(String),

    #[error("algorithm `{algorithm}` cannot be used with a {family} key")]
    KeyFamilyMismatch { algorithm: String, family: String },

    #[error("signature creation failed: {0}")]
    SignatureCreation(String),

    #[error("malformed token: expected 3 segments, found {0}")]
    MalformedToken(usize),

    #[error("malformed token segment: {0}")]
    MalformedSegment(String),

    #[error("badge `{0}` not found in configuration")]
    BadgeNotFound(String),

    /// Issuance produced a token that does not verify against the issuer's own key.
    #[error("freshly signed assertion failed self-verification")]
    SelfVerificationFailed,

    #[error("container document could not be parsed: {0}")]
    ContainerNotFound(String),

    #[error("error signing container: {0}")]
    SigningError(String),

    #[error("file to sign does not exist: {}", .0.display())]
    FileToSignNotExists(PathBuf),

    #[error("container holds no openbadges assertion")]
    MissingAssertion,

    #[error("assertion has no recipient identity")]
    AssertionMissingIdentity,

    #[error("could not fetch public key from {url}: {reason}")]
    NetworkFetchError { url: String, reason: String },

    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for BadgeError {
    fn from(err: config::ConfigError) -> Self {
        BadgeError::ConfigError(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BadgeError>;
