// src/jws/algorithms.rs
//! Algorithm registry for the JWS header `alg` parameter.
//!
//! Resolution is a pure lookup: `(header, key) -> (function, key)`. Nothing
//! is written into shared state while processing a header.
//!
//! Registered by default:
//! - `ES256`: ECDSA on P-256 with SHA-256, fixed 64-byte `r || s` signatures
//! - `RS256`: RSASSA-PKCS1-v1_5 with SHA-256

use crate::error::{BadgeError, Result};
use crate::models::assertion::Header;
use crate::wallet::key_management::{KeyFamily, PrivateKey, PublicKey};
use log::debug;
use p256::ecdsa::signature::{Signer as _, Verifier as _};
use rsa::signature::SignatureEncoding as _;
use sha2::Sha256;
use std::fmt;

/// Produces a raw signature over the signing input.
pub type SignFn = fn(&[u8], &PrivateKey) -> Result<Vec<u8>>;

/// Checks a raw signature. Never fails: any problem is `false`.
pub type VerifyFn = fn(&[u8], &[u8], &PublicKey) -> bool;

pub const ES256: &str = "ES256";
pub const RS256: &str = "RS256";

/// One registered algorithm identifier.
#[derive(Clone, Copy)]
pub struct AlgorithmEntry {
    pub id: &'static str,
    pub family: KeyFamily,
    pub signer: Option<SignFn>,
    pub verifier: Option<VerifyFn>,
}

impl fmt::Debug for AlgorithmEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgorithmEntry")
            .field("id", &self.id)
            .field("family", &self.family)
            .field("signer", &self.signer.is_some())
            .field("verifier", &self.verifier.is_some())
            .finish()
    }
}

/// A signing function bound to the key it will use.
#[derive(Clone, Copy)]
pub struct ResolvedSigner<'k> {
    pub algorithm: &'static str,
    pub key: &'k PrivateKey,
    sign: SignFn,
}

impl ResolvedSigner<'_> {
    pub fn sign(&self, signing_input: &[u8]) -> Result<Vec<u8>> {
        (self.sign)(signing_input, self.key)
    }
}

/// A verification function bound to the key it will use.
#[derive(Clone, Copy)]
pub struct ResolvedVerifier<'k> {
    pub algorithm: &'static str,
    pub key: &'k PublicKey,
    verify: VerifyFn,
}

impl ResolvedVerifier<'_> {
    pub fn verify(&self, signing_input: &[u8], signature: &[u8]) -> bool {
        (self.verify)(signing_input, signature, self.key)
    }
}

/// Maps `alg` identifiers to their implementations.
#[derive(Debug, Clone)]
pub struct AlgorithmRegistry {
    entries: Vec<AlgorithmEntry>,
}

impl Default for AlgorithmRegistry {
    fn default() -> Self {
        let mut registry = AlgorithmRegistry::empty();
        registry.register(AlgorithmEntry {
            id: ES256,
            family: KeyFamily::EcP256,
            signer: Some(es256_sign),
            verifier: Some(es256_verify),
        });
        registry.register(AlgorithmEntry {
            id: RS256,
            family: KeyFamily::Rsa2048,
            signer: Some(rs256_sign),
            verifier: Some(rs256_verify),
        });
        registry
    }
}

impl AlgorithmRegistry {
    pub fn empty() -> Self {
        AlgorithmRegistry { entries: Vec::new() }
    }

    /// Adds an entry, replacing any previous entry with the same id.
    pub fn register(&mut self, entry: AlgorithmEntry) {
        self.entries.retain(|existing| existing.id != entry.id);
        self.entries.push(entry);
    }

    /// Finds the entry for an `alg` identifier.
    ///
    /// # Errors
    /// `UnsupportedAlgorithm` for unknown identifiers.
    pub fn lookup(&self, alg: &str) -> Result<&AlgorithmEntry> {
        self.entries
            .iter()
            .find(|entry| entry.id == alg)
            .ok_or_else(|| BadgeError::UnsupportedAlgorithm(alg.to_string()))
    }

    /// The signing algorithm used for keys of `family`.
    pub fn algorithm_for(&self, family: KeyFamily) -> Result<&AlgorithmEntry> {
        self.entries
            .iter()
            .find(|entry| entry.family == family && entry.signer.is_some())
            .ok_or_else(|| BadgeError::UnsupportedAlgorithm(family.to_string()))
    }

    /// Resolves the signer named by `header` and checks the key fits it.
    ///
    /// # Errors
    /// - `UnsupportedAlgorithm` for an unknown `alg`
    /// - `MissingKey` when `key` is `None`
    /// - `MissingSigner` when the entry has no signing function
    /// - `KeyFamilyMismatch` when the key belongs to another family
    pub fn resolve_signer<'k>(
        &self,
        header: &Header,
        key: Option<&'k PrivateKey>,
    ) -> Result<ResolvedSigner<'k>> {
        let entry = self.lookup(&header.alg)?;
        let key = key.ok_or_else(|| BadgeError::MissingKey(entry.id.to_string()))?;
        let sign = entry
            .signer
            .ok_or_else(|| BadgeError::MissingSigner(entry.id.to_string()))?;
        check_family(entry, key.family())?;
        Ok(ResolvedSigner {
            algorithm: entry.id,
            key,
            sign,
        })
    }

    /// Resolves the verifier named by `header` and checks the key fits it.
    ///
    /// # Errors
    /// Same as [`resolve_signer`](Self::resolve_signer), with `MissingVerifier`.
    pub fn resolve_verifier<'k>(
        &self,
        header: &Header,
        key: Option<&'k PublicKey>,
    ) -> Result<ResolvedVerifier<'k>> {
        let entry = self.lookup(&header.alg)?;
        let key = key.ok_or_else(|| BadgeError::MissingKey(entry.id.to_string()))?;
        let verify = entry
            .verifier
            .ok_or_else(|| BadgeError::MissingVerifier(entry.id.to_string()))?;
        check_family(entry, key.family())?;
        Ok(ResolvedVerifier {
            algorithm: entry.id,
            key,
            verify,
        })
    }
}

fn check_family(entry: &AlgorithmEntry, family: KeyFamily) -> Result<()> {
    if entry.family != family {
        return Err(BadgeError::KeyFamilyMismatch {
            algorithm: entry.id.to_string(),
            family: family.to_string(),
        });
    }
    Ok(())
}

fn es256_sign(signing_input: &[u8], key: &PrivateKey) -> Result<Vec<u8>> {
    let PrivateKey::EcP256(secret) = key else {
        return Err(BadgeError::KeyFamilyMismatch {
            algorithm: ES256.to_string(),
            family: key.family().to_string(),
        });
    };
    let signing_key = p256::ecdsa::SigningKey::from(secret);
    let signature: p256::ecdsa::Signature = signing_key
        .try_sign(signing_input)
        .map_err(|e| BadgeError::SignatureCreation(e.to_string()))?;
    Ok(signature.to_bytes().to_vec())
}

fn es256_verify(signing_input: &[u8], signature: &[u8], key: &PublicKey) -> bool {
    let PublicKey::EcP256(public) = key else {
        debug!("ES256 verification attempted with a {} key", key.family());
        return false;
    };
    let signature = match p256::ecdsa::Signature::from_slice(signature) {
        Ok(signature) => signature,
        Err(e) => {
            debug!("ES256 signature is malformed: {e}");
            return false;
        }
    };
    let verifying_key = p256::ecdsa::VerifyingKey::from(public);
    match verifying_key.verify(signing_input, &signature) {
        Ok(()) => true,
        Err(e) => {
            debug!("ES256 signature rejected: {e}");
            false
        }
    }
}

fn rs256_sign(signing_input: &[u8], key: &PrivateKey) -> Result<Vec<u8>> {
    let PrivateKey::Rsa(secret) = key else {
        return Err(BadgeError::KeyFamilyMismatch {
            algorithm: RS256.to_string(),
            family: key.family().to_string(),
        });
    };
    let signing_key = rsa::pkcs1v15::SigningKey::<Sha256>::new(secret.as_ref().clone());
    let signature = signing_key
        .try_sign(signing_input)
        .map_err(|e| BadgeError::SignatureCreation(e.to_string()))?;
    Ok(signature.to_vec())
}

fn rs256_verify(signing_input: &[u8], signature: &[u8], key: &PublicKey) -> bool {
    let PublicKey::Rsa(public) = key else {
        debug!("RS256 verification attempted with a {} key", key.family());
        return false;
    };
    let signature = match rsa::pkcs1v15::Signature::try_from(signature) {
        Ok(signature) => signature,
        Err(e) => {
            debug!("RS256 signature is malformed: {e}");
            return false;
        }
    };
    let verifying_key = rsa::pkcs1v15::VerifyingKey::<Sha256>::new(public.clone());
    match verifying_key.verify(signing_input, &signature) {
        Ok(()) => true,
        Err(e) => {
            debug!("RS256 signature rejected: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ec_key() -> PrivateKey {
        PrivateKey::generate(KeyFamily::EcP256).unwrap()
    }

    #[test]
    fn test_unknown_algorithm() {
        let registry = AlgorithmRegistry::default();
        let key = ec_key();
        assert!(matches!(
            registry.resolve_signer(&Header::new("HS256"), Some(&key)),
            Err(BadgeError::UnsupportedAlgorithm(ref alg)) if alg == "HS256"
        ));
    }

    #[test]
    fn test_missing_key() {
        let registry = AlgorithmRegistry::default();
        assert!(matches!(
            registry.resolve_signer(&Header::new(ES256), None),
            Err(BadgeError::MissingKey(_))
        ));
        assert!(matches!(
            registry.resolve_verifier(&Header::new(ES256), None),
            Err(BadgeError::MissingKey(_))
        ));
    }

    #[test]
    fn test_missing_implementations() {
        let mut registry = AlgorithmRegistry::default();
        registry.register(AlgorithmEntry {
            id: "ES256",
            family: KeyFamily::EcP256,
            signer: None,
            verifier: None,
        });
        let key = ec_key();
        let public = key.public_key();

        assert!(matches!(
            registry.resolve_signer(&Header::new(ES256), Some(&key)),
            Err(BadgeError::MissingSigner(_))
        ));
        assert!(matches!(
            registry.resolve_verifier(&Header::new(ES256), Some(&public)),
            Err(BadgeError::MissingVerifier(_))
        ));
    }

    #[test]
    fn test_family_mismatch() {
        let registry = AlgorithmRegistry::default();
        let key = ec_key();
        assert!(matches!(
            registry.resolve_signer(&Header::new(RS256), Some(&key)),
            Err(BadgeError::KeyFamilyMismatch { .. })
        ));
    }

    #[test]
    fn test_algorithm_for_family() {
        let registry = AlgorithmRegistry::default();
        assert_eq!(registry.algorithm_for(KeyFamily::EcP256).unwrap().id, ES256);
        assert_eq!(registry.algorithm_for(KeyFamily::Rsa2048).unwrap().id, RS256);
        assert!(AlgorithmRegistry::empty().algorithm_for(KeyFamily::EcP256).is_err());
    }

    #[test]
    fn test_resolved_functions_round_trip() {
        let registry = AlgorithmRegistry::default();
        let key = ec_key();
        let public = key.public_key();
        let header = Header::new(ES256);

        let signer = registry.resolve_signer(&header, Some(&key)).unwrap();
        let signature = signer.sign(b"header.payload").unwrap();
        assert_eq!(signature.len(), 64);

        let verifier = registry.resolve_verifier(&header, Some(&public)).unwrap();
        assert!(verifier.verify(b"header.payload", &signature));
        assert!(!verifier.verify(b"header.payload2", &signature));
        assert!(!verifier.verify(b"header.payload", &signature[..63]));
    }

    #[test]
    fn test_primitives_reject_foreign_keys() {
        let ec = ec_key();
        assert!(matches!(
            rs256_sign(b"input", &ec),
            Err(BadgeError::KeyFamilyMismatch { .. })
        ));
        let signature = es256_sign(b"input", &ec).unwrap();
        let rsa = PrivateKey::generate(KeyFamily::Rsa2048).unwrap();
        assert!(!es256_verify(b"input", &signature, &rsa.public_key()));
        assert!(!rs256_verify(b"input", &signature, &rsa.public_key()));
    }
}
