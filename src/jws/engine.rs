// src/jws/engine.rs
//! Raw signing and verification over a compact signing input.

use crate::error::{BadgeError, Result};
use crate::jws::algorithms::AlgorithmRegistry;
use crate::models::assertion::Header;
use crate::wallet::key_management::{PrivateKey, PublicKey};
use log::{debug, warn};

/// Signs and verifies with the algorithm bound to each key's family.
#[derive(Debug, Clone, Default)]
pub struct SignatureEngine {
    registry: AlgorithmRegistry,
}

impl SignatureEngine {
    pub fn new(registry: AlgorithmRegistry) -> Self {
        SignatureEngine { registry }
    }

    pub fn registry(&self) -> &AlgorithmRegistry {
        &self.registry
    }

    /// JOSE header for tokens signed with `key`, e.g. `{"alg":"ES256"}`.
    pub fn header_for(&self, key: &PrivateKey) -> Result<Header> {
        let entry = self.registry.algorithm_for(key.family())?;
        Ok(Header::new(entry.id))
    }

    /// Signs `signing_input` with `key`.
    ///
    /// ES256 keys yield a 64-byte `r || s` signature, RSA keys a PKCS#1 v1.5
    /// signature; both over SHA-256 of the input.
    ///
    /// # Errors
    /// Registry resolution errors, or `SignatureCreation` from the crypto library.
    pub fn sign(&self, signing_input: &[u8], key: &PrivateKey) -> Result<Vec<u8>> {
        let header = self.header_for(key)?;
        self.sign_with_header(&header, signing_input, Some(key))
    }

    /// Signs with the algorithm named by `header`.
    pub fn sign_with_header(
        &self,
        header: &Header,
        signing_input: &[u8],
        key: Option<&PrivateKey>,
    ) -> Result<Vec<u8>> {
        let signer = self.registry.resolve_signer(header, key)?;
        debug!("signing {} bytes with {}", signing_input.len(), signer.algorithm);
        signer.sign(signing_input)
    }

    /// Verifies `signature` over `signing_input` with `key`.
    ///
    /// Returns `false` for any failure, including an unusable key or a
    /// malformed signature. Details are only logged.
    pub fn verify(&self, signing_input: &[u8], signature: &[u8], key: &PublicKey) -> bool {
        let header = match self.registry.algorithm_for(key.family()) {
            Ok(entry) => Header::new(entry.id),
            Err(e) => {
                debug!("no algorithm for {} keys: {e}", key.family());
                return false;
            }
        };
        self.verify_with_header(&header, signing_input, signature, key)
    }

    /// Verifies with the algorithm named by `header`. Never fails.
    pub fn verify_with_header(
        &self,
        header: &Header,
        signing_input: &[u8],
        signature: &[u8],
        key: &PublicKey,
    ) -> bool {
        match self.registry.resolve_verifier(header, Some(key)) {
            Ok(verifier) => verifier.verify(signing_input, signature),
            Err(BadgeError::KeyFamilyMismatch { algorithm, family }) => {
                warn!("token signed with {algorithm} cannot be checked with a {family} key");
                false
            }
            Err(e) => {
                warn!("cannot verify `{}` signature: {e}", header.alg);
                false
            }
        }
    }
}
