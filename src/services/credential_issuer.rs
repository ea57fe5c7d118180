// src/services/credential_issuer.rs
//! Assertion issuance.
//!
//! Builds the JOSE header and assertion payload, signs them, and checks the
//! resulting token against the issuer's own public key before releasing it.
//!
//! Lifecycle of one assertion:
//! `unsigned -> signed -> self-verified` (token returned) or
//! `signed -> issuance failed` (`SelfVerificationFailed`).

use crate::config::ConfigProvider;
use crate::error::{BadgeError, Result};
use crate::jws::engine::SignatureEngine;
use crate::models::assertion::{Assertion, CompactToken};
use crate::models::badge::{BadgeDefinition, Issuer};
use crate::services::verifier::VerificationService;
use crate::utils::crypto::recipient_identity;
use crate::utils::serialization::{encode, signing_input, to_base64url};
use crate::wallet::key_management::{KeyManager, PrivateKey};
use chrono::Utc;
use log::{info, warn};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Signs assertions and gates them on self-verification.
#[derive(Debug, Clone, Default)]
pub struct AssertionBuilder {
    engine: SignatureEngine,
    verifier: VerificationService,
}

impl AssertionBuilder {
    /// Creates a builder; the self-verification gate shares `engine`.
    pub fn new(engine: SignatureEngine) -> Self {
        AssertionBuilder {
            verifier: VerificationService::new(engine.clone()),
            engine,
        }
    }

    /// Signs an assertion awarding `badge` to `recipient`, dated now.
    ///
    /// # Arguments
    /// * `issuer` - Signing authority
    /// * `badge` - Badge being awarded
    /// * `recipient` - Recipient email (stored hashed)
    /// * `private_key` - Issuer signing key; selects the header `alg`
    ///
    /// # Errors
    /// - Registry and signing errors
    /// - `SelfVerificationFailed` if the token does not verify against
    ///   the public half of `private_key`
    pub fn build_and_sign(
        &self,
        issuer: &Issuer,
        badge: &BadgeDefinition,
        recipient: &str,
        private_key: &PrivateKey,
    ) -> Result<CompactToken> {
        let assertion = Assertion::new(issuer, badge, recipient, Utc::now().timestamp());
        self.sign_assertion(&assertion, private_key)
    }

    /// Signs a prepared payload and runs the self-verification gate.
    pub fn sign_assertion(&self, assertion: &Assertion, private_key: &PrivateKey) -> Result<CompactToken> {
        let header = self.engine.header_for(private_key)?;
        let header_segment = encode(&header)?;
        let payload_segment = encode(assertion)?;

        let input = signing_input(&header_segment, &payload_segment);
        let signature = self
            .engine
            .sign_with_header(&header, &input, Some(private_key))?;
        let token = CompactToken::from_segments(&header_segment, &payload_segment, &to_base64url(&signature));

        if !self.verifier.verify_local(token.as_str(), &private_key.public_key())? {
            warn!("assertion {} failed self-verification", assertion.uid);
            return Err(BadgeError::SelfVerificationFailed);
        }
        Ok(token)
    }

    /// Issues `badge_name` to `recipient` using the configured issuer and key.
    ///
    /// # Process Flow
    /// 1. Looks the badge up in the catalog (`BadgeNotFound`)
    /// 2. Loads the issuer's private key from its deterministic path (`KeyReadError`)
    /// 3. Signs and self-verifies
    /// 4. Appends to the issuance log, when one is configured
    pub fn issue<C: ConfigProvider + ?Sized>(
        &self,
        config: &C,
        badge_name: &str,
        recipient: &str,
    ) -> Result<CompactToken> {
        let badge = config.get_badge(badge_name)?;
        let issuer = config.get_issuer();
        let private_key = KeyManager::new(config.get_key_paths()).load_issuer_private(&issuer.name)?;

        let token = self.build_and_sign(issuer, badge, recipient, &private_key)?;
        info!("issued badge `{}` signed by `{}`", badge.name, issuer.name);

        if let Some(log_path) = config.get_issuance_log() {
            if let Err(e) = append_issuance_log(log_path, &badge.name, recipient, &token) {
                warn!("could not record issuance in {}: {e}", log_path.display());
            }
        }
        Ok(token)
    }
}

/// Appends `<timestamp>\t<badge>\t<identity hash>\t<token>` to `path`.
pub fn append_issuance_log(
    path: &Path,
    badge_name: &str,
    recipient: &str,
    token: &CompactToken,
) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(
        file,
        "{}\t{}\t{}\t{}",
        Utc::now().to_rfc3339(),
        badge_name,
        recipient_identity(recipient),
        token
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{KeyPaths, StaticConfig};
    use crate::fixtures::{sample_badge, sample_issuer};
    use crate::jws::algorithms::{AlgorithmEntry, AlgorithmRegistry, ES256};
    use crate::models::assertion::Header;
    use crate::utils::serialization::decode;
    use crate::wallet::key_management::{KeyFamily, PublicKey};
    use std::fs;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> StaticConfig {
        StaticConfig {
            issuer: sample_issuer(),
            badges: vec![sample_badge()],
            key_paths: KeyPaths {
                private_dir: dir.path().join("private"),
                public_dir: dir.path().join("public"),
            },
            algorithm: KeyFamily::EcP256,
            issuance_log: Some(dir.path().join("issued.log")),
        }
    }

    #[test]
    fn test_token_structure() {
        let key = PrivateKey::generate(KeyFamily::EcP256).unwrap();
        let builder = AssertionBuilder::default();

        let before = Utc::now().timestamp();
        let token = builder
            .build_and_sign(&sample_issuer(), &sample_badge(), "alice@example.com", &key)
            .unwrap();

        assert_eq!(token.as_str().split('.').count(), 3);
        let segments = token.segments();
        let header: Header = decode(segments.header).unwrap();
        assert_eq!(header.alg, ES256);

        let payload: Assertion = decode(segments.payload).unwrap();
        assert!(payload.is_issued_to("alice@example.com").unwrap());
        assert!(payload.issued_on >= before);
        assert_eq!(payload.uid, Assertion::uid_for(&sample_issuer(), &sample_badge(), "alice@example.com"));
    }

    // A verifier that rejects everything makes the gate trip.
    fn reject_all(_: &[u8], _: &[u8], _: &PublicKey) -> bool {
        false
    }

    #[test]
    fn test_self_verification_gate() {
        let default = AlgorithmRegistry::default();
        let es256 = *default.lookup(ES256).unwrap();
        let mut registry = AlgorithmRegistry::empty();
        registry.register(AlgorithmEntry {
            verifier: Some(reject_all),
            ..es256
        });

        let builder = AssertionBuilder::new(SignatureEngine::new(registry));
        let key = PrivateKey::generate(KeyFamily::EcP256).unwrap();
        let result = builder.build_and_sign(&sample_issuer(), &sample_badge(), "alice@example.com", &key);
        assert!(matches!(result, Err(BadgeError::SelfVerificationFailed)));
    }

    #[test]
    fn test_issue_from_config() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        KeyManager::new(&config.key_paths)
            .generate(&config.issuer.name, KeyFamily::EcP256)
            .unwrap();

        let token = AssertionBuilder::default()
            .issue(&config, "B1", "alice@example.com")
            .unwrap();

        let log = fs::read_to_string(dir.path().join("issued.log")).unwrap();
        assert_eq!(log.lines().count(), 1);
        assert!(log.contains(token.as_str()));
        assert!(log.contains(&recipient_identity("alice@example.com")));
        assert!(!log.contains("alice@example.com"));
    }

    #[test]
    fn test_issue_errors() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let builder = AssertionBuilder::default();

        assert!(matches!(
            builder.issue(&config, "Unknown", "alice@example.com"),
            Err(BadgeError::BadgeNotFound(_))
        ));
        // no key generated yet
        assert!(matches!(
            builder.issue(&config, "B1", "alice@example.com"),
            Err(BadgeError::KeyReadError { .. })
        ));
    }
}
