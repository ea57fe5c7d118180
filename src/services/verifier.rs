// src/services/verifier.rs
//! Assertion verification.
//!
//! Two workflows are offered:
//! - **Local**: check a token against a public key the caller already trusts
//! - **Inverse**: download the signer's public key from the `verify.url`
//!   carried inside the token, check the signature, then check that the
//!   token was issued to the claimed recipient
//!
//! The downloaded key is only used for discovery: the signature check is
//! what establishes trust, never the server that served the key.

use crate::error::{BadgeError, Result};
use crate::jws::engine::SignatureEngine;
use crate::models::assertion::{Assertion, Header};
use crate::storage::svg_container::SvgEmbedder;
use crate::utils::serialization::{decode, from_base64url, parse_token};
use crate::wallet::key_management::{KeyManager, PublicKey};
use log::{debug, info, warn};
use reqwest::blocking::Client;
use reqwest::Url;
use std::path::Path;
use std::time::Duration;

/// Upper bound on the public key download. There is no retry.
pub const KEY_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Verifies compact tokens locally or against a remotely published key.
///
/// No key material is kept between calls: every verification reads or
/// fetches the key it needs.
#[derive(Debug, Clone)]
pub struct VerificationService {
    engine: SignatureEngine,
    fetch_timeout: Duration,
}

impl Default for VerificationService {
    fn default() -> Self {
        VerificationService::new(SignatureEngine::default())
    }
}

impl VerificationService {
    pub fn new(engine: SignatureEngine) -> Self {
        VerificationService {
            engine,
            fetch_timeout: KEY_FETCH_TIMEOUT,
        }
    }

    /// Overrides the key download timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Verifies `token` against a trusted public key.
    ///
    /// The signing input is rebuilt from the segments exactly as received.
    ///
    /// # Returns
    /// - `Ok(true)` if the signature is valid for `public_key`
    /// - `Ok(false)` for any cryptographic failure, including a key of the
    ///   wrong family or an undecodable signature segment
    ///
    /// # Errors
    /// - `MalformedToken` unless the token has three segments (nothing is verified)
    /// - `MalformedSegment` if the header does not decode
    /// - `UnsupportedAlgorithm` / `MissingVerifier` for an unusable `alg`
    pub fn verify_local(&self, token: &str, public_key: &PublicKey) -> Result<bool> {
        let segments = parse_token(token)?;
        let header: Header = decode(segments.header)?;

        let entry = self.engine.registry().lookup(&header.alg)?;
        if entry.verifier.is_none() {
            return Err(BadgeError::MissingVerifier(entry.id.to_string()));
        }

        let signature = match from_base64url(segments.signature) {
            Ok(signature) => signature,
            Err(e) => {
                debug!("signature segment rejected: {e}");
                return Ok(false);
            }
        };

        Ok(self
            .engine
            .verify_with_header(&header, &segments.signing_input(), &signature, public_key))
    }

    /// Verifies `token` against a PEM-encoded public key given inline.
    ///
    /// # Errors
    /// `KeyReadError` if the PEM does not parse, plus [`verify_local`](Self::verify_local) errors.
    pub fn verify_with_pem(&self, token: &str, public_key_pem: &str) -> Result<bool> {
        let public_key = PublicKey::from_pem(public_key_pem).map_err(|reason| BadgeError::KeyReadError {
            source_name: "inline PEM".to_string(),
            reason,
        })?;
        self.verify_local(token, &public_key)
    }

    /// Verifies `token` against a public key file.
    pub fn verify_with_key_file(&self, token: &str, public_key_path: &Path) -> Result<bool> {
        let public_key = KeyManager::load_public(public_key_path)?;
        self.verify_local(token, &public_key)
    }

    /// Verifies `token` with the public half of the issuer's own private key.
    pub fn verify_with_issuer_key(&self, token: &str, keys: &KeyManager, issuer_identity: &str) -> Result<bool> {
        let private_key = keys.load_issuer_private(issuer_identity)?;
        self.verify_local(token, &private_key.public_key())
    }

    /// Verifies `token` with the key published at its `verify.url`, then
    /// checks it was issued to `claimed_recipient`.
    ///
    /// # Process Flow
    /// 1. Decodes the payload; an empty recipient identity is an error
    /// 2. Warns when the key URL is not HTTPS
    /// 3. Downloads the key (bounded timeout, validated TLS, no retry)
    /// 4. Parses the key and verifies the signature
    /// 5. Compares `sha256$hex(SHA-256(claimed_recipient))` with the payload
    ///
    /// # Returns
    /// `Ok(true)` only if both the signature and the recipient match.
    ///
    /// # Errors
    /// - `MalformedToken` / `MalformedSegment` for undecodable tokens
    /// - `AssertionMissingIdentity` when the payload names no recipient
    /// - `NetworkFetchError` for an unusable URL, timeout, transport error or non-2xx status
    /// - `KeyReadError` when the downloaded document is not a PEM public key
    /// - `HashError` when the recipient identity names an unsupported digest
    pub fn verify_inverse(&self, token: &str, claimed_recipient: &str) -> Result<bool> {
        let segments = parse_token(token)?;
        let assertion: Assertion = decode(segments.payload)?;

        if assertion.recipient.identity.is_empty() {
            return Err(BadgeError::AssertionMissingIdentity);
        }

        let key_url = key_location(&assertion.verify.url)?;
        let public_key_pem = self.fetch_public_key(&key_url)?;
        let public_key = PublicKey::from_pem(&public_key_pem).map_err(|reason| BadgeError::KeyReadError {
            source_name: key_url.to_string(),
            reason,
        })?;

        if let Ok(pretty) = serde_json::to_string_pretty(&assertion) {
            info!("assertion content:\n{pretty}");
        }

        if !self.verify_local(token, &public_key)? {
            info!("signature of assertion {} is not valid", assertion.uid);
            return Ok(false);
        }

        let issued_to_claimant = assertion.is_issued_to(claimed_recipient)?;
        if !issued_to_claimant {
            info!("assertion {} was issued to a different recipient", assertion.uid);
        }
        Ok(issued_to_claimant)
    }

    /// Extracts the token embedded in an SVG badge and runs inverse verification.
    pub fn verify_svg(&self, svg_path: &Path, claimed_recipient: &str) -> Result<bool> {
        let token = SvgEmbedder::extract_file(svg_path)?;
        self.verify_inverse(&token, claimed_recipient)
    }

    /// Downloads the PEM document at `url`.
    fn fetch_public_key(&self, url: &Url) -> Result<String> {
        let fetch_error = |reason: String| BadgeError::NetworkFetchError {
            url: url.to_string(),
            reason,
        };

        let client = Client::builder()
            .timeout(self.fetch_timeout)
            .build()
            .map_err(|e| fetch_error(e.to_string()))?;

        debug!("downloading public key from {url}");
        let response = client
            .get(url.clone())
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|e| fetch_error(e.to_string()))?;
        response.text().map_err(|e| fetch_error(e.to_string()))
    }
}

/// Parses the key URL, warning about transports without TLS.
fn key_location(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| BadgeError::NetworkFetchError {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if url.host_str().map_or(true, str::is_empty) {
        return Err(BadgeError::NetworkFetchError {
            url: raw.to_string(),
            reason: "the key URL has no host".to_string(),
        });
    }

    if url.scheme() == "https" {
        debug!("public key is served over TLS: {url}");
    } else {
        warn!("public key is served without TLS: {url}");
    }
    Ok(url)
}
