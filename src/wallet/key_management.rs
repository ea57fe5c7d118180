// src/wallet/key_management.rs
//! Asymmetric key management for badge issuers.
//!
//! Provides generation, PEM persistence, and loading of issuer keypairs:
//! - EC keys on NIST P-256 (via the `p256` crate)
//! - RSA-2048 keys (via the `rsa` crate)
//!
//! # File Naming
//! - Private key: `<private_dir>/hex(SHA-1(issuer name)).pem`
//! - Public key: `<public_dir>/hex(SHA-1(public key PEM)).pem`
//!
//! # Concurrency
//! The existence check in [`KeyManager::generate`] and the final write are
//! separate steps. The private key file is written first, with `create_new`,
//! so a concurrent generator loses with `KeyAlreadyExists` before it writes
//! anything. If the public key cannot be written, the private key written by
//! the same call is removed again. Callers generating keys concurrently for
//! the same issuer must still serialize externally.

use crate::config::KeyPaths;
use crate::error::{BadgeError, Result};
use crate::utils::crypto::sha1_hex;
use log::{debug, info, warn};
use p256::pkcs8::{DecodePrivateKey as _, DecodePublicKey as _, EncodePrivateKey as _, EncodePublicKey as _};
use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Extension appended to every key filename.
pub const KEY_FILE_EXTENSION: &str = "pem";

const RSA_KEY_BITS: usize = 2048;

/// Asymmetric algorithm families an issuer can hold.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyFamily {
    #[serde(rename = "ecc", alias = "ECC", alias = "ec")]
    EcP256,
    #[serde(rename = "rsa", alias = "RSA")]
    Rsa2048,
}

impl fmt::Display for KeyFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyFamily::EcP256 => f.write_str("EC P-256"),
            KeyFamily::Rsa2048 => f.write_str("RSA"),
        }
    }
}

/// Private signing key material.
#[derive(Clone)]
pub enum PrivateKey {
    EcP256(p256::SecretKey),
    Rsa(Box<RsaPrivateKey>),
}

impl PrivateKey {
    /// Generates a fresh key of the requested family from the OS RNG.
    ///
    /// # Errors
    /// `KeyGenerationError` if the crypto library fails.
    pub fn generate(family: KeyFamily) -> Result<Self> {
        match family {
            KeyFamily::EcP256 => Ok(PrivateKey::EcP256(p256::SecretKey::random(&mut OsRng))),
            KeyFamily::Rsa2048 => RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS)
                .map(|key| PrivateKey::Rsa(Box::new(key)))
                .map_err(|e| BadgeError::KeyGenerationError(e.to_string())),
        }
    }

    pub fn family(&self) -> KeyFamily {
        match self {
            PrivateKey::EcP256(_) => KeyFamily::EcP256,
            PrivateKey::Rsa(_) => KeyFamily::Rsa2048,
        }
    }

    /// Derives the matching public key.
    pub fn public_key(&self) -> PublicKey {
        match self {
            PrivateKey::EcP256(secret) => PublicKey::EcP256(secret.public_key()),
            PrivateKey::Rsa(secret) => PublicKey::Rsa(secret.to_public_key()),
        }
    }

    /// PKCS#8 PEM encoding.
    pub fn to_pem(&self) -> Result<String> {
        let pem = match self {
            PrivateKey::EcP256(secret) => secret
                .to_pkcs8_pem(p256::pkcs8::LineEnding::LF)
                .map(|pem| pem.as_str().to_owned())
                .map_err(|e| e.to_string()),
            PrivateKey::Rsa(secret) => secret
                .to_pkcs8_pem(rsa::pkcs8::LineEnding::LF)
                .map(|pem| pem.as_str().to_owned())
                .map_err(|e| e.to_string()),
        };
        pem.map_err(BadgeError::KeyGenerationError)
    }

    /// Parses PKCS#8, SEC1 (EC) or PKCS#1 (RSA) PEM.
    pub fn from_pem(pem: &str) -> std::result::Result<Self, String> {
        if let Ok(secret) = p256::SecretKey::from_pkcs8_pem(pem) {
            return Ok(PrivateKey::EcP256(secret));
        }
        if let Ok(secret) = p256::SecretKey::from_sec1_pem(pem) {
            return Ok(PrivateKey::EcP256(secret));
        }
        if let Ok(secret) = RsaPrivateKey::from_pkcs8_pem(pem) {
            return Ok(PrivateKey::Rsa(Box::new(secret)));
        }
        RsaPrivateKey::from_pkcs1_pem(pem)
            .map(|secret| PrivateKey::Rsa(Box::new(secret)))
            .map_err(|_| "not a P-256 or RSA private key in PEM form".to_string())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // key material is never printed
        f.debug_struct("PrivateKey")
            .field("family", &self.family())
            .finish_non_exhaustive()
    }
}

/// Public verification key material.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublicKey {
    EcP256(p256::PublicKey),
    Rsa(RsaPublicKey),
}

impl PublicKey {
    pub fn family(&self) -> KeyFamily {
        match self {
            PublicKey::EcP256(_) => KeyFamily::EcP256,
            PublicKey::Rsa(_) => KeyFamily::Rsa2048,
        }
    }

    /// SubjectPublicKeyInfo PEM encoding.
    pub fn to_pem(&self) -> Result<String> {
        match self {
            PublicKey::EcP256(public) => public
                .to_public_key_pem(p256::pkcs8::LineEnding::LF)
                .map_err(|e| BadgeError::KeyGenerationError(e.to_string())),
            PublicKey::Rsa(public) => public
                .to_public_key_pem(rsa::pkcs8::LineEnding::LF)
                .map_err(|e| BadgeError::KeyGenerationError(e.to_string())),
        }
    }

    /// Parses SPKI (EC or RSA) or PKCS#1 (RSA) PEM.
    pub fn from_pem(pem: &str) -> std::result::Result<Self, String> {
        if let Ok(public) = p256::PublicKey::from_public_key_pem(pem) {
            return Ok(PublicKey::EcP256(public));
        }
        if let Ok(public) = RsaPublicKey::from_public_key_pem(pem) {
            return Ok(PublicKey::Rsa(public));
        }
        RsaPublicKey::from_pkcs1_pem(pem)
            .map(PublicKey::Rsa)
            .map_err(|_| "not a P-256 or RSA public key in PEM form".to_string())
    }
}

/// A freshly generated issuer keypair and where it was written.
#[derive(Debug, Clone)]
pub struct Keypair {
    pub private_key: PrivateKey,
    pub public_key: PublicKey,
    pub public_key_pem: String,
    pub private_key_path: PathBuf,
    pub public_key_path: PathBuf,
}

impl Keypair {
    pub fn family(&self) -> KeyFamily {
        self.private_key.family()
    }
}

/// Creates and reads issuer keys under the configured key directories.
///
/// The filesystem is the only store: nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct KeyManager {
    private_dir: PathBuf,
    public_dir: PathBuf,
}

impl KeyManager {
    /// Creates a manager rooted at the given key directories.
    pub fn new(paths: &KeyPaths) -> Self {
        KeyManager {
            private_dir: paths.private_dir.clone(),
            public_dir: paths.public_dir.clone(),
        }
    }

    /// Deterministic private key location for an issuer.
    pub fn private_key_path(&self, issuer_identity: &str) -> PathBuf {
        self.private_dir.join(key_file_name(issuer_identity.as_bytes()))
    }

    /// Deterministic public key location, derived from the key's own PEM text.
    pub fn public_key_path(&self, public_key_pem: &str) -> PathBuf {
        self.public_dir.join(key_file_name(public_key_pem.as_bytes()))
    }

    /// Checks whether the issuer already owns a private key.
    ///
    /// # Errors
    /// `KeyAlreadyExists` with the existing path.
    pub fn has_key(&self, issuer_identity: &str) -> Result<()> {
        let path = self.private_key_path(issuer_identity);
        if path.is_file() {
            return Err(BadgeError::KeyAlreadyExists(path));
        }
        Ok(())
    }

    /// Generates and persists a new keypair for `issuer_identity`.
    ///
    /// # Arguments
    /// * `issuer_identity` - Issuer name; seeds the private key filename
    /// * `family` - Algorithm family of the new key
    ///
    /// # Errors
    /// - `KeyAlreadyExists` if the issuer already has a private key (nothing is written)
    /// - `KeyGenerationError` if key creation or PEM encoding fails
    /// - `KeyPersistenceError` if a key file cannot be written
    pub fn generate(&self, issuer_identity: &str, family: KeyFamily) -> Result<Keypair> {
        self.has_key(issuer_identity)?;

        let private_key = PrivateKey::generate(family)?;
        let public_key = private_key.public_key();

        let private_pem = private_key.to_pem()?;
        let public_key_pem = public_key.to_pem()?;

        let private_key_path = self.private_key_path(issuer_identity);
        let public_key_path = self.public_key_path(&public_key_pem);

        write_key_file(&private_key_path, &private_pem, true)?;
        if let Err(e) = write_key_file(&public_key_path, &public_key_pem, false) {
            if let Err(cleanup) = fs::remove_file(&private_key_path) {
                warn!(
                    "could not remove orphaned private key {}: {cleanup}",
                    private_key_path.display()
                );
            }
            return Err(e);
        }

        info!(
            "generated {} keypair for issuer `{}` ({})",
            family,
            issuer_identity,
            private_key_path.display()
        );

        Ok(Keypair {
            private_key,
            public_key,
            public_key_pem,
            private_key_path,
            public_key_path,
        })
    }

    /// Reads a PEM private key from disk.
    ///
    /// # Errors
    /// `KeyReadError` on a missing file or malformed PEM.
    pub fn load_private(path: &Path) -> Result<PrivateKey> {
        let pem = read_key_file(path)?;
        PrivateKey::from_pem(&pem).map_err(|reason| BadgeError::KeyReadError {
            source_name: path.display().to_string(),
            reason,
        })
    }

    /// Reads a PEM public key from disk.
    ///
    /// # Errors
    /// `KeyReadError` on a missing file or malformed PEM.
    pub fn load_public(path: &Path) -> Result<PublicKey> {
        let pem = read_key_file(path)?;
        PublicKey::from_pem(&pem).map_err(|reason| BadgeError::KeyReadError {
            source_name: path.display().to_string(),
            reason,
        })
    }

    /// Loads the private key stored for `issuer_identity`.
    pub fn load_issuer_private(&self, issuer_identity: &str) -> Result<PrivateKey> {
        Self::load_private(&self.private_key_path(issuer_identity))
    }
}

fn key_file_name(seed: &[u8]) -> String {
    format!("{}.{}", sha1_hex(seed), KEY_FILE_EXTENSION)
}

fn read_key_file(path: &Path) -> Result<String> {
    debug!("reading key file {}", path.display());
    fs::read_to_string(path).map_err(|e| BadgeError::KeyReadError {
        source_name: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn write_key_file(path: &Path, pem: &str, secret: bool) -> Result<()> {
    let persistence_error = |reason: String| BadgeError::KeyPersistenceError {
        path: path.to_path_buf(),
        reason,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| persistence_error(e.to_string()))?;
    }

    let mut options = OpenOptions::new();
    options.write(true);
    if secret {
        options.create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
    } else {
        options.create(true).truncate(true);
    }

    let mut file = options.open(path).map_err(|e| match e.kind() {
        ErrorKind::AlreadyExists => BadgeError::KeyAlreadyExists(path.to_path_buf()),
        _ => persistence_error(e.to_string()),
    })?;
    file.write_all(pem.as_bytes())
        .map_err(|e| persistence_error(e.to_string()))
}
