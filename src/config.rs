// src/config.rs
//! Issuer configuration.
//!
//! Components never read global state: they receive a [`ConfigProvider`]
//! (or the values it hands out) explicitly.
//!
//! [`Settings`] loads named profiles from a TOML file with the `config`
//! crate. Environment variables prefixed `OPENBADGES__` override file values,
//! e.g. `OPENBADGES__PROFILES__ECC__KEYS__PRIVATE_DIR=/srv/keys`.
//!
//! ```toml
//! [profiles.ecc.issuer]
//! name = "Acme Badge Issuer"
//! email = "badges@acme.test"
//! url = "https://acme.test"
//!
//! [profiles.ecc.keys]
//! crypto = "ecc"
//! private_dir = "./private"
//! public_dir = "./public"
//!
//! [[profiles.ecc.badges]]
//! name = "Badge ECC"
//! # ...
//! ```

use crate::error::{BadgeError, Result};
use crate::models::badge::{BadgeDefinition, Issuer};
use crate::wallet::key_management::KeyFamily;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Directories holding issuer private keys and published public keys.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct KeyPaths {
    pub private_dir: PathBuf,
    pub public_dir: PathBuf,
}

/// Source of issuer metadata, badge catalog and key settings.
pub trait ConfigProvider {
    fn get_issuer(&self) -> &Issuer;

    /// # Errors
    /// `BadgeNotFound` when no badge carries `name`.
    fn get_badge(&self, name: &str) -> Result<&BadgeDefinition>;

    fn get_key_paths(&self) -> &KeyPaths;

    fn get_algorithm_choice(&self) -> KeyFamily;

    /// Where successful issuances are recorded, if anywhere.
    fn get_issuance_log(&self) -> Option<&Path> {
        None
    }
}

/// Key section of a profile.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct KeySettings {
    pub crypto: KeyFamily,
    pub private_dir: PathBuf,
    pub public_dir: PathBuf,
}

/// One issuing profile: an issuer, its badges and its key settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub issuer: Issuer,
    #[serde(default)]
    pub badges: Vec<BadgeDefinition>,
    pub keys: KeySettings,
    #[serde(default)]
    pub log: Option<PathBuf>,
}

/// Contents of a settings file: profiles by name.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Settings {
    /// Loads settings from `path`, then applies `OPENBADGES__*` overrides.
    ///
    /// # Errors
    /// `ConfigError` if the file is missing or does not match the schema.
    pub fn load(path: &Path) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from(path))
            .add_source(Environment::with_prefix("OPENBADGES").prefix_separator("__").separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Selects a profile by name. Lookup ignores case.
    pub fn profile(&self, name: &str) -> Result<StaticConfig> {
        let wanted = name.to_lowercase();
        self.profiles
            .iter()
            .find(|(key, _)| key.to_lowercase() == wanted)
            .map(|(_, profile)| StaticConfig::from(profile.clone()))
            .ok_or_else(|| BadgeError::ConfigError(format!("profile `{name}` not found")))
    }
}

/// In-memory provider over a single profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticConfig {
    pub issuer: Issuer,
    pub badges: Vec<BadgeDefinition>,
    pub key_paths: KeyPaths,
    pub algorithm: KeyFamily,
    pub issuance_log: Option<PathBuf>,
}

impl From<Profile> for StaticConfig {
    fn from(profile: Profile) -> Self {
        StaticConfig {
            issuer: profile.issuer,
            badges: profile.badges,
            key_paths: KeyPaths {
                private_dir: profile.keys.private_dir,
                public_dir: profile.keys.public_dir,
            },
            algorithm: profile.keys.crypto,
            issuance_log: profile.log,
        }
    }
}

impl ConfigProvider for StaticConfig {
    fn get_issuer(&self) -> &Issuer {
        &self.issuer
    }

    fn get_badge(&self, name: &str) -> Result<&BadgeDefinition> {
        self.badges
            .iter()
            .find(|badge| badge.name == name)
            .ok_or_else(|| BadgeError::BadgeNotFound(name.to_string()))
    }

    fn get_key_paths(&self) -> &KeyPaths {
        &self.key_paths
    }

    fn get_algorithm_choice(&self) -> KeyFamily {
        self.algorithm
    }

    fn get_issuance_log(&self) -> Option<&Path> {
        self.issuance_log.as_deref()
    }
}
