// src/models/badge.rs
//! Issuer and badge definitions.
//!
//! Both are immutable configuration values supplied by a
//! [`ConfigProvider`](crate::config::ConfigProvider).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The authority that signs assertions.
///
/// # Fields
/// - `name`: Display name; also seeds the private key filename and assertion uids
/// - `email`: Contact address
/// - `url`: Homepage
/// - `revocation_list`: Carried as metadata only, never checked
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Issuer {
    pub name: String,
    pub email: String,
    pub url: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub revocation_list: Option<String>,
}

/// A badge that can be awarded to recipients.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BadgeDefinition {
    pub name: String,
    pub description: String,
    /// Public URL of the badge image
    pub image: String,
    pub criteria: String,
    /// URL of the issuer organization document
    pub issuer: String,
    /// URL of the badge class document, referenced from each assertion
    pub json_url: String,
    #[serde(default)]
    pub evidence: Option<String>,
    /// Where verifiers can download the issuer's public key
    pub url_key_verif: String,
    /// Local SVG asset that signed copies are produced from
    #[serde(default)]
    pub local_badge_path: Option<PathBuf>,
}
