// src/lib.rs

//! # Open Badges signer
//!
//! Issues and verifies Open Badges assertions signed as compact JWS tokens.
//!
//! ## Architecture Overview
//! 1. **Utilities**: digests and compact token serialization
//! 2. **Wallet**: issuer keypair generation, persistence and loading
//! 3. **JWS**: algorithm registry and signature engine
//! 4. **Services**: assertion issuance and verification
//! 5. **Storage**: baking tokens into SVG badge images
//!
//! Configuration is always passed in explicitly through a
//! [`ConfigProvider`](config::ConfigProvider).

pub mod config;
pub mod error;
pub mod jws;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;
pub mod wallet;

#[cfg(test)]
mod fixtures;

pub use crate::config::{ConfigProvider, KeyPaths, Settings, StaticConfig};
pub use crate::error::{BadgeError, Result};
pub use crate::jws::algorithms::AlgorithmRegistry;
pub use crate::jws::engine::SignatureEngine;
pub use crate::models::assertion::{Assertion, CompactToken, Header};
pub use crate::models::badge::{BadgeDefinition, Issuer};
pub use crate::services::credential_issuer::AssertionBuilder;
pub use crate::services::verifier::VerificationService;
pub use crate::storage::svg_container::SvgEmbedder;
pub use crate::wallet::key_management::{KeyFamily, KeyManager, Keypair, PrivateKey, PublicKey};
