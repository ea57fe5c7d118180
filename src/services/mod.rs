// src/services/mod.rs
//! Issuance and verification services.

pub mod credential_issuer;
pub mod verifier;
