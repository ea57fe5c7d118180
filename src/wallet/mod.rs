// src/wallet/mod.rs
//! Issuer key storage.

pub mod key_management;
