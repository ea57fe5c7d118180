// src/models/mod.rs
//! Data structures shared by issuance and verification.

pub mod assertion;
pub mod badge;
