// src/jws/mod.rs
//! Minimal JWS signing: one algorithm per token, selected by the header.

pub mod algorithms;
pub mod engine;
