// src/storage/mod.rs
//! Containers that carry signed assertions.

pub mod svg_container;
