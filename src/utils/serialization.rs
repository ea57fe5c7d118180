// src/utils/serialization.rs
//! Compact serialization for signed assertions.
//!
//! Provides the encoding primitives behind the 3-segment token format:
//! - JSON + base64url (no padding) segment encoding and decoding
//! - Signing-input construction over already-encoded segments
//! - Token splitting into header, payload and signature segments

use crate::error::{BadgeError, Result};
use serde::{de::DeserializeOwned, Serialize};

/// Separator between token segments.
pub const SEGMENT_SEPARATOR: char = '.';

/// Borrowed view of the three segments of a compact token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSegments<'a> {
    pub header: &'a str,
    pub payload: &'a str,
    pub signature: &'a str,
}

impl<'a> TokenSegments<'a> {
    /// Signing input recomputed from the segments exactly as received.
    pub fn signing_input(&self) -> Vec<u8> {
        signing_input(self.header, self.payload)
    }
}

/// Encodes raw bytes as base64url without padding.
pub fn to_base64url(data: &[u8]) -> String {
    base64::encode_config(data, base64::URL_SAFE_NO_PAD)
}

/// Decodes a base64url segment. Trailing padding is tolerated.
///
/// # Errors
/// `MalformedSegment` if the input is not valid base64url.
pub fn from_base64url(segment: &str) -> Result<Vec<u8>> {
    base64::decode_config(segment.trim_end_matches('='), base64::URL_SAFE_NO_PAD)
        .map_err(|e| BadgeError::MalformedSegment(format!("invalid base64url: {e}")))
}

/// Serializes a value to JSON, then to a base64url segment.
///
/// Struct fields serialize in declaration order and `serde_json::Value`
/// objects in key order, so equal values always encode to the same segment.
pub fn encode<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_vec(value)
        .map_err(|e| BadgeError::MalformedSegment(format!("JSON serialization failed: {e}")))?;
    Ok(to_base64url(&json))
}

/// Inverse of [`encode`].
///
/// # Errors
/// `MalformedSegment` on invalid base64url or invalid JSON.
pub fn decode<T: DeserializeOwned>(segment: &str) -> Result<T> {
    let bytes = from_base64url(segment)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| BadgeError::MalformedSegment(format!("invalid JSON: {e}")))
}

/// Builds `header_segment "." payload_segment` over the encoded segments.
///
/// Verifiers must call this with the segments they received, never with
/// re-serialized decoded values.
pub fn signing_input(header_segment: &str, payload_segment: &str) -> Vec<u8> {
    let mut input = Vec::with_capacity(header_segment.len() + payload_segment.len() + 1);
    input.extend_from_slice(header_segment.as_bytes());
    input.push(SEGMENT_SEPARATOR as u8);
    input.extend_from_slice(payload_segment.as_bytes());
    input
}

/// Splits a compact token into its three segments.
///
/// # Errors
/// `MalformedToken` unless the token has exactly three segments.
pub fn parse_token(token: &str) -> Result<TokenSegments<'_>> {
    let parts: Vec<&str> = token.trim().split(SEGMENT_SEPARATOR).collect();
    match parts.as_slice() {
        [header, payload, signature] => Ok(TokenSegments {
            header: *header,
            payload: *payload,
            signature: *signature,
        }),
        _ => Err(BadgeError::MalformedToken(parts.len())),
    }
}
