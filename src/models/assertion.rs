// src/models/assertion.rs
//! Signed assertion data model.
//!
//! An assertion binds a [`BadgeDefinition`] to a recipient. It travels as a
//! [`CompactToken`]: `base64url(header) "." base64url(payload) "." base64url(signature)`.

use crate::error::Result;
use crate::models::badge::{BadgeDefinition, Issuer};
use crate::utils::crypto::{identity_matches, recipient_identity, sha1_hex};
use crate::utils::serialization::{parse_token, TokenSegments};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// JOSE header declaring the signing algorithm, e.g. `{"alg":"ES256"}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub alg: String,
}

impl Header {
    pub fn new(alg: impl Into<String>) -> Self {
        Header { alg: alg.into() }
    }
}

/// Hashed recipient block of an assertion.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    /// `sha256$<hex>` of the recipient address; empty when absent
    #[serde(default)]
    pub identity: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(deserialize_with = "bool_or_string")]
    pub hashed: bool,
}

/// Verification block: where the signer's public key can be fetched.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VerifyInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

/// The signed claim (JWS payload).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Assertion {
    pub uid: String,
    pub recipient: Recipient,
    pub image: String,
    pub badge: String,
    pub verify: VerifyInfo,
    /// Unix timestamp (seconds) taken at signing time
    pub issued_on: i64,
}

impl Assertion {
    /// Builds the payload awarding `badge` to `recipient`.
    ///
    /// # Arguments
    /// * `issuer` - Signing authority
    /// * `badge` - Badge being awarded
    /// * `recipient` - Plain recipient email; only its hash is stored
    /// * `issued_on` - Unix timestamp of issuance
    pub fn new(issuer: &Issuer, badge: &BadgeDefinition, recipient: &str, issued_on: i64) -> Self {
        Assertion {
            uid: Self::uid_for(issuer, badge, recipient),
            recipient: Recipient {
                identity: recipient_identity(recipient),
                kind: "email".to_string(),
                hashed: true,
            },
            image: badge.image.clone(),
            badge: badge.json_url.clone(),
            verify: VerifyInfo {
                kind: "signed".to_string(),
                url: badge.url_key_verif.clone(),
            },
            issued_on,
        }
    }

    /// `hex(SHA-1(issuer.name + badge.name + recipient))`
    pub fn uid_for(issuer: &Issuer, badge: &BadgeDefinition, recipient: &str) -> String {
        let seed = format!("{}{}{}", issuer.name, badge.name, recipient);
        sha1_hex(seed.as_bytes())
    }

    /// True when this assertion was issued to `recipient`.
    ///
    /// # Errors
    /// `HashError` if the stored identity names an unsupported digest.
    pub fn is_issued_to(&self, recipient: &str) -> Result<bool> {
        identity_matches(&self.recipient.identity, recipient)
    }
}

// Early issuers wrote `"hashed": "true"`.
fn bool_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Text(s) => s.eq_ignore_ascii_case("true"),
    })
}

/// A signed assertion in compact form. Always holds exactly three segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompactToken(String);

impl CompactToken {
    /// Joins already-encoded segments.
    pub fn from_segments(header: &str, payload: &str, signature: &str) -> Self {
        CompactToken(format!("{header}.{payload}.{signature}"))
    }

    /// Validates the segment count of `token`.
    ///
    /// # Errors
    /// `MalformedToken` unless there are exactly three segments.
    pub fn parse(token: &str) -> Result<Self> {
        let trimmed = token.trim();
        parse_token(trimmed)?;
        Ok(CompactToken(trimmed.to_string()))
    }

    pub fn segments(&self) -> TokenSegments<'_> {
        let mut parts = self.0.splitn(3, '.');
        TokenSegments {
            header: parts.next().unwrap_or_default(),
            payload: parts.next().unwrap_or_default(),
            signature: parts.next().unwrap_or_default(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CompactToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CompactToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CompactToken {
    type Err = crate::error::BadgeError;

    fn from_str(s: &str) -> Result<Self> {
        CompactToken::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BadgeError;
    use crate::fixtures::{sample_badge, sample_issuer};

    #[test]
    fn test_payload_fields() {
        let assertion = Assertion::new(&sample_issuer(), &sample_badge(), "alice@example.com", 1_400_000_000);

        assert_eq!(assertion.uid, sha1_hex(b"AcmeB1alice@example.com"));
        assert_eq!(assertion.recipient.identity, recipient_identity("alice@example.com"));
        assert_eq!(assertion.recipient.kind, "email");
        assert!(assertion.recipient.hashed);
        assert_eq!(assertion.badge, "https://acme.test/b1.json");
        assert_eq!(assertion.verify.kind, "signed");
        assert_eq!(assertion.verify.url, "https://acme.test/key.pem");
        assert!(assertion.is_issued_to("alice@example.com").unwrap());
        assert!(!assertion.is_issued_to("mallory@example.com").unwrap());
    }

    #[test]
    fn test_payload_json_shape() {
        let assertion = Assertion::new(&sample_issuer(), &sample_badge(), "alice@example.com", 42);
        let json = serde_json::to_value(&assertion).unwrap();

        assert_eq!(json["issuedOn"], 42);
        assert_eq!(json["recipient"]["type"], "email");
        assert_eq!(json["recipient"]["hashed"], true);
        assert_eq!(json["verify"]["type"], "signed");
    }

    #[test]
    fn test_legacy_string_flag() {
        let json = r#"{"identity":"sha256$00","type":"email","hashed":"true"}"#;
        let recipient: Recipient = serde_json::from_str(json).unwrap();
        assert!(recipient.hashed);
    }

    #[test]
    fn test_compact_token_parse() {
        let token: CompactToken = "h.p.s".parse().unwrap();
        assert_eq!(token.segments().payload, "p");
        assert_eq!(token.to_string(), "h.p.s");
        assert!(matches!(
            CompactToken::parse("h.p"),
            Err(BadgeError::MalformedToken(2))
        ));
    }
}
