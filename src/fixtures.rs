// src/fixtures.rs
//! Sample issuer and badge shared by unit tests.

use crate::models::badge::{BadgeDefinition, Issuer};

pub fn sample_issuer() -> Issuer {
    Issuer {
        name: "Acme".to_string(),
        email: "badges@acme.test".to_string(),
        url: "https://acme.test".to_string(),
        image: None,
        revocation_list: Some("https://acme.test/revoked.json".to_string()),
    }
}

pub fn sample_badge() -> BadgeDefinition {
    BadgeDefinition {
        name: "B1".to_string(),
        description: "First badge".to_string(),
        image: "https://acme.test/b1.svg".to_string(),
        criteria: "https://acme.test/b1.html".to_string(),
        issuer: "https://acme.test/org.json".to_string(),
        json_url: "https://acme.test/b1.json".to_string(),
        evidence: None,
        url_key_verif: "https://acme.test/key.pem".to_string(),
        local_badge_path: None,
    }
}
