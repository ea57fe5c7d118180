// tests/issuance_flow.rs
//! End-to-end issuance and verification through the public API.

use mockito::mock;
use openbadges::{
    AssertionBuilder, BadgeDefinition, BadgeError, ConfigProvider, Issuer, KeyFamily, KeyManager,
    KeyPaths, StaticConfig, SvgEmbedder, VerificationService,
};
use std::fs;
use tempfile::TempDir;

const BADGE_SVG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="64" height="64"><rect width="64" height="64"/></svg>"#;

fn acme_config(dir: &TempDir, family: KeyFamily, key_url: &str) -> StaticConfig {
    let image = dir.path().join("badge.svg");
    fs::write(&image, BADGE_SVG).unwrap();

    StaticConfig {
        issuer: Issuer {
            name: "Acme".to_string(),
            email: "badges@acme.test".to_string(),
            url: "https://acme.test".to_string(),
            image: None,
            revocation_list: None,
        },
        badges: vec![BadgeDefinition {
            name: "B1".to_string(),
            description: "First badge".to_string(),
            image: "https://acme.test/b1.svg".to_string(),
            criteria: "https://acme.test/b1.html".to_string(),
            issuer: "https://acme.test/org.json".to_string(),
            json_url: "https://acme.test/b1.json".to_string(),
            evidence: None,
            url_key_verif: key_url.to_string(),
            local_badge_path: Some(image),
        }],
        key_paths: KeyPaths {
            private_dir: dir.path().join("private"),
            public_dir: dir.path().join("public"),
        },
        algorithm: family,
        issuance_log: None,
    }
}

#[test]
fn test_scenario_a_issue_and_verify_locally() {
    let dir = TempDir::new().unwrap();
    let config = acme_config(&dir, KeyFamily::EcP256, "https://acme.test/key.pem");
    let keys = KeyManager::new(config.get_key_paths());
    let keypair = keys.generate("Acme", config.get_algorithm_choice()).unwrap();

    let token = AssertionBuilder::default()
        .issue(&config, "B1", "alice@example.com")
        .unwrap();
    assert_eq!(token.as_str().split('.').count(), 3);

    let service = VerificationService::default();
    assert!(service.verify_local(token.as_str(), &keypair.public_key).unwrap());
    assert!(service
        .verify_with_key_file(token.as_str(), &keypair.public_key_path)
        .unwrap());
    assert!(service
        .verify_with_issuer_key(token.as_str(), &keys, "Acme")
        .unwrap());
}

#[test]
fn test_scenario_b_unrelated_key_rejects() {
    let dir = TempDir::new().unwrap();
    let config = acme_config(&dir, KeyFamily::EcP256, "https://acme.test/key.pem");
    KeyManager::new(config.get_key_paths())
        .generate("Acme", KeyFamily::EcP256)
        .unwrap();
    let token = AssertionBuilder::default()
        .issue(&config, "B1", "alice@example.com")
        .unwrap();

    let other_dir = TempDir::new().unwrap();
    let unrelated = KeyManager::new(&KeyPaths {
        private_dir: other_dir.path().join("private"),
        public_dir: other_dir.path().join("public"),
    })
    .generate("Someone Else", KeyFamily::EcP256)
    .unwrap();

    assert!(!VerificationService::default()
        .verify_local(token.as_str(), &unrelated.public_key)
        .unwrap());
}

#[test]
fn test_scenario_c_two_segments_fail_fast() {
    let dir = TempDir::new().unwrap();
    let keypair = KeyManager::new(&KeyPaths {
        private_dir: dir.path().join("private"),
        public_dir: dir.path().join("public"),
    })
    .generate("Acme", KeyFamily::EcP256)
    .unwrap();

    let service = VerificationService::default();
    assert!(matches!(
        service.verify_local("eyJhbGciOiJFUzI1NiJ9.eyJ1aWQiOiIxIn0", &keypair.public_key),
        Err(BadgeError::MalformedToken(2))
    ));
    assert!(matches!(
        service.verify_inverse("eyJhbGciOiJFUzI1NiJ9.eyJ1aWQiOiIxIn0", "alice@example.com"),
        Err(BadgeError::MalformedToken(2))
    ));
}

#[test]
fn test_scenario_d_unparsable_remote_key() {
    let _m = mock("GET", "/flow/broken.pem")
        .with_status(200)
        .with_body("-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----\n")
        .create();

    let dir = TempDir::new().unwrap();
    let key_url = format!("{}/flow/broken.pem", mockito::server_url());
    let config = acme_config(&dir, KeyFamily::EcP256, &key_url);
    KeyManager::new(config.get_key_paths())
        .generate("Acme", KeyFamily::EcP256)
        .unwrap();
    let token = AssertionBuilder::default()
        .issue(&config, "B1", "alice@example.com")
        .unwrap();

    let result = VerificationService::default().verify_inverse(token.as_str(), "alice@example.com");
    assert!(matches!(result, Err(BadgeError::KeyReadError { .. })));
}

#[test]
fn test_baked_badge_inverse_verification() {
    let dir = TempDir::new().unwrap();
    let key_path = "/flow/acme-rsa.pem";
    let key_url = format!("{}{}", mockito::server_url(), key_path);
    let config = acme_config(&dir, KeyFamily::Rsa2048, &key_url);

    let keypair = KeyManager::new(config.get_key_paths())
        .generate("Acme", config.get_algorithm_choice())
        .unwrap();
    let _m = mock("GET", key_path)
        .with_status(200)
        .with_body(keypair.public_key_pem.clone())
        .create();

    let token = AssertionBuilder::default()
        .issue(&config, "B1", "alice@example.com")
        .unwrap();

    let baked = dir.path().join("badge-alice.svg");
    let image = config.get_badge("B1").unwrap().local_badge_path.clone().unwrap();
    SvgEmbedder::embed_file(&image, &baked, token.as_str()).unwrap();

    let service = VerificationService::default();
    assert!(service.verify_svg(&baked, "alice@example.com").unwrap());
    assert!(!service.verify_svg(&baked, "bob@example.com").unwrap());
}
