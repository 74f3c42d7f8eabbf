use askforge::{
    auth::{self, Claims},
    config::AppConfig,
    models::{Role, User},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

fn test_user() -> User {
    User {
        id: Uuid::new_v4(),
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        password_hash: String::new(),
        role: Role::User,
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn password_hash_verifies_roundtrip() {
    let hash = auth::hash_password("correct horse battery staple").unwrap();

    assert!(auth::verify_password("correct horse battery staple", &hash));
    assert!(!auth::verify_password("wrong password", &hash));
}

#[test]
fn two_hashes_of_the_same_password_differ() {
    // Each hash carries a fresh random salt.
    let first = auth::hash_password("password123").unwrap();
    let second = auth::hash_password("password123").unwrap();

    assert_ne!(first, second);
    assert!(auth::verify_password("password123", &first));
    assert!(auth::verify_password("password123", &second));
}

#[test]
fn malformed_stored_hash_verifies_false() {
    assert!(!auth::verify_password("password123", "not-a-phc-string"));
    assert!(!auth::verify_password("password123", ""));
}

#[test]
fn issued_token_decodes_to_matching_claims() {
    let config = AppConfig::default();
    let user = test_user();

    let token = auth::issue_token(&user, &config).unwrap();

    let decoded = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .unwrap();

    assert_eq!(decoded.claims.sub, user.id);
    assert_eq!(decoded.claims.username, user.username);
    assert_eq!(decoded.claims.role, Role::User);
    assert!(decoded.claims.exp > decoded.claims.iat);
}

#[test]
fn expired_token_is_rejected() {
    // Negative expiry pushes `exp` far enough into the past to clear the
    // default decoding leeway.
    let config = AppConfig {
        token_expiry_minutes: -5,
        ..AppConfig::default()
    };
    let user = test_user();

    let token = auth::issue_token(&user, &config).unwrap();

    let result = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    );

    assert!(result.is_err());
}

#[test]
fn token_signed_with_other_secret_is_rejected() {
    let config = AppConfig::default();
    let user = test_user();

    let token = auth::issue_token(&user, &config).unwrap();

    let result = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(b"a-different-secret"),
        &Validation::default(),
    );

    assert!(result.is_err());
}
