use super::*;
use jsonwebtoken::{EncodingKey, Header};
use serde_json::json;

const SECRET: &str = "s3cret";

fn sign(claims: &serde_json::Value, secret: &str) -> String {
    jsonwebtoken::encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
}

fn now() -> i64 {
    i64::try_from(std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap().as_secs()).unwrap()
}

#[test]
fn verify_accepts_string_user_id() {
    let verifier = TokenVerifier::new(SECRET);
    let identity = verifier.verify(&sign(&json!({"userId": "u-42"}), SECRET)).unwrap();
    assert_eq!(identity, Identity { user_id: "u-42".into() });
}

#[test]
fn verify_accepts_numeric_user_id() {
    let verifier = TokenVerifier::new(SECRET);
    let identity = verifier.verify(&sign(&json!({"userId": 7}), SECRET)).unwrap();
    assert_eq!(identity.user_id, "7");
}

#[test]
fn verify_rejects_wrong_secret() {
    let verifier = TokenVerifier::new(SECRET);
    let result = verifier.verify(&sign(&json!({"userId": "u"}), "other"));
    assert!(matches!(result, Err(AuthError::Invalid(_))));
}

#[test]
fn verify_rejects_missing_or_empty_user_id() {
    let verifier = TokenVerifier::new(SECRET);
    assert!(matches!(verifier.verify(&sign(&json!({"sub": "u"}), SECRET)), Err(AuthError::NoUserId)));
    assert!(matches!(verifier.verify(&sign(&json!({"userId": ""}), SECRET)), Err(AuthError::NoUserId)));
}

#[test]
fn verify_rejects_expired_token() {
    let verifier = TokenVerifier::new(SECRET);
    let token = sign(&json!({"userId": "u", "exp": now() - 3600}), SECRET);
    assert!(matches!(verifier.verify(&token), Err(AuthError::Invalid(_))));
}

#[test]
fn verify_accepts_unexpired_token() {
    let verifier = TokenVerifier::new(SECRET);
    let token = sign(&json!({"userId": "u", "exp": now() + 3600}), SECRET);
    assert!(verifier.verify(&token).is_ok());
}

#[test]
fn verify_rejects_blank_and_garbage() {
    let verifier = TokenVerifier::new(SECRET);
    assert!(matches!(verifier.verify("  "), Err(AuthError::Missing)));
    assert!(matches!(verifier.verify_opt(None), Err(AuthError::Missing)));
    assert!(matches!(verifier.verify("not.a.jwt"), Err(AuthError::Invalid(_))));
}
