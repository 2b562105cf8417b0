//! 令牌编解码测试
//!
//! 篡改、算法替换与过期判定

use auth_system::{
    auth::jwt::{Claims, TokenCodec},
    clock::ManualClock,
    error::TokenError,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const SECRET: &str = "test_secret_key_32_characters_long!";

fn codec() -> (TokenCodec, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::starting_now());
    let codec = TokenCodec::new(SECRET.as_bytes(), clock.clone()).unwrap();
    (codec, clock)
}

/// 替换第 `segment` 段中间位置的一个字符
fn flip_char(token: &str, segment: usize) -> String {
    let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
    let target = &mut parts[segment];
    let mid = target.len() / 2;
    let original = target.as_bytes()[mid];
    let replacement = if original == b'A' { 'B' } else { 'A' };
    target.replace_range(mid..mid + 1, &replacement.to_string());
    parts.join(".")
}

fn claims_for(clock: &ManualClock, ttl_secs: i64) -> Claims {
    use auth_system::clock::Clock;
    let now = clock.now().timestamp();
    Claims {
        sub: Uuid::new_v4().to_string(),
        email: "a@x.com".to_string(),
        iat: now,
        exp: now + ttl_secs,
        jti: Uuid::new_v4().to_string(),
    }
}

#[test]
fn test_parse_round_trip_preserves_claims() {
    let (codec, _) = codec();
    let subject = Uuid::new_v4().to_string();

    let token = codec
        .issue(&subject, "alice@example.com", Duration::from_secs(900))
        .unwrap();
    let claims = codec.parse(&token).unwrap();

    assert_eq!(claims.sub, subject);
    assert_eq!(claims.email, "alice@example.com");
    assert_eq!(claims.exp, claims.iat + 900);
}

#[test]
fn test_tokens_issued_in_same_second_differ() {
    let (codec, _) = codec();

    let first = codec.issue("u", "a@x.com", Duration::from_secs(60)).unwrap();
    let second = codec.issue("u", "a@x.com", Duration::from_secs(60)).unwrap();

    assert_ne!(first, second);
    assert_ne!(
        codec.parse(&first).unwrap().jti,
        codec.parse(&second).unwrap().jti
    );
}

#[test]
fn test_payload_byte_flip_is_signature_mismatch() {
    let (codec, _) = codec();
    let token = codec.issue("u", "a@x.com", Duration::from_secs(60)).unwrap();

    let tampered = flip_char(&token, 1);

    assert_ne!(tampered, token);
    assert_eq!(codec.parse(&tampered), Err(TokenError::SignatureMismatch));
}

#[test]
fn test_signature_byte_flip_is_signature_mismatch() {
    let (codec, _) = codec();
    let token = codec.issue("u", "a@x.com", Duration::from_secs(60)).unwrap();

    let tampered = flip_char(&token, 2);

    assert_eq!(codec.parse(&tampered), Err(TokenError::SignatureMismatch));
}

#[test]
fn test_other_hmac_algorithm_rejected() {
    let (codec, clock) = codec();
    let claims = claims_for(&clock, 60);

    let token = encode(
        &Header::new(Algorithm::HS512),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();

    assert_eq!(codec.parse(&token), Err(TokenError::SignatureMismatch));
}

#[test]
fn test_unsigned_token_rejected() {
    let (codec, clock) = codec();
    let claims = claims_for(&clock, 60);

    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
    let token = format!("{}.{}.", header, payload);

    // 未知算法无法解析头部
    assert_eq!(codec.parse(&token), Err(TokenError::Malformed));
}

#[test]
fn test_missing_segments_malformed() {
    let (codec, _) = codec();
    let token = codec.issue("u", "a@x.com", Duration::from_secs(60)).unwrap();
    let two_segments: String = token.rsplitn(2, '.').nth(1).unwrap().to_string();

    assert_eq!(codec.parse(&two_segments), Err(TokenError::Malformed));
    assert_eq!(codec.parse("a.b.c"), Err(TokenError::Malformed));
}

#[test]
fn test_expiry_boundary() {
    let (codec, clock) = codec();
    let token = codec.issue("u", "a@x.com", Duration::from_secs(900)).unwrap();

    // now == exp 仍然有效
    clock.advance(chrono::Duration::seconds(900));
    assert!(codec.parse(&token).is_ok());

    clock.advance(chrono::Duration::seconds(1));
    assert_eq!(codec.parse(&token), Err(TokenError::Expired));
}

#[test]
fn test_tampered_expired_token_reports_signature_first() {
    let (codec, clock) = codec();
    let token = codec.issue("u", "a@x.com", Duration::from_secs(60)).unwrap();

    clock.advance(chrono::Duration::hours(2));

    assert_eq!(codec.parse(&token), Err(TokenError::Expired));
    assert_eq!(
        codec.parse(&flip_char(&token, 2)),
        Err(TokenError::SignatureMismatch)
    );
}
