use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use signet_backend::{
    config::Config,
    models::device::Device,
    services::token::{TokenService, TokenValidation},
    store::{AuthStore, InMemoryAuthStore},
    types::AccountId,
};

mod support;

#[derive(Debug, Deserialize)]
struct TokenClaims {
    sub: String,
    #[serde(rename = "deviceId")]
    device_id: String,
    jti: String,
    iss: String,
    aud: String,
    exp: i64,
}

fn decode_claims(token: &str) -> TokenClaims {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[support::TEST_ISSUER]);
    validation.set_audience(&[support::TEST_AUDIENCE]);
    decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(support::TEST_SECRET.as_ref()),
        &validation,
    )
    .expect("decode claims")
    .claims
}

fn setup() -> (Arc<InMemoryAuthStore>, TokenService) {
    let store = Arc::new(InMemoryAuthStore::new());
    let service = TokenService::new(store.clone(), &support::test_config());
    (store, service)
}

#[tokio::test]
async fn issue_creates_exactly_one_device_per_fingerprint() {
    let (store, service) = setup();
    let account_id = AccountId::new();

    let token = service.issue(account_id, "fp1").await.expect("issue");
    let devices = store.list_devices_for_account(account_id).await.expect("list");
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].fingerprint, "fp1");

    let claims = decode_claims(&token);
    assert_eq!(claims.sub, account_id.to_string());
    assert_eq!(claims.device_id, devices[0].identifier);
    assert_eq!(claims.iss, support::TEST_ISSUER);
    assert_eq!(claims.aud, support::TEST_AUDIENCE);
    assert!(!claims.jti.is_empty());
}

#[tokio::test]
async fn repeat_issue_renews_the_same_device() {
    let (store, service) = setup();
    let account_id = AccountId::new();

    service.issue(account_id, "fp1").await.expect("first issue");
    let before = store
        .find_device_by_fingerprint(account_id, "fp1")
        .await
        .expect("lookup")
        .expect("device");

    tokio::time::sleep(StdDuration::from_millis(10)).await;
    let token = service.issue(account_id, "fp1").await.expect("second issue");

    let devices = store.list_devices_for_account(account_id).await.expect("list");
    assert_eq!(devices.len(), 1, "renewal must not create a second record");
    let after = &devices[0];

    assert_eq!(after.id, before.id);
    assert_eq!(after.identifier, before.identifier);
    assert_eq!(after.created_at, before.created_at);
    assert!(after.expires_at > before.expires_at);
    assert!(after.last_used_at > before.last_used_at);

    assert_eq!(decode_claims(&token).device_id, before.identifier);
}

#[tokio::test]
async fn token_expiry_tracks_device_expiry() {
    let (store, service) = setup();
    let account_id = AccountId::new();

    let token = service.issue(account_id, "fp1").await.expect("issue");
    let device = store
        .find_device_by_fingerprint(account_id, "fp1")
        .await
        .expect("lookup")
        .expect("device");
    assert_eq!(decode_claims(&token).exp, device.expires_at.timestamp());
}

#[tokio::test]
async fn validation_succeeds_and_bumps_last_used() {
    let (store, service) = setup();
    let account_id = AccountId::new();

    let token = service.issue(account_id, "fp1").await.expect("issue");
    let before = store
        .find_device_by_fingerprint(account_id, "fp1")
        .await
        .expect("lookup")
        .expect("device");

    tokio::time::sleep(StdDuration::from_millis(10)).await;
    let outcome = service.validate(&token).await;
    assert_eq!(
        outcome,
        TokenValidation::Valid {
            account_id,
            device_identifier: before.identifier.clone(),
        }
    );

    let after = store
        .find_device_by_id(before.id)
        .await
        .expect("lookup")
        .expect("device");
    assert!(after.last_used_at > before.last_used_at);
    assert_eq!(after.expires_at, before.expires_at, "validation never renews");
}

#[tokio::test]
async fn validation_rejects_a_token_whose_device_expired() {
    let (store, service) = setup();
    let account_id = AccountId::new();

    // Device valid long enough for the token itself to pass signature and
    // expiry checks, then forced past its window through the store.
    let device = store
        .upsert_device(Device::new(
            account_id,
            "fp1".to_string(),
            Utc::now() + Duration::days(30),
        ))
        .await
        .expect("create device");
    let token = service.sign(account_id, &device).expect("sign");

    let mut expired = device.clone();
    expired.expires_at = Utc::now() - Duration::seconds(1);
    store.upsert_device(expired).await.expect("expire device");

    assert_eq!(service.validate(&token).await, TokenValidation::Invalid);
}

#[tokio::test]
async fn validation_rejects_an_expired_token_outright() {
    let (store, service) = setup();
    let account_id = AccountId::new();

    let expired_device = Device::new(
        account_id,
        "fp1".to_string(),
        Utc::now() - Duration::hours(1),
    );
    store
        .upsert_device(expired_device.clone())
        .await
        .expect("store device");
    let token = service.sign(account_id, &expired_device).expect("sign");

    assert_eq!(service.validate(&token).await, TokenValidation::Invalid);
}

#[tokio::test]
async fn validation_rejects_tampered_tokens() {
    let (_, service) = setup();
    let account_id = AccountId::new();

    let token = service.issue(account_id, "fp1").await.expect("issue");
    let mut tampered = token.clone();
    tampered.pop();
    tampered.push('A');

    assert_eq!(service.validate(&tampered).await, TokenValidation::Invalid);
    assert_eq!(service.validate("not-a-token").await, TokenValidation::Invalid);
}

#[tokio::test]
async fn validation_rejects_foreign_issuer_and_audience() {
    let store = Arc::new(InMemoryAuthStore::new());
    let service = TokenService::new(store.clone(), &support::test_config());

    let mut other_config = support::test_config();
    other_config.jwt_issuer = "someone-else".to_string();
    let other_issuer = TokenService::new(store.clone(), &other_config);

    let mut other_config = support::test_config();
    other_config.jwt_audience = "other-clients".to_string();
    let other_audience = TokenService::new(store.clone(), &other_config);

    let account_id = AccountId::new();
    let from_other_issuer = other_issuer.issue(account_id, "fp1").await.expect("issue");
    let from_other_audience = other_audience
        .issue(account_id, "fp2")
        .await
        .expect("issue");

    assert_eq!(
        service.validate(&from_other_issuer).await,
        TokenValidation::Invalid
    );
    assert_eq!(
        service.validate(&from_other_audience).await,
        TokenValidation::Invalid
    );
}

#[tokio::test]
async fn each_token_carries_a_unique_jti() {
    let (_, service) = setup();
    let account_id = AccountId::new();

    let first = service.issue(account_id, "fp1").await.expect("issue");
    let second = service.issue(account_id, "fp1").await.expect("issue");
    assert_ne!(decode_claims(&first).jti, decode_claims(&second).jti);
}

#[tokio::test]
async fn extract_account_id_skips_the_store() {
    let (_, service) = setup();
    let account_id = AccountId::new();

    let token = service.issue(account_id, "fp1").await.expect("issue");
    assert_eq!(service.extract_account_id(&token), Some(account_id));
    assert_eq!(service.extract_account_id("garbage"), None);

    let stranger = TokenService::new(
        Arc::new(InMemoryAuthStore::new()),
        &Config {
            jwt_secret: "another-secret-another-secret-ends!!".to_string(),
            ..support::test_config()
        },
    );
    assert_eq!(stranger.extract_account_id(&token), None);
}
