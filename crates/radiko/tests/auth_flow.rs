mod common;

use common::MockRadiko;
use radiko_engine::auth::{Authenticator, find_area};
use radiko_engine::error::AuthPhase;
use radiko_engine::{
    AuthError, CredentialManager, DeviceIdentity, HttpAuthenticator, MemorySessionStore,
    RadikoConfig, SessionStore, StoreKey, create_client,
};
use std::sync::Arc;

fn authenticator(config: &RadikoConfig) -> HttpAuthenticator {
    let client = create_client(&config.http).unwrap();
    HttpAuthenticator::new(client, config.endpoints.clone(), config.auth.clone())
}

#[tokio::test]
async fn test_handshake_uses_server_key_window() {
    let mock = MockRadiko::start().await;
    let config = mock.config();

    let issued = authenticator(&config)
        .authenticate(&DeviceIdentity::generate(), "JP27")
        .await
        .unwrap();

    assert_eq!(issued.token, "mock-token-1");
    assert_eq!(issued.area_id, "JP27");
    assert!(issued.area_info.starts_with("JP27,"));
    assert!(!issued.area_info.ends_with('\n'));

    let osaka = find_area("JP27").unwrap();
    assert_eq!(mock.locations(), vec![osaka.location_header()]);
}

#[tokio::test]
async fn test_unknown_area_falls_back_to_tokyo() {
    let mock = MockRadiko::start().await;
    let config = mock.config();

    let issued = authenticator(&config)
        .authenticate(&DeviceIdentity::generate(), "JP99")
        .await
        .unwrap();

    assert_eq!(issued.area_id, "JP13");
    assert_eq!(mock.locations(), vec![find_area("JP13").unwrap().location_header()]);
}

#[tokio::test]
async fn test_overridden_key_window_is_rejected_by_auth2() {
    let mock = MockRadiko::start().await;
    let config = RadikoConfig::builder()
        .with_base_url(mock.base_url())
        .with_system_proxy(false)
        .with_partial_key_override(0, 16)
        .build();

    let err = authenticator(&config)
        .authenticate(&DeviceIdentity::generate(), "JP13")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AuthError::Status {
            phase: AuthPhase::Auth2,
            status
        } if status == reqwest::StatusCode::UNAUTHORIZED
    ));
    assert_eq!(mock.count("/v2/api/auth1"), 1);
    assert_eq!(mock.count("/v2/api/auth2"), 1);
}

#[tokio::test]
async fn test_manager_caches_and_persists() {
    let mock = MockRadiko::start().await;
    let config = mock.config();
    let store = Arc::new(MemorySessionStore::new());
    let manager = CredentialManager::new(
        store.clone(),
        Arc::new(authenticator(&config)),
        config.auth.clone(),
    );

    let first = manager.ensure_credential(Some("JP14")).await.unwrap();
    let second = manager.ensure_credential(Some("JP14")).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(mock.tokens_issued(), 1);

    assert_eq!(
        store.get_string(StoreKey::AuthToken).await.unwrap().as_deref(),
        Some("mock-token-1")
    );
    assert_eq!(
        store.get_string(StoreKey::AreaId).await.unwrap().as_deref(),
        Some("JP14")
    );
    assert!(store.get(StoreKey::DeviceInfo).await.unwrap().is_some());

    let moved = manager.ensure_credential(Some("JP01")).await.unwrap();
    assert_eq!(moved.area_id, "JP01");
    assert_eq!(mock.tokens_issued(), 2);
}
