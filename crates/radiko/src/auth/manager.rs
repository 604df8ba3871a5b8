use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::device::DeviceIdentity;
use super::handshake::Authenticator;
use crate::config::AuthConfig;
use crate::error::{RadikoError, StoreError};
use crate::store::{SessionStore, StoreKey};

/// A time-boxed token bound to a confirmed area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credential {
    pub token: String,
    pub area_id: String,
    pub area_info: String,
    /// Issue time, epoch milliseconds
    pub issued_at_ms: i64,
}

impl Credential {
    pub fn age(&self, now_ms: i64) -> Duration {
        Duration::from_millis(now_ms.saturating_sub(self.issued_at_ms).max(0) as u64)
    }

    /// True while `now - issued_at < ttl`. A timestamp in the future is never fresh.
    pub fn is_fresh(&self, now_ms: i64, ttl: Duration) -> bool {
        let age = now_ms.saturating_sub(self.issued_at_ms);
        age >= 0 && (age as u128) < ttl.as_millis()
    }

    /// Leading characters of the token, safe to log or display.
    pub fn token_prefix(&self) -> &str {
        token_prefix(&self.token)
    }
}

pub(crate) fn token_prefix(token: &str) -> &str {
    let end = token
        .char_indices()
        .nth(8)
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    &token[..end]
}

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Read-through cache over the handshake.
///
/// Every path that may re-issue a credential runs under one lock, so two
/// callers racing on an expired token produce a single handshake.
pub struct CredentialManager {
    store: Arc<dyn SessionStore>,
    authenticator: Arc<dyn Authenticator>,
    config: AuthConfig,
    refresh_lock: Mutex<()>,
}

impl CredentialManager {
    pub fn new(
        store: Arc<dyn SessionStore>,
        authenticator: Arc<dyn Authenticator>,
        config: AuthConfig,
    ) -> Self {
        Self {
            store,
            authenticator,
            config,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Explicit argument, then the stored preference, then the configured default.
    pub async fn preferred_area(&self, explicit: Option<&str>) -> Result<String, RadikoError> {
        if let Some(area) = explicit.filter(|a| !a.is_empty()) {
            return Ok(area.to_string());
        }
        Ok(self
            .store
            .get_string(StoreKey::PreferredArea)
            .await?
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| self.config.default_area.clone()))
    }

    /// The persisted credential, if a complete one exists.
    pub async fn cached_credential(&self) -> Result<Option<Credential>, RadikoError> {
        let Some(token) = self.store.get_string(StoreKey::AuthToken).await? else {
            return Ok(None);
        };
        let Some(issued_at_ms) = self.store.get_i64(StoreKey::TokenTimestamp).await? else {
            return Ok(None);
        };
        Ok(Some(Credential {
            token,
            area_id: self
                .store
                .get_string(StoreKey::AreaId)
                .await?
                .unwrap_or_default(),
            area_info: self
                .store
                .get_string(StoreKey::AreaInfo)
                .await?
                .unwrap_or_default(),
            issued_at_ms,
        }))
    }

    /// Returns the cached credential while it is fresh and was requested for
    /// the preferred area; otherwise runs both handshake phases.
    pub async fn ensure_credential(
        &self,
        preferred_area: Option<&str>,
    ) -> Result<Credential, RadikoError> {
        let _guard = self.refresh_lock.lock().await;
        let area = self.preferred_area(preferred_area).await?;

        if let Some(cached) = self.cached_credential().await? {
            let requested = self
                .store
                .get_string(StoreKey::RequestedArea)
                .await?
                .unwrap_or_else(|| cached.area_id.clone());
            let now = now_ms();
            if cached.is_fresh(now, self.config.token_ttl) && requested == area {
                let remaining = self.config.token_ttl.saturating_sub(cached.age(now));
                debug!(
                    area = %cached.area_id,
                    remaining_mins = remaining.as_secs() / 60,
                    "Using cached token"
                );
                return Ok(cached);
            }
            debug!(requested = %requested, preferred = %area, "Cached token is stale or for another area");
        }

        self.issue(&area).await
    }

    /// Discards any cached token and re-runs both phases.
    pub async fn force_reauthenticate(
        &self,
        preferred_area: Option<&str>,
    ) -> Result<Credential, RadikoError> {
        let _guard = self.refresh_lock.lock().await;
        self.store
            .remove(&[StoreKey::AuthToken, StoreKey::TokenTimestamp])
            .await?;
        let area = self.preferred_area(preferred_area).await?;
        self.issue(&area).await
    }

    async fn issue(&self, area: &str) -> Result<Credential, RadikoError> {
        let device = self.device_identity().await?;
        let issued = self.authenticator.authenticate(&device, area).await?;
        let credential = Credential {
            token: issued.token,
            area_id: issued.area_id,
            area_info: issued.area_info,
            issued_at_ms: now_ms(),
        };

        self.store
            .set(vec![
                (StoreKey::AuthToken, json!(credential.token)),
                (StoreKey::AreaId, json!(credential.area_id)),
                (StoreKey::AreaInfo, json!(credential.area_info)),
                (StoreKey::TokenTimestamp, json!(credential.issued_at_ms)),
                (StoreKey::RequestedArea, json!(area)),
            ])
            .await?;

        info!(
            area = %credential.area_id,
            token = %credential.token_prefix(),
            "Issued new token"
        );
        Ok(credential)
    }

    /// The persisted identity, without generating one.
    pub async fn stored_device(&self) -> Result<Option<DeviceIdentity>, RadikoError> {
        let Some(value) = self.store.get(StoreKey::DeviceInfo).await? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(device) => Ok(Some(device)),
            Err(e) => {
                warn!(error = %e, "Stored device identity is unreadable");
                Ok(None)
            }
        }
    }

    /// The persisted identity, generating and persisting one on first use.
    pub async fn device_identity(&self) -> Result<DeviceIdentity, RadikoError> {
        if let Some(device) = self.stored_device().await? {
            return Ok(device);
        }
        let device = DeviceIdentity::generate();
        let value = serde_json::to_value(&device).map_err(StoreError::from)?;
        self.store.set(vec![(StoreKey::DeviceInfo, value)]).await?;
        info!(device = %device.device, "Generated device identity");
        Ok(device)
    }
}
