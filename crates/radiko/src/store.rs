//! Session persistence.
//!
//! Device identity and the cached credential live in a key-value store owned
//! by the host. The engine only needs batch `set` so a credential is never
//! half-written, plus `get` and `remove`.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StoreError;

/// Keys the engine reads and writes, with names shared by every host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    DeviceInfo,
    AuthToken,
    AreaId,
    AreaInfo,
    TokenTimestamp,
    PreferredArea,
    RequestedArea,
    KeepAlive,
}

impl StoreKey {
    pub const ALL: [StoreKey; 8] = [
        StoreKey::DeviceInfo,
        StoreKey::AuthToken,
        StoreKey::AreaId,
        StoreKey::AreaInfo,
        StoreKey::TokenTimestamp,
        StoreKey::PreferredArea,
        StoreKey::RequestedArea,
        StoreKey::KeepAlive,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            StoreKey::DeviceInfo => "radiko_device_info",
            StoreKey::AuthToken => "radiko_auth_token",
            StoreKey::AreaId => "radiko_area_id",
            StoreKey::AreaInfo => "radiko_area_info",
            StoreKey::TokenTimestamp => "radiko_token_timestamp",
            StoreKey::PreferredArea => "radiko_preferred_area",
            StoreKey::RequestedArea => "radiko_requested_area",
            StoreKey::KeepAlive => "keepAlive",
        }
    }
}

impl std::fmt::Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: StoreKey) -> Result<Option<Value>, StoreError>;

    /// Writes every entry or none of them.
    async fn set(&self, entries: Vec<(StoreKey, Value)>) -> Result<(), StoreError>;

    async fn remove(&self, keys: &[StoreKey]) -> Result<(), StoreError>;

    async fn get_string(&self, key: StoreKey) -> Result<Option<String>, StoreError> {
        match self.get(key).await? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(StoreError::Corrupt {
                key: key.as_str(),
                reason: format!("expected a string, found {other}"),
            }),
        }
    }

    async fn get_i64(&self, key: StoreKey) -> Result<Option<i64>, StoreError> {
        match self.get(key).await? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n.as_i64().map(Some).ok_or(StoreError::Corrupt {
                key: key.as_str(),
                reason: format!("expected an integer, found {n}"),
            }),
            Some(other) => Err(StoreError::Corrupt {
                key: key.as_str(),
                reason: format!("expected an integer, found {other}"),
            }),
        }
    }
}

/// In-memory store for tests and hosts without persistence.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: parking_lot::Mutex<HashMap<StoreKey, Value>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> HashMap<StoreKey, Value> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: StoreKey) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.lock().get(&key).cloned())
    }

    async fn set(&self, entries: Vec<(StoreKey, Value)>) -> Result<(), StoreError> {
        self.entries.lock().extend(entries);
        Ok(())
    }

    async fn remove(&self, keys: &[StoreKey]) -> Result<(), StoreError> {
        let mut map = self.entries.lock();
        for key in keys {
            map.remove(key);
        }
        Ok(())
    }
}

/// Store persisted as a single JSON object.
///
/// Every mutation rewrites the file through a sibling temp file and a rename,
/// so readers never observe a partially written document. Unknown keys found
/// on disk are preserved.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<Map<String, Value>>,
}

impl JsonFileStore {
    /// Opens the store at `path`, starting empty when the file does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match tokio::fs::read(&path).await {
            Ok(raw) if raw.iter().all(u8::is_ascii_whitespace) => Map::new(),
            Ok(raw) => match serde_json::from_slice::<Value>(&raw)? {
                Value::Object(map) => map,
                other => {
                    return Err(StoreError::Corrupt {
                        key: "<root>",
                        reason: format!("expected a JSON object, found {other}"),
                    });
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), keys = entries.len(), "Opened session store");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, entries: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let body = serde_json::to_vec_pretty(entries)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for JsonFileStore {
    async fn get(&self, key: StoreKey) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.lock().await.get(key.as_str()).cloned())
    }

    async fn set(&self, entries: Vec<(StoreKey, Value)>) -> Result<(), StoreError> {
        let mut guard = self.entries.lock().await;
        let mut next = guard.clone();
        for (key, value) in entries {
            next.insert(key.as_str().to_string(), value);
        }
        self.persist(&next).await?;
        *guard = next;
        Ok(())
    }

    async fn remove(&self, keys: &[StoreKey]) -> Result<(), StoreError> {
        let mut guard = self.entries.lock().await;
        let mut next = guard.clone();
        let mut changed = false;
        for key in keys {
            changed |= next.remove(key.as_str()).is_some();
        }
        if changed {
            self.persist(&next).await?;
            *guard = next;
        }
        Ok(())
    }
}
